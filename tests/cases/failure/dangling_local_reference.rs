// expect: DanglingReference
fn dangle() -> &String {
    let s = String::from("hello");
    &s
}

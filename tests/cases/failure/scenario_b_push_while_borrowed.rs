// expect: ConflictingBorrow
fn main() {
    let mut v = vec![1, 2, 3];
    let r1 = &v[2];
    v.push(4);
    println!("{}", r1);
}

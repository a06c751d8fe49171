// expect: UseOfMovedValue
fn main() {
    let x = String::from("hello");
    let y = x;
    println!("{} {}", x, y);
}

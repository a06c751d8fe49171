fn main() {
    let x = String::from("hello");
    let y = x.clone();
    println!("{} {}", x, y);
}

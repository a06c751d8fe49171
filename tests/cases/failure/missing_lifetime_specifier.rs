// expect: AmbiguousLifetime
fn pick(x: &str, y: &str) -> &str {
    x
}

fn main() {
    let a = String::from("a");
    let b = String::from("b");
    println!("{}", pick(a.as_str(), b.as_str()));
}

struct Pair { left: String, right: String }

fn main() {
    let mut pair = Pair { left: String::new(), right: String::new() };
    let l = &mut pair.left;
    let r = &pair.right;
    l.push_str("a");
    println!("{} {}", l, r);
}

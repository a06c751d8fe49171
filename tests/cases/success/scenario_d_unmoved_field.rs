struct Account { owner: String, note: String }

fn main() {
    let account = Account { owner: String::from("ferris"), note: String::from("hi") };
    let bytes = account.owner.into_bytes();
    println!("{}", bytes.len());
    println!("{}", account.note);
}

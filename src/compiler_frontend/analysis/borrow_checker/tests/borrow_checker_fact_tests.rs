use crate::compiler_frontend::analysis::borrow_checker::LoanKindName;
use crate::compiler_frontend::analysis::borrow_checker::tests::test_support::{
    assert_accepted, check, check_with_facts, first_fact_with, summary,
};

const BORROW_THEN_PUSH: &str = "fn main() {
    let mut v = vec![1, 2, 3];
    let num = &v[2];
    println!(\"Third element is {}\", *num);
    v.push(4);
}";

#[test]
fn borrowing_an_element_takes_write_and_own_from_the_vector() {
    let outcome = check_with_facts(BORROW_THEN_PUSH);
    assert_accepted(&outcome);

    let main = summary(&outcome, "main");
    assert_eq!(first_fact_with(main, "v").permissions_of("v"), Some("RWO-"));

    let after_borrow = first_fact_with(main, "num");
    assert_eq!(after_borrow.statement, "let");
    assert_eq!(after_borrow.permissions_of("v"), Some("R---"));
    assert_eq!(after_borrow.permissions_of("num"), Some("R-O-"));
    assert_eq!(after_borrow.permissions_of("*num"), Some("R---"));
    assert_eq!(after_borrow.live_loans.len(), 1);
}

#[test]
fn permissions_come_back_after_the_last_use() {
    let outcome = check_with_facts(BORROW_THEN_PUSH);
    let main = summary(&outcome, "main");

    let after_push = main
        .facts
        .iter()
        .rfind(|fact| fact.statement == "expression")
        .expect("the push should have a fact");
    assert_eq!(after_push.permissions_of("v"), Some("RWO-"));

    let element_loan = main
        .loans
        .iter()
        .find(|loan| loan.place == "v[2]")
        .expect("the element borrow should be recorded");
    assert_eq!(element_loan.kind, LoanKindName::Shared);
    assert!(element_loan.ended_at.is_some());
    assert!(element_loan.ended_at.unwrap_or_default() <= after_push.point);
}

#[test]
fn a_mutable_borrow_takes_every_permission_from_the_owner() {
    let outcome = check_with_facts(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let m = &mut v;
             m.push(4);
             println!(\"{:?}\", v);
         }",
    );
    assert_accepted(&outcome);

    let after_borrow = first_fact_with(summary(&outcome, "main"), "m");
    assert_eq!(after_borrow.permissions_of("v"), Some("----"));
    assert_eq!(after_borrow.permissions_of("m"), Some("R-O-"));
    assert_eq!(after_borrow.permissions_of("*m"), Some("RW--"));
}

#[test]
fn reading_through_a_mutable_reference_downgrades_it() {
    let outcome = check_with_facts(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let m = &mut v;
             let s = &*m;
             println!(\"{}\", s.len());
             m.push(4);
         }",
    );
    assert_accepted(&outcome);

    let main = summary(&outcome, "main");
    let after_reborrow = first_fact_with(main, "s");
    assert_eq!(after_reborrow.permissions_of("v"), Some("R---"));
    assert_eq!(after_reborrow.permissions_of("*m"), Some("R---"));
    assert_eq!(after_reborrow.permissions_of("*s"), Some("R---"));

    let unique = main
        .loans
        .iter()
        .find(|loan| loan.kind == LoanKindName::Unique && loan.place == "v")
        .expect("the mutable borrow should be recorded");
    assert!(unique.downgraded);
}

#[test]
fn shared_borrows_coexist_and_both_end() {
    let outcome = check_with_facts(
        "fn main() {
             let mut v = vec![1, 2];
             let a = &v;
             let b = &v;
             println!(\"{:?} {:?}\", a, b);
             v.push(3);
         }",
    );
    assert_accepted(&outcome);

    let main = summary(&outcome, "main");
    let after_second = first_fact_with(main, "b");
    assert_eq!(after_second.live_loans.len(), 2);
    assert_eq!(after_second.permissions_of("v"), Some("R---"));
    assert_eq!(main.max_live_loans, 2);

    let shared = main
        .loans
        .iter()
        .filter(|loan| loan.kind == LoanKindName::Shared)
        .collect::<Vec<_>>();
    assert_eq!(shared.len(), 2);
    assert!(shared.iter().all(|loan| loan.ended_at.is_some()));
}

#[test]
fn moved_values_have_no_permissions() {
    let outcome = check_with_facts(
        "fn main() {
             let s = String::from(\"hello\");
             let t = s;
             println!(\"{}\", t);
         }",
    );

    let after_move = first_fact_with(summary(&outcome, "main"), "t");
    assert_eq!(after_move.permissions_of("s"), Some("----"));
    assert_eq!(after_move.permissions_of("t"), Some("R-O-"));
}

#[test]
fn parameters_tied_to_the_result_can_flow() {
    let outcome = check_with_facts(
        "fn first_word(s: &String) -> &str {
             let len = s.len();
             println!(\"{}\", len);
             s.as_str()
         }",
    );
    assert_accepted(&outcome);

    let fact = first_fact_with(summary(&outcome, "first_word"), "len");
    assert_eq!(fact.permissions_of("s"), Some("R-OF"));
    assert_eq!(fact.permissions_of("*s"), Some("R--F"));
    assert_eq!(fact.permissions_of("len"), Some("R-O-"));
}

#[test]
fn nothing_flows_out_of_a_function_returning_an_owned_value() {
    let outcome = check_with_facts(
        "fn shout(s: &String) -> String {
             let upper = s.to_uppercase();
             println!(\"{}\", upper);
             upper
         }",
    );

    let fact = first_fact_with(summary(&outcome, "shout"), "upper");
    assert_eq!(fact.permissions_of("s"), Some("R-O-"));
}

#[test]
fn facts_are_only_collected_on_request() {
    let outcome = check(BORROW_THEN_PUSH);
    assert!(summary(&outcome, "main").facts.is_empty());
}

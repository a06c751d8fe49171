use crate::compiler_frontend::analysis::borrow_checker::LoanKindName;
use crate::compiler_frontend::analysis::borrow_checker::tests::test_support::{
    assert_accepted, check, check_lexical, expect_error, run_borrow_checker, settings, summary,
};
use crate::compiler_frontend::compiler_errors::{ErrorMetaDataKey, ErrorType};
use crate::settings::{CheckerSettings, RestorationMode};

// ---------
// Ownership
// ---------

#[test]
fn reading_a_moved_string_is_rejected() {
    let outcome = check(
        "fn main() {
             let x = String::from(\"hello\");
             let y = x;
             println!(\"{} {}\", x, y);
         }",
    );

    let error = expect_error(&outcome, ErrorType::UseOfMovedValue);
    assert_eq!(error.place.as_deref(), Some("x"));
    assert_eq!(error.function.as_deref(), Some("main"));
    assert!(error.related.is_some(), "the move should be pointed at");
    assert_eq!(error.metadata_value(ErrorMetaDataKey::MovedVariable), Some("x"));
}

#[test]
fn copy_types_are_not_moved() {
    let outcome = check(
        "fn main() {
             let x = 5;
             let y = x;
             println!(\"{} {}\", x, y);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn passing_by_value_moves_the_argument() {
    let outcome = check(
        "fn consume(s: String) { println!(\"{}\", s); }
         fn main() {
             let s = String::from(\"hi\");
             consume(s);
             println!(\"{}\", s.len());
         }",
    );
    expect_error(&outcome, ErrorType::UseOfMovedValue);
}

#[test]
fn moving_twice_is_rejected() {
    let outcome = check(
        "fn main() {
             let s = String::from(\"hi\");
             drop(s);
             drop(s);
         }",
    );
    expect_error(&outcome, ErrorType::UseOfMovedValue);
}

#[test]
fn cloning_leaves_the_original_usable() {
    let outcome = check(
        "fn main() {
             let s = String::from(\"hi\");
             let t = s.clone();
             drop(t);
             println!(\"{}\", s);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn reassigning_a_moved_binding_makes_it_usable_again() {
    let outcome = check(
        "fn main() {
             let mut s = String::from(\"a\");
             let t = s;
             s = String::from(\"b\");
             println!(\"{} {}\", s, t);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn a_move_in_one_branch_counts_after_the_branch() {
    let outcome = check(
        "fn main(flag: bool) {
             let s = String::from(\"a\");
             if flag {
                 drop(s);
             }
             println!(\"{}\", s);
         }",
    );
    expect_error(&outcome, ErrorType::UseOfMovedValue);
}

#[test]
fn moving_in_both_branches_is_fine_when_unused_after() {
    let outcome = check(
        "fn main(flag: bool) {
             let s = String::from(\"a\");
             if flag {
                 drop(s);
             } else {
                 let t = s;
                 println!(\"{}\", t);
             }
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn reading_an_uninitialized_binding_is_rejected() {
    let outcome = check(
        "fn main() {
             let x: i32;
             println!(\"{}\", x);
         }",
    );

    let error = expect_error(&outcome, ErrorType::UseOfMovedValue);
    assert!(error.msg.contains("before it was initialized"), "{}", error.msg);
}

#[test]
fn a_deferred_binding_can_be_assigned_once() {
    let outcome = check(
        "fn main() {
             let x;
             x = 5;
             println!(\"{}\", x);
         }",
    );
    assert_accepted(&outcome);
}

// ---------------------------------
// Partial moves out of struct fields
// ---------------------------------

const ACCOUNT: &str = "struct Account { owner: String, note: String }";

fn with_account(body: &str) -> String {
    format!(
        "{ACCOUNT}
         fn main() {{
             let account = Account {{ owner: String::from(\"ferris\"), note: String::from(\"hi\") }};
             let bytes = account.owner.into_bytes();
             println!(\"{{}}\", bytes.len());
             {body}
         }}"
    )
}

#[test]
fn the_unmoved_field_stays_readable() {
    let outcome = check(&with_account("println!(\"{}\", account.note);"));
    assert_accepted(&outcome);
}

#[test]
fn the_moved_field_is_gone() {
    let outcome = check(&with_account("println!(\"{}\", account.owner);"));
    let error = expect_error(&outcome, ErrorType::UseOfMovedValue);
    assert_eq!(error.place.as_deref(), Some("account.owner"));
}

#[test]
fn the_whole_struct_cannot_be_moved_after_a_partial_move() {
    let outcome = check(&with_account("let whole = account; drop(whole);"));
    let error = expect_error(&outcome, ErrorType::UseOfMovedValue);
    assert!(error.msg.contains("part of it was moved"), "{}", error.msg);
}

#[test]
fn the_whole_struct_cannot_be_borrowed_after_a_partial_move() {
    let outcome = check(&with_account("let r = &account; println!(\"{}\", r.note);"));
    expect_error(&outcome, ErrorType::UseOfMovedValue);
}

#[test]
fn reassigning_the_moved_field_restores_the_struct() {
    let outcome = check(
        "struct Account { owner: String, note: String }
         fn main() {
             let mut account = Account { owner: String::from(\"a\"), note: String::from(\"b\") };
             let owner = account.owner;
             account.owner = String::from(\"c\");
             let whole = account;
             println!(\"{} {}\", owner, whole.note);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn a_by_value_method_moves_the_whole_receiver() {
    let outcome = check(
        "struct Account { owner: String, note: String }
         impl Account {
             fn close(self) -> String { self.owner }
         }
         fn main() {
             let account = Account { owner: String::from(\"a\"), note: String::from(\"b\") };
             let owner = account.close();
             println!(\"{} {}\", owner, account.note);
         }",
    );
    expect_error(&outcome, ErrorType::UseOfMovedValue);
}

// -------
// Borrows
// -------

#[test]
fn pushing_while_an_element_borrow_is_used_later_conflicts() {
    let outcome = check(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let r1 = &v[2];
             v.push(4);
             println!(\"{}\", r1);
         }",
    );

    let error = expect_error(&outcome, ErrorType::ConflictingBorrow);
    assert_eq!(error.place.as_deref(), Some("v"));
    assert_eq!(error.metadata_value(ErrorMetaDataKey::BorrowedVariable), Some("v[2]"));
    assert!(error.related.is_some());
}

#[test]
fn pushing_after_the_last_use_of_the_borrow_is_fine() {
    let source = "fn main() {
                      let mut v = vec![1, 2, 3];
                      let r1 = &v[2];
                      println!(\"{}\", r1);
                      v.push(4);
                  }";

    assert_accepted(&check(source));

    // Lexical restoration keeps the loan until r1 goes out of scope
    expect_error(&check_lexical(source), ErrorType::ConflictingBorrow);
}

#[test]
fn two_phase_receiver_allows_reading_in_the_arguments() {
    let outcome = check(
        "fn main() {
             let mut v = vec![1, 2];
             v.push(v.len());
             println!(\"{}\", v.len());
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn a_second_unique_borrow_conflicts() {
    let outcome = check(
        "fn main() {
             let mut s = String::new();
             let a = &mut s;
             let b = &mut s;
             a.push_str(\"x\");
             b.push_str(\"y\");
         }",
    );
    expect_error(&outcome, ErrorType::ConflictingBorrow);
}

#[test]
fn reading_the_owner_while_a_unique_borrow_lives_conflicts() {
    let outcome = check(
        "fn main() {
             let mut s = String::new();
             let r = &mut s;
             println!(\"{}\", s);
             r.push_str(\"a\");
         }",
    );

    let error = expect_error(&outcome, ErrorType::ConflictingBorrow);
    assert_eq!(error.place.as_deref(), Some("s"));
}

#[test]
fn many_shared_borrows_coexist() {
    let outcome = check(
        "fn main() {
             let s = String::from(\"hi\");
             let a = &s;
             let b = &s;
             let c = &s;
             println!(\"{} {} {} {}\", a, b, c, s);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn disjoint_fields_can_be_borrowed_independently() {
    let outcome = check(
        "struct Pair { left: String, right: String }
         fn main() {
             let mut pair = Pair { left: String::new(), right: String::new() };
             let l = &mut pair.left;
             let r = &pair.right;
             l.push_str(\"a\");
             println!(\"{} {}\", l, r);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn a_field_borrow_blocks_unique_use_of_the_parent() {
    let outcome = check(
        "struct Pair { left: String, right: String }
         fn touch(p: &mut Pair) { p.left.push_str(\"!\"); }
         fn main() {
             let mut pair = Pair { left: String::new(), right: String::new() };
             let l = &pair.left;
             touch(&mut pair);
             println!(\"{}\", l);
         }",
    );
    expect_error(&outcome, ErrorType::ConflictingBorrow);
}

#[test]
fn distinct_literal_indexes_are_disjoint() {
    let source = "fn main() {
                      let mut v = vec![1, 2, 3];
                      let a = &mut v[0];
                      let b = &v[1];
                      *a += 1;
                      println!(\"{}\", b);
                  }";

    assert_accepted(&check(source));

    let strict = CheckerSettings {
        literal_index_disjointness: false,
        ..settings(RestorationMode::LastUse)
    };
    expect_error(&run_borrow_checker(source, &strict, false), ErrorType::ConflictingBorrow);
}

#[test]
fn dynamic_indexes_may_alias() {
    let outcome = check(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let i = 0;
             let j = 1;
             let a = &mut v[i];
             let b = &v[j];
             *a += 1;
             println!(\"{}\", b);
         }",
    );
    expect_error(&outcome, ErrorType::ConflictingBorrow);
}

#[test]
fn a_shared_reborrow_downgrades_the_unique_loan() {
    let outcome = check(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let m = &mut v;
             let s = &*m;
             println!(\"{} {}\", m.len(), s.len());
         }",
    );
    assert_accepted(&outcome);

    let main = summary(&outcome, "main");
    let unique = main
        .loans
        .iter()
        .find(|loan| loan.kind == LoanKindName::Unique)
        .expect("the &mut v loan");
    assert!(unique.downgraded);
    assert!(unique.derived_from.is_empty());

    let reborrow = main
        .loans
        .iter()
        .find(|loan| loan.kind == LoanKindName::Shared)
        .expect("the &*m loan");
    assert_eq!(reborrow.derived_from, vec![unique.id]);
}

#[test]
fn writing_through_a_downgraded_reference_conflicts_while_the_reader_lives() {
    let outcome = check(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let m = &mut v;
             let s = &*m;
             m.push(4);
             println!(\"{}\", s.len());
         }",
    );
    expect_error(&outcome, ErrorType::ConflictingBorrow);
}

// ----------------------
// Write and own checks
// ----------------------

#[test]
fn assigning_twice_to_an_immutable_binding_is_rejected() {
    let outcome = check(
        "fn main() {
             let x = 5;
             x = 6;
             println!(\"{}\", x);
         }",
    );

    let error = expect_error(&outcome, ErrorType::WriteWithoutPermission);
    assert!(error.msg.contains("assign twice"), "{}", error.msg);
    assert_eq!(error.metadata_value(ErrorMetaDataKey::PermissionsNeeded), Some("W"));
}

#[test]
fn mutating_an_immutable_binding_through_a_method_is_rejected() {
    let outcome = check(
        "fn main() {
             let s = String::new();
             s.push_str(\"a\");
         }",
    );

    let error = expect_error(&outcome, ErrorType::WriteWithoutPermission);
    assert!(error.msg.contains("not declared as mutable"), "{}", error.msg);
}

#[test]
fn mutating_through_a_shared_reference_is_rejected() {
    let outcome = check("fn append(r: &String) { r.push_str(\"!\"); }");

    let error = expect_error(&outcome, ErrorType::WriteWithoutPermission);
    assert_eq!(error.place.as_deref(), Some("*r"));
    assert!(error.msg.contains("behind a '&' reference"), "{}", error.msg);
}

#[test]
fn mutating_through_a_unique_reference_is_fine() {
    let outcome = check(
        "fn append(r: &mut String) { r.push_str(\"!\"); }
         fn main() {
             let mut s = String::new();
             append(&mut s);
             println!(\"{}\", s);
         }",
    );
    assert_accepted(&outcome);
}

#[test]
fn moving_out_of_a_reference_is_rejected() {
    let outcome = check("fn take(r: &String) -> String { *r }");

    let error = expect_error(&outcome, ErrorType::WriteWithoutPermission);
    assert!(error.msg.contains("behind a reference"), "{}", error.msg);
}

#[test]
fn moving_out_of_an_index_is_rejected() {
    let outcome = check(
        "fn main() {
             let v = vec![String::new()];
             let s = v[0];
             println!(\"{}\", s);
         }",
    );
    expect_error(&outcome, ErrorType::WriteWithoutPermission);
}

#[test]
fn assigning_while_borrowed_is_rejected() {
    let outcome = check(
        "fn main() {
             let mut x = 1;
             let r = &x;
             x = 2;
             println!(\"{}\", r);
         }",
    );

    let error = expect_error(&outcome, ErrorType::WriteWithoutPermission);
    assert!(error.msg.contains("because it is borrowed"), "{}", error.msg);
}

#[test]
fn moving_while_borrowed_is_rejected() {
    let outcome = check(
        "fn main() {
             let s = String::from(\"a\");
             let r = &s;
             let t = s;
             println!(\"{} {}\", r, t);
         }",
    );
    expect_error(&outcome, ErrorType::WriteWithoutPermission);
}

#[test]
fn errors_stop_only_their_own_function() {
    let outcome = check(
        "fn broken() {
             let s = String::new();
             drop(s);
             drop(s);
         }
         fn also_broken() {
             let x = 1;
             x = 2;
             println!(\"{}\", x);
         }
         fn fine() {
             let s = String::new();
             println!(\"{}\", s);
         }",
    );

    let kinds = outcome.errors.iter().map(|error| error.error_type).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![ErrorType::UseOfMovedValue, ErrorType::WriteWithoutPermission]
    );
    assert_eq!(outcome.report.stats.functions_analyzed, 3);
    assert_eq!(outcome.report.stats.functions_with_errors, 2);
    assert!(!summary(&outcome, "fine").has_error);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let source = "fn a() { let s = String::new(); drop(s); drop(s); }
                  fn b() { let mut v = vec![1]; let r = &v[0]; v.push(2); println!(\"{}\", r); }
                  fn c() { let x = 1; println!(\"{}\", x); }";

    let sequential = run_borrow_checker(source, &settings(RestorationMode::LastUse), false);
    let parallel = run_borrow_checker(
        source,
        &CheckerSettings {
            parallel: true,
            ..settings(RestorationMode::LastUse)
        },
        false,
    );

    let describe = |outcome: &crate::compiler_frontend::analysis::borrow_checker::BorrowOutcome| {
        outcome
            .errors
            .iter()
            .map(|error| (error.error_type, error.function.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(describe(&sequential), describe(&parallel));
    assert_eq!(describe(&sequential).len(), 2);
}

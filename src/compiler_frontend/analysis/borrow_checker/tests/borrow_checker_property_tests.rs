//! Property tests for the rules every program must follow,
//! over generated variations of small snippets.

use crate::compiler_frontend::analysis::borrow_checker::LoanKindName;
use crate::compiler_frontend::analysis::borrow_checker::tests::test_support::{
    check, check_lexical, summary,
};
use crate::compiler_frontend::compiler_errors::ErrorType;
use proptest::prelude::*;

// =========
// Snippets
// =========

/// `count` shared borrows of one vector, used in `uses` order, then a push
fn shared_borrows_then_push(count: usize, uses: &[usize]) -> String {
    let mut source = String::from("fn main() {\n    let mut v = vec![1, 2, 3];\n");
    for index in 0..count {
        source.push_str(&format!("    let r{index} = &v;\n"));
    }
    for index in uses {
        source.push_str(&format!("    println!(\"{{:?}}\", r{index});\n"));
    }
    source.push_str("    v.push(4);\n}\n");
    source
}

const PAIR: &str = "struct Pair { left: String, right: String }\n";

fn unique_borrow_then_access(held: &str, accessed: &str, access: Access) -> String {
    let access = match access {
        Access::Shared => format!("let other = &{accessed};"),
        Access::Unique => format!("let other = &mut {accessed};"),
        Access::Read => format!("println!(\"{{:?}}\", {accessed});"),
    };

    format!(
        "{PAIR}fn main() {{
             let mut p = Pair {{ left: String::new(), right: String::new() }};
             let m = &mut {held};
             {access}
             println!(\"{{:?}}\", m);
         }}"
    )
}

fn reference_escaping_blocks(depth: usize, branch: Branch, use_inside: bool) -> String {
    let assign = match branch {
        Branch::None => String::from("r = &x;"),
        Branch::Then => String::from("if flag { r = &x; } else { r = &outer; }"),
        Branch::Else => String::from("if flag { r = &outer; } else { r = &x; }"),
    };
    let inner_use = if use_inside { "println!(\"{}\", r);" } else { "" };
    let outer_use = if use_inside { "" } else { "println!(\"{}\", r);" };

    format!(
        "fn main() {{
             let outer = String::from(\"outer\");
             let flag = true;
             let r;
             {open}
             let x = String::from(\"x\");
             {assign}
             {inner_use}
             {close}
             {outer_use}
             println!(\"{{}} {{}}\", outer, flag);
         }}",
        open = "{".repeat(depth),
        close = "}".repeat(depth),
    )
}

// ===========
// Strategies
// ===========

#[derive(Debug, Clone, Copy)]
enum Access {
    Shared,
    Unique,
    Read,
}

#[derive(Debug, Clone, Copy)]
enum Branch {
    None,
    Then,
    Else,
}

/// Every borrow used at least once, plus some repeated uses, in any order
fn arb_use_order() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1..5usize).prop_flat_map(|count| {
        (Just(count), prop::collection::vec(0..count, 0..4)).prop_flat_map(|(count, extra)| {
            let mut uses = (0..count).collect::<Vec<_>>();
            uses.extend(extra);
            (Just(count), Just(uses).prop_shuffle())
        })
    })
}

fn arb_owned_value() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("String::from(\"hello\")"),
        Just("vec![1, 2, 3]"),
        Just("Box::new(5)"),
        Just("String::new()"),
    ]
}

fn arb_move() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("let t = s;"),
        Just("drop(s);"),
        Just("let boxed = Box::new(s);"),
    ]
}

fn arb_later_use() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("println!(\"{:?}\", s);"),
        Just("let r = &s;"),
        Just("let u = s;"),
        Just("drop(s);"),
    ]
}

fn arb_place() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("p"), Just("p.left"), Just("p.right")]
}

fn arb_access() -> impl Strategy<Value = Access> {
    prop_oneof![Just(Access::Shared), Just(Access::Unique), Just(Access::Read)]
}

fn arb_branch() -> impl Strategy<Value = Branch> {
    prop_oneof![Just(Branch::None), Just(Branch::Then), Just(Branch::Else)]
}

fn overlaps(a: &str, b: &str) -> bool {
    a == b || a == "p" || b == "p"
}

// =======
// Checks
// =======

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn restoration_does_not_depend_on_use_order((count, uses) in arb_use_order()) {
        let source = shared_borrows_then_push(count, &uses);
        let outcome = check(&source);

        prop_assert!(outcome.errors.is_empty(), "rejected:\n{}", source);

        let main = summary(&outcome, "main");
        prop_assert_eq!(main.max_live_loans, count);

        let shared = main.loans.iter().filter(|loan| loan.kind == LoanKindName::Shared);
        for loan in shared {
            prop_assert!(loan.ended_at.is_some(), "loan#{} never ended:\n{}", loan.id, source);
        }
    }

    #[test]
    fn lexical_restoration_waits_for_the_scope((count, uses) in arb_use_order()) {
        let source = shared_borrows_then_push(count, &uses);
        let outcome = check_lexical(&source);

        let kinds = outcome.errors.iter().map(|error| error.error_type).collect::<Vec<_>>();
        prop_assert_eq!(kinds, vec![ErrorType::ConflictingBorrow]);
    }

    #[test]
    fn reading_after_a_move_fails(
        value in arb_owned_value(),
        moved in arb_move(),
        used in arb_later_use(),
    ) {
        let source = format!("fn main() {{\n    let s = {value};\n    {moved}\n    {used}\n}}\n");
        let outcome = check(&source);

        let Some(error) = outcome.errors.first() else {
            return Err(TestCaseError::fail(format!("accepted:\n{source}")));
        };
        prop_assert_eq!(error.error_type, ErrorType::UseOfMovedValue);
        prop_assert_eq!(error.place.as_deref(), Some("s"));
    }

    #[test]
    fn a_live_unique_borrow_blocks_overlapping_access(
        held in prop_oneof![Just("p"), Just("p.left")],
        accessed in arb_place(),
        access in arb_access(),
    ) {
        let source = unique_borrow_then_access(held, accessed, access);
        let outcome = check(&source);

        if overlaps(held, accessed) {
            let kinds = outcome.errors.iter().map(|error| error.error_type).collect::<Vec<_>>();
            prop_assert_eq!(kinds, vec![ErrorType::ConflictingBorrow], "{}", source);
        } else {
            prop_assert!(outcome.errors.is_empty(), "rejected:\n{}", source);
        }
    }

    #[test]
    fn references_never_outlive_their_referent(
        depth in 1..4usize,
        branch in arb_branch(),
        use_inside in any::<bool>(),
    ) {
        let source = reference_escaping_blocks(depth, branch, use_inside);
        let outcome = check(&source);

        if use_inside {
            prop_assert!(outcome.errors.is_empty(), "rejected:\n{}", source);
        } else {
            let error = outcome.errors.first().map(|error| error.error_type);
            prop_assert_eq!(error, Some(ErrorType::DanglingReference), "{}", source);
        }
    }
}

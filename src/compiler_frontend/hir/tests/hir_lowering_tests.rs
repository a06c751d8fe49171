use crate::compiler_frontend::ast::parser::parse_ast;
use crate::compiler_frontend::ast::prelude::parse_prelude;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::compiler_warnings::WarningKind;
use crate::compiler_frontend::datatypes::TypeTable;
use crate::compiler_frontend::hir::hir_builder::{HirLowering, lower_module};
use crate::compiler_frontend::hir::hir_expression::format_captures;
use crate::compiler_frontend::hir::hir_nodes::{
    BorrowKind, DerefKind, HirExpression, HirExpressionKind, HirFunction, HirStatementKind,
    Projection,
};
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use std::path::Path;

fn lower(source: &str) -> (HirLowering, StringTable) {
    let mut string_table = StringTable::new();
    let mut ast = parse_prelude(&mut string_table).expect("prelude should parse");
    let tokens = tokenize(source, &mut string_table).expect("source should tokenize");
    ast.merge(parse_ast(tokens, &mut string_table, false).expect("source should parse"));

    let type_table = TypeTable::new(&ast, &[], &mut string_table).expect("types should collect");
    let lowering = lower_module(&ast, &type_table, &mut string_table, Path::new("test.rs"));
    (lowering, string_table)
}

fn lower_ok(source: &str) -> (HirLowering, StringTable) {
    let (lowering, string_table) = lower(source);
    assert!(
        lowering.errors.is_empty(),
        "unexpected errors: {:?}",
        lowering.errors.iter().map(|error| &error.msg).collect::<Vec<_>>()
    );
    (lowering, string_table)
}

fn function<'a>(lowering: &'a HirLowering, name: &str) -> &'a HirFunction {
    lowering
        .module
        .checked_functions()
        .find(|function| function.display_name == name)
        .expect("function should exist")
}

fn let_values(function: &HirFunction) -> Vec<&HirExpression> {
    function
        .statements()
        .iter()
        .filter_map(|statement| match &statement.kind {
            HirStatementKind::Let {
                value: Some(value), ..
            } => Some(value),
            _ => None,
        })
        .collect()
}

#[test]
fn strings_move_and_integers_copy() {
    let (lowering, _) = lower_ok(
        "fn main() {
             let s = String::from(\"a\");
             let t = s;
             let n = 1;
             let m = n;
             println!(\"{} {}\", t, m);
         }",
    );

    let values = let_values(function(&lowering, "main"));
    assert!(matches!(values[0].kind, HirExpressionKind::Call { .. }));
    assert!(matches!(values[1].kind, HirExpressionKind::Move(_)));
    assert!(matches!(values[2].kind, HirExpressionKind::Literal));
    assert!(matches!(values[3].kind, HirExpressionKind::Copy(_)));
}

#[test]
fn body_is_wrapped_in_param_and_block_scopes() {
    let (lowering, _) = lower_ok("fn main() { let x = 1; println!(\"{}\", x); }");

    let kinds = function(&lowering, "main")
        .statements()
        .iter()
        .map(|statement| &statement.kind)
        .collect::<Vec<_>>();

    assert!(matches!(kinds[0], HirStatementKind::EnterScope(_)));
    assert!(matches!(kinds[1], HirStatementKind::EnterScope(_)));
    assert!(matches!(kinds[kinds.len() - 2], HirStatementKind::ExitScope(_)));
    assert!(matches!(kinds[kinds.len() - 1], HirStatementKind::ExitScope(_)));
}

#[test]
fn mutable_method_receiver_is_a_two_phase_autoref() {
    let (lowering, _) = lower_ok("fn main() { let mut v = vec![1, 2]; v.push(v.len()); }");

    let main = function(&lowering, "main");
    let call = main
        .statements()
        .iter()
        .find_map(|statement| match &statement.kind {
            HirStatementKind::Expression(expression) => Some(expression),
            _ => None,
        })
        .expect("push call");

    let HirExpressionKind::Call { args, two_phase, .. } = &call.kind else {
        panic!("expected a call");
    };
    assert!(*two_phase);
    assert!(matches!(
        &args[0].kind,
        HirExpressionKind::Borrow { place, kind: BorrowKind::Unique } if place.is_root()
    ));

    let HirExpressionKind::Call { args: len_args, two_phase, .. } = &args[1].kind else {
        panic!("expected v.len()");
    };
    assert!(!*two_phase);
    assert!(matches!(
        len_args[0].kind,
        HirExpressionKind::Borrow {
            kind: BorrowKind::Shared,
            ..
        }
    ));
}

#[test]
fn field_access_looks_through_references() {
    let (lowering, _) = lower_ok(
        "struct Person { name: String }
         fn name_of(p: &Person) -> &String { &p.name }",
    );

    let returned = function(&lowering, "name_of")
        .statements()
        .iter()
        .find_map(|statement| match &statement.kind {
            HirStatementKind::Return(Some(value)) => Some(value),
            _ => None,
        })
        .expect("tail is returned");

    let HirExpressionKind::Borrow { place, kind } = &returned.kind else {
        panic!("expected a borrow");
    };
    assert_eq!(*kind, BorrowKind::Shared);
    assert!(matches!(
        place.projections.as_slice(),
        [Projection::Deref(DerefKind::Shared), Projection::Field(_)]
    ));
}

#[test]
fn let_if_assigns_in_both_arms() {
    let (lowering, string_table) = lower_ok(
        "fn pick(c: bool) -> i32 {
             let x = if c { 1 } else { 2 };
             x
         }",
    );

    let pick = function(&lowering, "pick");
    let kinds = pick.statements().iter().map(|statement| &statement.kind).collect::<Vec<_>>();

    let assigns = kinds
        .iter()
        .filter(|kind| matches!(kind, HirStatementKind::Assign { .. }))
        .count();
    assert_eq!(assigns, 2);
    assert!(kinds.iter().any(|kind| matches!(kind, HirStatementKind::If { .. })));
    assert!(kinds.iter().any(|kind| matches!(kind, HirStatementKind::Else)));
    assert!(kinds.iter().any(|kind| matches!(kind, HirStatementKind::EndIf)));

    // `x` takes the type of the arms
    let x = pick
        .locals
        .iter()
        .find(|local| string_table.resolve(local.name) == "x")
        .expect("x");
    assert_eq!(x.ty.display(&string_table), "i32");
}

#[test]
fn mutable_reference_arguments_are_reborrowed() {
    let (lowering, _) = lower_ok(
        "fn add(v: &mut Vec<i32>) { v.push(1); }
         fn main() {
             let mut v = Vec::new();
             let r = &mut v;
             add(r);
             add(r);
         }",
    );

    let main = function(&lowering, "main");
    let reborrows = main
        .statements()
        .iter()
        .filter(|statement| {
            matches!(
                &statement.kind,
                HirStatementKind::Expression(HirExpression {
                    kind: HirExpressionKind::Call { args, .. },
                    ..
                }) if matches!(
                    &args[0].kind,
                    HirExpressionKind::Borrow { place, kind: BorrowKind::Unique }
                        if matches!(
                            place.projections.as_slice(),
                            [Projection::Deref(DerefKind::Unique)]
                        )
                )
            )
        })
        .count();
    assert_eq!(reborrows, 2);
}

#[test]
fn format_strings_read_their_captures() {
    let (lowering, _) = lower_ok("fn main() { let name = String::new(); println!(\"hi {name}\"); }");

    let main = function(&lowering, "main");
    let format = main
        .statements()
        .iter()
        .find_map(|statement| match &statement.kind {
            HirStatementKind::Expression(expression) => Some(expression),
            _ => None,
        })
        .expect("println");

    let HirExpressionKind::Format(operands) = &format.kind else {
        panic!("expected a format macro");
    };
    assert!(matches!(operands[0].kind, HirExpressionKind::Read(_)));
    assert!(lowering.warnings.is_empty());
}

#[test]
fn format_captures_skip_escapes_and_positions() {
    assert_eq!(format_captures("{a} {{b}} {c:?} {} {0} {d:>4}"), vec!["a", "c", "d"]);
}

#[test]
fn unused_and_needlessly_mutable_locals_warn() {
    let (lowering, _) = lower_ok(
        "fn main() {
             let mut x = 1;
             let y = 2;
             let _ignored = 3;
             println!(\"{}\", x);
         }",
    );

    let kinds = lowering
        .warnings
        .iter()
        .map(|warning| (warning.msg.as_str(), warning.warning_kind))
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![("x", WarningKind::UnusedMutable), ("y", WarningKind::UnusedVariable)]
    );
}

#[test]
fn statements_after_return_are_unreachable() {
    let (lowering, _) = lower_ok("fn f() -> i32 { return 1; let x = 2; x }");

    assert!(
        lowering
            .warnings
            .iter()
            .any(|warning| warning.warning_kind == WarningKind::UnreachableCode)
    );
}

#[test]
fn unknown_names_are_rule_errors() {
    let (lowering, _) = lower("fn main() { let x = y; }");

    assert_eq!(lowering.errors.len(), 1);
    assert_eq!(lowering.errors[0].error_type, ErrorType::Rule);
    assert_eq!(lowering.errors[0].function.as_deref(), Some("main"));
}

#[test]
fn wrong_argument_count_is_a_rule_error() {
    let (lowering, _) = lower("fn f(a: i32) { } fn main() { f(1, 2); }");

    assert_eq!(lowering.errors.len(), 1);
    assert_eq!(lowering.errors[0].error_type, ErrorType::Rule);
}

#[test]
fn struct_literals_need_every_field() {
    let (lowering, _) = lower(
        "struct Point { x: i32, y: i32 }
         fn main() { let p = Point { x: 1 }; }",
    );

    assert_eq!(lowering.errors.len(), 1);
    assert_eq!(lowering.errors[0].error_type, ErrorType::Type);
}

#[test]
fn struct_update_copies_missing_fields_from_the_base() {
    let (lowering, _) = lower_ok(
        "struct Point { x: i32, y: i32 }
         fn main() {
             let p = Point { x: 1, y: 2 };
             let q = Point { x: 3, ..p };
             println!(\"{}\", q.y);
         }",
    );

    let values = let_values(function(&lowering, "main"));
    let HirExpressionKind::Aggregate(fields) = &values[1].kind else {
        panic!("expected a struct literal");
    };
    assert_eq!(fields.len(), 2);
    assert!(matches!(&fields[1].kind, HirExpressionKind::Copy(place) if !place.is_root()));
}

#[test]
fn borrowing_a_value_with_no_place_is_a_rule_error() {
    let (lowering, _) = lower("fn main() { let r = &(1 + 2); }");

    assert_eq!(lowering.errors.len(), 1);
    assert_eq!(lowering.errors[0].error_type, ErrorType::Rule);
    assert!(lowering.errors[0].msg.contains("no place"));
}

#[test]
fn temporaries_are_autoreferenced_for_methods() {
    let (lowering, _) = lower_ok("fn main() { let n = String::from(\"hi\").len(); println!(\"{n}\"); }");

    let values = let_values(function(&lowering, "main"));
    let HirExpressionKind::Call { args, .. } = &values[0].kind else {
        panic!("expected a call");
    };
    assert!(matches!(args[0].kind, HirExpressionKind::BorrowTemporary(_)));
}

use crate::compiler_frontend::ast::ast_nodes::{Ast, ExpressionKind, StatementKind, Ty};
use crate::compiler_frontend::ast::parser::parse_ast;
use crate::compiler_frontend::ast::prelude::parse_prelude;
use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorType};
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;

fn parse(source: &str) -> Result<(Ast, StringTable), CompilerError> {
    let mut string_table = StringTable::new();
    let tokens = tokenize(source, &mut string_table)?;
    let ast = parse_ast(tokens, &mut string_table, false)?;
    Ok((ast, string_table))
}

fn parse_ok(source: &str) -> (Ast, StringTable) {
    parse(source).expect("source should parse")
}

#[test]
fn parses_longest_signature_with_named_lifetime() {
    let (ast, string_table) = parse_ok(
        "fn longest<'a>(x: &'a str, y: &'a str) -> &'a str { if x.len() > y.len() { x } else { y } }",
    );

    let function = &ast.functions[0];
    assert_eq!(string_table.resolve(function.name), "longest");
    assert_eq!(function.lifetimes.len(), 1);
    assert_eq!(function.params.len(), 2);
    assert!(!function.has_receiver);
    assert_eq!(function.return_type.display(&string_table), "&'a str");

    let body = function.body.as_ref().expect("body");
    assert!(body.statements.is_empty());
    assert!(matches!(
        body.tail.as_deref().map(|tail| &tail.kind),
        Some(ExpressionKind::If { .. })
    ));
}

#[test]
fn parses_structs_impls_and_receivers() {
    let (ast, string_table) = parse_ok(
        "struct Person { name: String, age: u8 }
         struct Pair(i32, i32);
         impl Person {
             fn name(&self) -> &String { &self.name }
             fn rename(&mut self, name: String) { self.name = name; }
             fn into_name(self) -> String { self.name }
         }",
    );

    assert_eq!(ast.structs.len(), 2);
    assert_eq!(string_table.resolve(ast.structs[1].fields[1].name), "1");

    let receivers = ast
        .functions
        .iter()
        .map(|function| function.params[0].ty.display(&string_table))
        .collect::<Vec<_>>();
    assert_eq!(receivers, vec!["&Self", "&mut Self", "Self"]);
    assert!(ast.functions.iter().all(|function| function.has_receiver));
    assert!(ast.functions.iter().all(|function| function.owner.is_some()));
}

#[test]
fn statement_kinds() {
    let (ast, _) = parse_ok(
        "fn main() {
             let mut v = vec![1, 2, 3];
             let r = &v[2];
             v.push(4);
             v[0] += 1;
             *r;
             { let inner = 1; }
             return;
         }",
    );

    let statements = &ast.functions[0].body.as_ref().expect("body").statements;
    assert!(matches!(statements[0].kind, StatementKind::Let { mutable: true, .. }));
    assert!(matches!(statements[1].kind, StatementKind::Let { mutable: false, .. }));
    assert!(matches!(statements[2].kind, StatementKind::Expression(_)));
    assert!(matches!(statements[3].kind, StatementKind::CompoundAssign { .. }));
    assert!(matches!(statements[5].kind, StatementKind::Block(_)));
    assert!(matches!(statements[6].kind, StatementKind::Return(None)));
}

#[test]
fn struct_literals_are_not_parsed_in_if_conditions() {
    let (ast, _) = parse_ok(
        "struct Point { x: i32, y: i32 }
         fn main() {
             let p = Point { x: 1, y: 2 };
             let q = Point { x: 3, ..p };
             if p.x == q.x { let same = true; }
         }",
    );

    let body = ast.functions[0].body.as_ref().expect("body");
    let StatementKind::Let {
        value: Some(value), ..
    } = &body.statements[1].kind
    else {
        panic!("expected a let");
    };
    assert!(matches!(
        &value.kind,
        ExpressionKind::StructLiteral { base: Some(_), .. }
    ));

    // The trailing if is the block's value
    assert!(matches!(
        body.tail.as_deref().map(|tail| &tail.kind),
        Some(ExpressionKind::If { .. })
    ));
}

#[test]
fn statement_if_does_not_swallow_the_next_deref() {
    let (ast, _) = parse_ok(
        "fn main() {
             let mut x = 1;
             let r = &mut x;
             if true { }
             *r = 2;
         }",
    );

    let statements = &ast.functions[0].body.as_ref().expect("body").statements;
    assert_eq!(statements.len(), 4);
    assert!(matches!(statements[3].kind, StatementKind::Assign { .. }));
}

#[test]
fn types_cover_references_slices_and_tuples() {
    let (ast, string_table) = parse_ok(
        "fn f<'a, T>(a: &&i32, b: [u8; 4], c: (String, &'a mut T), d: &[i32]) -> Option<&'a T>;",
    );

    let function = &ast.functions[0];
    assert!(function.body.is_none());
    assert_eq!(function.params[0].ty.display(&string_table), "&&i32");
    assert_eq!(function.params[1].ty.display(&string_table), "[u8; 4]");
    assert_eq!(function.params[2].ty.display(&string_table), "(String, &'a mut T)");
    assert!(matches!(
        &function.params[2].ty,
        Ty::Tuple(items) if matches!(
            &items[1],
            Ty::Reference { inner, .. } if matches!(**inner, Ty::Generic(_))
        )
    ));
    assert_eq!(function.return_type.display(&string_table), "Option<&'a T>");
}

#[test]
fn method_chains_fields_and_casts() {
    let (ast, _) = parse_ok(
        "fn main() { let n = pair.0.len() as u64 + s[1..].len() as u64; }",
    );

    let statements = &ast.functions[0].body.as_ref().expect("body").statements;
    let StatementKind::Let {
        value: Some(value), ..
    } = &statements[0].kind
    else {
        panic!("expected a let");
    };

    let ExpressionKind::Binary { left, right, .. } = &value.kind else {
        panic!("expected an addition");
    };
    assert!(matches!(left.kind, ExpressionKind::Cast { .. }));
    assert!(matches!(right.kind, ExpressionKind::Cast { .. }));
}

#[test]
fn loops_are_rejected() {
    let error = parse("fn main() { for x in v { } }").expect_err("loops are unsupported");
    assert_eq!(error.error_type, ErrorType::Syntax);
}

#[test]
fn missing_semicolon_is_a_syntax_error() {
    let error = parse("fn main() { let x = 1 let y = 2; }").expect_err("should fail");
    assert_eq!(error.error_type, ErrorType::Syntax);
}

#[test]
fn prelude_parses() {
    let mut string_table = StringTable::new();
    let prelude = parse_prelude(&mut string_table).expect("prelude should parse");

    assert!(prelude.functions.iter().all(|function| function.from_prelude));
    assert!(prelude.functions.iter().all(|function| function.body.is_none()));
    assert!(prelude
        .copy_types
        .iter()
        .any(|(name, _)| string_table.resolve(*name) == "i32"));
}

//! Declarations every snippet can use without writing them out.
//!
//! The prelude is written in the snippet language itself and parsed with the
//! same front end, so its signatures go through the same elision rules as user code.
//! Inside `impl<T> Vec<T>`, `T` stands for the element type of the receiver.

use crate::compiler_frontend::ast::ast_nodes::Ast;
use crate::compiler_frontend::ast::parser::parse_ast;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::settings::PRELUDE_FILE_NAME;
use std::path::PathBuf;

pub const PRELUDE_SOURCE: &str = r#"
copy i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char;

fn drop<T>(value: T);

impl String {
    fn new() -> String;
    fn from(text: &str) -> String;
    fn with_capacity(capacity: usize) -> String;
    fn clone(&self) -> String;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn push(&mut self, ch: char);
    fn push_str(&mut self, text: &str);
    fn insert_str(&mut self, index: usize, text: &str);
    fn clear(&mut self);
    fn as_str(&self) -> &str;
    fn as_bytes(&self) -> &[u8];
    fn into_bytes(self) -> Vec<u8>;
    fn to_string(&self) -> String;
    fn to_uppercase(&self) -> String;
}

impl str {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn as_bytes(&self) -> &[u8];
    fn trim(&self) -> &str;
    fn to_string(&self) -> String;
    fn to_owned(&self) -> String;
    fn to_uppercase(&self) -> String;
}

impl<T> Vec<T> {
    fn new() -> Vec<T>;
    fn with_capacity(capacity: usize) -> Vec<T>;
    fn clone(&self) -> Vec<T>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn push(&mut self, value: T);
    fn pop(&mut self) -> Option<T>;
    fn insert(&mut self, index: usize, value: T);
    fn remove(&mut self, index: usize) -> T;
    fn clear(&mut self);
    fn contains(&self, value: &T) -> bool;
    fn first(&self) -> Option<&T>;
    fn last(&self) -> Option<&T>;
    fn get(&self, index: usize) -> Option<&T>;
    fn get_mut(&mut self, index: usize) -> Option<&mut T>;
    fn extend_from_slice(&mut self, other: &[T]);
}

impl<T> Option<T> {
    fn is_some(&self) -> bool;
    fn is_none(&self) -> bool;
    fn unwrap(self) -> T;
    fn expect(self, message: &str) -> T;
}

impl<T> Box<T> {
    fn new(value: T) -> Box<T>;
}
"#;

/// Parses the prelude into its own AST, marked so warnings are never reported for it.
pub fn parse_prelude(string_table: &mut StringTable) -> Result<Ast, CompilerError> {
    let tokens = tokenize(PRELUDE_SOURCE, string_table)
        .map_err(|error| error.with_file_path(PathBuf::from(PRELUDE_FILE_NAME)))?;

    parse_ast(tokens, string_table, true)
        .map_err(|error| error.with_file_path(PathBuf::from(PRELUDE_FILE_NAME)))
}

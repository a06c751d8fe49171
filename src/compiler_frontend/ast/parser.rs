//! Item and type parsing for the snippet grammar.
//!
//! Statements live in `statements.rs` and expressions in `expressions.rs`,
//! both as further `impl Parser` blocks.

use crate::compiler_frontend::ast::ast_nodes::{
    Ast, FieldDefinition, FunctionDefinition, Param, StructDefinition, Ty,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::string_interning::{StringId, StringTable};
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, TextLocation, TokenKind};
use crate::{ast_log, return_syntax_error};

// Item level words that are accepted and skipped
const IGNORED_MODIFIERS: [&str; 2] = ["pub", "unsafe"];

pub fn parse_ast(
    tokens: FileTokens,
    string_table: &mut StringTable,
    from_prelude: bool,
) -> Result<Ast, CompilerError> {
    Parser::new(tokens, string_table, from_prelude).parse_items()
}

pub(crate) struct Parser<'a> {
    pub(crate) tokens: FileTokens,
    pub(crate) string_table: &'a mut StringTable,
    from_prelude: bool,

    // Generic type names of the function currently being parsed
    pub(crate) generics: Vec<StringId>,

    // `if x == y {` must not read `y {` as a struct literal
    pub(crate) no_struct_literal: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        tokens: FileTokens,
        string_table: &'a mut StringTable,
        from_prelude: bool,
    ) -> Self {
        Self {
            tokens,
            string_table,
            from_prelude,
            generics: Vec::new(),
            no_struct_literal: false,
        }
    }

    pub(crate) fn current(&self) -> &TokenKind {
        self.tokens.current_token_kind()
    }

    pub(crate) fn location(&self) -> TextLocation {
        self.tokens.current_location()
    }

    pub(crate) fn is_ident(&self, name: &str) -> bool {
        matches!(self.current(), TokenKind::Ident(id) if self.string_table.resolve(*id) == name)
    }

    pub(crate) fn describe_current(&self) -> String {
        self.current().get_name(self.string_table)
    }

    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        context: &str,
    ) -> Result<TextLocation, CompilerError> {
        let location = self.location();
        if self.current() == &kind {
            self.tokens.advance();
            return Ok(location);
        }

        return_syntax_error!(
            format!(
                "Expected '{}' {context}, found '{}'",
                kind.get_name(self.string_table),
                self.describe_current()
            ),
            location,
            {
                CompilationStage => "Parsing",
            }
        )
    }

    pub(crate) fn expect_ident(
        &mut self,
        context: &str) -> Result<(StringId,
        TextLocation,
    ), CompilerError> {
        let location = self.location();
        if let TokenKind::Ident(id) = self.current() {
            let id = *id;
            self.tokens.advance();
            return Ok((id, location));
        }

        return_syntax_error!(
            format!("Expected a name {context}, found '{}'", self.describe_current()),
            location,
            {
                CompilationStage => "Parsing",
            }
        )
    }

    fn skip_modifiers(&mut self) {
        while IGNORED_MODIFIERS.iter().any(|word| self.is_ident(word)) {
            self.tokens.advance();
        }
    }

    fn parse_items(mut self) -> Result<Ast, CompilerError> {
        let mut ast = Ast::default();

        loop {
            self.skip_modifiers();

            match self.current().clone() {
                TokenKind::Eof => break,

                TokenKind::Copy => {
                    self.tokens.advance();
                    loop {
                        let (name, location) = self.expect_ident("in a copy declaration")?;
                        ast.copy_types.push((name, location));
                        if !self.tokens.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::Semicolon, "after a copy declaration")?;
                }

                TokenKind::Struct => {
                    let definition = self.parse_struct()?;
                    ast_log!("struct {}", self.string_table.resolve(definition.name));
                    ast.structs.push(definition);
                }

                TokenKind::Fn => {
                    let function = self.parse_function(None, &[])?;
                    ast_log!("fn {}", self.string_table.resolve(function.name));
                    ast.functions.push(function);
                }

                TokenKind::Impl => {
                    let functions = self.parse_impl()?;
                    ast.functions.extend(functions);
                }

                // `use std::io;` and similar lines
                TokenKind::Ident(id) if self.string_table.resolve(id) == "use" => {
                    while !matches!(self.current(), TokenKind::Semicolon | TokenKind::Eof) {
                        self.tokens.advance();
                    }
                    self.tokens.eat(&TokenKind::Semicolon);
                }

                _ => {
                    return_syntax_error!(
                        format!(
                            "Expected 'fn', 'struct', 'impl' or 'copy' at the top level, found '{}'",
                            self.describe_current()
                        ),
                        self.location(),
                        {
                            CompilationStage => "Parsing",
                            PrimarySuggestion => "Statements must be inside a function body such as 'fn main() { ... }'",
                        }
                    )
                }
            }
        }

        Ok(ast)
    }

    fn parse_struct(&mut self) -> Result<StructDefinition, CompilerError> {
        let start = self.expect(TokenKind::Struct, "")?;
        let (name, _) = self.expect_ident("after 'struct'")?;
        let (lifetimes, generics) = self.parse_generic_params()?;
        let previous_generics = std::mem::replace(&mut self.generics, generics);

        let mut fields = Vec::new();
        match self.current() {
            // Unit struct
            TokenKind::Semicolon => {
                self.tokens.advance();
            }

            // Tuple struct: fields are named "0", "1", ...
            TokenKind::OpenParenthesis => {
                self.tokens.advance();
                let mut index = 0;
                while self.current() != &TokenKind::CloseParenthesis {
                    self.skip_modifiers();
                    let ty = self.parse_type()?;
                    fields.push(FieldDefinition {
                        name: self.string_table.intern(&index.to_string()),
                        ty,
                    });
                    index += 1;
                    if !self.tokens.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseParenthesis, "to close the tuple struct")?;
                self.expect(TokenKind::Semicolon, "after a tuple struct")?;
            }

            _ => {
                self.expect(TokenKind::OpenCurly, "to open the struct body")?;
                while self.current() != &TokenKind::CloseCurly {
                    self.skip_modifiers();
                    let (field_name, _) = self.expect_ident("for a struct field")?;
                    self.expect(TokenKind::Colon, "after the field name")?;
                    let ty = self.parse_type()?;
                    fields.push(FieldDefinition {
                        name: field_name,
                        ty,
                    });
                    if !self.tokens.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseCurly, "to close the struct body")?;
            }
        }

        self.generics = previous_generics;

        Ok(StructDefinition {
            name,
            lifetimes,
            fields,
            location: start,
        })
    }

    fn parse_impl(&mut self) -> Result<Vec<FunctionDefinition>, CompilerError> {
        self.expect(TokenKind::Impl, "")?;

        // impl<'a> Name<'a> { ... }
        let (impl_lifetimes, generics) = self.parse_generic_params()?;
        let (owner, _) = self.expect_ident("after 'impl'")?;
        let previous_generics = std::mem::replace(&mut self.generics, generics.clone());
        if self.current() == &TokenKind::LessThan {
            self.parse_type_arguments()?;
        }

        self.expect(TokenKind::OpenCurly, "to open the impl block")?;

        let mut functions = Vec::new();
        loop {
            self.skip_modifiers();
            if self.current() != &TokenKind::Fn {
                break;
            }
            let mut function = self.parse_function(Some(owner), &generics)?;

            // Lifetimes of the impl header are in scope for every method
            function.lifetimes.splice(0..0, impl_lifetimes.iter().copied());
            ast_log!(
                "fn {}::{}",
                self.string_table.resolve(owner),
                self.string_table.resolve(function.name)
            );
            functions.push(function);
        }

        self.expect(TokenKind::CloseCurly, "to close the impl block")?;
        self.generics = previous_generics;

        Ok(functions)
    }

    fn parse_function(
        &mut self,
        owner: Option<StringId>,
        owner_generics: &[StringId],
    ) -> Result<FunctionDefinition, CompilerError> {
        let start = self.expect(TokenKind::Fn, "")?;
        let (name, _) = self.expect_ident("after 'fn'")?;
        let (lifetimes, generics) = self.parse_generic_params()?;

        let outer_generics = self.generics.clone();
        self.generics.extend(generics.iter().copied());

        self.expect(TokenKind::OpenParenthesis, "to open the parameter list")?;

        let mut params = Vec::new();
        let mut has_receiver = false;

        if let Some(receiver) = self.parse_receiver()? {
            params.push(receiver);
            has_receiver = true;
            if !self.tokens.eat(&TokenKind::Comma)
                && self.current() != &TokenKind::CloseParenthesis
            {
                return_syntax_error!("Expected ',' after the receiver", self.location(), {
                    CompilationStage => "Parsing",
                })
            }
        }

        while self.current() != &TokenKind::CloseParenthesis {
            let mutable = self.tokens.eat(&TokenKind::Mut);
            let (param_name, location) = self.expect_ident("for a parameter")?;
            self.expect(TokenKind::Colon, "after the parameter name")?;
            let ty = self.parse_type()?;
            params.push(Param {
                name: param_name,
                mutable,
                ty,
                location,
            });

            if !self.tokens.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::CloseParenthesis, "to close the parameter list")?;

        let return_type = if self.tokens.eat(&TokenKind::Arrow) {
            self.parse_type()?
        } else {
            Ty::Unit
        };

        let body = if self.tokens.eat(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_block()?)
        };

        self.generics = outer_generics;

        Ok(FunctionDefinition {
            name,
            owner,
            owner_generics: owner_generics.to_vec(),
            lifetimes,
            generics,
            has_receiver,
            params,
            return_type,
            body,
            location: start,
            from_prelude: self.from_prelude,
        })
    }

    // self | mut self | &self | &mut self | &'a self | &'a mut self
    fn parse_receiver(&mut self) -> Result<Option<Param>, CompilerError> {
        let location = self.location();
        let self_name = self.string_table.intern("self");

        match self.current() {
            TokenKind::SelfValue => {
                self.tokens.advance();
                Ok(Some(Param {
                    name: self_name,
                    mutable: false,
                    ty: Ty::SelfType,
                    location,
                }))
            }

            TokenKind::Mut if self.tokens.peek_next_token() == Some(&TokenKind::SelfValue) => {
                self.tokens.advance();
                self.tokens.advance();
                Ok(Some(Param {
                    name: self_name,
                    mutable: true,
                    ty: Ty::SelfType,
                    location,
                }))
            }

            TokenKind::Ampersand => {
                let mut offset = 1;
                let lifetime = match self.tokens.peek_token_at(offset) {
                    Some(TokenKind::Lifetime(id)) => {
                        offset += 1;
                        Some(*id)
                    }
                    _ => None,
                };
                let mutable = self.tokens.peek_token_at(offset) == Some(&TokenKind::Mut);
                if mutable {
                    offset += 1;
                }

                if self.tokens.peek_token_at(offset) != Some(&TokenKind::SelfValue) {
                    return Ok(None);
                }

                for _ in 0..=offset {
                    self.tokens.advance();
                }

                Ok(Some(Param {
                    name: self_name,
                    mutable: false,
                    ty: Ty::Reference {
                        lifetime,
                        mutable,
                        inner: Box::new(Ty::SelfType),
                    },
                    location,
                }))
            }

            _ => Ok(None),
        }
    }

    /// `<'a, 'b, T>` after a function, struct or impl name
    fn parse_generic_params(&mut self) -> Result<(Vec<StringId>, Vec<StringId>), CompilerError> {
        let mut lifetimes = Vec::new();
        let mut generics = Vec::new();

        if !self.tokens.eat(&TokenKind::LessThan) {
            return Ok((lifetimes, generics));
        }

        loop {
            match self.current().clone() {
                TokenKind::Lifetime(id) => {
                    lifetimes.push(id);
                    self.tokens.advance();
                }
                TokenKind::Ident(id) => {
                    generics.push(id);
                    self.tokens.advance();

                    // Trait bounds are not checked: T: Display + Clone
                    if self.tokens.eat(&TokenKind::Colon) {
                        while !matches!(
                            self.current(),
                            TokenKind::Comma | TokenKind::GreaterThan | TokenKind::Eof
                        ) {
                            self.tokens.advance();
                        }
                    }
                }
                TokenKind::GreaterThan => break,
                _ => {
                    return_syntax_error!(
                        format!("Unexpected '{}' in generic parameters", self.describe_current()),
                        self.location(),
                        {
                            CompilationStage => "Parsing",
                        }
                    )
                }
            }

            if !self.tokens.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::GreaterThan, "to close the generic parameters")?;

        Ok((lifetimes, generics))
    }

    /// `<'a, String, &str>` after a type name
    pub(crate) fn parse_type_arguments(
        &mut self) -> Result<(Vec<StringId>,
        Vec<Ty>,
    ), CompilerError> {
        let mut lifetimes = Vec::new();
        let mut args = Vec::new();
        self.expect(TokenKind::LessThan, "to open the type arguments")?;

        while self.current() != &TokenKind::GreaterThan {
            if let TokenKind::Lifetime(id) = self.current() {
                lifetimes.push(*id);
                self.tokens.advance();
            } else {
                args.push(self.parse_type()?);
            }

            if !self.tokens.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::GreaterThan, "to close the type arguments")?;
        Ok((lifetimes, args))
    }

    pub(crate) fn parse_type(&mut self) -> Result<Ty, CompilerError> {
        let location = self.location();

        match self.current().clone() {
            TokenKind::Ampersand => {
                self.tokens.advance();
                self.parse_reference_type()
            }

            // &&T
            TokenKind::And => {
                self.tokens.advance();
                let inner = self.parse_reference_type()?;
                Ok(Ty::reference(inner, false))
            }

            TokenKind::OpenParenthesis => {
                self.tokens.advance();
                let mut items = Vec::new();
                let mut trailing_comma = false;
                while self.current() != &TokenKind::CloseParenthesis {
                    items.push(self.parse_type()?);
                    trailing_comma = self.tokens.eat(&TokenKind::Comma);
                    if !trailing_comma {
                        break;
                    }
                }
                self.expect(TokenKind::CloseParenthesis, "to close the tuple type")?;

                Ok(match items.len() {
                    0 => Ty::Unit,
                    1 if !trailing_comma => items.remove(0),
                    _ => Ty::Tuple(items),
                })
            }

            TokenKind::OpenBracket => {
                self.tokens.advance();
                let element = self.parse_type()?;
                let length = if self.tokens.eat(&TokenKind::Semicolon) {
                    match self.current() {
                        TokenKind::IntLiteral(value) => {
                            let value = *value as u64;
                            self.tokens.advance();
                            Some(value)
                        }
                        _ => {
                            return_syntax_error!("Array lengths must be integer literals", self.location(), {
                                CompilationStage => "Parsing",
                            })
                        }
                    }
                } else {
                    None
                };
                self.expect(TokenKind::CloseBracket, "to close the array type")?;

                Ok(Ty::Array {
                    element: Box::new(element),
                    length,
                })
            }

            TokenKind::SelfType => {
                self.tokens.advance();
                Ok(Ty::SelfType)
            }

            // impl Trait in argument position
            TokenKind::Impl => {
                self.tokens.advance();
                self.parse_type()?;
                Ok(Ty::Unknown)
            }

            TokenKind::Ident(first) => {
                self.tokens.advance();

                if self.string_table.resolve(first) == "dyn" {
                    self.parse_type()?;
                    return Ok(Ty::Unknown);
                }

                // Module paths like std::collections::HashMap keep the last segment
                let mut name = first;
                while self.tokens.eat(&TokenKind::DoubleColon) {
                    let (segment, _) = self.expect_ident("in a type path")?;
                    name = segment;
                }

                if self.string_table.resolve(name) == "_" {
                    return Ok(Ty::Unknown);
                }

                if self.generics.contains(&name) {
                    return Ok(Ty::Generic(name));
                }

                let (lifetimes, args) = if self.current() == &TokenKind::LessThan {
                    self.parse_type_arguments()?
                } else {
                    (Vec::new(), Vec::new())
                };

                Ok(Ty::Named {
                    name,
                    lifetimes,
                    args,
                })
            }

            _ => {
                return_syntax_error!(
                    format!("Expected a type, found '{}'", self.describe_current()),
                    location,
                    {
                        CompilationStage => "Parsing",
                    }
                )
            }
        }
    }

    // After the '&'
    fn parse_reference_type(&mut self) -> Result<Ty, CompilerError> {
        let lifetime = match self.current() {
            TokenKind::Lifetime(id) => {
                let id = *id;
                self.tokens.advance();
                Some(id)
            }
            _ => None,
        };
        let mutable = self.tokens.eat(&TokenKind::Mut);
        let inner = self.parse_type()?;

        Ok(Ty::Reference {
            lifetime,
            mutable,
            inner: Box::new(inner),
        })
    }
}

use crate::compiler_frontend::ast::ast_nodes::{
    BinaryOperator, Block, Expression, ExpressionKind, UnaryOperator,
};
use crate::compiler_frontend::ast::parser::Parser;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::string_interning::StringId;
use crate::compiler_frontend::tokenizer::tokens::{TextLocation, TokenKind};
use crate::return_syntax_error;

impl Parser<'_> {
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, CompilerError> {
        self.parse_binary(0)
    }

    // Precedence climbing from `||` (level 0) down to `* / %` (level 4)
    fn parse_binary(&mut self, level: usize) -> Result<Expression, CompilerError> {
        if level > 4 {
            return self.parse_unary();
        }

        let start = self.location();
        let mut left = self.parse_binary(level + 1)?;

        while let Some(operator) = self.binary_operator_at(level) {
            self.tokens.advance();
            let right = self.parse_binary(level + 1)?;
            left = Expression::new(
                ExpressionKind::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start.to(&self.tokens.previous_location()),
            );
        }

        Ok(left)
    }

    fn binary_operator_at(&self, level: usize) -> Option<BinaryOperator> {
        let operator = match self.current() {
            TokenKind::Or => BinaryOperator::Or,
            TokenKind::And => BinaryOperator::And,
            TokenKind::EqualTo => BinaryOperator::EqualTo,
            TokenKind::NotEqual => BinaryOperator::NotEqual,
            TokenKind::LessThan => BinaryOperator::LessThan,
            TokenKind::LessThanOrEqual => BinaryOperator::LessThanOrEqual,
            TokenKind::GreaterThan => BinaryOperator::GreaterThan,
            TokenKind::GreaterThanOrEqual => BinaryOperator::GreaterThanOrEqual,
            TokenKind::Add => BinaryOperator::Add,
            TokenKind::Subtract => BinaryOperator::Subtract,
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::Divide => BinaryOperator::Divide,
            TokenKind::Modulus => BinaryOperator::Modulus,
            _ => return None,
        };

        let operator_level = match operator {
            BinaryOperator::Or => 0,
            BinaryOperator::And => 1,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulus => 4,
            _ => 2,
        };

        (operator_level == level).then_some(operator)
    }

    fn parse_unary(&mut self) -> Result<Expression, CompilerError> {
        let start = self.location();

        let kind = match self.current() {
            TokenKind::Subtract => {
                self.tokens.advance();
                ExpressionKind::Unary {
                    operator: UnaryOperator::Negate,
                    value: Box::new(self.parse_unary()?),
                }
            }
            TokenKind::Bang => {
                self.tokens.advance();
                ExpressionKind::Unary {
                    operator: UnaryOperator::Not,
                    value: Box::new(self.parse_unary()?),
                }
            }
            TokenKind::Star => {
                self.tokens.advance();
                ExpressionKind::Deref(Box::new(self.parse_unary()?))
            }
            TokenKind::Ampersand => {
                self.tokens.advance();
                let mutable = self.tokens.eat(&TokenKind::Mut);
                ExpressionKind::Borrow {
                    mutable,
                    value: Box::new(self.parse_unary()?),
                }
            }

            // `&&x` is a reference to a temporary reference
            TokenKind::And => {
                self.tokens.advance();
                let mutable = self.tokens.eat(&TokenKind::Mut);
                let inner_start = self.location();
                let inner = ExpressionKind::Borrow {
                    mutable,
                    value: Box::new(self.parse_unary()?),
                };
                ExpressionKind::Borrow {
                    mutable: false,
                    value: Box::new(Expression::new(
                        inner,
                        inner_start.to(&self.tokens.previous_location()),
                    )),
                }
            }
            _ => return self.parse_postfix(),
        };

        Ok(Expression::new(kind, start.to(&self.tokens.previous_location())))
    }

    fn parse_postfix(&mut self) -> Result<Expression, CompilerError> {
        let start = self.location();
        let mut expression = self.parse_primary()?;

        loop {
            let kind = match self.current().clone() {
                TokenKind::Dot => {
                    self.tokens.advance();
                    match self.current().clone() {
                        TokenKind::IntLiteral(index) => {
                            self.tokens.advance();
                            ExpressionKind::Field {
                                base: Box::new(expression),
                                field: self.string_table.intern(&index.to_string()),
                            }
                        }

                        TokenKind::Ident(name) => {
                            self.tokens.advance();

                            // .collect::<Vec<_>>()
                            if self.tokens.eat(&TokenKind::DoubleColon) {
                                self.parse_type_arguments()?;
                            }

                            if self.current() == &TokenKind::OpenParenthesis {
                                let args = self.parse_arguments(TokenKind::CloseParenthesis)?;
                                ExpressionKind::MethodCall {
                                    receiver: Box::new(expression),
                                    method: name,
                                    args,
                                }
                            } else {
                                ExpressionKind::Field {
                                    base: Box::new(expression),
                                    field: name,
                                }
                            }
                        }

                        _ => {
                            return_syntax_error!(
                                format!("Expected a field or method name after '.', found '{}'", self.describe_current()),
                                self.location(),
                                {
                                    CompilationStage => "Parsing",
                                }
                            )
                        }
                    }
                }

                TokenKind::OpenBracket => {
                    self.tokens.advance();
                    let index = self.parse_index()?;
                    self.expect(TokenKind::CloseBracket, "to close the index")?;
                    ExpressionKind::Index {
                        base: Box::new(expression),
                        index: Box::new(index),
                    }
                }

                TokenKind::Ident(id) if self.string_table.resolve(id) == "as" => {
                    self.tokens.advance();
                    let ty = self.parse_type()?;
                    ExpressionKind::Cast {
                        value: Box::new(expression),
                        ty,
                    }
                }

                _ => break,
            };

            expression = Expression::new(kind, start.to(&self.tokens.previous_location()));
        }

        Ok(expression)
    }

    // `i`, `a..b`, `..b`, `a..` or `..`
    fn parse_index(&mut self) -> Result<Expression, CompilerError> {
        let start = self.location();

        let range_start = if self.current() == &TokenKind::DotDot {
            None
        } else {
            let value = self.parse_expression()?;
            if self.current() != &TokenKind::DotDot {
                return Ok(value);
            }
            Some(Box::new(value))
        };

        self.expect(TokenKind::DotDot, "in a range")?;
        let range_end = if self.current() == &TokenKind::CloseBracket {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        Ok(Expression::new(
            ExpressionKind::Range {
                start: range_start,
                end: range_end,
            },
            start.to(&self.tokens.previous_location()),
        ))
    }

    fn parse_primary(&mut self) -> Result<Expression, CompilerError> {
        let start = self.location();

        let kind = match self.current().clone() {
            TokenKind::IntLiteral(value) => {
                self.tokens.advance();
                ExpressionKind::Int(value)
            }
            TokenKind::FloatLiteral(value) => {
                self.tokens.advance();
                ExpressionKind::Float(value)
            }
            TokenKind::StringLiteral(value) => {
                self.tokens.advance();
                ExpressionKind::Str(value)
            }
            TokenKind::CharLiteral(value) => {
                self.tokens.advance();
                ExpressionKind::Char(value)
            }
            TokenKind::True => {
                self.tokens.advance();
                ExpressionKind::Bool(true)
            }
            TokenKind::False => {
                self.tokens.advance();
                ExpressionKind::Bool(false)
            }
            TokenKind::SelfValue => {
                self.tokens.advance();
                ExpressionKind::Variable(self.string_table.intern("self"))
            }

            TokenKind::SelfType => {
                self.tokens.advance();
                let self_name = self.string_table.intern("Self");
                self.parse_path_expression(self_name, start)?
            }

            TokenKind::Ident(name) => {
                self.tokens.advance();
                self.parse_path_expression(name, start)?
            }

            TokenKind::OpenParenthesis => {
                self.tokens.advance();
                let previous_restriction = std::mem::replace(&mut self.no_struct_literal, false);

                let mut items = Vec::new();
                let mut trailing_comma = false;
                while self.current() != &TokenKind::CloseParenthesis {
                    items.push(self.parse_expression()?);
                    trailing_comma = self.tokens.eat(&TokenKind::Comma);
                    if !trailing_comma {
                        break;
                    }
                }
                self.expect(TokenKind::CloseParenthesis, "to close the parenthesis")?;
                self.no_struct_literal = previous_restriction;

                match items.len() {
                    0 => ExpressionKind::Unit,
                    1 if !trailing_comma => return Ok(items.remove(0)),
                    _ => ExpressionKind::Tuple(items),
                }
            }

            TokenKind::OpenBracket => {
                self.tokens.advance();
                let previous_restriction = std::mem::replace(&mut self.no_struct_literal, false);

                let mut items = Vec::new();
                while self.current() != &TokenKind::CloseBracket {
                    items.push(self.parse_expression()?);

                    // [value; count] evaluates value once
                    if self.tokens.eat(&TokenKind::Semicolon) {
                        self.parse_expression()?;
                        break;
                    }

                    if !self.tokens.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBracket, "to close the array")?;
                self.no_struct_literal = previous_restriction;

                ExpressionKind::Array(items)
            }

            TokenKind::If => return self.parse_if(),

            _ => {
                return_syntax_error!(
                    format!("Expected an expression, found '{}'", self.describe_current()),
                    start,
                    {
                        CompilationStage => "Parsing",
                    }
                )
            }
        };

        Ok(Expression::new(kind, start.to(&self.tokens.previous_location())))
    }

    /// Everything that starts with a name: variables, calls, macros and struct literals
    fn parse_path_expression(
        &mut self,
        first: StringId,
        start: TextLocation,
    ) -> Result<ExpressionKind, CompilerError> {
        let mut path = vec![first];

        while self.tokens.eat(&TokenKind::DoubleColon) {
            // Vec::<i32>::new()
            if self.current() == &TokenKind::LessThan {
                self.parse_type_arguments()?;
                continue;
            }

            let (segment, _) = self.expect_ident("in a path")?;
            path.push(segment);
        }

        match self.current() {
            TokenKind::Bang if path.len() == 1 => {
                self.tokens.advance();
                let closing = match self.current() {
                    TokenKind::OpenParenthesis => TokenKind::CloseParenthesis,
                    TokenKind::OpenBracket => TokenKind::CloseBracket,
                    TokenKind::OpenCurly => TokenKind::CloseCurly,
                    _ => {
                        return_syntax_error!(
                            format!(
                                "Expected '(' or '[' after the macro name '{}!'",
                                self.string_table.resolve(first)
                            ),
                            self.location(),
                            {
                                CompilationStage => "Parsing",
                            }
                        )
                    }
                };
                let args = self.parse_arguments(closing)?;

                Ok(ExpressionKind::Macro { name: first, args })
            }

            TokenKind::OpenParenthesis => {
                let args = self.parse_arguments(TokenKind::CloseParenthesis)?;
                Ok(ExpressionKind::Call { path, args })
            }

            TokenKind::OpenCurly
                if path.len() == 1
                    && !self.no_struct_literal
                    && self.looks_like_type_name(first) =>
            {
                self.parse_struct_literal(first)
            }

            _ if path.len() == 1 => Ok(ExpressionKind::Variable(first)),

            _ => {
                let written = path
                    .iter()
                    .map(|segment| self.string_table.resolve(*segment))
                    .collect::<Vec<_>>()
                    .join("::");

                return_syntax_error!(
                    format!("Paths are only supported as calls, '{written}' is not called"),
                    start.to(&self.tokens.previous_location()),
                    {
                        CompilationStage => "Parsing",
                        PrimarySuggestion => "Call the function with '(...)'",
                    }
                )
            }
        }
    }

    fn looks_like_type_name(&self, name: StringId) -> bool {
        self.string_table
            .resolve(name)
            .chars()
            .next()
            .is_some_and(|first| first.is_uppercase())
    }

    /// Comma separated expressions up to `closing`. `;` also separates, for `vec![0; 3]`.
    fn parse_arguments(&mut self, closing: TokenKind) -> Result<Vec<Expression>, CompilerError> {
        self.tokens.advance();
        let previous_restriction = std::mem::replace(&mut self.no_struct_literal, false);

        let mut args = Vec::new();
        while self.current() != &closing {
            args.push(self.parse_expression()?);

            if !self.tokens.eat(&TokenKind::Comma) && !self.tokens.eat(&TokenKind::Semicolon) {
                break;
            }
        }

        self.expect(closing, "to close the argument list")?;
        self.no_struct_literal = previous_restriction;

        Ok(args)
    }

    fn parse_struct_literal(&mut self, name: StringId) -> Result<ExpressionKind, CompilerError> {
        self.expect(TokenKind::OpenCurly, "to open the struct literal")?;

        let mut fields = Vec::new();
        let mut base = None;

        while self.current() != &TokenKind::CloseCurly {
            if self.tokens.eat(&TokenKind::DotDot) {
                base = Some(Box::new(self.parse_expression()?));
                break;
            }

            let (field, location) = match self.current() {
                TokenKind::IntLiteral(index) => {
                    let field = self.string_table.intern(&index.to_string());
                    let location = self.location();
                    self.tokens.advance();
                    (field, location)
                }
                _ => self.expect_ident("for a struct field")?,
            };

            // `Point { x, y }` shorthand
            let value = if self.tokens.eat(&TokenKind::Colon) {
                self.parse_expression()?
            } else {
                Expression::new(ExpressionKind::Variable(field), location)
            };

            fields.push((field, value));

            if !self.tokens.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::CloseCurly, "to close the struct literal")?;

        Ok(ExpressionKind::StructLiteral { name, fields, base })
    }

    pub(crate) fn parse_if(&mut self) -> Result<Expression, CompilerError> {
        let start = self.expect(TokenKind::If, "")?;

        let previous_restriction = std::mem::replace(&mut self.no_struct_literal, true);
        let condition = self.parse_expression()?;
        self.no_struct_literal = previous_restriction;

        let then_block = self.parse_block()?;

        let else_block = if self.tokens.eat(&TokenKind::Else) {
            if self.current() == &TokenKind::If {
                let nested = self.parse_if()?;
                let location = nested.location;
                Some(Block {
                    statements: Vec::new(),
                    tail: Some(Box::new(nested)),
                    location,
                    close: TextLocation::new(location.end_pos, location.end_pos),
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(Expression::new(
            ExpressionKind::If {
                condition: Box::new(condition),
                then_block,
                else_block,
            },
            start.to(&self.tokens.previous_location()),
        ))
    }
}

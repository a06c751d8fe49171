use crate::compiler_frontend::ast::ast_nodes::{Block, Expression, Statement, StatementKind};
use crate::compiler_frontend::ast::parser::Parser;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::tokenizer::tokens::TokenKind;
use crate::return_syntax_error;

// Keywords the snippet language deliberately leaves out
const UNSUPPORTED_STATEMENTS: [&str; 5] = ["while", "loop", "for", "match", "break"];

impl Parser<'_> {
    pub(crate) fn parse_block(&mut self) -> Result<Block, CompilerError> {
        let start = self.expect(TokenKind::OpenCurly, "to open a block")?;
        let previous_restriction = std::mem::replace(&mut self.no_struct_literal, false);

        let mut statements = Vec::new();
        let mut tail = None;

        loop {
            match self.current() {
                TokenKind::CloseCurly => break,
                TokenKind::Eof => {
                    return_syntax_error!("Unexpected end of file, a block was never closed", self.location(), {
                        CompilationStage => "Parsing",
                        PrimarySuggestion => "Add the missing '}'",
                    })
                }
                _ => {}
            }

            if let Some(statement) = self.parse_statement(&mut tail)? {
                statements.push(statement);
            }

            // A tail expression has to be the last thing in the block
            if tail.is_some() && self.current() != &TokenKind::CloseCurly {
                return_syntax_error!(
                    format!("Expected ';' or '}}', found '{}'", self.describe_current()),
                    self.location(),
                    {
                        CompilationStage => "Parsing",
                        PrimarySuggestion => "Add a ';' after the expression",
                    }
                )
            }
        }

        let end = self.expect(TokenKind::CloseCurly, "to close the block")?;
        self.no_struct_literal = previous_restriction;

        Ok(Block {
            statements,
            tail: tail.map(Box::new),
            location: start.to(&end),
            close: end,
        })
    }

    /// Parses one statement. A final expression without ';' is written to `tail` instead.
    fn parse_statement(
        &mut self,
        tail: &mut Option<Expression>,
    ) -> Result<Option<Statement>, CompilerError> {
        let start = self.location();

        if let TokenKind::Ident(id) = self.current()
            && UNSUPPORTED_STATEMENTS.contains(&self.string_table.resolve(*id))
        {
            return_syntax_error!(
                format!(
                    "'{}' is not supported, only straight-line code and if/else are checked",
                    self.describe_current()
                ),
                start,
                {
                    CompilationStage => "Parsing",
                }
            )
        }

        let kind = match self.current() {
            TokenKind::Semicolon => {
                self.tokens.advance();
                return Ok(None);
            }

            TokenKind::Let => self.parse_let()?,

            TokenKind::Return => {
                self.tokens.advance();
                let ends_here =
                    matches!(self.current(), TokenKind::Semicolon | TokenKind::CloseCurly);
                let value = if ends_here {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.tokens.eat(&TokenKind::Semicolon);
                StatementKind::Return(value)
            }

            TokenKind::OpenCurly => StatementKind::Block(self.parse_block()?),

            // A statement level if ends at its last block, so `*r = 1;` after it is not a product
            TokenKind::If => {
                let expression = self.parse_if()?;
                if self.current() == &TokenKind::CloseCurly {
                    *tail = Some(expression);
                    return Ok(None);
                }
                self.tokens.eat(&TokenKind::Semicolon);
                StatementKind::Expression(expression)
            }

            _ => {
                let expression = self.parse_expression()?;

                if self.at_compound_assign() {
                    self.tokens.advance();
                    let value = self.parse_expression()?;
                    self.expect(TokenKind::Semicolon, "after an assignment")?;
                    StatementKind::CompoundAssign {
                        target: expression,
                        value,
                    }
                } else if self.tokens.eat(&TokenKind::Assign) {
                    let value = self.parse_expression()?;
                    self.expect(TokenKind::Semicolon, "after an assignment")?;
                    StatementKind::Assign {
                        target: expression,
                        value,
                    }
                } else if self.tokens.eat(&TokenKind::Semicolon) {
                    StatementKind::Expression(expression)
                } else if self.current() == &TokenKind::CloseCurly {
                    *tail = Some(expression);
                    return Ok(None);
                } else {
                    return_syntax_error!(
                        format!("Expected ';' after the expression, found '{}'", self.describe_current()),
                        self.location(),
                        {
                            CompilationStage => "Parsing",
                            PrimarySuggestion => "Add a ';' after the expression",
                        }
                    )
                }
            }
        };

        Ok(Some(Statement {
            kind,
            location: start.to(&self.tokens.previous_location()),
        }))
    }

    fn parse_let(&mut self) -> Result<StatementKind, CompilerError> {
        self.expect(TokenKind::Let, "")?;
        let mutable = self.tokens.eat(&TokenKind::Mut);
        let (name, _) = self.expect_ident("after 'let'")?;

        let ty = if self.tokens.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let value = if self.tokens.eat(&TokenKind::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon, "after a let statement")?;

        Ok(StatementKind::Let {
            name,
            mutable,
            ty,
            value,
        })
    }

    fn at_compound_assign(&self) -> bool {
        matches!(
            self.current(),
            TokenKind::AddAssign
                | TokenKind::SubtractAssign
                | TokenKind::MultiplyAssign
                | TokenKind::DivideAssign
        )
    }
}

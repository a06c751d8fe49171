use crate::compiler_frontend::string_interning::{StringId, StringTable};
use crate::token_log;
use serde::Serialize;
use std::iter::Peekable;
use std::str::Chars;

/// Zero based line, one based column of a character in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, PartialOrd, Ord)]
pub struct CharPosition {
    pub line_number: i32,
    pub char_column: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub struct TextLocation {
    pub start_pos: CharPosition,
    pub end_pos: CharPosition,
}

impl TextLocation {
    pub fn new(start: CharPosition, end: CharPosition) -> Self {
        Self {
            start_pos: start,
            end_pos: end,
        }
    }

    pub fn new_just_line(line: i32) -> Self {
        Self {
            start_pos: CharPosition {
                line_number: line,
                char_column: 1,
            },
            end_pos: CharPosition {
                line_number: line,
                char_column: 120, // Arbitrary number
            },
        }
    }

    /// Span from the start of `self` to the end of `other`
    pub fn to(&self, other: &TextLocation) -> TextLocation {
        TextLocation {
            start_pos: self.start_pos,
            end_pos: other.end_pos.max(self.end_pos),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    Ident(StringId),
    Lifetime(StringId), // 'a (stored without the quote)

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(StringId),
    CharLiteral(char),

    // Keywords
    Let,
    Mut,
    Fn,
    Return,
    If,
    Else,
    Struct,
    Impl,
    Copy,
    SelfValue, // self
    SelfType,  // Self
    True,
    False,

    // Delimiters
    OpenParenthesis,
    CloseParenthesis,
    OpenCurly,
    CloseCurly,
    OpenBracket,
    CloseBracket,
    Comma,
    Semicolon,
    Colon,
    DoubleColon,
    Dot,
    DotDot,
    Arrow,
    Bang,

    // Operators
    Ampersand,
    Star,
    Assign,
    Add,
    Subtract,
    Divide,
    Modulus,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    EqualTo,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,

    Eof,
}

impl TokenKind {
    pub fn get_name(&self, string_table: &StringTable) -> String {
        match self {
            TokenKind::Ident(id) => string_table.resolve(*id).to_owned(),
            TokenKind::Lifetime(id) => format!("'{}", string_table.resolve(*id)),
            TokenKind::StringLiteral(id) => format!("\"{}\"", string_table.resolve(*id)),
            TokenKind::IntLiteral(value) => value.to_string(),
            TokenKind::FloatLiteral(value) => value.to_string(),
            TokenKind::CharLiteral(value) => format!("'{value}'"),
            other => other.symbol().to_owned(),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Let => "let",
            TokenKind::Mut => "mut",
            TokenKind::Fn => "fn",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Struct => "struct",
            TokenKind::Impl => "impl",
            TokenKind::Copy => "copy",
            TokenKind::SelfValue => "self",
            TokenKind::SelfType => "Self",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::OpenParenthesis => "(",
            TokenKind::CloseParenthesis => ")",
            TokenKind::OpenCurly => "{",
            TokenKind::CloseCurly => "}",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::DoubleColon => "::",
            TokenKind::Dot => ".",
            TokenKind::DotDot => "..",
            TokenKind::Arrow => "->",
            TokenKind::Bang => "!",
            TokenKind::Ampersand => "&",
            TokenKind::Star => "*",
            TokenKind::Assign => "=",
            TokenKind::Add => "+",
            TokenKind::Subtract => "-",
            TokenKind::Divide => "/",
            TokenKind::Modulus => "%",
            TokenKind::AddAssign => "+=",
            TokenKind::SubtractAssign => "-=",
            TokenKind::MultiplyAssign => "*=",
            TokenKind::DivideAssign => "/=",
            TokenKind::EqualTo => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::LessThan => "<",
            TokenKind::LessThanOrEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterThanOrEqual => ">=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Eof => "end of file",
            TokenKind::Ident(_)
            | TokenKind::Lifetime(_)
            | TokenKind::IntLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::CharLiteral(_) => "literal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub location: TextLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: TextLocation) -> Self {
        Token { kind, location }
    }
}

/// Cursor over the tokens of one source file, used by the parser.
#[derive(Clone, Debug)]
pub struct FileTokens {
    pub tokens: Vec<Token>,
    pub index: usize,
    pub length: usize,
}

impl FileTokens {
    pub fn new(tokens: Vec<Token>) -> FileTokens {
        FileTokens {
            length: tokens.len(),
            tokens,
            index: 0,
        }
    }

    pub fn current_token_kind(&self) -> &TokenKind {
        // The tokenizer always ends the stream with Eof, and advance never moves past it
        &self.tokens[self.index.min(self.length - 1)].kind
    }

    pub fn peek_next_token(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index + 1).map(|token| &token.kind)
    }

    pub fn peek_token_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + offset).map(|token| &token.kind)
    }

    pub fn current_location(&self) -> TextLocation {
        self.tokens[self.index.min(self.length - 1)].location
    }

    pub fn previous_location(&self) -> TextLocation {
        self.tokens[self.index.saturating_sub(1)].location
    }

    pub fn advance(&mut self) {
        match self.current_token_kind() {
            // Can't advance past End of File
            TokenKind::Eof => {
                token_log!("Parser tried to advance past EOF");
            }

            _ => {
                self.index += 1;
            }
        }
    }

    /// Advances when the current token matches `kind`
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.current_token_kind() == kind {
            self.advance();
            return true;
        }

        false
    }
}

pub struct TokenStream<'a> {
    pub chars: Peekable<Chars<'a>>,
    pub position: CharPosition,
    pub start_position: CharPosition,
}

impl<'a> TokenStream<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            chars: source_code.chars().peekable(),
            position: CharPosition::default(),
            start_position: CharPosition::default(),
        }
    }

    pub fn next(&mut self) -> Option<char> {
        match self.chars.peek() {
            Some(c) => {
                if *c == '\n' {
                    self.position.line_number += 1;
                    self.position.char_column = 0;
                } else {
                    self.position.char_column += 1;
                }

                self.chars.next()
            }

            None => None,
        }
    }

    pub fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Looks one character further than `peek` without consuming anything
    pub fn peek_second(&self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        lookahead.next()
    }

    /// Location from the first character of the current token to the last consumed character
    pub fn new_location(&self) -> TextLocation {
        TextLocation::new(self.start_position, self.position)
    }

    /// Marks the character that was just consumed as the start of a new token
    pub fn update_start_position(&mut self) {
        self.start_position = self.position;
    }
}

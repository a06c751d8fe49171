use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::string_interning::StringTable;
use crate::compiler_frontend::tokenizer::tokens::{
    FileTokens, TextLocation, Token, TokenKind, TokenStream,
};
use crate::{return_syntax_error, settings, token_log};

macro_rules! return_token {
    ($kind:expr, $stream:expr $(,)?) => {
        return Ok(Some(Token::new($kind, $stream.new_location())))
    };
}

pub fn tokenize(
    source_code: &str,
    string_table: &mut StringTable,
) -> Result<FileTokens, CompilerError> {
    let initial_capacity = source_code.len() / settings::SRC_TO_TOKEN_RATIO;

    let mut tokens: Vec<Token> = Vec::with_capacity(initial_capacity);
    let mut stream = TokenStream::new(source_code);

    loop {
        // Tuple fields like `pair.0.1` must not be read as a float
        let after_dot = matches!(tokens.last().map(|token| &token.kind), Some(TokenKind::Dot));
        let Some(token) = get_token_kind(&mut stream, after_dot, string_table)? else {
            break;
        };

        token_log!("{:?}", token.kind);
        tokens.push(token);
    }

    let end = stream.position;
    tokens.push(Token::new(TokenKind::Eof, TextLocation::new(end, end)));

    Ok(FileTokens::new(tokens))
}

/// Reads the next token, or None at the end of the source.
pub fn get_token_kind(
    stream: &mut TokenStream,
    after_dot: bool,
    string_table: &mut StringTable,
) -> Result<Option<Token>, CompilerError> {
    let current_char = loop {
        let Some(ch) = stream.next() else {
            return Ok(None);
        };

        if ch.is_whitespace() {
            continue;
        }

        // Line comments, including `// expect:` markers in test cases
        if ch == '/' && stream.peek() == Some(&'/') {
            while let Some(next) = stream.peek() {
                if *next == '\n' {
                    break;
                }
                stream.next();
            }
            continue;
        }

        // Attributes like #[derive(Debug)] carry nothing the checker needs
        if ch == '#' {
            skip_attribute(stream);
            continue;
        }

        break ch;
    };

    stream.update_start_position();

    if current_char == '"' {
        return tokenize_string(stream, string_table);
    }

    if current_char == '\'' {
        return tokenize_quote(stream, string_table);
    }

    if current_char.is_ascii_digit() {
        return tokenize_number(current_char, after_dot, stream);
    }

    if is_valid_var_char(&current_char) {
        let mut token_value = String::from(current_char);
        while let Some(next) = stream.peek() {
            if !is_valid_var_char(next) {
                break;
            }
            token_value.push(*next);
            stream.next();
        }

        return_token!(keyword_or_variable(&token_value, string_table), stream);
    }

    let kind = match current_char {
        '(' => TokenKind::OpenParenthesis,
        ')' => TokenKind::CloseParenthesis,
        '{' => TokenKind::OpenCurly,
        '}' => TokenKind::CloseCurly,
        '[' => TokenKind::OpenBracket,
        ']' => TokenKind::CloseBracket,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,

        ':' => followed_by(stream, ':', TokenKind::DoubleColon, TokenKind::Colon),
        '.' => followed_by(stream, '.', TokenKind::DotDot, TokenKind::Dot),
        '!' => followed_by(stream, '=', TokenKind::NotEqual, TokenKind::Bang),
        '=' => followed_by(stream, '=', TokenKind::EqualTo, TokenKind::Assign),
        '+' => followed_by(stream, '=', TokenKind::AddAssign, TokenKind::Add),
        '*' => followed_by(stream, '=', TokenKind::MultiplyAssign, TokenKind::Star),
        '/' => followed_by(stream, '=', TokenKind::DivideAssign, TokenKind::Divide),
        '%' => TokenKind::Modulus,
        '<' => followed_by(stream, '=', TokenKind::LessThanOrEqual, TokenKind::LessThan),
        '>' => followed_by(
            stream,
            '=',
            TokenKind::GreaterThanOrEqual,
            TokenKind::GreaterThan,
        ),
        '&' => followed_by(stream, '&', TokenKind::And, TokenKind::Ampersand),

        '-' => match stream.peek() {
            Some('>') => {
                stream.next();
                TokenKind::Arrow
            }
            Some('=') => {
                stream.next();
                TokenKind::SubtractAssign
            }
            _ => TokenKind::Subtract,
        },

        '|' => {
            if stream.peek() == Some(&'|') {
                stream.next();
                TokenKind::Or
            } else {
                return_syntax_error!(
                    "Closures are not supported, found a lone '|'",
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                    }
                )
            }
        }

        _ => {
            return_syntax_error!(
                format!("Invalid character: '{current_char}'"),
                stream.new_location(),
                {
                    CompilationStage => "Tokenization",
                    PrimarySuggestion => "Remove the character or replace it with supported syntax",
                }
            )
        }
    };

    return_token!(kind, stream)
}

fn skip_attribute(stream: &mut TokenStream) {
    if stream.peek() == Some(&'!') {
        stream.next();
    }

    if stream.peek() != Some(&'[') {
        return;
    }

    let mut depth = 0usize;
    while let Some(ch) = stream.next() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
    }
}

fn followed_by(
    stream: &mut TokenStream,
    expected: char,
    joined: TokenKind,
    single: TokenKind,
) -> TokenKind {
    if stream.peek() == Some(&expected) {
        stream.next();
        return joined;
    }

    single
}

fn tokenize_string(
    stream: &mut TokenStream,
    string_table: &mut StringTable,
) -> Result<Option<Token>, CompilerError> {
    let mut token_value = String::new();

    while let Some(ch) = stream.next() {
        match ch {
            '"' => {
                let interned = string_table.intern(&token_value);
                return_token!(TokenKind::StringLiteral(interned), stream);
            }
            '\\' => {
                if let Some(escaped) = stream.next() {
                    token_value.push(unescape(escaped));
                }
            }
            _ => token_value.push(ch),
        }
    }

    return_syntax_error!(
        "Unterminated string literal - missing closing quote",
        stream.new_location(),
        {
            CompilationStage => "Tokenization",
            PrimarySuggestion => "Add a closing '\"' at the end of the string",
        }
    )
}

// Either a char literal ('x', '\n') or a lifetime ('a, 'static)
fn tokenize_quote(
    stream: &mut TokenStream,
    string_table: &mut StringTable,
) -> Result<Option<Token>, CompilerError> {
    match stream.peek().copied() {
        Some('\\') => {
            stream.next();
            let escaped = stream.next().map(unescape).unwrap_or('\\');
            if stream.next() != Some('\'') {
                return_syntax_error!("Unterminated char literal", stream.new_location(), {
                    CompilationStage => "Tokenization",
                })
            }
            return_token!(TokenKind::CharLiteral(escaped), stream);
        }

        Some(first) if stream.peek_second() == Some('\'') => {
            stream.next();
            stream.next();
            return_token!(TokenKind::CharLiteral(first), stream);
        }

        Some(first) if is_valid_var_char(&first) => {
            let mut name = String::new();
            while let Some(next) = stream.peek() {
                if !is_valid_var_char(next) {
                    break;
                }
                name.push(*next);
                stream.next();
            }

            let interned = string_table.intern(&name);
            return_token!(TokenKind::Lifetime(interned), stream);
        }

        _ => {
            return_syntax_error!("Expected a lifetime name or char literal after '", stream.new_location(), {
                CompilationStage => "Tokenization",
            })
        }
    }
}

fn tokenize_number(
    first: char,
    after_dot: bool,
    stream: &mut TokenStream,
) -> Result<Option<Token>, CompilerError> {
    let mut token_value = String::from(first);
    let mut is_float = false;

    while let Some(next) = stream.peek().copied() {
        if next.is_ascii_digit() || next == '_' {
            if next != '_' {
                token_value.push(next);
            }
            stream.next();
            continue;
        }

        // `1.5` is a float, but `v.0.1`, `0..3` and `x.0.len()` are not
        if next == '.'
            && !is_float
            && !after_dot
            && stream.peek_second().is_some_and(|after| after.is_ascii_digit())
        {
            is_float = true;
            token_value.push(next);
            stream.next();
            continue;
        }

        break;
    }

    // Type suffixes like 5u8 or 2.0f32 are accepted and ignored
    while let Some(next) = stream.peek() {
        if !next.is_ascii_alphanumeric() {
            break;
        }
        stream.next();
    }

    if is_float {
        match token_value.parse::<f64>() {
            Ok(value) => return_token!(TokenKind::FloatLiteral(value), stream),
            Err(_) => {
                return_syntax_error!(format!("Invalid float literal '{token_value}'"), stream.new_location(), {
                    CompilationStage => "Tokenization",
                })
            }
        }
    }

    match token_value.parse::<i64>() {
        Ok(value) => return_token!(TokenKind::IntLiteral(value), stream),
        Err(_) => {
            return_syntax_error!(format!("Integer literal '{token_value}' is too large"), stream.new_location(), {
                CompilationStage => "Tokenization",
            })
        }
    }
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

pub fn is_valid_var_char(char: &char) -> bool {
    char.is_alphanumeric() || *char == '_'
}

fn keyword_or_variable(token_value: &str, string_table: &mut StringTable) -> TokenKind {
    match token_value {
        "let" => TokenKind::Let,
        "mut" => TokenKind::Mut,
        "fn" => TokenKind::Fn,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "struct" => TokenKind::Struct,
        "impl" => TokenKind::Impl,
        "copy" => TokenKind::Copy,
        "self" => TokenKind::SelfValue,
        "Self" => TokenKind::SelfType,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Ident(string_table.intern(token_value)),
    }
}

#[cfg(test)]
#[path = "tests/tokenizer_tests.rs"]
mod tokenizer_tests;

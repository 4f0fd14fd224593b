use std::fmt;

use sel_support::quoted;

use crate::error::{Error, Result, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Number(f64),
    Text(String),
    Def,
    Comma,
    Semicolon,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Dot,
    Slash,
    Underscore,
    Percent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub(super) fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            span: Span::new(start, end - start),
        }
    }

    /// Binary operator tokens, with the builtin each one stands for.
    pub fn binary_operator(&self) -> Option<&'static str> {
        match self.kind {
            TokenKind::Plus => Some("add"),
            TokenKind::Minus => Some("sub"),
            TokenKind::Dot => Some("mul"),
            TokenKind::Slash => Some("div"),
            TokenKind::Underscore => Some("index"),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Eof => f.write_str("end of script"),
            TokenKind::Name(name) => write!(f, "name '{name}'"),
            TokenKind::Number(n) => write!(f, "literal number of value {n}"),
            TokenKind::Text(text) => write!(f, "literal string {}", quoted(text)),
            TokenKind::Def => f.write_str("special name \"def\""),
            TokenKind::Comma => f.write_str("token ','"),
            TokenKind::Semicolon => f.write_str("token ';'"),
            TokenKind::LBracket => f.write_str("token '['"),
            TokenKind::RBracket => f.write_str("token ']'"),
            TokenKind::LBrace => f.write_str("token '{'"),
            TokenKind::RBrace => f.write_str("token '}'"),
            TokenKind::Plus => f.write_str("token '+'"),
            TokenKind::Minus => f.write_str("token '-'"),
            TokenKind::Dot => f.write_str("token '.'"),
            TokenKind::Slash => f.write_str("token '/'"),
            TokenKind::Underscore => f.write_str("token '_'"),
            TokenKind::Percent => f.write_str("token '%'"),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                c if c.is_whitespace() => {
                    self.advance_char();
                }
                '#' => self.skip_comment(),
                ':' => tokens.push(self.lex_string()?),
                '0'..='9' => tokens.push(self.lex_number()),
                'a'..='z' => tokens.push(self.lex_name()),
                ',' => tokens.push(self.simple_token(TokenKind::Comma)),
                ';' => tokens.push(self.simple_token(TokenKind::Semicolon)),
                '[' => tokens.push(self.simple_token(TokenKind::LBracket)),
                ']' => tokens.push(self.simple_token(TokenKind::RBracket)),
                '{' => tokens.push(self.simple_token(TokenKind::LBrace)),
                '}' => tokens.push(self.simple_token(TokenKind::RBrace)),
                '+' => tokens.push(self.simple_token(TokenKind::Plus)),
                '-' => tokens.push(self.simple_token(TokenKind::Minus)),
                '.' => tokens.push(self.simple_token(TokenKind::Dot)),
                '/' => tokens.push(self.simple_token(TokenKind::Slash)),
                '_' => tokens.push(self.simple_token(TokenKind::Underscore)),
                '%' => tokens.push(self.simple_token(TokenKind::Percent)),
                other => {
                    return Err(Error::parse(
                        format!("unexpected character '{other}'"),
                        Span::new(self.position, other.len_utf8()),
                    ));
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, self.position, self.position));
        Ok(tokens)
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    /// `:text:` where `::` stands for a single colon.
    fn lex_string(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance_char(); // opening colon

        let mut value = String::new();
        loop {
            match self.advance_char() {
                Some(':') => {
                    if self.peek_char() == Some(':') {
                        self.advance_char();
                        value.push(':');
                    } else {
                        return Ok(Token::new(TokenKind::Text(value), start, self.position));
                    }
                }
                Some('\\') => match self.peek_char().and_then(escaped) {
                    Some(c) => {
                        self.advance_char();
                        value.push(c);
                    }
                    None => value.push('\\'),
                },
                Some(other) => value.push(other),
                None => {
                    return Err(Error::parse(
                        "expected closing ':' but got end of script instead",
                        Span::new(start, self.position - start),
                    ));
                }
            }
        }
    }

    fn lex_number(&mut self) -> Token {
        let start = self.position;
        self.take_digits();
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_char();
            self.take_digits();
        }
        let lexeme = self.slice(start, self.position);
        let n = lexeme.parse::<f64>().unwrap_or_default();
        Token::new(TokenKind::Number(n), start, self.position)
    }

    fn take_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_char();
        }
    }

    fn lex_name(&mut self) -> Token {
        let start = self.position;
        while self.peek_char().is_some_and(|c| c.is_ascii_lowercase()) {
            self.advance_char();
        }
        let kind = match self.slice(start, self.position) {
            "def" => TokenKind::Def,
            name => TokenKind::Name(name.to_string()),
        };
        Token::new(kind, start, self.position)
    }

    fn simple_token(&mut self, kind: TokenKind) -> Token {
        let start = self.position;
        self.advance_char();
        Token::new(kind, start, self.position)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }
}

fn escaped(c: char) -> Option<char> {
    match c {
        'a' => Some('\x07'),
        'b' => Some('\x08'),
        't' => Some('\t'),
        'n' => Some('\n'),
        'v' => Some('\x0b'),
        'f' => Some('\x0c'),
        'r' => Some('\r'),
        'e' => Some('\x1b'),
        _ => None,
    }
}

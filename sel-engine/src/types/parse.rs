use std::fmt;

use super::Type;
use crate::error::{Error, Result, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Bind,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Arrow,
    Comma,
    Star,
    Name,
    TypeName,
    Unknown,
    End,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    offset: usize,
}

impl Token<'_> {
    fn span(&self) -> Span {
        Span::new(self.offset, self.text.len().max(1))
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::End => f.write_str("end of type"),
            TokenKind::Name => write!(f, "name '{}'", self.text),
            TokenKind::TypeName => write!(f, "type name '{}'", self.text),
            _ => write!(f, "token '{}'", self.text),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            let start = self.position;
            let kind = match ch {
                c if c.is_whitespace() => {
                    self.advance_char();
                    continue;
                }
                ':' => self.pair(':', TokenKind::Bind),
                '-' => self.pair('>', TokenKind::Arrow),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                '*' => self.single(TokenKind::Star),
                'a'..='z' | 'A'..='Z' => {
                    self.advance_char();
                    while matches!(self.peek_char(), Some('a'..='z')) {
                        self.advance_char();
                    }
                    if ch.is_ascii_lowercase() {
                        TokenKind::Name
                    } else {
                        TokenKind::TypeName
                    }
                }
                _ => self.single(TokenKind::Unknown),
            };
            tokens.push(Token {
                kind,
                text: &self.input[start..self.position],
                offset: start,
            });
        }

        tokens.push(Token {
            kind: TokenKind::End,
            text: "",
            offset: self.input.len(),
        });
        tokens
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance_char();
        kind
    }

    fn pair(&mut self, second: char, kind: TokenKind) -> TokenKind {
        self.advance_char();
        if self.peek_char() == Some(second) {
            self.advance_char();
            kind
        } else {
            TokenKind::Unknown
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        Some(ch)
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    current: usize,
}

pub(super) fn parse_named(text: &str) -> Result<(Option<String>, Type)> {
    let mut parser = Parser {
        tokens: Lexer::new(text).tokenize(),
        current: 0,
    };

    let name = if parser.peek_kind() == TokenKind::Name
        && parser.peek_kind_at(1) == TokenKind::Bind
    {
        let name = parser.advance().text.to_string();
        parser.advance();
        Some(name)
    } else {
        None
    };

    let ty = parser.parse_type()?;
    if parser.peek_kind() != TokenKind::End {
        return Err(parser.expected("end of type"));
    }
    Ok((name, ty))
}

impl<'a> Parser<'a> {
    // type ::= name | TyName | (type) | [type, ...] | (type, type, ...) | type* | type -> type
    fn parse_type(&mut self) -> Result<Type> {
        let token = self.peek().clone();
        let mut ty = match token.kind {
            TokenKind::Name => {
                self.advance();
                Type::Unknown(token.text.to_string())
            }
            TokenKind::TypeName => {
                let ty = match token.text {
                    "Num" => Type::Num,
                    "Str" => Type::str(false),
                    _ => return Err(self.expected("type name")),
                };
                self.advance();
                ty
            }
            TokenKind::LParen => {
                self.advance();
                let first = self.parse_type()?;
                if self.peek_kind() == TokenKind::Comma {
                    let mut items = vec![first];
                    while self.peek_kind() == TokenKind::Comma {
                        self.advance();
                        items.push(self.parse_type()?);
                    }
                    self.expect(TokenKind::RParen, "matching token ')'")?;
                    Type::tuple(items)
                } else {
                    self.expect(TokenKind::RParen, "token ',' or matching token ')'")?;
                    first
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = vec![self.parse_type()?];
                while self.peek_kind() == TokenKind::Comma {
                    self.advance();
                    items.push(self.parse_type()?);
                }
                self.expect(TokenKind::RBracket, "matching token ']'")?;
                Type::lst(items, false)
            }
            _ => return Err(self.expected("type expression")),
        };

        if self.peek_kind() == TokenKind::Star {
            self.advance();
            ty = ty.with_infinite(true);
        }

        if self.peek_kind() == TokenKind::Arrow {
            self.advance();
            let to = self.parse_type()?;
            ty = Type::fun(ty, to);
        }

        Ok(ty)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.peek_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    fn expected(&self, what: &str) -> Error {
        let got = self.peek();
        Error::parse(format!("expected {what} but got {got} instead"), got.span())
    }

    fn peek(&self) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, ahead: usize) -> TokenKind {
        self.tokens
            .get(self.current + ahead)
            .map(|token| token.kind)
            .unwrap_or(TokenKind::End)
    }

    fn advance(&mut self) -> &Token<'a> {
        let at = self.current.min(self.tokens.len() - 1);
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        &self.tokens[at]
    }
}

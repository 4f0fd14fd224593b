use log::debug;

use super::lexer::{Token, TokenKind};
use super::Scope;
use crate::error::{Error, Result, Span};
use crate::value::{define, FunChain, LstLiteral, NumLiteral, StrLiteral, Value};

pub struct Parser<'s> {
    tokens: Vec<Token>,
    current: usize,
    scope: &'s mut dyn Scope,
}

impl<'s> Parser<'s> {
    /// A [`TokenKind::Eof`] is appended when `tokens` do not already end
    /// with one, as [`super::Lexer`] gives.
    pub fn new(mut tokens: Vec<Token>, scope: &'s mut dyn Scope) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let end = tokens.last().map_or(0, |token| token.span.offset + token.span.len);
            tokens.push(Token::new(TokenKind::Eof, end, end));
        }
        Self {
            tokens,
            current: 0,
            scope,
        }
    }

    pub fn parse(&mut self) -> Result<Value> {
        let value = self.parse_script()?;
        match self.peek_kind() {
            TokenKind::Eof => Ok(value),
            TokenKind::RBracket => Err(Error::parse(
                "unmatched closing ']'",
                self.peek().span,
            )),
            _ => Err(self.expected("',' or end of script")),
        }
    }

    /// Elements separated by `,`. Stops before `]` or the end of script.
    fn parse_script(&mut self) -> Result<Value> {
        let first = self.parse_element()?;
        if !matches!(self.peek_kind(), TokenKind::Comma) {
            return Ok(first);
        }

        if first.as_fun().is_ok() {
            let mut stages = vec![first.into_fun()?];
            while matches!(self.peek_kind(), TokenKind::Comma) {
                self.advance();
                stages.push(self.parse_element()?.into_fun()?);
            }
            debug!("chained {} functions", stages.len());
            return Ok(Value::fun(FunChain::new(stages)?));
        }

        let mut value = first;
        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.advance();
            let stage = self.parse_element()?;
            value = stage.apply(value)?;
        }
        Ok(value)
    }

    fn parse_element(&mut self) -> Result<Value> {
        let mut value = if matches!(self.peek_kind(), TokenKind::Def) {
            self.parse_def()?
        } else {
            self.parse_atom()?
        };

        while !ends_element(self.peek_kind()) {
            let arg = self.parse_atom()?;
            value = value.apply(arg)?;
        }

        if matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.advance();
            return self.parse_element();
        }
        Ok(value)
    }

    /// `def name :doc: atom`
    fn parse_def(&mut self) -> Result<Value> {
        self.advance();

        let name_token = self.peek().clone();
        let TokenKind::Name(name) = name_token.kind.clone() else {
            return Err(self.expected("name"));
        };
        self.advance();

        let TokenKind::Text(doc) = self.peek_kind().clone() else {
            return Err(self.expected(&format!("docstring for '{name}'")));
        };
        if self.scope.lookup_name(&name).is_some() {
            return Err(Error::parse(
                format!("cannot redefine already known name '{name}'"),
                name_token.span,
            ));
        }
        self.advance();

        let value = define(&name, &doc, self.parse_atom()?);
        debug!("defined '{name}' of type {}", value.ty());
        self.scope.define_name_user(&name, value.copy())?;
        Ok(value)
    }

    fn parse_atom(&mut self) -> Result<Value> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Name(name) => {
                let value = self.scope.lookup_name(name).ok_or_else(|| {
                    Error::parse(format!("unknown name '{name}'"), token.span)
                })?;
                self.advance();
                Ok(value)
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Value::num(NumLiteral::new(*n)))
            }
            TokenKind::Text(text) => {
                self.advance();
                Ok(Value::str(StrLiteral::new(text.as_bytes())))
            }
            TokenKind::LBrace => self.parse_list(),
            TokenKind::LBracket => self.parse_sub_script(),
            TokenKind::Percent => {
                self.advance();
                let arg = match self.peek().binary_operator() {
                    Some(op) => {
                        let span = self.advance().span;
                        self.flipped(op, span)?
                    }
                    None => self.parse_atom()?,
                };
                self.builtin("flip", token.span)?.apply(arg)
            }
            _ => match token.binary_operator() {
                Some(op) => {
                    self.advance();
                    let arg = self.parse_atom()?;
                    self.flipped(op, token.span)?.apply(arg)
                }
                None => Err(self.expected("atom")),
            },
        }
    }

    /// `{ element, ... }`
    fn parse_list(&mut self) -> Result<Value> {
        self.advance();
        let mut items = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace) {
            items.push(self.parse_element()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBrace => {}
                _ => return Err(self.expected("',' or '}'")),
            }
        }
        self.advance();
        Ok(Value::lst(LstLiteral::from_items(items)))
    }

    /// `[ script ]`
    fn parse_sub_script(&mut self) -> Result<Value> {
        let open = self.advance().span;
        if matches!(self.peek_kind(), TokenKind::RBracket) {
            let close = self.peek().span;
            return Err(Error::parse(
                "expected element but got empty sub-script instead",
                Span::new(open.offset, close.offset + close.len - open.offset),
            ));
        }
        let value = self.parse_script()?;
        if !matches!(self.peek_kind(), TokenKind::RBracket) {
            return Err(self.expected("',' or ']'"));
        }
        self.advance();
        Ok(value)
    }

    /// `flip op`, the function behind a binary operator.
    fn flipped(&mut self, op: &str, span: Span) -> Result<Value> {
        let op = self.builtin(op, span)?;
        self.builtin("flip", span)?.apply(op)
    }

    fn builtin(&self, name: &str, span: Span) -> Result<Value> {
        self.scope
            .lookup_name(name)
            .ok_or_else(|| Error::parse(format!("unknown name '{name}'"), span))
    }

    fn expected(&self, what: &str) -> Error {
        let token = self.peek();
        Error::parse(
            format!("expected {what} but got {token} instead"),
            token.span,
        )
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    fn advance(&mut self) -> &Token {
        let at = self.current;
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[at]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}

fn ends_element(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::Eof
    )
}

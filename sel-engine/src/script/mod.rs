//! Script text to a value: tokens, then elements applied left to right.

mod lexer;
mod parser;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;
use crate::value::Value;

/// Names visible while parsing a script.
pub trait Scope {
    /// A fresh value for `name`, user definitions first.
    fn lookup_name(&self, name: &str) -> Option<Value>;

    /// Records a user definition; fails when `name` is already known.
    fn define_name_user(&mut self, name: &str, value: Value) -> Result<()>;
}

/// Parses `source` into a single value, registering `def`s into `scope`.
pub fn parse(source: &str, scope: &mut dyn Scope) -> Result<Value> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens, scope).parse()
}

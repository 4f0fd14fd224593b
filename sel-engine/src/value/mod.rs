//! Value kinds and the capability contract each of them offers.
//!
//! A [`Value`] is exactly one of four kinds. Every concrete value type
//! implements one of [`Num`], [`Str`], [`Lst`] or [`Fun`], all of which share
//! [`Describe`] for their type and debug representation.

mod define;
mod io;
mod literal;

use std::fmt;
use std::io::Write;

pub use define::{define, Define};
pub use io::{Input, Output};
pub use literal::{FunChain, LstLiteral, NumLiteral, StrChunks, StrLiteral};

use crate::error::{Error, Result};
use crate::repr::Repr;
use crate::types::{Kind, Type};

pub(crate) static NUM_TYPE: Type = Type::Num;
pub(crate) static STR_TYPE: Type = Type::Str { infinite: false };

pub trait Describe {
    fn ty(&self) -> &Type;
    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result;
}

pub trait Num: Describe {
    fn value(&mut self) -> Result<f64>;
    fn copy(&self) -> Box<dyn Num>;
}

/// Forward-only byte stream.
pub trait Str: Describe {
    /// Writes the next available bytes; may write nothing once at the end.
    fn stream(&mut self, out: &mut dyn Write) -> Result<()>;

    /// True once the previous `stream` emitted the last byte.
    fn end(&mut self) -> Result<bool>;

    /// Writes everything left. Never returns on an endless string.
    fn entire(&mut self, out: &mut dyn Write) -> Result<()> {
        while !self.end()? {
            self.stream(out)?;
        }
        Ok(())
    }

    fn copy(&self) -> Box<dyn Str>;

    /// Hands back the number this string is a lazy rendering of, if any.
    fn take_num(&mut self) -> Option<Box<dyn Num>> {
        None
    }
}

/// Iterator with one-past-the-end semantics: `current` and `advance` are
/// only valid while `end` is false.
pub trait Lst: Describe {
    fn current(&mut self) -> Result<Value>;
    fn advance(&mut self) -> Result<()>;
    fn end(&mut self) -> Result<bool>;

    fn rewind(&mut self) -> Result<()> {
        Err(Error::NotImplemented(format!("rewind for {}", self.ty())))
    }

    /// Number of elements, leaving the list rewound.
    fn count(&mut self) -> Result<usize> {
        self.rewind()?;
        let mut n = 0;
        while !self.end()? {
            self.advance()?;
            n += 1;
        }
        self.rewind()?;
        Ok(n)
    }

    fn is_finite(&self) -> bool {
        !self.ty().is_infinite()
    }

    fn copy(&self) -> Box<dyn Lst>;

    /// `current` then `advance`, or `None` at the end.
    fn next_value(&mut self) -> Result<Option<Value>> {
        if self.end()? {
            return Ok(None);
        }
        let value = self.current()?;
        self.advance()?;
        Ok(Some(value))
    }
}

pub trait Fun: Describe {
    /// Consumes the argument; `self` is left untouched and can be applied again.
    fn apply(&self, arg: Value) -> Result<Value>;
    fn copy(&self) -> Box<dyn Fun>;
}

pub enum Value {
    Num(Box<dyn Num>),
    Str(Box<dyn Str>),
    Lst(Box<dyn Lst>),
    Fun(Box<dyn Fun>),
}

impl Value {
    pub fn num(n: impl Num + 'static) -> Self {
        Value::Num(Box::new(n))
    }

    pub fn str(s: impl Str + 'static) -> Self {
        Value::Str(Box::new(s))
    }

    pub fn lst(l: impl Lst + 'static) -> Self {
        Value::Lst(Box::new(l))
    }

    pub fn fun(f: impl Fun + 'static) -> Self {
        Value::Fun(Box::new(f))
    }

    pub fn ty(&self) -> &Type {
        match self {
            Value::Num(it) => it.ty(),
            Value::Str(it) => it.ty(),
            Value::Lst(it) => it.ty(),
            Value::Fun(it) => it.ty(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Num(_) => Kind::Num,
            Value::Str(_) => Kind::Str,
            Value::Lst(_) => Kind::Lst,
            Value::Fun(_) => Kind::Fun,
        }
    }

    /// Full logical duplicate; nothing is shared with `self`.
    pub fn copy(&self) -> Value {
        match self {
            Value::Num(it) => Value::Num(it.copy()),
            Value::Str(it) => Value::Str(it.copy()),
            Value::Lst(it) => Value::Lst(it.copy()),
            Value::Fun(it) => Value::Fun(it.copy()),
        }
    }

    pub fn apply(&self, arg: Value) -> Result<Value> {
        match self {
            Value::Fun(f) => f.apply(arg),
            other => Err(Error::TypeMismatch {
                from: other.ty().clone(),
                to: Type::fun(arg.ty().clone(), Type::unk("b")),
            }),
        }
    }

    pub fn into_num(self) -> Result<Box<dyn Num>> {
        match self {
            Value::Num(it) => Ok(it),
            other => Err(other.mismatch(Type::Num)),
        }
    }

    pub fn into_str(self) -> Result<Box<dyn Str>> {
        match self {
            Value::Str(it) => Ok(it),
            other => Err(other.mismatch(Type::str(false))),
        }
    }

    pub fn into_lst(self) -> Result<Box<dyn Lst>> {
        match self {
            Value::Lst(it) => Ok(it),
            other => Err(other.mismatch(Type::lst(vec![Type::unk("a")], false))),
        }
    }

    pub fn into_fun(self) -> Result<Box<dyn Fun>> {
        match self {
            Value::Fun(it) => Ok(it),
            other => Err(other.mismatch(Type::fun(Type::unk("a"), Type::unk("b")))),
        }
    }

    pub fn as_num(&mut self) -> Result<&mut (dyn Num + 'static)> {
        match self {
            Value::Num(it) => Ok(&mut **it),
            other => Err(other.mismatch(Type::Num)),
        }
    }

    pub fn as_str(&mut self) -> Result<&mut (dyn Str + 'static)> {
        match self {
            Value::Str(it) => Ok(&mut **it),
            other => Err(other.mismatch(Type::str(false))),
        }
    }

    pub fn as_lst(&mut self) -> Result<&mut (dyn Lst + 'static)> {
        match self {
            Value::Lst(it) => Ok(&mut **it),
            other => Err(other.mismatch(Type::lst(vec![Type::unk("a")], false))),
        }
    }

    pub fn as_fun(&self) -> Result<&(dyn Fun + 'static)> {
        match self {
            Value::Fun(it) => Ok(&**it),
            other => Err(Error::TypeMismatch {
                from: other.ty().clone(),
                to: Type::fun(Type::unk("a"), Type::unk("b")),
            }),
        }
    }

    fn mismatch(&self, to: Type) -> Error {
        Error::TypeMismatch {
            from: self.ty().clone(),
            to,
        }
    }

    pub fn repr_into(&self, r: &mut Repr<'_>) -> fmt::Result {
        match self {
            Value::Num(it) => it.repr(r),
            Value::Str(it) => it.repr(r),
            Value::Lst(it) => it.repr(r),
            Value::Fun(it) => it.repr(r),
        }
    }

    /// Debug representation, either on one line or indented.
    pub fn repr(&self, single_line: bool) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.repr_into(&mut Repr::new(&mut out, single_line));
        out
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr(true))
    }
}

/// Drains a string into memory.
pub fn read_all(s: &mut dyn Str) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    s.entire(&mut buffer)?;
    Ok(buffer)
}

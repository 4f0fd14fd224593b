use std::fmt;
use std::io::Write;

use super::{Describe, Fun, Lst, Num, Str, Value};
use crate::error::Result;
use crate::repr::{Field, Repr};
use crate::types::Type;

/// A user definition: some value under a name, with its doc string.
/// Every capability is forwarded to the wrapped value.
pub struct Define<T: ?Sized> {
    name: String,
    doc: String,
    inner: Box<T>,
}

impl<T: ?Sized> Define<T> {
    pub fn new(name: impl Into<String>, doc: &str, inner: Box<T>) -> Self {
        Self {
            name: name.into(),
            doc: doc.split_whitespace().collect::<Vec<_>>().join(" "),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    fn rewrap<U: ?Sized>(&self, inner: Box<U>) -> Box<Define<U>> {
        Box::new(Define {
            name: self.name.clone(),
            doc: self.doc.clone(),
            inner,
        })
    }
}

/// Wraps `value` in the definition of its own kind.
pub fn define(name: &str, doc: &str, value: Value) -> Value {
    match value {
        Value::Num(it) => Value::Num(Box::new(Define::new(name, doc, it))),
        Value::Str(it) => Value::Str(Box::new(Define::new(name, doc, it))),
        Value::Lst(it) => Value::Lst(Box::new(Define::new(name, doc, it))),
        Value::Fun(it) => Value::Fun(Box::new(Define::new(name, doc, it))),
    }
}

macro_rules! describe_define {
    ($($kind:ident => $node:literal),* $(,)?) => {$(
        impl Describe for Define<dyn $kind> {
            fn ty(&self) -> &Type {
                self.inner.ty()
            }

            fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
                let fields = vec![
                    ("name".to_string(), Field::Text(self.name.as_str().into())),
                    ("doc".to_string(), Field::Text(self.doc.as_str().into())),
                    ("v".to_string(), Field::$kind(&*self.inner)),
                ];
                r.node(self.ty(), $node, fields)
            }
        }
    )*};
}

describe_define! {
    Num => "NumDefine",
    Str => "StrDefine",
    Lst => "LstDefine",
    Fun => "FunDefine",
}

impl Num for Define<dyn Num> {
    fn value(&mut self) -> Result<f64> {
        self.inner.value()
    }

    fn copy(&self) -> Box<dyn Num> {
        self.rewrap(self.inner.copy())
    }
}

impl Str for Define<dyn Str> {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        self.inner.stream(out)
    }

    fn end(&mut self) -> Result<bool> {
        self.inner.end()
    }

    fn entire(&mut self, out: &mut dyn Write) -> Result<()> {
        self.inner.entire(out)
    }

    fn copy(&self) -> Box<dyn Str> {
        self.rewrap(self.inner.copy())
    }

    fn take_num(&mut self) -> Option<Box<dyn Num>> {
        self.inner.take_num()
    }
}

impl Lst for Define<dyn Lst> {
    fn current(&mut self) -> Result<Value> {
        self.inner.current()
    }

    fn advance(&mut self) -> Result<()> {
        self.inner.advance()
    }

    fn end(&mut self) -> Result<bool> {
        self.inner.end()
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner.rewind()
    }

    fn count(&mut self) -> Result<usize> {
        self.inner.count()
    }

    fn is_finite(&self) -> bool {
        self.inner.is_finite()
    }

    fn copy(&self) -> Box<dyn Lst> {
        self.rewrap(self.inner.copy())
    }
}

impl Fun for Define<dyn Fun> {
    fn apply(&self, arg: Value) -> Result<Value> {
        self.inner.apply(arg)
    }

    fn copy(&self) -> Box<dyn Fun> {
        self.rewrap(self.inner.copy())
    }
}

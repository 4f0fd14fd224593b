use std::fmt;
use std::io::Write;

use super::{Describe, Fun, Lst, Num, Str, Value, NUM_TYPE, STR_TYPE};
use crate::error::{Error, Result};
use crate::repr::{Field, Repr};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumLiteral {
    n: f64,
}

impl NumLiteral {
    pub fn new(n: f64) -> Self {
        Self { n }
    }
}

impl Describe for NumLiteral {
    fn ty(&self) -> &Type {
        &NUM_TYPE
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(self.ty(), "NumLiteral", vec![("n".into(), Field::Number(self.n))])
    }
}

impl Num for NumLiteral {
    fn value(&mut self) -> Result<f64> {
        Ok(self.n)
    }

    fn copy(&self) -> Box<dyn Num> {
        Box::new(*self)
    }
}

/// Finite string known up front. Streaming position is kept apart from the
/// bytes, so `entire` always emits everything.
#[derive(Debug, Clone)]
pub struct StrLiteral {
    bytes: Vec<u8>,
    read: bool,
}

impl StrLiteral {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            read: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Describe for StrLiteral {
    fn ty(&self) -> &Type {
        &STR_TYPE
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.bytes);
        r.node(self.ty(), "StrLiteral", vec![("s".into(), Field::Text(text))])
    }
}

impl Str for StrLiteral {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        if !self.read {
            out.write_all(&self.bytes)?;
            self.read = true;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        Ok(self.read)
    }

    fn entire(&mut self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&self.bytes)?;
        self.read = true;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(StrLiteral::new(self.bytes.clone()))
    }
}

/// Finite string served one pre-split chunk per `stream` call.
#[derive(Debug, Clone)]
pub struct StrChunks {
    chunks: Vec<Vec<u8>>,
    at: usize,
}

impl StrChunks {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks, at: 0 }
    }
}

impl Describe for StrChunks {
    fn ty(&self) -> &Type {
        &STR_TYPE
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        let fields = self
            .chunks
            .iter()
            .enumerate()
            .map(|(k, chunk)| {
                (
                    format!("c[{k}]"),
                    Field::Text(String::from_utf8_lossy(chunk)),
                )
            })
            .collect();
        r.node(self.ty(), "StrChunks", fields)
    }
}

impl Str for StrChunks {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        if let Some(chunk) = self.chunks.get(self.at) {
            out.write_all(chunk)?;
            self.at += 1;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        Ok(self.chunks.len() <= self.at)
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(StrChunks::new(self.chunks.clone()))
    }
}

pub struct LstLiteral {
    ty: Type,
    items: Vec<Value>,
    at: usize,
}

impl LstLiteral {
    /// `has` is the declared element-type list; it is not checked against
    /// the items.
    pub fn new(has: Vec<Type>, items: Vec<Value>) -> Self {
        Self {
            ty: Type::lst(has, false),
            items,
            at: 0,
        }
    }

    /// Infers `[T]` from the first item when all items share a compatible
    /// type, `[_mixed]` otherwise (and for no items).
    pub fn from_items(items: Vec<Value>) -> Self {
        let has = match items.split_first() {
            Some((first, rest)) if rest.iter().all(|it| it.ty().equals(first.ty())) => {
                vec![first.ty().clone()]
            }
            _ => Vec::new(),
        };
        Self::new(has, items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Describe for LstLiteral {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        let fields = self
            .items
            .iter()
            .enumerate()
            .map(|(k, item)| (format!("v[{k}]"), Field::Value(item)))
            .collect();
        r.node(&self.ty, "LstLiteral", fields)
    }
}

impl Lst for LstLiteral {
    fn current(&mut self) -> Result<Value> {
        self.items
            .get(self.at)
            .map(Value::copy)
            .ok_or_else(|| Error::runtime("dereferenced a list past its end"))
    }

    fn advance(&mut self) -> Result<()> {
        if self.at < self.items.len() {
            self.at += 1;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        Ok(self.items.len() <= self.at)
    }

    fn rewind(&mut self) -> Result<()> {
        self.at = 0;
        Ok(())
    }

    fn count(&mut self) -> Result<usize> {
        Ok(self.items.len())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(LstLiteral {
            ty: self.ty.clone(),
            items: self.items.iter().map(Value::copy).collect(),
            at: 0,
        })
    }
}

/// Left-to-right composition of the `,` pipeline.
pub struct FunChain {
    ty: Type,
    stages: Vec<Box<dyn Fun>>,
}

impl FunChain {
    pub fn new(stages: Vec<Box<dyn Fun>>) -> Result<Self> {
        let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
            return Err(Error::runtime("cannot chain zero functions"));
        };
        let from = first.ty().from().cloned();
        let to = last.ty().to().cloned();
        let (Some(from), Some(to)) = (from, to) else {
            return Err(Error::TypeMismatch {
                from: first.ty().clone(),
                to: Type::fun(Type::unk("a"), Type::unk("b")),
            });
        };
        Ok(Self {
            ty: Type::fun(from, to),
            stages,
        })
    }

    pub fn stages(&self) -> &[Box<dyn Fun>] {
        &self.stages
    }
}

impl Describe for FunChain {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        let fields = self
            .stages
            .iter()
            .enumerate()
            .map(|(k, stage)| (format!("f[{k}]"), Field::Fun(stage.as_ref())))
            .collect();
        r.node(&self.ty, "FunChain", fields)
    }
}

impl Fun for FunChain {
    fn apply(&self, arg: Value) -> Result<Value> {
        let mut value = arg;
        for stage in &self.stages {
            value = stage.apply(value)?;
        }
        Ok(value)
    }

    fn copy(&self) -> Box<dyn Fun> {
        Box::new(FunChain {
            ty: self.ty.clone(),
            stages: self.stages.iter().map(|stage| stage.copy()).collect(),
        })
    }
}

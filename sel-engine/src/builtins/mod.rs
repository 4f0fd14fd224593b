//! The builtin catalogue and the registry built from it.

mod func;
mod list;
mod num;
mod text;

use std::collections::HashMap;
use std::io::Write;

use crate::curry::{tail_node, Bound, Builtin, Curried};
use crate::error::{Error, Result};
use crate::types::Type;
use crate::value::{Num, Str, Value};

pub struct Module {
    pub name: &'static str,
    pub doc: &'static str,
    pub builtins: &'static [Builtin],
}

pub static MODULES: &[Module] = &[num::MODULE, text::MODULE, list::MODULE, func::MODULE];

struct Entry {
    builtin: &'static Builtin,
    module: &'static str,
    ty: Type,
}

/// Name to builtin mapping, with every signature parsed up front.
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn with_builtins() -> Result<Self> {
        Self::from_modules(MODULES)
    }

    pub fn from_modules(modules: &'static [Module]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for module in modules {
            for builtin in module.builtins {
                let ty = Type::parse(builtin.signature)?.qualified(builtin.name);
                if builtin.arity == 0 || ty.arity() < builtin.arity {
                    return Err(Error::runtime(format!(
                        "builtin '{}' declares {} arguments for '{}'",
                        builtin.name, builtin.arity, builtin.signature
                    )));
                }
                if index.insert(builtin.name, entries.len()).is_some() {
                    return Err(Error::runtime(format!(
                        "builtin '{}' is declared twice",
                        builtin.name
                    )));
                }
                entries.push(Entry {
                    builtin,
                    module: module.name,
                    ty,
                });
            }
        }
        Ok(Self { entries, index })
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&at| &self.entries[at])
    }

    /// A fresh head value for `name`, nothing bound yet.
    pub fn lookup_name(&self, name: &str) -> Option<Value> {
        self.entry(name)
            .map(|entry| Value::fun(Curried::head(entry.builtin, entry.ty.clone())))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Type> {
        self.entry(name).map(|entry| &entry.ty)
    }

    pub fn lookup_doc(&self, name: &str) -> Option<&'static str> {
        self.entry(name).map(|entry| entry.builtin.doc)
    }

    pub fn lookup_module(&self, name: &str) -> Option<&'static str> {
        self.entry(name).map(|entry| entry.module)
    }

    /// Every builtin name, in catalogue order.
    pub fn list_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.builtin.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type ComputeNum = fn(&mut Bound) -> Result<f64>;
type RenderStr = fn(&mut Bound) -> Result<Vec<u8>>;

/// Tail computing a number once, on first `value`.
pub(crate) struct NumTail {
    bound: Bound,
    compute: ComputeNum,
    cached: Option<f64>,
}

impl NumTail {
    pub(crate) fn value(bound: Bound, compute: ComputeNum) -> Result<Value> {
        Ok(Value::num(NumTail {
            bound,
            compute,
            cached: None,
        }))
    }
}

tail_node!(NumTail);

impl Num for NumTail {
    fn value(&mut self) -> Result<f64> {
        if let Some(n) = self.cached {
            return Ok(n);
        }
        let n = (self.compute)(&mut self.bound)?;
        self.cached = Some(n);
        Ok(n)
    }

    fn copy(&self) -> Box<dyn Num> {
        Box::new(NumTail {
            bound: self.bound.copy(),
            compute: self.compute,
            cached: None,
        })
    }
}

/// Tail rendering a whole string at once, on first use.
pub(crate) struct StrTail {
    bound: Bound,
    render: RenderStr,
    rendered: Option<Vec<u8>>,
    served: bool,
}

impl StrTail {
    pub(crate) fn value(bound: Bound, render: RenderStr) -> Result<Value> {
        Ok(Value::str(StrTail {
            bound,
            render,
            rendered: None,
            served: false,
        }))
    }

    fn rendered(&mut self) -> Result<&[u8]> {
        if self.rendered.is_none() {
            self.rendered = Some((self.render)(&mut self.bound)?);
        }
        Ok(self.rendered.as_deref().unwrap_or_default())
    }
}

tail_node!(StrTail);

impl Str for StrTail {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        if !self.served {
            out.write_all(self.rendered()?)?;
            self.served = true;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        Ok(self.served)
    }

    fn entire(&mut self, out: &mut dyn Write) -> Result<()> {
        out.write_all(self.rendered()?)?;
        self.served = true;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(StrTail {
            bound: self.bound.copy(),
            render: self.render,
            rendered: None,
            served: false,
        })
    }
}

/// Streams `s` until it ends or `more` says the bytes so far are enough.
pub(crate) fn read_prefix(s: &mut dyn Str, mut more: impl FnMut(&[u8]) -> bool) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    while more(&buffer) && !s.end()? {
        s.stream(&mut buffer)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_signature_parses() {
        let registry = Registry::with_builtins().unwrap();
        assert_eq!(registry.len(), MODULES.iter().map(|m| m.builtins.len()).sum::<usize>());
        assert!(registry.lookup_name("map").is_some());
        assert!(registry.lookup_name("nope").is_none());
    }
}

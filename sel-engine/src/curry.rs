//! Partial application of builtins.
//!
//! A builtin of arity N goes through N + 1 states. The head and every body
//! are [`Curried`] functions holding the arguments bound so far; binding the
//! last one hands a [`Bound`] to the builtin's `finish`, which wraps it in
//! the tail value doing the actual work when pulled.

use std::fmt;

use log::trace;

use crate::coerce::coerce;
use crate::error::{Error, Result};
use crate::repr::{arg_label, Field, Repr};
use crate::types::Type;
use crate::value::{Describe, Fun, Lst, Num, Str, Value};

pub type Finish = fn(Bound) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub arity: usize,
    pub doc: &'static str,
    pub finish: Finish,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("arity", &self.arity)
            .finish()
    }
}

pub const fn builtin(
    name: &'static str,
    signature: &'static str,
    arity: usize,
    doc: &'static str,
    finish: Finish,
) -> Builtin {
    Builtin {
        name,
        signature,
        arity,
        doc,
        finish,
    }
}

/// `add` with 2 arguments left becomes `Add2`.
fn node_name(name: &str, remaining: usize) -> String {
    let mut chars = name.chars();
    let head: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
    format!("{head}{}{remaining}", chars.as_str())
}

fn arg_fields(args: &[Value]) -> Vec<(String, Field<'_>)> {
    args.iter()
        .enumerate()
        .map(|(k, arg)| (arg_label(k), Field::Value(arg)))
        .collect()
}

/// Head or body of a builtin's chain.
pub struct Curried {
    builtin: &'static Builtin,
    ty: Type,
    args: Vec<Value>,
}

impl Curried {
    /// The head state, before any argument. `ty` is the builtin's parsed
    /// signature.
    pub fn head(builtin: &'static Builtin, ty: Type) -> Self {
        Self {
            builtin,
            ty,
            args: Vec::new(),
        }
    }

    pub fn builtin(&self) -> &'static Builtin {
        self.builtin
    }

    pub fn bound(&self) -> usize {
        self.args.len()
    }
}

impl Describe for Curried {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        let name = node_name(self.builtin.name, self.builtin.arity - self.args.len());
        r.node(&self.ty, &name, arg_fields(&self.args))
    }
}

impl Fun for Curried {
    fn apply(&self, arg: Value) -> Result<Value> {
        let Some(from) = self.ty.from() else {
            return Err(Error::TypeMismatch {
                from: self.ty.clone(),
                to: Type::fun(arg.ty().clone(), Type::unk("b")),
            });
        };
        let arg = coerce(arg, from)?;
        let ty = self.ty.applied(arg.ty())?;
        trace!(
            "{}: bound argument {} of type {}, now {ty}",
            self.builtin.name,
            self.args.len() + 1,
            arg.ty()
        );

        let mut args: Vec<Value> = self.args.iter().map(Value::copy).collect();
        args.push(arg);

        if args.len() < self.builtin.arity {
            return Ok(Value::fun(Curried {
                builtin: self.builtin,
                ty,
                args,
            }));
        }
        (self.builtin.finish)(Bound {
            builtin: self.builtin,
            ty,
            args,
        })
    }

    fn copy(&self) -> Box<dyn Fun> {
        Box::new(Curried {
            builtin: self.builtin,
            ty: self.ty.clone(),
            args: self.args.iter().map(Value::copy).collect(),
        })
    }
}

/// Every argument of a builtin, oldest first, with the type of the result.
pub struct Bound {
    builtin: &'static Builtin,
    ty: Type,
    args: Vec<Value>,
}

impl Bound {
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn name(&self) -> &'static str {
        self.builtin.name
    }

    pub fn arg(&self, k: usize) -> Result<&Value> {
        self.args.get(k).ok_or_else(|| self.missing(k))
    }

    pub fn num(&mut self, k: usize) -> Result<&mut (dyn Num + 'static)> {
        if self.args.len() <= k {
            return Err(self.missing(k));
        }
        self.args[k].as_num()
    }

    pub fn str(&mut self, k: usize) -> Result<&mut (dyn Str + 'static)> {
        if self.args.len() <= k {
            return Err(self.missing(k));
        }
        self.args[k].as_str()
    }

    pub fn lst(&mut self, k: usize) -> Result<&mut (dyn Lst + 'static)> {
        if self.args.len() <= k {
            return Err(self.missing(k));
        }
        self.args[k].as_lst()
    }

    pub fn fun(&self, k: usize) -> Result<&(dyn Fun + 'static)> {
        self.arg(k)?.as_fun()
    }

    /// Gives up the whole binding for its `k`-th argument.
    pub fn into_arg(mut self, k: usize) -> Result<Value> {
        if self.args.len() <= k {
            return Err(self.missing(k));
        }
        Ok(self.args.swap_remove(k))
    }

    fn missing(&self, k: usize) -> Error {
        Error::runtime(format!(
            "{} has no argument {} bound",
            self.builtin.name,
            k + 1
        ))
    }

    pub fn copy(&self) -> Bound {
        Bound {
            builtin: self.builtin,
            ty: self.ty.clone(),
            args: self.args.iter().map(Value::copy).collect(),
        }
    }

    pub fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(&self.ty, &node_name(self.builtin.name, 0), arg_fields(&self.args))
    }
}

/// Implements [`Describe`] for a tail struct through its `bound` field.
macro_rules! tail_node {
    ($($tail:ty),* $(,)?) => {$(
        impl $crate::value::Describe for $tail {
            fn ty(&self) -> &$crate::types::Type {
                self.bound.ty()
            }

            fn repr(&self, r: &mut $crate::repr::Repr<'_>) -> ::std::fmt::Result {
                self.bound.repr(r)
            }
        }
    )*};
}

pub(crate) use tail_node;

#[cfg(test)]
mod tests {
    use super::node_name;

    #[test]
    fn node_names_capitalize_and_count() {
        assert_eq!(node_name("add", 2), "Add2");
        assert_eq!(node_name("zipwith", 0), "Zipwith0");
    }
}

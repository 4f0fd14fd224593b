//! Structural types: unknowns, numbers, strings, lists/tuples and functions.
//!
//! Strings and lists carry a finiteness flag. `applied` propagates it through
//! function application together with the named unknowns.

mod parse;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Unknown,
    Num,
    Str,
    Lst,
    Fun,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Unknown => "Unknown",
            Kind::Num => "Num",
            Kind::Str => "Str",
            Kind::Lst => "Lst",
            Kind::Fun => "Fun",
        })
    }
}

/// `PartialEq` is structural identity (flags included); the weaker
/// compatibility check used when binding arguments is [`Type::equals`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Unknown(String),
    Num,
    Str {
        infinite: bool,
    },
    Lst {
        has: Vec<Type>,
        infinite: bool,
        tuple: bool,
    },
    Fun(Box<Type>, Box<Type>),
}

impl Type {
    pub fn unk(name: impl Into<String>) -> Self {
        Type::Unknown(name.into())
    }

    pub fn num() -> Self {
        Type::Num
    }

    pub fn str(infinite: bool) -> Self {
        Type::Str { infinite }
    }

    pub fn lst(has: Vec<Type>, infinite: bool) -> Self {
        Type::Lst {
            has,
            infinite,
            tuple: false,
        }
    }

    pub fn tuple(has: Vec<Type>) -> Self {
        Type::Lst {
            has,
            infinite: false,
            tuple: true,
        }
    }

    pub fn fun(from: Type, to: Type) -> Self {
        Type::Fun(Box::new(from), Box::new(to))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Unknown(_) => Kind::Unknown,
            Type::Num => Kind::Num,
            Type::Str { .. } => Kind::Str,
            Type::Lst { .. } => Kind::Lst,
            Type::Fun(..) => Kind::Fun,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Type::Unknown(name) => Some(name),
            _ => None,
        }
    }

    /// Element types of a list or tuple, empty for anything else.
    pub fn has(&self) -> &[Type] {
        match self {
            Type::Lst { has, .. } => has,
            _ => &[],
        }
    }

    pub fn from(&self) -> Option<&Type> {
        self.split_fun().map(|(from, _)| from)
    }

    pub fn to(&self) -> Option<&Type> {
        self.split_fun().map(|(_, to)| to)
    }

    pub fn split_fun(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::Fun(from, to) => Some((from, to)),
            _ => None,
        }
    }

    /// Only strings and lists can be infinite; every other kind reads as finite.
    pub fn is_infinite(&self) -> bool {
        match self {
            Type::Str { infinite } | Type::Lst { infinite, .. } => *infinite,
            _ => false,
        }
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Type::Lst { tuple: true, .. })
    }

    pub fn with_infinite(self, infinite: bool) -> Self {
        match self {
            Type::Str { .. } => Type::Str { infinite },
            Type::Lst { has, tuple, .. } => Type::Lst {
                has,
                infinite,
                tuple,
            },
            other => other,
        }
    }

    /// Number of arguments this type accepts before yielding a non-function.
    pub fn arity(&self) -> usize {
        match self {
            Type::Fun(_, to) => 1 + to.arity(),
            _ => 0,
        }
    }

    pub fn is_concrete(&self) -> bool {
        match self {
            Type::Unknown(_) => false,
            Type::Num | Type::Str { .. } => true,
            Type::Lst { has, .. } => has.iter().all(Type::is_concrete),
            Type::Fun(from, to) => from.is_concrete() && to.is_concrete(),
        }
    }

    /// Appends `_<owner>` to every unknown name. Formatting only shows the
    /// part before the first `_`, so this keeps two builtins' variables apart
    /// without changing how they print.
    pub fn qualified(&self, owner: &str) -> Type {
        match self {
            Type::Unknown(name) => Type::Unknown(format!("{name}_{owner}")),
            Type::Num => Type::Num,
            Type::Str { infinite } => Type::Str {
                infinite: *infinite,
            },
            Type::Lst {
                has,
                infinite,
                tuple,
            } => Type::Lst {
                has: has.iter().map(|it| it.qualified(owner)).collect(),
                infinite: *infinite,
                tuple: *tuple,
            },
            Type::Fun(from, to) => Type::fun(from.qualified(owner), to.qualified(owner)),
        }
    }

    /// Compatibility: unknowns act as wildcards, bound on first encounter.
    ///
    /// Not transitive, and ignores finiteness. A list with no element types
    /// (`[_mixed]`) is compatible with any list.
    pub fn equals(&self, other: &Type) -> bool {
        let mut known = HashMap::new();
        compatible(&mut known, self, other)
    }

    /// Return type of `self` (a function) once given an argument of type `arg`.
    ///
    /// Unknowns of the parameter are bound to the matching parts of `arg`
    /// (first occurrence wins, no occurs-check) and substituted in the return
    /// type; whatever stays unbound is kept as is. String and list flags of the
    /// return type are all rewritten from a single tracked finiteness, which
    /// starts infinite and takes the flag of the argument at the last infinite
    /// string/list position of the parameter. Tuples are always finite.
    pub fn applied(&self, arg: &Type) -> Result<Type> {
        let (from, to) = self.split_fun().ok_or_else(|| Error::TypeMismatch {
            from: self.clone(),
            to: Type::fun(Type::unk("a"), Type::unk("b")),
        })?;
        let mut bindings = Bindings::new();
        bindings.find(arg, from);
        Ok(bindings.build(to))
    }

    /// This type with its unknowns replaced by the matching parts of
    /// `concrete`. The flags are this type's own.
    pub fn instantiated(&self, concrete: &Type) -> Type {
        let mut bindings = Bindings::new();
        bindings.collect(concrete, self);
        bindings.substitute(self)
    }

    pub fn parse(text: &str) -> Result<Type> {
        parse::parse_named(text).map(|(_, ty)| ty)
    }

    /// Like [`Type::parse`], also returning the `name ::` prefix if any.
    pub fn parse_named(text: &str) -> Result<(Option<String>, Type)> {
        parse::parse_named(text)
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Type::parse(s)
    }
}

fn compatible(known: &mut HashMap<String, Type>, a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Unknown(x), Type::Unknown(y)) => {
            if x == y {
                return true;
            }
            if let Some(bound) = known.get(x).cloned() {
                return compatible(known, &bound, b);
            }
            if let Some(bound) = known.get(y).cloned() {
                return compatible(known, a, &bound);
            }
            known.insert(x.clone(), b.clone());
            true
        }
        (Type::Unknown(x), _) => match known.get(x).cloned() {
            Some(bound) => compatible(known, &bound, b),
            None => {
                known.insert(x.clone(), b.clone());
                true
            }
        },
        (_, Type::Unknown(y)) => match known.get(y).cloned() {
            Some(bound) => compatible(known, a, &bound),
            None => {
                known.insert(y.clone(), a.clone());
                true
            }
        },
        (Type::Num, Type::Num) | (Type::Str { .. }, Type::Str { .. }) => true,
        (Type::Lst { has: ha, .. }, Type::Lst { has: hb, .. }) => {
            if ha.is_empty() || hb.is_empty() {
                return true;
            }
            ha.len() == hb.len()
                && ha
                    .iter()
                    .zip(hb.iter())
                    .all(|(x, y)| compatible(known, x, y))
        }
        (Type::Fun(af, at), Type::Fun(bf, bt)) => {
            compatible(known, af, bf) && compatible(known, at, bt)
        }
        _ => false,
    }
}

struct Bindings {
    known: HashMap<String, Type>,
    infinite: bool,
}

impl Bindings {
    fn new() -> Self {
        Self {
            known: HashMap::new(),
            infinite: true,
        }
    }

    fn bind(&mut self, name: &str, concrete: &Type) {
        if !self.known.contains_key(name) {
            self.known.insert(name.to_string(), concrete.clone());
        }
    }

    fn find(&mut self, concrete: &Type, formal: &Type) {
        match formal {
            Type::Unknown(name) => self.bind(name, concrete),
            Type::Num => {}
            Type::Str { infinite } => self.track(*infinite, concrete),
            Type::Lst { has, infinite, .. } => {
                for (formal_item, concrete_item) in has.iter().zip(concrete.has()) {
                    self.find(concrete_item, formal_item);
                }
                self.track(*infinite, concrete);
            }
            Type::Fun(from, to) => {
                if let Some((concrete_from, concrete_to)) = concrete.split_fun() {
                    self.find(concrete_from, from);
                    self.find(concrete_to, to);
                }
            }
        }
    }

    fn track(&mut self, formal_infinite: bool, concrete: &Type) {
        if formal_infinite {
            self.infinite = concrete.is_infinite();
        }
    }

    fn build(&self, formal: &Type) -> Type {
        match formal {
            Type::Unknown(name) => self
                .known
                .get(name)
                .cloned()
                .unwrap_or_else(|| formal.clone()),
            Type::Num => Type::Num,
            Type::Str { .. } => Type::Str {
                infinite: self.infinite,
            },
            Type::Lst { has, tuple, .. } => Type::Lst {
                has: has.iter().map(|it| self.build(it)).collect(),
                infinite: !tuple && self.infinite,
                tuple: *tuple,
            },
            Type::Fun(from, to) => Type::fun(self.build(from), self.build(to)),
        }
    }

    fn collect(&mut self, concrete: &Type, formal: &Type) {
        match formal {
            Type::Unknown(name) => self.bind(name, concrete),
            Type::Num | Type::Str { .. } => {}
            Type::Lst { has, .. } => {
                for (formal_item, concrete_item) in has.iter().zip(concrete.has()) {
                    self.collect(concrete_item, formal_item);
                }
            }
            Type::Fun(from, to) => {
                if let Some((concrete_from, concrete_to)) = concrete.split_fun() {
                    self.collect(concrete_from, from);
                    self.collect(concrete_to, to);
                }
            }
        }
    }

    fn substitute(&self, formal: &Type) -> Type {
        match formal {
            Type::Unknown(name) => self
                .known
                .get(name)
                .cloned()
                .unwrap_or_else(|| formal.clone()),
            Type::Lst {
                has,
                infinite,
                tuple,
            } => Type::Lst {
                has: has.iter().map(|it| self.substitute(it)).collect(),
                infinite: *infinite,
                tuple: *tuple,
            },
            Type::Fun(from, to) => Type::fun(self.substitute(from), self.substitute(to)),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unknown(name) => match name.find('_') {
                Some(at) => f.write_str(&name[..at])?,
                None => f.write_str(name)?,
            },
            Type::Num => f.write_str("Num")?,
            Type::Str { .. } => f.write_str("Str")?,
            Type::Lst { has, tuple, .. } => {
                if has.is_empty() {
                    f.write_str("[_mixed]")?;
                } else {
                    let (open, close) = if *tuple { ("(", ")") } else { ("[", "]") };
                    f.write_str(open)?;
                    for (k, item) in has.iter().enumerate() {
                        if 0 < k {
                            f.write_str(", ")?;
                        }
                        write!(f, "{item}")?;
                    }
                    f.write_str(close)?;
                }
            }
            Type::Fun(from, to) => {
                if let Type::Fun(..) = **from {
                    write!(f, "({from}) -> {to}")?;
                } else {
                    write!(f, "{from} -> {to}")?;
                }
            }
        }
        if self.is_infinite() {
            f.write_str("*")?;
        }
        Ok(())
    }
}

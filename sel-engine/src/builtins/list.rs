use std::cell::OnceCell;
use std::io::Write;

use super::Module;
use crate::coerce::coerce;
use crate::curry::{builtin, tail_node, Bound, Builtin};
use crate::error::{Error, Result};
use crate::types::{Kind, Type};
use crate::value::{Fun, Lst, Num, Str, Value};

const LIST_BUILTINS: &[Builtin] = &[
    builtin(
        "map",
        "(a -> b) -> [a]* -> [b]*",
        2,
        "make a new list by applying a function to each item of a list",
        map,
    ),
    builtin("repeat", "a -> [a]*", 1, "an endless list of copies of the same value", repeat),
    builtin(
        "zipwith",
        "(a -> b -> c) -> [a]* -> [b]* -> [c]*",
        3,
        "make a new list by applying a binary function to the items of two lists side by side; \
         stops at the end of the shorter one",
        zipwith,
    ),
    builtin("take", "Num -> [a]* -> [a]*", 2, "only the first items of a list, or fewer", take),
    builtin("drop", "Num -> [a]* -> [a]*", 2, "every item of a list but the first ones", drop),
    builtin("head", "[a] -> a", 1, "the first item of a list", head),
    builtin("last", "[a] -> a", 1, "the last item of a list", last),
    builtin("tail", "[a] -> [a]", 1, "every item of a list but the first", tail),
    builtin("init", "[a] -> [a]", 1, "every item of a list but the last", init),
    builtin("reverse", "[a] -> [a]", 1, "the items of a list in reverse order", reverse),
    builtin("index", "[a] -> Num -> a", 2, "the item of a list at the given position", index),
];

pub(super) const MODULE: Module = Module {
    name: "list",
    doc: "Lazy list traversal, slicing and element access.",
    builtins: LIST_BUILTINS,
};

fn past_end() -> Error {
    Error::runtime("dereferenced a list past its end")
}

struct Map {
    bound: Bound,
}

tail_node!(Map);

impl Lst for Map {
    fn current(&mut self) -> Result<Value> {
        let item = self.bound.lst(1)?.current()?;
        self.bound.fun(0)?.apply(item)
    }

    fn advance(&mut self) -> Result<()> {
        self.bound.lst(1)?.advance()
    }

    fn end(&mut self) -> Result<bool> {
        self.bound.lst(1)?.end()
    }

    fn rewind(&mut self) -> Result<()> {
        self.bound.lst(1)?.rewind()
    }

    fn count(&mut self) -> Result<usize> {
        self.bound.lst(1)?.count()
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Map {
            bound: self.bound.copy(),
        })
    }
}

fn map(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Map { bound }))
}

struct Repeat {
    bound: Bound,
}

tail_node!(Repeat);

impl Lst for Repeat {
    fn current(&mut self) -> Result<Value> {
        Ok(self.bound.arg(0)?.copy())
    }

    fn advance(&mut self) -> Result<()> {
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn rewind(&mut self) -> Result<()> {
        Ok(())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Repeat {
            bound: self.bound.copy(),
        })
    }
}

fn repeat(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Repeat { bound }))
}

struct ZipWith {
    bound: Bound,
}

tail_node!(ZipWith);

impl Lst for ZipWith {
    fn current(&mut self) -> Result<Value> {
        let left = self.bound.lst(1)?.current()?;
        let right = self.bound.lst(2)?.current()?;
        self.bound.fun(0)?.apply(left)?.apply(right)
    }

    fn advance(&mut self) -> Result<()> {
        self.bound.lst(1)?.advance()?;
        self.bound.lst(2)?.advance()
    }

    fn end(&mut self) -> Result<bool> {
        Ok(self.bound.lst(1)?.end()? || self.bound.lst(2)?.end()?)
    }

    fn rewind(&mut self) -> Result<()> {
        self.bound.lst(1)?.rewind()?;
        self.bound.lst(2)?.rewind()
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(ZipWith {
            bound: self.bound.copy(),
        })
    }
}

fn zipwith(bound: Bound) -> Result<Value> {
    Ok(Value::lst(ZipWith { bound }))
}

/// Reads a count argument: its integer part, negatives as zero.
fn count_arg(bound: &mut Bound, k: usize) -> Result<usize> {
    let n = bound.num(k)?.value()?;
    Ok(n.max(0.0) as usize)
}

struct Take {
    bound: Bound,
    limit: Option<usize>,
    at: usize,
}

tail_node!(Take);

impl Take {
    fn limit(&mut self) -> Result<usize> {
        if let Some(limit) = self.limit {
            return Ok(limit);
        }
        let limit = count_arg(&mut self.bound, 0)?;
        self.limit = Some(limit);
        Ok(limit)
    }
}

impl Lst for Take {
    fn current(&mut self) -> Result<Value> {
        if self.end()? {
            return Err(past_end());
        }
        self.bound.lst(1)?.current()
    }

    fn advance(&mut self) -> Result<()> {
        self.bound.lst(1)?.advance()?;
        self.at += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        Ok(self.limit()? <= self.at || self.bound.lst(1)?.end()?)
    }

    fn rewind(&mut self) -> Result<()> {
        self.bound.lst(1)?.rewind()?;
        self.at = 0;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Take {
            bound: self.bound.copy(),
            limit: self.limit,
            at: 0,
        })
    }
}

fn take(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Take {
        bound,
        limit: None,
        at: 0,
    }))
}

struct Skip {
    bound: Bound,
    skipped: bool,
}

tail_node!(Skip);

impl Skip {
    fn skip(&mut self) -> Result<&mut (dyn Lst + 'static)> {
        if !self.skipped {
            let n = count_arg(&mut self.bound, 0)?;
            let source = self.bound.lst(1)?;
            for _ in 0..n {
                if source.end()? {
                    break;
                }
                source.advance()?;
            }
            self.skipped = true;
        }
        self.bound.lst(1)
    }
}

impl Lst for Skip {
    fn current(&mut self) -> Result<Value> {
        self.skip()?.current()
    }

    fn advance(&mut self) -> Result<()> {
        self.skip()?.advance()
    }

    fn end(&mut self) -> Result<bool> {
        self.skip()?.end()
    }

    fn rewind(&mut self) -> Result<()> {
        self.bound.lst(1)?.rewind()?;
        self.skipped = false;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Skip {
            bound: self.bound.copy(),
            skipped: false,
        })
    }
}

fn drop(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Skip {
        bound,
        skipped: false,
    }))
}

type PickFn = fn(&mut Bound) -> Result<Value>;

/// Tail standing for one item of a list, found on first use.
///
/// When the item kind is not known from the type, the tail is a string and
/// hands out the number it was picked as through `take_num`.
struct Pick<T: ?Sized> {
    bound: Bound,
    pick: PickFn,
    picked: Option<Box<T>>,
}

fn picked(bound: Bound, pick: PickFn) -> Result<Value> {
    match bound.ty().kind() {
        Kind::Num => Ok(Value::Num(Box::new(Pick::<dyn Num>::new(bound, pick)))),
        Kind::Str | Kind::Unknown => {
            Ok(Value::Str(Box::new(Pick::<dyn Str>::new(bound, pick))))
        }
        Kind::Lst => Ok(Value::Lst(Box::new(Pick::<dyn Lst>::new(bound, pick)))),
        Kind::Fun => Ok(Value::fun(PickFun::new(bound, pick))),
    }
}

/// What the picked item is coerced to before it is handed out.
fn pick_target(ty: &Type) -> Type {
    match ty {
        Type::Unknown(_) => Type::str(false),
        ty => ty.clone(),
    }
}

impl<T: ?Sized> Pick<T> {
    fn new(bound: Bound, pick: PickFn) -> Self {
        Self {
            bound,
            pick,
            picked: None,
        }
    }

    fn restarted(&self) -> Self {
        Self::new(self.bound.copy(), self.pick)
    }
}

macro_rules! pick_kind {
    ($($kind:ident => $into:ident),* $(,)?) => {$(
        tail_node!(Pick<dyn $kind>);

        impl Pick<dyn $kind> {
            fn get(&mut self) -> Result<&mut (dyn $kind + 'static)> {
                if self.picked.is_none() {
                    let item = (self.pick)(&mut self.bound)?;
                    let target = pick_target(self.bound.ty());
                    self.picked = Some(coerce(item, &target)?.$into()?);
                }
                self.picked.as_deref_mut().ok_or_else(past_end)
            }
        }
    )*};
}

pick_kind! {
    Num => into_num,
    Str => into_str,
    Lst => into_lst,
}

/// Function item of a list, picked from a copy of the arguments on the first
/// application.
struct PickFun {
    bound: Bound,
    pick: PickFn,
    picked: OnceCell<Box<dyn Fun>>,
}

tail_node!(PickFun);

impl PickFun {
    fn new(bound: Bound, pick: PickFn) -> Self {
        Self {
            bound,
            pick,
            picked: OnceCell::new(),
        }
    }
}

impl Fun for PickFun {
    fn apply(&self, arg: Value) -> Result<Value> {
        if self.picked.get().is_none() {
            let mut bound = self.bound.copy();
            let item = (self.pick)(&mut bound)?;
            let fun = coerce(item, self.bound.ty())?.into_fun()?;
            let _ = self.picked.set(fun);
        }
        self.picked.get().ok_or_else(past_end)?.apply(arg)
    }

    fn copy(&self) -> Box<dyn Fun> {
        Box::new(PickFun::new(self.bound.copy(), self.pick))
    }
}

impl Num for Pick<dyn Num> {
    fn value(&mut self) -> Result<f64> {
        self.get()?.value()
    }

    fn copy(&self) -> Box<dyn Num> {
        Box::new(self.restarted())
    }
}

impl Str for Pick<dyn Str> {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        self.get()?.stream(out)
    }

    fn end(&mut self) -> Result<bool> {
        self.get()?.end()
    }

    fn entire(&mut self, out: &mut dyn Write) -> Result<()> {
        self.get()?.entire(out)
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(self.restarted())
    }

    fn take_num(&mut self) -> Option<Box<dyn Num>> {
        self.get().ok()?.take_num()
    }
}

impl Lst for Pick<dyn Lst> {
    fn current(&mut self) -> Result<Value> {
        self.get()?.current()
    }

    fn advance(&mut self) -> Result<()> {
        self.get()?.advance()
    }

    fn end(&mut self) -> Result<bool> {
        self.get()?.end()
    }

    fn rewind(&mut self) -> Result<()> {
        self.get()?.rewind()
    }

    fn count(&mut self) -> Result<usize> {
        self.get()?.count()
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(self.restarted())
    }
}

fn head(bound: Bound) -> Result<Value> {
    picked(bound, |b| {
        let source = b.lst(0)?;
        if source.end()? {
            return Err(Error::runtime("head of an empty list"));
        }
        source.current()
    })
}

fn last(bound: Bound) -> Result<Value> {
    picked(bound, |b| {
        let source = b.lst(0)?;
        let mut last = None;
        while let Some(item) = source.next_value()? {
            last = Some(item);
        }
        last.ok_or_else(|| Error::runtime("last of an empty list"))
    })
}

fn index(bound: Bound) -> Result<Value> {
    picked(bound, |b| {
        let n = b.num(1)?.value()?;
        if n < 0.0 {
            return Err(Error::runtime(format!("index {n} is negative")));
        }
        let source = b.lst(0)?;
        for _ in 0..n as usize {
            if source.end()? {
                break;
            }
            source.advance()?;
        }
        if source.end()? {
            return Err(Error::runtime(format!("index {n} is out of range")));
        }
        source.current()
    })
}

/// Every item but the first.
struct Rest {
    bound: Bound,
    started: bool,
}

tail_node!(Rest);

impl Rest {
    fn start(&mut self) -> Result<&mut (dyn Lst + 'static)> {
        if !self.started {
            let source = self.bound.lst(0)?;
            if source.end()? {
                return Err(Error::runtime("tail of an empty list"));
            }
            source.advance()?;
            self.started = true;
        }
        self.bound.lst(0)
    }
}

impl Lst for Rest {
    fn current(&mut self) -> Result<Value> {
        self.start()?.current()
    }

    fn advance(&mut self) -> Result<()> {
        self.start()?.advance()
    }

    fn end(&mut self) -> Result<bool> {
        self.start()?.end()
    }

    fn rewind(&mut self) -> Result<()> {
        self.bound.lst(0)?.rewind()?;
        self.started = false;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Rest {
            bound: self.bound.copy(),
            started: false,
        })
    }
}

fn tail(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Rest {
        bound,
        started: false,
    }))
}

/// Every item but the last: one item is held back until the next one shows.
struct Init {
    bound: Bound,
    held: Option<Value>,
    started: bool,
}

tail_node!(Init);

impl Init {
    fn start(&mut self) -> Result<()> {
        if !self.started {
            let source = self.bound.lst(0)?;
            let first = source
                .next_value()?
                .ok_or_else(|| Error::runtime("init of an empty list"))?;
            self.held = Some(first);
            self.started = true;
        }
        Ok(())
    }
}

impl Lst for Init {
    fn current(&mut self) -> Result<Value> {
        if self.end()? {
            return Err(past_end());
        }
        self.held.as_ref().map(Value::copy).ok_or_else(past_end)
    }

    fn advance(&mut self) -> Result<()> {
        self.start()?;
        self.held = self.bound.lst(0)?.next_value()?;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.start()?;
        Ok(self.held.is_none() || self.bound.lst(0)?.end()?)
    }

    fn rewind(&mut self) -> Result<()> {
        self.bound.lst(0)?.rewind()?;
        self.held = None;
        self.started = false;
        Ok(())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Init {
            bound: self.bound.copy(),
            held: None,
            started: false,
        })
    }
}

fn init(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Init {
        bound,
        held: None,
        started: false,
    }))
}

struct Reverse {
    bound: Bound,
    items: Option<Vec<Value>>,
    at: usize,
}

tail_node!(Reverse);

impl Reverse {
    fn items(&mut self) -> Result<&[Value]> {
        if self.items.is_none() {
            let source = self.bound.lst(0)?;
            let mut items = Vec::new();
            while let Some(item) = source.next_value()? {
                items.push(item);
            }
            items.reverse();
            self.items = Some(items);
        }
        Ok(self.items.as_deref().unwrap_or_default())
    }
}

impl Lst for Reverse {
    fn current(&mut self) -> Result<Value> {
        let at = self.at;
        self.items()?.get(at).map(Value::copy).ok_or_else(past_end)
    }

    fn advance(&mut self) -> Result<()> {
        self.at += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        let at = self.at;
        Ok(self.items()?.len() <= at)
    }

    fn rewind(&mut self) -> Result<()> {
        self.at = 0;
        Ok(())
    }

    fn count(&mut self) -> Result<usize> {
        Ok(self.items()?.len())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Reverse {
            bound: self.bound.copy(),
            items: None,
            at: 0,
        })
    }
}

fn reverse(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Reverse {
        bound,
        items: None,
        at: 0,
    }))
}

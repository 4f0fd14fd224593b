use super::Module;
use crate::curry::{builtin, tail_node, Bound, Builtin};
use crate::error::Result;
use crate::value::{Fun, Value};

const FUNC_BUILTINS: &[Builtin] = &[
    builtin("const", "a -> b -> a", 1, "a function always giving back the same value", const_),
    builtin("id", "a -> a", 1, "the value itself", id),
    builtin(
        "flip",
        "(a -> b -> c) -> b -> a -> c",
        2,
        "a binary function with its two arguments swapped",
        flip,
    ),
];

pub(super) const MODULE: Module = Module {
    name: "func",
    doc: "Combinators over functions.",
    builtins: FUNC_BUILTINS,
};

/// `const x`: ignores its argument and gives a copy of `x`.
struct Const {
    bound: Bound,
}

tail_node!(Const);

impl Fun for Const {
    fn apply(&self, _ignored: Value) -> Result<Value> {
        Ok(self.bound.arg(0)?.copy())
    }

    fn copy(&self) -> Box<dyn Fun> {
        Box::new(Const {
            bound: self.bound.copy(),
        })
    }
}

fn const_(bound: Bound) -> Result<Value> {
    Ok(Value::fun(Const { bound }))
}

fn id(bound: Bound) -> Result<Value> {
    bound.into_arg(0)
}

/// `flip f y`: applying `x` gives `f x y`.
struct Flip {
    bound: Bound,
}

tail_node!(Flip);

impl Fun for Flip {
    fn apply(&self, arg: Value) -> Result<Value> {
        let second = self.bound.arg(1)?.copy();
        self.bound.fun(0)?.apply(arg)?.apply(second)
    }

    fn copy(&self) -> Box<dyn Fun> {
        Box::new(Flip {
            bound: self.bound.copy(),
        })
    }
}

fn flip(bound: Bound) -> Result<Value> {
    Ok(Value::fun(Flip { bound }))
}

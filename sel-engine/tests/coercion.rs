use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use sel_engine::{
    coerce, read_all, Describe, Error, Kind, Lst, LstLiteral, Num, NumLiteral, Registry, Repr,
    Result, StrChunks, StrLiteral, Type, Value,
};

static NUM: Type = Type::Num;

/// A number counting how many times it was asked for its value.
struct CountingNum {
    n: f64,
    reads: Rc<Cell<usize>>,
}

impl Describe for CountingNum {
    fn ty(&self) -> &Type {
        &NUM
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(self.ty(), "CountingNum", Vec::new())
    }
}

impl Num for CountingNum {
    fn value(&mut self) -> Result<f64> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.n)
    }

    fn copy(&self) -> Box<dyn Num> {
        Box::new(CountingNum {
            n: self.n,
            reads: Rc::clone(&self.reads),
        })
    }
}

fn text(mut value: Value) -> anyhow::Result<String> {
    Ok(String::from_utf8(read_all(value.as_str()?)?)?)
}

fn texts(mut value: Value) -> anyhow::Result<Vec<String>> {
    let list = value.as_lst()?;
    let mut out = Vec::new();
    while let Some(item) = list.next_value()? {
        out.push(text(item)?);
    }
    Ok(out)
}

fn nums(items: &[f64]) -> Value {
    Value::lst(LstLiteral::from_items(
        items
            .iter()
            .map(|&n| Value::num(NumLiteral::new(n)))
            .collect(),
    ))
}

#[test]
fn number_round_trip_never_formats() -> anyhow::Result<()> {
    let reads = Rc::new(Cell::new(0));
    let source = Value::num(CountingNum {
        n: 5.0,
        reads: Rc::clone(&reads),
    });

    let as_text = coerce(source, &Type::str(false))?;
    assert_eq!(as_text.kind(), Kind::Str);
    let mut back = coerce(as_text, &Type::Num)?;
    assert_eq!(reads.get(), 0);

    assert_eq!(back.as_num()?.value()?, 5.0);
    assert_eq!(reads.get(), 1);
    Ok(())
}

#[test]
fn rendering_waits_for_the_first_pull() -> anyhow::Result<()> {
    let reads = Rc::new(Cell::new(0));
    let as_text = coerce(
        Value::num(CountingNum {
            n: 0.5,
            reads: Rc::clone(&reads),
        }),
        &Type::str(false),
    )?;
    assert_eq!(reads.get(), 0);
    assert_eq!(text(as_text)?, "0.5");
    assert_eq!(reads.get(), 1);
    Ok(())
}

#[test]
fn plain_text_does_not_become_a_number() {
    let err = coerce(Value::str(StrLiteral::new("42")), &Type::Num).unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }));
    assert_eq!(err.to_string(), "cannot coerce from Str to Num");
}

#[test]
fn same_kind_and_unknown_targets_are_untouched() -> anyhow::Result<()> {
    let value = coerce(Value::num(NumLiteral::new(1.0)), &Type::unk("a"))?;
    assert_eq!(value.repr(true), "<Num> NumLiteral { n= 1 }");

    let value = coerce(Value::str(StrLiteral::new("x")), &Type::str(true))?;
    assert_eq!(value.repr(true), "<Str> StrLiteral { s= \"x\" }");
    Ok(())
}

#[test]
fn text_splits_into_graphemes() -> anyhow::Result<()> {
    let input: &[u8] = b"a\xe3\x81\xb5b\r\nc\xf0\x9f\x8f\xb3\xe2\x80\x8d\xe2\x9a\xa7d";
    let expected = ["a", "ふ", "b", "\r\n", "c", "🏳\u{200d}⚧", "d"];

    let whole = coerce(Value::str(StrLiteral::new(input)), &Type::lst(vec![Type::str(false)], false))?;
    assert_eq!(whole.ty().to_string(), "[Str]");
    assert_eq!(texts(whole)?, expected);

    let bytewise = StrChunks::new(input.iter().map(|&b| vec![b]).collect());
    let split = coerce(Value::str(bytewise), &Type::lst(vec![Type::str(false)], false))?;
    assert_eq!(texts(split)?, expected);
    Ok(())
}

#[test]
fn empty_text_is_an_empty_list() -> anyhow::Result<()> {
    let mut list = coerce(Value::str(StrLiteral::new("")), &Type::lst(vec![Type::unk("a")], true))?;
    assert!(list.as_lst()?.end()?);
    Ok(())
}

#[test]
fn lists_join_by_depth() -> anyhow::Result<()> {
    let flat = coerce(nums(&[1.0, 2.0, 3.0]), &Type::str(false))?;
    assert_eq!(text(flat)?, "1 2 3");

    let nested = Value::lst(LstLiteral::from_items(vec![nums(&[1.0, 2.0]), nums(&[3.0])]));
    assert_eq!(nested.ty().to_string(), "[[Num]]");
    assert_eq!(text(coerce(nested, &Type::str(false))?)?, "1 2\n3");

    let deep = Value::lst(LstLiteral::from_items(vec![
        Value::lst(LstLiteral::from_items(vec![nums(&[1.0])])),
        Value::lst(LstLiteral::from_items(vec![nums(&[2.0])])),
    ]));
    assert_eq!(text(coerce(deep, &Type::str(false))?)?, "1\n\n2");
    Ok(())
}

#[test]
fn list_elements_follow_the_target_type() -> anyhow::Result<()> {
    let target = Type::lst(vec![Type::str(false)], false);
    let mapped = coerce(nums(&[1.0, 2.5]), &target)?;
    assert_eq!(mapped.ty(), &target);
    assert_eq!(texts(mapped)?, ["1", "2.5"]);
    Ok(())
}

#[test]
fn list_coercion_cycles_through_element_types() -> anyhow::Result<()> {
    let target = Type::tuple(vec![Type::str(false), Type::Num]);
    let mut mapped = coerce(nums(&[1.0, 2.0, 3.0]), &target)?;
    let list = mapped.as_lst()?;

    let kinds: Vec<Kind> = std::iter::from_fn(|| list.next_value().ok().flatten())
        .map(|item| item.kind())
        .collect();
    assert_eq!(kinds, [Kind::Str, Kind::Num, Kind::Str]);
    Ok(())
}

#[test]
fn mapped_list_copies_restart_the_cycle() -> anyhow::Result<()> {
    let target = Type::tuple(vec![Type::str(false), Type::Num]);
    let mut mapped = coerce(nums(&[1.0, 2.0, 3.0]), &target)?;
    let list = mapped.as_lst()?;
    list.advance()?;
    assert_eq!(list.current()?.kind(), Kind::Num);

    let mut fresh = list.copy();
    let kinds: Vec<Kind> = std::iter::from_fn(|| fresh.next_value().ok().flatten())
        .map(|item| item.kind())
        .collect();
    assert_eq!(kinds, [Kind::Str, Kind::Num, Kind::Str]);
    Ok(())
}

#[test]
fn matching_lists_are_not_wrapped() -> anyhow::Result<()> {
    let list = coerce(nums(&[1.0]), &Type::lst(vec![Type::unk("a")], false))?;
    assert!(list.repr(true).starts_with("<[Num]> LstLiteral"));
    Ok(())
}

#[test]
fn functions_and_numbers_do_not_mix() -> anyhow::Result<()> {
    let registry = Registry::with_builtins()?;
    let abs = registry.lookup_name("abs").expect("abs is a builtin");
    assert!(matches!(
        coerce(abs, &Type::Num),
        Err(Error::Coercion { .. })
    ));
    assert!(coerce(Value::num(NumLiteral::new(1.0)), &Type::lst(vec![Type::Num], false)).is_err());
    Ok(())
}

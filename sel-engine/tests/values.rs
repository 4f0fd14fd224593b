use std::cell::RefCell;
use std::io::{self, BufReader, Cursor, Write};
use std::rc::Rc;

use sel_engine::{
    define, read_all, Describe, FunChain, Input, Kind, Lst, LstLiteral, NumLiteral, Output,
    Registry, Str, StrChunks, StrLiteral, Value,
};

/// Writer whose bytes stay readable after being moved into an `Output`.
#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn text(mut value: Value) -> anyhow::Result<String> {
    let bytes = read_all(value.as_str()?)?;
    Ok(String::from_utf8(bytes)?)
}

fn numbers(list: &mut dyn Lst) -> anyhow::Result<Vec<f64>> {
    let mut out = Vec::new();
    while let Some(mut item) = list.next_value()? {
        out.push(item.as_num()?.value()?);
    }
    Ok(out)
}

fn num_list(items: &[f64]) -> LstLiteral {
    LstLiteral::from_items(
        items
            .iter()
            .map(|&n| Value::num(NumLiteral::new(n)))
            .collect(),
    )
}

#[test]
fn literals_render_their_contents() {
    assert_eq!(
        Value::num(NumLiteral::new(42.1)).repr(false),
        "<Num> NumLiteral { n= 42.1 }"
    );
    assert_eq!(
        Value::str(StrLiteral::new("coucou")).repr(false),
        "<Str> StrLiteral { s= \"coucou\" }"
    );
}

#[test]
fn list_literal_spreads_over_lines() {
    let list = Value::lst(num_list(&[1.0, 2.0]));
    assert_eq!(
        list.repr(false),
        "<[Num]> LstLiteral {\n   v[0]=<Num> NumLiteral { n= 1 }\n   v[1]=<Num> NumLiteral { n= 2 }\n}"
    );
    assert_eq!(
        list.repr(true),
        "<[Num]> LstLiteral { v[0]=<Num> NumLiteral { n= 1 } v[1]=<Num> NumLiteral { n= 2 } }"
    );
}

#[test]
fn list_literal_types() {
    assert_eq!(num_list(&[1.0, 2.0]).ty().to_string(), "[Num]");
    assert_eq!(num_list(&[]).ty().to_string(), "[_mixed]");

    let mixed = LstLiteral::from_items(vec![
        Value::num(NumLiteral::new(1.0)),
        Value::str(StrLiteral::new("one")),
    ]);
    assert_eq!(mixed.ty().to_string(), "[_mixed]");
}

#[test]
fn list_literal_rewinds_and_counts() -> anyhow::Result<()> {
    let mut list = num_list(&[3.0, 2.0, 1.0]);
    assert_eq!(numbers(&mut list)?, vec![3.0, 2.0, 1.0]);
    assert!(list.end()?);
    assert_eq!(list.count()?, 3);
    list.rewind()?;
    assert_eq!(numbers(&mut list)?, vec![3.0, 2.0, 1.0]);
    assert!(list.current().is_err());
    Ok(())
}

#[test]
fn empty_list_literal_ends_before_any_item() -> anyhow::Result<()> {
    let mut list = LstLiteral::from_items(Vec::new());
    assert_eq!(list.ty().to_string(), "[_mixed]");
    assert!(list.end()?);
    assert!(list.current().is_err());
    assert_eq!(list.count()?, 0);
    assert!(list.next_value()?.is_none());

    let mut pair = num_list(&[1.0, 2.0]);
    let mut pulled = 0;
    while !pair.end()? {
        pair.current()?;
        pair.advance()?;
        pulled += 1;
    }
    assert_eq!(pulled, 2);
    Ok(())
}

#[test]
fn copies_start_over() -> anyhow::Result<()> {
    let mut list = num_list(&[1.0, 2.0]);
    list.advance()?;
    let mut copy = list.copy();
    assert_eq!(numbers(copy.as_mut())?, vec![1.0, 2.0]);

    let mut chunks = StrChunks::new(vec![b"ab".to_vec(), b"cd".to_vec()]);
    let mut first = Vec::new();
    chunks.stream(&mut first)?;
    assert_eq!(first, b"ab");
    let copy = chunks.copy();
    assert_eq!(text(Value::Str(copy))?, "abcd");
    Ok(())
}

#[test]
fn definitions_forward_and_squeeze_docs() -> anyhow::Result<()> {
    let mut one = define("one", "  the\n number\tone ", Value::num(NumLiteral::new(1.0)));
    assert_eq!(one.kind(), Kind::Num);
    assert_eq!(one.as_num()?.value()?, 1.0);
    assert_eq!(
        one.repr(true),
        "<Num> NumDefine { name= \"one\" doc= \"the number one\" v=<Num> NumLiteral { n= 1 } }"
    );

    let copied = one.copy();
    assert!(copied.repr(true).starts_with("<Num> NumDefine"));
    Ok(())
}

#[test]
fn input_copies_share_what_was_read() -> anyhow::Result<()> {
    let reader = BufReader::with_capacity(2, Cursor::new(b"abcde".to_vec()));
    let mut input = Input::new(reader);
    assert_eq!(input.ty().to_string(), "Str*");
    let early = input.copy();

    let mut head = Vec::new();
    input.stream(&mut head)?;
    assert_eq!(head, b"ab");

    let late = input.copy();
    assert_eq!(text(Value::Str(late))?, "cde");

    let mut rest = Vec::new();
    input.entire(&mut rest)?;
    assert_eq!(rest, b"cde");
    assert!(input.end()?);

    assert_eq!(text(Value::Str(early))?, "abcde");
    Ok(())
}

#[test]
fn input_drops_bytes_every_copy_has_read() -> anyhow::Result<()> {
    let size = 1 << 20;
    let bytes: Vec<u8> = (0..size).map(|k| (k % 251) as u8).collect();
    let mut input = Input::new(BufReader::with_capacity(4096, Cursor::new(bytes.clone())));

    let mut sink = Vec::new();
    while sink.len() < size - 4096 {
        input.stream(&mut sink)?;
    }
    assert!(input.cached() <= 4096, "{} bytes cached", input.cached());

    let copy = read_all(&mut *input.copy())?;
    assert_eq!(copy, &bytes[sink.len()..]);
    assert!(input.cached() <= 4096, "{} bytes cached", input.cached());
    Ok(())
}

#[test]
fn output_drains_its_argument() -> anyhow::Result<()> {
    let sink = SharedBuffer::default();
    let output = Value::fun(Output::new(sink.clone()));
    assert_eq!(output.ty().to_string(), "Str -> ()");

    let result = output.apply(Value::num(NumLiteral::new(42.0)))?;
    assert_eq!(text(result)?, "");
    output.apply(Value::str(StrLiteral::new("!")))?;
    assert_eq!(sink.0.borrow().as_slice(), b"42!");
    Ok(())
}

#[test]
fn chains_compose_left_to_right() -> anyhow::Result<()> {
    assert!(FunChain::new(Vec::new()).is_err());

    let registry = Registry::with_builtins()?;
    let stage = |name: &str| -> anyhow::Result<_> {
        let value = registry
            .lookup_name(name)
            .ok_or_else(|| anyhow::anyhow!("missing {name}"))?;
        Ok(value.into_fun()?)
    };
    let chain = Value::fun(FunChain::new(vec![stage("tonum")?, stage("hex")?])?);
    assert_eq!(chain.ty().to_string(), "Str* -> Str");

    let result = chain.apply(Value::str(StrLiteral::new("255 apples")))?;
    assert_eq!(text(result)?, "ff");
    Ok(())
}

#[test]
fn only_functions_apply() {
    let number = Value::num(NumLiteral::new(1.0));
    assert!(number.apply(Value::num(NumLiteral::new(2.0))).is_err());
    assert!(number.as_fun().is_err());
}

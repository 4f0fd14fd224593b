use std::io::Write;

use super::{read_prefix, Module, NumTail};
use crate::coerce::{Joiner, TextCursor, Unit};
use crate::curry::{builtin, tail_node, Bound, Builtin};
use crate::error::{Error, Result};
use crate::value::{read_all, Lst, NumLiteral, Str, StrLiteral, Value};

const TEXT_BUILTINS: &[Builtin] = &[
    builtin("bytes", "Str* -> [Num]*", 1, "split a string into its bytes", bytes),
    builtin("unbytes", "[Num]* -> Str*", 1, "make a string out of a list of bytes", unbytes),
    builtin(
        "codepoints",
        "Str* -> [Num]*",
        1,
        "split a string into its Unicode code points",
        codepoints,
    ),
    builtin(
        "uncodepoints",
        "[Num]* -> Str*",
        1,
        "make a string out of a list of Unicode code points",
        uncodepoints,
    ),
    builtin(
        "graphemes",
        "Str* -> [Str]*",
        1,
        "split a string into its grapheme clusters",
        graphemes,
    ),
    builtin(
        "contains",
        "Str -> Str* -> Num",
        2,
        "1 when the first string occurs in the second, 0 otherwise",
        contains,
    ),
    builtin(
        "startswith",
        "Str -> Str* -> Num",
        2,
        "1 when the second string starts with the first, 0 otherwise",
        startswith,
    ),
    builtin(
        "endswith",
        "Str -> Str* -> Num",
        2,
        "1 when the second string ends with the first, 0 otherwise",
        endswith,
    ),
    builtin("prefix", "Str -> Str* -> Str*", 2, "put the first string in front of the second", prefix),
    builtin("suffix", "Str -> Str* -> Str*", 2, "put the first string after the second", suffix),
    builtin(
        "surround",
        "Str -> Str -> Str* -> Str*",
        3,
        "put the first string in front of the third and the second after it",
        surround,
    ),
    builtin(
        "split",
        "Str -> Str* -> [Str*]*",
        2,
        "break a string into the pieces found between occurrences of a separator; \
         an empty separator gives an endless list of empty strings",
        split,
    ),
    builtin(
        "join",
        "Str -> [Str*]* -> Str*",
        2,
        "make a string of the items of a list with a separator in between",
        join,
    ),
];

pub(super) const MODULE: Module = Module {
    name: "text",
    doc: "Strings as bytes, code points and graphemes; searching, affixing, splitting and joining.",
    builtins: TEXT_BUILTINS,
};

/// List of the bytes of its string argument, pulled chunk by chunk.
struct Bytes {
    bound: Bound,
    chunk: Vec<u8>,
    at: usize,
}

tail_node!(Bytes);

impl Bytes {
    fn fill(&mut self) -> Result<()> {
        while self.chunk.len() <= self.at {
            let source = self.bound.str(0)?;
            if source.end()? {
                break;
            }
            self.chunk.clear();
            self.at = 0;
            source.stream(&mut self.chunk)?;
        }
        Ok(())
    }
}

impl Lst for Bytes {
    fn current(&mut self) -> Result<Value> {
        self.fill()?;
        let byte = self
            .chunk
            .get(self.at)
            .ok_or_else(|| Error::runtime("dereferenced a list past its end"))?;
        Ok(Value::num(NumLiteral::new(f64::from(*byte))))
    }

    fn advance(&mut self) -> Result<()> {
        self.fill()?;
        self.at += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.fill()?;
        Ok(self.chunk.len() <= self.at)
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Bytes {
            bound: self.bound.copy(),
            chunk: Vec::new(),
            at: 0,
        })
    }
}

fn bytes(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Bytes {
        bound,
        chunk: Vec::new(),
        at: 0,
    }))
}

/// List of the text units (code points or graphemes) of its string argument.
struct Units {
    bound: Bound,
    cursor: TextCursor,
    current: Option<Vec<u8>>,
    done: bool,
    make: fn(Vec<u8>) -> Value,
}

tail_node!(Units);

impl Units {
    fn value(bound: Bound, unit: Unit, make: fn(Vec<u8>) -> Value) -> Result<Value> {
        Ok(Value::lst(Units {
            bound,
            cursor: TextCursor::new(unit),
            current: None,
            done: false,
            make,
        }))
    }

    fn fetch(&mut self) -> Result<()> {
        if self.current.is_none() && !self.done {
            self.current = self.cursor.next(self.bound.str(0)?)?;
            self.done = self.current.is_none();
        }
        Ok(())
    }
}

impl Lst for Units {
    fn current(&mut self) -> Result<Value> {
        self.fetch()?;
        match &self.current {
            Some(unit) => Ok((self.make)(unit.clone())),
            None => Err(Error::runtime("dereferenced a list past its end")),
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.fetch()?;
        self.current = None;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.fetch()?;
        Ok(self.current.is_none())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Units {
            bound: self.bound.copy(),
            cursor: TextCursor::new(self.cursor.unit()),
            current: None,
            done: false,
            make: self.make,
        })
    }
}

fn codepoints(bound: Bound) -> Result<Value> {
    Units::value(bound, Unit::CodePoint, |unit| {
        let code = std::str::from_utf8(&unit)
            .ok()
            .and_then(|text| text.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Value::num(NumLiteral::new(f64::from(u32::from(code))))
    })
}

fn graphemes(bound: Bound) -> Result<Value> {
    Units::value(bound, Unit::Grapheme, |unit| Value::str(StrLiteral::new(unit)))
}

/// String made of the numbers of its list argument, one element per chunk.
struct FromNumbers {
    bound: Bound,
    encode: fn(f64, &mut dyn Write) -> Result<()>,
}

tail_node!(FromNumbers);

impl Str for FromNumbers {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        if let Some(mut item) = self.bound.lst(0)?.next_value()? {
            let n = item.as_num()?.value()?;
            (self.encode)(n, out)?;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.bound.lst(0)?.end()
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(FromNumbers {
            bound: self.bound.copy(),
            encode: self.encode,
        })
    }
}

fn unbytes(bound: Bound) -> Result<Value> {
    Ok(Value::str(FromNumbers {
        bound,
        encode: |n, out| Ok(out.write_all(&[n as u8])?),
    }))
}

fn uncodepoints(bound: Bound) -> Result<Value> {
    Ok(Value::str(FromNumbers {
        bound,
        encode: |n, out| {
            let c = char::from_u32(n as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
            let mut buffer = [0; 4];
            Ok(out.write_all(c.encode_utf8(&mut buffer).as_bytes())?)
        },
    }))
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn contains(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| {
        let needle = read_all(b.str(0)?)?;
        if needle.is_empty() {
            return Ok(1.0);
        }
        let haystack = b.str(1)?;
        let mut window = Vec::new();
        while !haystack.end()? {
            haystack.stream(&mut window)?;
            if window.windows(needle.len()).any(|it| it == needle.as_slice()) {
                return Ok(1.0);
            }
            let keep = window.len().min(needle.len() - 1);
            window.drain(..window.len() - keep);
        }
        Ok(0.0)
    })
}

fn startswith(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| {
        let needle = read_all(b.str(0)?)?;
        let head = read_prefix(b.str(1)?, |so_far| so_far.len() < needle.len())?;
        Ok(truth(head.starts_with(&needle)))
    })
}

fn endswith(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| {
        let needle = read_all(b.str(0)?)?;
        let text = read_all(b.str(1)?)?;
        Ok(truth(text.ends_with(&needle)))
    })
}

/// Its string arguments one after the other, in `order`.
struct Concat {
    bound: Bound,
    order: &'static [usize],
    at: usize,
}

tail_node!(Concat);

impl Concat {
    fn skip_ended(&mut self) -> Result<()> {
        while let Some(&k) = self.order.get(self.at) {
            if !self.bound.str(k)?.end()? {
                break;
            }
            self.at += 1;
        }
        Ok(())
    }
}

impl Str for Concat {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        self.skip_ended()?;
        if let Some(&k) = self.order.get(self.at) {
            self.bound.str(k)?.stream(out)?;
        }
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.skip_ended()?;
        Ok(self.order.len() <= self.at)
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(Concat {
            bound: self.bound.copy(),
            order: self.order,
            at: 0,
        })
    }
}

fn prefix(bound: Bound) -> Result<Value> {
    Ok(Value::str(Concat {
        bound,
        order: &[0, 1],
        at: 0,
    }))
}

fn suffix(bound: Bound) -> Result<Value> {
    Ok(Value::str(Concat {
        bound,
        order: &[1, 0],
        at: 0,
    }))
}

fn surround(bound: Bound) -> Result<Value> {
    Ok(Value::str(Concat {
        bound,
        order: &[0, 2, 1],
        at: 0,
    }))
}

/// The pieces of a string between occurrences of a separator.
struct Split {
    bound: Bound,
    separator: Option<Vec<u8>>,
    pending: Vec<u8>,
    current: Option<Vec<u8>>,
    done: bool,
}

tail_node!(Split);

impl Split {
    fn fetch(&mut self) -> Result<()> {
        if self.current.is_some() || self.done {
            return Ok(());
        }
        if self.separator.is_none() {
            self.separator = Some(read_all(self.bound.str(0)?)?);
        }
        let separator = self.separator.as_deref().unwrap_or_default();
        if separator.is_empty() {
            self.current = Some(Vec::new());
            return Ok(());
        }

        let source = self.bound.str(1)?;
        loop {
            let found = self
                .pending
                .windows(separator.len())
                .position(|it| it == separator);
            if let Some(at) = found {
                let piece = self.pending[..at].to_vec();
                self.pending.drain(..at + separator.len());
                self.current = Some(piece);
                return Ok(());
            }
            if source.end()? {
                self.current = Some(std::mem::take(&mut self.pending));
                self.done = true;
                return Ok(());
            }
            source.stream(&mut self.pending)?;
        }
    }
}

impl Lst for Split {
    fn current(&mut self) -> Result<Value> {
        self.fetch()?;
        match &self.current {
            Some(piece) => Ok(Value::str(StrLiteral::new(piece.clone()))),
            None => Err(Error::runtime("dereferenced a list past its end")),
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.fetch()?;
        self.current = None;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.fetch()?;
        Ok(self.current.is_none())
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(Split {
            bound: self.bound.copy(),
            separator: None,
            pending: Vec::new(),
            current: None,
            done: false,
        })
    }
}

fn split(bound: Bound) -> Result<Value> {
    Ok(Value::lst(Split {
        bound,
        separator: None,
        pending: Vec::new(),
        current: None,
        done: false,
    }))
}

struct Join {
    bound: Bound,
    joiner: Option<Joiner>,
}

tail_node!(Join);

impl Join {
    fn ready(&mut self) -> Result<()> {
        if self.joiner.is_none() {
            let separator = read_all(self.bound.str(0)?)?;
            self.joiner = Some(Joiner::new(separator));
        }
        Ok(())
    }
}

impl Str for Join {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        self.ready()?;
        let source = self.bound.lst(1)?;
        match self.joiner.as_mut() {
            Some(joiner) => joiner.stream(source, out),
            None => Ok(()),
        }
    }

    fn end(&mut self) -> Result<bool> {
        self.ready()?;
        let source = self.bound.lst(1)?;
        match self.joiner.as_mut() {
            Some(joiner) => joiner.end(source),
            None => Ok(true),
        }
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(Join {
            bound: self.bound.copy(),
            joiner: None,
        })
    }
}

fn join(bound: Bound) -> Result<Value> {
    Ok(Value::str(Join {
        bound,
        joiner: None,
    }))
}

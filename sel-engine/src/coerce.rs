//! Kind-changing conversions between values.
//!
//! Dispatch is on the kind of the target type. Every conversion only builds
//! an adapter; the work happens when the result is pulled.

use std::fmt;
use std::io::Write;

use log::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::repr::{Field, Repr};
use crate::types::Type;
use crate::value::{Describe, Lst, Num, Str, StrLiteral, Value};

/// Converts `value` so it can stand where `to` is expected.
///
/// The source is consumed. A value already of the target kind comes back
/// unchanged, except lists, which get their elements coerced when the
/// element types differ.
pub fn coerce(value: Value, to: &Type) -> Result<Value> {
    match (value, to) {
        (value, Type::Unknown(_)) => Ok(value),
        (Value::Num(num), Type::Num) => Ok(Value::Num(num)),
        (Value::Str(text), Type::Str { .. }) => Ok(Value::Str(text)),
        (Value::Fun(fun), Type::Fun(..)) => Ok(Value::Fun(fun)),

        (Value::Num(num), Type::Str { .. }) => {
            trace!("coercing {} to {to}: rendering lazily", num.ty());
            Ok(Value::str(StrFromNum::new(num)))
        }
        (Value::Str(mut text), Type::Num) => match text.take_num() {
            Some(num) => Ok(Value::Num(num)),
            None => Err(Error::Coercion {
                from: text.ty().clone(),
                to: to.clone(),
            }),
        },
        (Value::Lst(lst), Type::Lst { .. }) => coerce_list(lst, to),
        (Value::Lst(lst), Type::Str { .. }) => {
            trace!("coercing {} to {to}: joining elements", lst.ty());
            Ok(Value::str(StrFromLst::new(lst)))
        }
        (Value::Str(text), Type::Lst { .. }) => {
            trace!("coercing {} to {to}: splitting graphemes", text.ty());
            coerce_list(Box::new(LstFromStr::graphemes(text)), to)
        }

        (value, _) => Err(Error::Coercion {
            from: value.ty().clone(),
            to: to.clone(),
        }),
    }
}

fn coerce_list(lst: Box<dyn Lst>, to: &Type) -> Result<Value> {
    let target = to.instantiated(lst.ty());
    if &target == lst.ty() {
        return Ok(Value::Lst(lst));
    }
    trace!("coercing {} to {target}: mapping elements", lst.ty());
    Ok(Value::lst(LstMapCoerce::new(target, lst)))
}

/// Textual rendering shared by number to string conversions.
pub(crate) fn format_number(n: f64) -> String {
    format!("{n}")
}

/// A number seen as a string, rendered on first use.
///
/// The number stays owned by the adapter so coercing back to a number hands
/// it out again without any text involved.
pub struct StrFromNum {
    source: Option<Box<dyn Num>>,
    rendered: Option<Vec<u8>>,
    served: bool,
}

static STR_FROM_NUM_TYPE: Type = Type::Str { infinite: false };

impl StrFromNum {
    pub fn new(source: Box<dyn Num>) -> Self {
        Self {
            source: Some(source),
            rendered: None,
            served: false,
        }
    }

    fn rendered(&mut self) -> Result<&[u8]> {
        if self.rendered.is_none() {
            let source = self
                .source
                .as_mut()
                .ok_or_else(|| Error::runtime("number was already taken out of its string"))?;
            self.rendered = Some(format_number(source.value()?).into_bytes());
        }
        Ok(self.rendered.as_deref().unwrap_or_default())
    }
}

impl Describe for StrFromNum {
    fn ty(&self) -> &Type {
        &STR_FROM_NUM_TYPE
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        let fields = match &self.source {
            Some(source) => vec![("v".to_string(), Field::Num(source.as_ref()))],
            None => Vec::new(),
        };
        r.node(self.ty(), "StrFromNum", fields)
    }
}

impl Str for StrFromNum {
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
        Box::new(StrFromNum {
            source: self.source.as_ref().map(|source| source.copy()),
            rendered: self.rendered.clone(),
            served: false,
        })
    }

    fn take_num(&mut self) -> Option<Box<dyn Num>> {
        self.source.take()
    }
}

/// Streams the elements of a list as strings with a separator in between,
/// one element chunk per call.
pub(crate) struct Joiner {
    separator: Vec<u8>,
    item: Option<Box<dyn Str>>,
    started: bool,
}

impl Joiner {
    pub(crate) fn new(separator: Vec<u8>) -> Self {
        Self {
            separator,
            item: None,
            started: false,
        }
    }

    pub(crate) fn stream(&mut self, source: &mut dyn Lst, out: &mut dyn Write) -> Result<()> {
        if let Some(item) = self.item.as_mut() {
            if !item.end()? {
                return item.stream(out);
            }
        }
        self.item = None;
        let Some(value) = source.next_value()? else {
            return Ok(());
        };
        if self.started {
            out.write_all(&self.separator)?;
        }
        self.started = true;
        let mut item = coerce(value, &Type::str(false))?.into_str()?;
        item.stream(out)?;
        self.item = Some(item);
        Ok(())
    }

    pub(crate) fn end(&mut self, source: &mut dyn Lst) -> Result<bool> {
        if let Some(item) = self.item.as_mut() {
            if !item.end()? {
                return Ok(false);
            }
        }
        source.end()
    }

    pub(crate) fn restarted(&self) -> Self {
        Self::new(self.separator.clone())
    }
}

/// A list seen as a string: elements as strings, joined by a separator
/// chosen from how deeply the elements nest.
pub struct StrFromLst {
    ty: Type,
    source: Box<dyn Lst>,
    joiner: Joiner,
}

impl StrFromLst {
    pub fn new(source: Box<dyn Lst>) -> Self {
        let separator = match list_depth(source.ty()) {
            0 | 1 => b" ".to_vec(),
            2 => b"\n".to_vec(),
            _ => b"\n\n".to_vec(),
        };
        Self {
            ty: Type::str(source.ty().is_infinite()),
            source,
            joiner: Joiner::new(separator),
        }
    }
}

fn list_depth(ty: &Type) -> usize {
    match ty {
        Type::Lst { has, .. } => 1 + has.first().map(list_depth).unwrap_or(0),
        _ => 0,
    }
}

impl Describe for StrFromLst {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(
            &self.ty,
            "StrFromLst",
            vec![("v".to_string(), Field::Lst(self.source.as_ref()))],
        )
    }
}

impl Str for StrFromLst {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        self.joiner.stream(self.source.as_mut(), out)
    }

    fn end(&mut self) -> Result<bool> {
        self.joiner.end(self.source.as_mut())
    }

    fn copy(&self) -> Box<dyn Str> {
        Box::new(StrFromLst {
            ty: self.ty.clone(),
            source: self.source.copy(),
            joiner: self.joiner.restarted(),
        })
    }
}

/// Wraps a list so each element is coerced to the matching target element
/// type, cycling through the targets by position.
pub struct LstMapCoerce {
    ty: Type,
    source: Box<dyn Lst>,
    at: usize,
}

impl LstMapCoerce {
    pub fn new(ty: Type, source: Box<dyn Lst>) -> Self {
        Self { ty, source, at: 0 }
    }
}

impl Describe for LstMapCoerce {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(
            &self.ty,
            "LstMapCoerce",
            vec![("v".to_string(), Field::Lst(self.source.as_ref()))],
        )
    }
}

impl Lst for LstMapCoerce {
    fn current(&mut self) -> Result<Value> {
        let value = self.source.current()?;
        let targets = self.ty.has();
        if targets.is_empty() {
            return Ok(value);
        }
        coerce(value, &targets[self.at % targets.len()])
    }

    fn advance(&mut self) -> Result<()> {
        self.source.advance()?;
        self.at += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        self.source.end()
    }

    fn rewind(&mut self) -> Result<()> {
        self.source.rewind()?;
        self.at = 0;
        Ok(())
    }

    fn count(&mut self) -> Result<usize> {
        self.source.count()
    }

    fn copy(&self) -> Box<dyn Lst> {
        Box::new(LstMapCoerce {
            ty: self.ty.clone(),
            source: self.source.copy(),
            at: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Grapheme,
    CodePoint,
}

/// Cuts a chunked byte stream into text units, carrying partial characters
/// and clusters over to the next chunk.
#[derive(Debug, Clone)]
pub(crate) struct TextCursor {
    unit: Unit,
    pending: Vec<u8>,
}

impl TextCursor {
    pub(crate) fn new(unit: Unit) -> Self {
        Self {
            unit,
            pending: Vec::new(),
        }
    }

    pub(crate) fn unit(&self) -> Unit {
        self.unit
    }

    /// Bytes of the next unit, or `None` once `source` is exhausted.
    pub(crate) fn next(&mut self, source: &mut dyn Str) -> Result<Option<Vec<u8>>> {
        loop {
            let needs_more = self.pending.is_empty() || !self.has_complete_unit();
            if !needs_more || source.end()? {
                break;
            }
            source.stream(&mut self.pending)?;
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        let len = self.first_unit_len().max(1);
        Ok(Some(self.pending.drain(..len).collect()))
    }

    fn valid_prefix(&self) -> (&str, bool) {
        match std::str::from_utf8(&self.pending) {
            Ok(text) => (text, false),
            Err(err) => {
                let valid = &self.pending[..err.valid_up_to()];
                // the prefix is valid by construction
                let text = std::str::from_utf8(valid).unwrap_or_default();
                (text, err.error_len().is_some())
            }
        }
    }

    /// A unit is complete when it is followed by at least one more byte
    /// that could not extend it.
    fn has_complete_unit(&self) -> bool {
        let (text, broken) = self.valid_prefix();
        if text.is_empty() {
            return broken;
        }
        match self.unit {
            Unit::CodePoint => true,
            Unit::Grapheme => {
                let first = text.graphemes(true).next().map(str::len).unwrap_or(0);
                first < text.len() || broken
            }
        }
    }

    fn first_unit_len(&self) -> usize {
        let (text, _) = self.valid_prefix();
        match self.unit {
            Unit::CodePoint => text.chars().next().map(char::len_utf8).unwrap_or(0),
            Unit::Grapheme => text.graphemes(true).next().map(str::len).unwrap_or(0),
        }
    }
}

/// A string seen as the list of its grapheme clusters, each a finite string.
pub struct LstFromStr {
    ty: Type,
    source: Box<dyn Str>,
    cursor: TextCursor,
    current: Option<Vec<u8>>,
    done: bool,
}

impl LstFromStr {
    pub fn graphemes(source: Box<dyn Str>) -> Self {
        Self {
            ty: Type::lst(vec![Type::str(false)], source.ty().is_infinite()),
            source,
            cursor: TextCursor::new(Unit::Grapheme),
            current: None,
            done: false,
        }
    }

    fn fetch(&mut self) -> Result<()> {
        if self.current.is_none() && !self.done {
            self.current = self.cursor.next(self.source.as_mut())?;
            self.done = self.current.is_none();
        }
        Ok(())
    }
}

impl Describe for LstFromStr {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(
            &self.ty,
            "LstFromStr",
            vec![("v".to_string(), Field::Str(self.source.as_ref()))],
        )
    }
}

impl Lst for LstFromStr {
    fn current(&mut self) -> Result<Value> {
        self.fetch()?;
        match &self.current {
            Some(bytes) => Ok(Value::str(StrLiteral::new(bytes.clone()))),
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
        Box::new(LstFromStr::graphemes(self.source.copy()))
    }
}

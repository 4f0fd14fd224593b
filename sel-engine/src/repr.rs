use std::borrow::Cow;
use std::fmt::{self, Write};

use sel_support::quoted;

use crate::types::Type;
use crate::value::{Fun, Lst, Num, Str, Value};

const INDENT: &str = "   ";

/// One labelled entry in a value's debug representation.
pub enum Field<'a> {
    Number(f64),
    Text(Cow<'a, str>),
    Value(&'a Value),
    Num(&'a dyn Num),
    Str(&'a dyn Str),
    Lst(&'a dyn Lst),
    Fun(&'a dyn Fun),
}

/// Writer for the `<type> Name { field=... }` debug representation.
///
/// Nodes with more than one field are spread over indented lines unless
/// `single_line` is set.
pub struct Repr<'w> {
    out: &'w mut dyn Write,
    single_line: bool,
    depth: usize,
}

impl<'w> Repr<'w> {
    pub fn new(out: &'w mut dyn Write, single_line: bool) -> Self {
        Self {
            out,
            single_line,
            depth: 0,
        }
    }

    pub(crate) fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn node(&mut self, ty: &Type, name: &str, fields: Vec<(String, Field<'_>)>) -> fmt::Result {
        write!(self.out, "<{ty}> {name} {{")?;
        if fields.is_empty() {
            return self.out.write_str(" }");
        }

        if self.single_line || fields.len() == 1 {
            for (label, field) in &fields {
                self.out.write_char(' ')?;
                self.field(label, field)?;
            }
            return self.out.write_str(" }");
        }

        self.depth += 1;
        for (label, field) in &fields {
            self.newline()?;
            self.field(label, field)?;
        }
        self.depth -= 1;
        self.newline()?;
        self.out.write_char('}')
    }

    fn field(&mut self, label: &str, field: &Field<'_>) -> fmt::Result {
        write!(self.out, "{label}=")?;
        match field {
            Field::Number(n) => write!(self.out, " {n}"),
            Field::Text(text) => write!(self.out, " {}", quoted(text)),
            Field::Value(value) => value.repr_into(self),
            Field::Num(num) => num.repr(self),
            Field::Str(str) => str.repr(self),
            Field::Lst(lst) => lst.repr(self),
            Field::Fun(fun) => fun.repr(self),
        }
    }

    fn newline(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        for _ in 0..self.depth {
            self.out.write_str(INDENT)?;
        }
        Ok(())
    }
}

/// Field label for the `k`-th bound argument: `arg_A`, `arg_B`, ...
pub(crate) fn arg_label(k: usize) -> String {
    let letter = (b'A' + (k % 26) as u8) as char;
    format!("arg_{letter}")
}

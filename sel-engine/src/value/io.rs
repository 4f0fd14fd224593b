use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{BufRead, Write};
use std::rc::{Rc, Weak};

use log::trace;

use super::{Describe, Fun, Str, StrLiteral, Value};
use crate::coerce::coerce;
use crate::error::Result;
use crate::repr::Repr;
use crate::types::Type;

static INPUT_TYPE: Type = Type::Str { infinite: true };

struct InputBuffer {
    reader: Box<dyn BufRead>,
    /// Bytes from offset `base` on, kept until every live reader is past them.
    cache: Vec<u8>,
    base: usize,
    readers: Vec<Weak<Cell<usize>>>,
    eof: bool,
}

impl InputBuffer {
    /// Offset one past the last byte read from the reader.
    fn upto(&self) -> usize {
        self.base + self.cache.len()
    }

    fn after(&self, at: usize) -> &[u8] {
        &self.cache[at.saturating_sub(self.base).min(self.cache.len())..]
    }

    /// Pulls one more chunk from the reader into the cache.
    fn fill(&mut self) -> Result<()> {
        if self.eof {
            return Ok(());
        }
        let read = {
            let chunk = self.reader.fill_buf()?;
            self.cache.extend_from_slice(chunk);
            chunk.len()
        };
        if read == 0 {
            self.eof = true;
        } else {
            self.reader.consume(read);
        }
        Ok(())
    }

    fn register(&mut self, at: usize) -> Rc<Cell<usize>> {
        let at = Rc::new(Cell::new(at));
        self.readers.push(Rc::downgrade(&at));
        at
    }

    /// Drops the bytes no live reader still has ahead of it.
    fn trim(&mut self) {
        self.readers.retain(|reader| reader.strong_count() > 0);
        let oldest = self
            .readers
            .iter()
            .filter_map(Weak::upgrade)
            .map(|at| at.get())
            .min()
            .unwrap_or_else(|| self.upto());
        if oldest > self.base {
            let dropped = (oldest - self.base).min(self.cache.len());
            self.cache.drain(..dropped);
            self.base += dropped;
            trace!("input cache dropped {dropped} bytes, {} left", self.cache.len());
        }
    }
}

/// The process input as a string. Its type is infinite, though it stops at
/// the reader's EOF.
///
/// Copies share one cache and a copy picks up where its original is. Bytes
/// every live copy is past are dropped.
pub struct Input {
    buffer: Rc<RefCell<InputBuffer>>,
    at: Rc<Cell<usize>>,
}

impl Input {
    pub fn new(reader: impl BufRead + 'static) -> Self {
        let mut buffer = InputBuffer {
            reader: Box::new(reader),
            cache: Vec::new(),
            base: 0,
            readers: Vec::new(),
            eof: false,
        };
        let at = buffer.register(0);
        Self {
            buffer: Rc::new(RefCell::new(buffer)),
            at,
        }
    }

    /// Number of bytes held for this input and its copies.
    pub fn cached(&self) -> usize {
        self.buffer.borrow().cache.len()
    }
}

impl Describe for Input {
    fn ty(&self) -> &Type {
        &INPUT_TYPE
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(self.ty(), "Input", Vec::new())
    }
}

impl Str for Input {
    fn stream(&mut self, out: &mut dyn Write) -> Result<()> {
        let mut buffer = self.buffer.borrow_mut();
        if buffer.upto() <= self.at.get() {
            buffer.fill()?;
        }
        out.write_all(buffer.after(self.at.get()))?;
        self.at.set(buffer.upto());
        buffer.trim();
        Ok(())
    }

    fn end(&mut self) -> Result<bool> {
        let mut buffer = self.buffer.borrow_mut();
        if buffer.upto() <= self.at.get() {
            buffer.fill()?;
        }
        Ok(buffer.upto() <= self.at.get() && buffer.eof)
    }

    fn copy(&self) -> Box<dyn Str> {
        let mut buffer = self.buffer.borrow_mut();
        Box::new(Input {
            at: buffer.register(self.at.get()),
            buffer: Rc::clone(&self.buffer),
        })
    }
}

/// Sink for the process output, `Str -> ()`. Applying it drains the string
/// into the writer and yields an empty string.
pub struct Output {
    ty: Type,
    sink: Rc<RefCell<Box<dyn Write>>>,
}

impl Output {
    pub fn new(writer: impl Write + 'static) -> Self {
        Self {
            ty: Type::fun(Type::str(false), Type::unk("()")),
            sink: Rc::new(RefCell::new(Box::new(writer))),
        }
    }
}

impl Describe for Output {
    fn ty(&self) -> &Type {
        &self.ty
    }

    fn repr(&self, r: &mut Repr<'_>) -> fmt::Result {
        r.node(&self.ty, "Output", Vec::new())
    }
}

impl Fun for Output {
    fn apply(&self, arg: Value) -> Result<Value> {
        let mut text = coerce(arg, &Type::str(false))?.into_str()?;
        let mut sink = self.sink.borrow_mut();
        text.entire(&mut **sink)?;
        sink.flush()?;
        Ok(Value::str(StrLiteral::new(Vec::new())))
    }

    fn copy(&self) -> Box<dyn Fun> {
        Box::new(Output {
            ty: self.ty.clone(),
            sink: Rc::clone(&self.sink),
        })
    }
}

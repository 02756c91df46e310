//! Output sinks for rendered text.
//!
//! A [`Sink`] accepts characters and never fails on the write itself. Sinks
//! backed by I/O record the first failure instead, and the serializer checks
//! [`Sink::has_error`] to abort rendering.

use std::io::{self, BufWriter, Write};

/// Character destination for rendered output.
pub trait Sink {
    fn write_str(&mut self, s: &str);

    fn write_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf));
    }

    /// Returns `true` once a write has failed.
    fn has_error(&self) -> bool {
        false
    }
}

impl Sink for String {
    fn write_str(&mut self, s: &str) {
        self.push_str(s);
    }

    fn write_char(&mut self, c: char) {
        self.push(c);
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_str(&mut self, s: &str) {
        (**self).write_str(s)
    }

    fn write_char(&mut self, c: char) {
        (**self).write_char(c)
    }

    fn has_error(&self) -> bool {
        (**self).has_error()
    }
}

/// Discards everything written to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn write_str(&mut self, _s: &str) {}

    fn write_char(&mut self, _c: char) {}
}

/// Buffered UTF-8 sink over any [`io::Write`].
///
/// After the first failed write every subsequent write is dropped.
pub struct IoSink<W: Write> {
    writer: BufWriter<W>,
    error: Option<io::Error>,
}

impl<W: Write> IoSink<W> {
    pub fn new(writer: W) -> Self {
        IoSink {
            writer: BufWriter::new(writer),
            error: None,
        }
    }

    /// Takes the recorded error, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Flushes buffered output, returning any recorded error first.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}

impl<W: Write> Sink for IoSink<W> {
    fn write_str(&mut self, s: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.writer.write_all(s.as_bytes()) {
            self.error = Some(err);
        }
    }

    fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

//! Character reader with unbounded replay.
//!
//! [`PagedReader`] decodes UTF-8 from an underlying byte source exactly once
//! and keeps every decoded character in fixed-size pages. Marked positions can
//! be replayed any number of times without touching the source again, which is
//! what lets a section body be re-rendered once per element and a cached
//! include be re-rendered once per iteration.
//!
//! # Reset policy
//!
//! [`PagedReader::reset`] pops the most recent mark. With no mark pending it
//! rewinds to the start of the stream.
//!
//! # Example
//!
//! ```rust
//! use httprpc_template::PagedReader;
//!
//! let mut reader = PagedReader::new("ABCDEFGH".as_bytes());
//! let mut out = String::new();
//! for _ in 0..3 {
//!     out.push(reader.read().unwrap().unwrap());
//! }
//! reader.mark();
//! out.push(reader.read().unwrap().unwrap());
//! out.push(reader.read().unwrap().unwrap());
//! reader.reset();
//! while let Some(c) = reader.read().unwrap() {
//!     out.push(c);
//! }
//! assert_eq!(out, "ABCDEDEFGH");
//! ```

use std::io::{self, Read};
use std::str;

/// Number of characters per page.
pub const PAGE_SIZE: usize = 1024;

const READ_CHUNK: usize = 4096;

/// Replayable character reader over a UTF-8 byte source.
pub struct PagedReader<R> {
    source: Option<R>,
    pages: Vec<Vec<char>>,
    count: usize,
    position: usize,
    marks: Vec<usize>,
    undecoded: Vec<u8>,
    eof: bool,
}

impl<R: Read> PagedReader<R> {
    pub fn new(source: R) -> Self {
        PagedReader {
            source: Some(source),
            pages: Vec::new(),
            count: 0,
            position: 0,
            marks: Vec::new(),
            undecoded: Vec::new(),
            eof: false,
        }
    }

    /// Reads the next character, or `None` at end of stream.
    pub fn read(&mut self) -> io::Result<Option<char>> {
        while self.position >= self.count {
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }

        let c = self.pages[self.position / PAGE_SIZE][self.position % PAGE_SIZE];
        self.position += 1;
        Ok(Some(c))
    }

    /// Reads up to `buf.len()` characters. Returns `None` at end of stream.
    pub fn read_chars(&mut self, buf: &mut [char]) -> io::Result<Option<usize>> {
        if buf.is_empty() {
            return Ok(Some(0));
        }

        let mut n = 0;
        while n < buf.len() {
            match self.read()? {
                Some(c) => {
                    buf[n] = c;
                    n += 1;
                }
                None => break,
            }
        }

        Ok(if n == 0 { None } else { Some(n) })
    }

    /// Pushes the current position onto the mark stack.
    pub fn mark(&mut self) {
        self.marks.push(self.position);
    }

    /// Pops the most recent mark and rewinds to it, or rewinds to the start
    /// of the stream when no mark is pending.
    pub fn reset(&mut self) {
        self.position = self.marks.pop().unwrap_or(0);
    }

    /// Number of marks currently pending.
    pub fn marks(&self) -> usize {
        self.marks.len()
    }

    /// Current logical position, in characters.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Releases the underlying source. Characters already buffered remain
    /// readable; nothing further is decoded.
    pub fn close(&mut self) {
        self.source = None;
        self.eof = true;
    }

    fn fill(&mut self) -> io::Result<()> {
        let Some(source) = self.source.as_mut() else {
            self.eof = true;
            return Ok(());
        };

        let mut chunk = [0u8; READ_CHUNK];
        let n = loop {
            match source.read(&mut chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };

        if n == 0 {
            self.eof = true;
            self.source = None;
            if !self.undecoded.is_empty() {
                return Err(invalid_utf8());
            }
            return Ok(());
        }

        self.undecoded.extend_from_slice(&chunk[..n]);
        let valid = match str::from_utf8(&self.undecoded) {
            Ok(text) => text.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(_) => return Err(invalid_utf8()),
        };

        let decoded: Vec<char> = match str::from_utf8(&self.undecoded[..valid]) {
            Ok(text) => text.chars().collect(),
            Err(_) => return Err(invalid_utf8()),
        };
        self.undecoded.drain(..valid);

        for c in decoded {
            self.push(c);
        }
        Ok(())
    }

    fn push(&mut self, c: char) {
        if self.count % PAGE_SIZE == 0 {
            self.pages.push(Vec::with_capacity(PAGE_SIZE));
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(c);
        }
        self.count += 1;
    }
}

fn invalid_utf8() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8")
}

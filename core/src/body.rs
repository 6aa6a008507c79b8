use std::fmt::Debug;
use std::fmt::Formatter;
use std::io::Read;
use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;

use crate::{Error, Result};

/// Body of a request or response sent through the [`Pipeline`](crate::Pipeline).
///
/// Cloning a `Stream` body shares the underlying reader, so a retry can rewind the
/// same stream through its mark.
#[derive(Clone, Default)]
pub enum Body {
    /// No content.
    #[default]
    Empty,
    /// In memory content, replayable for free.
    Bytes(Bytes),
    /// Streaming content.
    Stream(Stream),
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(bs) => write!(f, "Body::Bytes({} bytes)", bs.len()),
            Body::Stream(s) => write!(f, "Body::Stream(len: {:?})", s.len),
        }
    }
}

impl Body {
    /// Create a streaming body from a reader.
    pub fn from_reader(reader: impl Read + Send + 'static, len: Option<u64>) -> Self {
        Body::Stream(Stream::new(reader, len))
    }

    /// Content length if known.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bs) => Some(bs.len() as u64),
            Body::Stream(s) => s.len,
        }
    }

    /// Convert into a reader over the remaining content.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Body::Empty => Box::new(std::io::empty()),
            Body::Bytes(bs) => Box::new(std::io::Cursor::new(bs)),
            Body::Stream(s) => Box::new(s),
        }
    }

    /// Read the whole content into memory.
    pub fn collect(self) -> Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bs) => Ok(bs),
            Body::Stream(s) => {
                let mut buf = Vec::new();
                let mut r = s;
                r.read_to_end(&mut buf)
                    .map_err(crate::checksum::from_io_error)?;
                Ok(buf.into())
            }
        }
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bs: Vec<u8>) -> Self {
        Body::Bytes(bs.into())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(s.into())
    }
}

/// Stream is a shared handle over a [`MarkableReader`].
#[derive(Clone)]
pub struct Stream {
    reader: Arc<Mutex<MarkableReader>>,
    len: Option<u64>,
}

impl Stream {
    /// Wrap a reader.
    pub fn new(reader: impl Read + Send + 'static, len: Option<u64>) -> Self {
        Self {
            reader: Arc::new(Mutex::new(MarkableReader::new(reader))),
            len,
        }
    }

    /// Content length if known.
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    /// Mark the current position, keeping at most `budget` bytes for replay.
    pub fn mark(&self, budget: usize) {
        self.reader.lock().expect("lock poisoned").mark(budget)
    }

    /// Rewind to the mark.
    pub fn reset(&self) -> Result<()> {
        self.reader.lock().expect("lock poisoned").reset()
    }

    /// Bytes handed out since the last mark.
    pub fn read_since_mark(&self) -> u64 {
        self.reader.lock().expect("lock poisoned").read_since_mark()
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.lock().expect("lock poisoned").read(buf)
    }
}

/// MarkableReader buffers bytes read after a mark so they can be read again.
///
/// The buffer is bounded by the budget given to [`MarkableReader::mark`]. Once more
/// bytes than the budget have been read the mark is invalidated and
/// [`MarkableReader::reset`] fails.
pub struct MarkableReader {
    inner: Box<dyn Read + Send>,
    buf: Vec<u8>,
    pos: usize,
    budget: Option<usize>,
    overflowed: bool,
    read_since_mark: u64,
}

impl MarkableReader {
    /// Wrap a reader, no mark is set.
    pub fn new(inner: impl Read + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            buf: Vec::new(),
            pos: 0,
            budget: None,
            overflowed: false,
            read_since_mark: 0,
        }
    }

    /// Mark the current position.
    pub fn mark(&mut self, budget: usize) {
        // Keep bytes not yet replayed, they sit after the new mark.
        self.buf.drain(..self.pos);
        self.pos = 0;
        self.overflowed = self.buf.len() > budget;
        if self.overflowed {
            self.buf = Vec::new();
        }
        self.budget = Some(budget);
        self.read_since_mark = 0;
    }

    /// Rewind to the mark.
    pub fn reset(&mut self) -> Result<()> {
        if self.budget.is_none() {
            return Err(Error::request_invalid("stream reset without mark"));
        }
        if self.overflowed {
            return Err(Error::request_invalid(
                "stream read beyond the mark buffer, can't reset",
            ));
        }
        self.pos = 0;
        self.read_since_mark = 0;
        Ok(())
    }

    /// Bytes handed out since the last mark or reset.
    pub fn read_since_mark(&self) -> u64 {
        self.read_since_mark
    }
}

impl Read for MarkableReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.pos < self.buf.len() {
            let n = (self.buf.len() - self.pos).min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            self.read_since_mark += n as u64;
            return Ok(n);
        }

        let n = self.inner.read(out)?;
        self.read_since_mark += n as u64;

        if let Some(budget) = self.budget {
            if !self.overflowed {
                if self.buf.len() + n > budget {
                    self.overflowed = true;
                    self.buf = Vec::new();
                    self.pos = 0;
                } else {
                    self.buf.extend_from_slice(&out[..n]);
                    self.pos = self.buf.len();
                }
            }
        }
        Ok(n)
    }
}

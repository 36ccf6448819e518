//! Pull-based input sources for streaming decode

use bytes::Bytes;
use per_core::{PerResult, PerSettings};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

/// Outcome of asking a source for more input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refill {
    /// More octets to append after the current buffer
    Data(Bytes),
    /// The stream has ended for good
    Exhausted,
    /// Nothing available right now, ask again later
    Pending,
}

/// Supplies more input when a [`BitInput`](super::BitInput) runs dry
///
/// Called only when a read needs more bits than the cursor holds. Returning
/// `Ok(Refill::Data(..))` with an empty chunk is treated like `Pending`.
/// An `Err` is propagated to the caller of the read unchanged.
#[cfg_attr(test, mockall::automock)]
pub trait RefillSource {
    fn refill(&mut self) -> PerResult<Refill>;
}

impl<T: RefillSource + ?Sized> RefillSource for &mut T {
    fn refill(&mut self) -> PerResult<Refill> {
        (**self).refill()
    }
}

impl<T: RefillSource + ?Sized> RefillSource for Box<T> {
    fn refill(&mut self) -> PerResult<Refill> {
        (**self).refill()
    }
}

/// A source with nothing behind the initial buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefill;

impl RefillSource for NoRefill {
    fn refill(&mut self) -> PerResult<Refill> {
        Ok(Refill::Exhausted)
    }
}

/// A queue of chunks fed by the caller as they arrive
///
/// While open, an empty queue answers `Pending`; once closed it answers
/// `Exhausted`.
#[derive(Debug, Default)]
pub struct ChunkedSource {
    chunks: VecDeque<Bytes>,
    closed: bool,
}

impl ChunkedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed source holding all the given chunks
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            closed: true,
        }
    }

    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        self.chunks.push_back(chunk.into());
    }

    /// No more chunks will be pushed
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending_chunks(&self) -> usize {
        self.chunks.len()
    }
}

impl RefillSource for ChunkedSource {
    fn refill(&mut self) -> PerResult<Refill> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Refill::Data(chunk)),
            None if self.closed => Ok(Refill::Exhausted),
            None => Ok(Refill::Pending),
        }
    }
}

/// Reads input from any [`Read`] implementation
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, settings: &PerSettings) -> Self {
        Self {
            reader,
            chunk_size: settings.refill_chunk_size.max(1),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> RefillSource for ReaderSource<R> {
    fn refill(&mut self) -> PerResult<Refill> {
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(Refill::Exhausted),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Refill::Data(Bytes::from(buf)));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(Refill::Pending),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

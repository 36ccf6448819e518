//! Push-based output sinks for streaming encode

use bytes::BytesMut;
use per_core::PerResult;
use std::io::Write;

/// Consumes completed octets from a [`BitOutput`](super::BitOutput)
///
/// A sink must take the whole span or fail; partial acceptance is not
/// representable. A failure is fatal for the encode operation in progress.
#[cfg_attr(test, mockall::automock)]
pub trait FlushSink {
    fn accept(&mut self, data: &[u8]) -> PerResult<()>;
}

impl<T: FlushSink + ?Sized> FlushSink for &mut T {
    fn accept(&mut self, data: &[u8]) -> PerResult<()> {
        (**self).accept(data)
    }
}

impl<T: FlushSink + ?Sized> FlushSink for Box<T> {
    fn accept(&mut self, data: &[u8]) -> PerResult<()> {
        (**self).accept(data)
    }
}

impl FlushSink for Vec<u8> {
    fn accept(&mut self, data: &[u8]) -> PerResult<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

impl FlushSink for BytesMut {
    fn accept(&mut self, data: &[u8]) -> PerResult<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// Writes output to any [`Write`] implementation
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FlushSink for WriterSink<W> {
    fn accept(&mut self, data: &[u8]) -> PerResult<()> {
        self.writer.write_all(data)?;
        Ok(())
    }
}

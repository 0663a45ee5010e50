//! Push-only byte sinks used by the CBOR serializer.
//!

use std::io::{self, BufWriter, Write};

/// A destination for encoded bytes.
pub trait ByteSink {
    /// Append one byte.
    fn push_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Append a slice of bytes.
    fn push_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Push buffered bytes to the underlying destination, if any.
    fn flush(&mut self) -> io::Result<()>;
}

// The in-memory sink.
impl ByteSink for Vec<u8> {
    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        self.push(byte);
        Ok(())
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).push_byte(byte)
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).push_bytes(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// A sink that forwards bytes to a [`Write`] stream through a buffer.
///
/// Buffered bytes are flushed on demand and when the sink is dropped.
/// A flush failure during drop is discarded.
pub struct StreamSink<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> StreamSink<W> {
    /// Wrap a byte stream.
    pub fn new(stream: W) -> StreamSink<W> {
        StreamSink {
            inner: BufWriter::new(stream),
        }
    }

    /// Wrap a byte stream, using a buffer of at least `capacity` bytes.
    pub fn with_capacity(capacity: usize, stream: W) -> StreamSink<W> {
        StreamSink {
            inner: BufWriter::with_capacity(capacity, stream),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

impl<W: Write> ByteSink for StreamSink<W> {
    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for StreamSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.flush() {
            tracing::debug!("discarding flush error on drop: {}", e);
        }
    }
}

//! Outbound byte sink for the engine.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Byte sink the engine writes whole frames to.
///
/// Each call carries exactly one complete frame. A write may block on
/// transport flow control, but must not call back into the engine.
pub trait Link: Send + Sync {
    /// Hand one encoded frame to the transport.
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()>;
}

/// Link over any [`Write`] (serial port, TCP stream, pipe).
///
/// Writes are serialized so frames never interleave on the wire.
#[derive(Debug)]
pub struct StreamLink<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> StreamLink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Link for StreamLink<W> {
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(bytes)?;
        writer.flush()
    }
}

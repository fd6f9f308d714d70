//! Inbound reader path: feeds transport bytes into the engine.

use std::io::{self, ErrorKind, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, instrument};

use crate::engine::Engine;

/// Default read chunk size.
pub const DEFAULT_READ_CHUNK: usize = 512;

/// Read from `reader` until end of stream, handing every chunk to the engine.
///
/// Returns the total number of bytes read.
#[instrument(level = "debug", skip(reader, engine))]
pub fn pump<R: Read>(mut reader: R, engine: &Engine, chunk_size: usize) -> io::Result<u64> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => {
                debug!(total, "reader reached end of stream");
                return Ok(total);
            }
            Ok(len) => {
                total += len as u64;
                engine.on_bytes_received(&buffer[..len]);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

/// Run [`pump`] on a dedicated thread.
pub fn spawn_reader<R>(reader: R, engine: Arc<Engine>) -> io::Result<JoinHandle<io::Result<u64>>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("objlink-reader".into())
        .spawn(move || pump(reader, &engine, DEFAULT_READ_CHUNK))
}

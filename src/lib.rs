//! objlink - exchange typed object snapshots with an autopilot over a lossy byte stream
//!
//! This library implements the object link wire protocol: frames carrying a
//! snapshot of one object instance, requests for a snapshot, and
//! acknowledgments, framed with a sync byte and a CRC-8 so the receiver can
//! resynchronize on a serial link that drops or corrupts bytes.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use objlink::{Engine, EngineConfig, MemoryStore, StreamLink};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.register(0x1000, 4, false)?;
//!
//! let link = Arc::new(StreamLink::new(Vec::new()));
//! let engine = Engine::new(EngineConfig::default(), store, link)?;
//!
//! // One DATA_ACKED frame; a transaction now waits for the peer's ACK.
//! let report = engine.send_object(0x1000, 0, true, false)?;
//! assert!(report.is_success());
//! assert!(engine.find_transaction(0x1000, 0).is_some());
//! # Ok::<(), objlink::Error>(())
//! ```
//!
//! # Layers
//!
//! - [`protocol`] - frame layout, CRC-8, encoder and streaming decoder
//! - [`engine`] - transaction tracking, object store seam, statistics
//! - [`transport`] - byte link, reader path, UDP frame mirror

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod engine;
pub mod protocol;
pub mod transport;

pub use engine::{Completion, CompletionSink, Engine, EngineConfig, MemoryStore, ObjectStore, SendReport, Stats};
pub use protocol::{ALL_INSTANCES, Error, Frame, FrameDecoder, FrameKind, MAX_PAYLOAD_LENGTH, Result};
pub use transport::{Link, StreamLink};

/// Protocol version carried in every frame's type byte
pub const PROTOCOL_VERSION: u8 = protocol::TYPE_VER;

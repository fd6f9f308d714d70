//! Byte link, inbound reader path, and frame mirroring.

mod link;
mod mirror;
mod reader;

pub use link::{Link, StreamLink};
pub use mirror::{Direction, FrameMirror, MirrorConfig, UdpMirror};
pub use reader::{DEFAULT_READ_CHUNK, pump, spawn_reader};

//! Object link wire protocol
//!
//! This module provides the frame layout, frame kinds, checksum, and codec.

mod codec;
pub mod crc;
mod decoder;
mod error;
mod frame;
mod header;
mod types;

pub use codec::{decode, encode, encode_into};
pub use decoder::{DecodeStatus, FrameDecoder};
pub use error::{Error, Result};
pub use frame::Frame;
pub use header::FrameHeader;
pub use types::{FrameKind, InstanceLayout};

/// Byte marking the start of every frame.
pub const SYNC_VAL: u8 = 0x3C;

/// Protocol version bits carried in the type byte.
pub const TYPE_VER: u8 = 0x20;

/// Mask isolating the version bits of the type byte.
pub const TYPE_MASK: u8 = 0xF8;

/// Header size without instance id: sync(1), type(1), length(2), object id(4)
pub const MIN_HEADER_LENGTH: usize = 8;

/// Header size with instance id: sync(1), type(1), length(2), object id(4), instance id(2)
pub const MAX_HEADER_LENGTH: usize = 10;

/// Size of the instance id field.
pub const INSTANCE_LENGTH: usize = 2;

/// Size of the trailing checksum.
pub const CHECKSUM_LENGTH: usize = 1;

/// Maximum object payload carried by one frame.
pub const MAX_PAYLOAD_LENGTH: usize = 256;

/// Largest value the length field may hold (header plus payload).
pub const MAX_FRAME_LENGTH: usize = MAX_HEADER_LENGTH + MAX_PAYLOAD_LENGTH;

/// Largest complete frame on the wire, checksum included.
pub const MAX_PACKET_LENGTH: usize = MAX_FRAME_LENGTH + CHECKSUM_LENGTH;

/// Default capacity of the engine's outbound buffer.
pub const TX_BUFFER_SIZE: usize = 2 * 1024;

/// Instance id meaning "every instance of the object".
///
/// Only accepted as an API input; frames always carry a concrete instance.
pub const ALL_INSTANCES: u16 = 0xFFFF;

/// Header length for an object with the given instance layout.
#[must_use]
pub const fn header_length(multi_instance: bool) -> usize {
    if multi_instance {
        MAX_HEADER_LENGTH
    } else {
        MIN_HEADER_LENGTH
    }
}

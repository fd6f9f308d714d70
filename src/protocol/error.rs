//! Object link error types

use thiserror::Error;

use super::FrameKind;

/// Object link protocol errors
#[derive(Error, Debug)]
pub enum Error {
    /// Payload exceeds what one frame can carry
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Payload supplied for a kind that never carries one
    #[error("{kind} frames carry no payload")]
    PayloadNotAllowed {
        /// Frame kind
        kind: FrameKind,
    },

    /// Length field exceeds the maximum frame size
    #[error("frame too large: length {length} (max {max})")]
    FrameTooLarge {
        /// Declared length
        length: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Length field inconsistent with the frame kind or header
    #[error("invalid frame length: {length}")]
    InvalidLength {
        /// Declared length
        length: usize,
    },

    /// Unknown frame type or protocol version
    #[error("invalid frame type: {type_byte:#x}")]
    InvalidFrameType {
        /// Invalid type byte
        type_byte: u8,
    },

    /// Checksum mismatch
    #[error("checksum mismatch: expected {expected:#04x}, got {found:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes
        expected: u8,
        /// Checksum carried by the frame
        found: u8,
    },

    /// Buffer ended before a complete frame
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size (lower bound)
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Object id not known to the object store
    #[error("unknown object: {object_id:#010x}")]
    UnknownObject {
        /// Object id
        object_id: u32,
    },

    /// Instance not known for an otherwise valid object
    #[error("unknown instance {instance_id} of object {object_id:#010x}")]
    UnknownInstance {
        /// Object id
        object_id: u32,
        /// Instance id
        instance_id: u16,
    },

    /// Payload size does not match the object's layout
    #[error("object {object_id:#010x} expects {expected} bytes, got {found}")]
    SizeMismatch {
        /// Object id
        object_id: u32,
        /// Size declared by the object
        expected: usize,
        /// Size received
        found: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

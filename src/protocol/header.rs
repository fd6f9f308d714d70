//! Object link frame header
//!
//! The header is 8 bytes, or 10 when the object type is multi-instance.

use bytes::BufMut;

use super::{Error, FrameKind, MAX_PAYLOAD_LENGTH, Result, SYNC_VAL, header_length};

/// Object link frame header
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Sync 0x3C   |  Type (kind)  |       Length (LE, 2)          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     Object ID (BE, 4)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Instance ID (LE, 2, multi)  |    Payload (0-256) ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The length field counts every byte from sync to the end of the payload.
/// A one byte CRC-8 over type..payload follows the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    kind: FrameKind,
    length: u16,
    object_id: u32,
    instance_id: u16,
    multi_instance: bool,
}

impl FrameHeader {
    /// Create a header for a payload of `payload_len` bytes
    pub fn new(
        kind: FrameKind,
        object_id: u32,
        instance_id: u16,
        multi_instance: bool,
        payload_len: usize,
    ) -> Result<Self> {
        if payload_len > MAX_PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_LENGTH,
            });
        }
        if payload_len > 0 && !kind.carries_payload() {
            return Err(Error::PayloadNotAllowed { kind });
        }

        // Bounded by MAX_FRAME_LENGTH, which fits in u16.
        let length = (header_length(multi_instance) + payload_len) as u16;
        Ok(Self {
            kind,
            length,
            object_id,
            instance_id: if multi_instance { instance_id } else { 0 },
            multi_instance,
        })
    }

    /// Get frame kind
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Get the length field (header plus payload)
    #[must_use]
    pub const fn length(&self) -> u16 {
        self.length
    }

    /// Get object ID
    #[must_use]
    pub const fn object_id(&self) -> u32 {
        self.object_id
    }

    /// Get instance ID (0 for single-instance objects)
    #[must_use]
    pub const fn instance_id(&self) -> u16 {
        self.instance_id
    }

    /// Whether the instance id is present on the wire
    #[must_use]
    pub const fn is_multi_instance(&self) -> bool {
        self.multi_instance
    }

    /// Header size in bytes, sync included
    #[must_use]
    pub const fn header_len(&self) -> usize {
        header_length(self.multi_instance)
    }

    /// Payload size in bytes
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.length as usize - self.header_len()
    }

    /// Append the encoded header to `out`
    pub fn write_to<B: BufMut>(&self, out: &mut B) {
        out.put_u8(SYNC_VAL);
        out.put_u8(self.kind.as_u8());
        out.put_u16_le(self.length);
        out.put_u32(self.object_id);
        if self.multi_instance {
            out.put_u16_le(self.instance_id);
        }
    }

    /// Encode to a fresh byte vector
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header_len());
        self.write_to(&mut bytes);
        bytes
    }

    /// Header produced by the decoder once the id fields are known.
    pub(crate) fn from_wire(
        kind: FrameKind,
        length: u16,
        object_id: u32,
        instance_id: u16,
        multi_instance: bool,
    ) -> Self {
        Self {
            kind,
            length,
            object_id,
            instance_id,
            multi_instance,
        }
    }
}

//! Frame kinds and instance layout

use std::fmt;

use super::{TYPE_MASK, TYPE_VER};

/// Object link frame kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FrameKind {
    /// Object snapshot, no acknowledgment wanted
    Data = TYPE_VER,
    /// Ask the peer for an object snapshot
    DataRequest = TYPE_VER | 0x01,
    /// Object snapshot, acknowledgment wanted
    DataAcked = TYPE_VER | 0x02,
    /// Positive acknowledgment
    Ack = TYPE_VER | 0x03,
    /// Negative acknowledgment
    Nack = TYPE_VER | 0x04,
}

impl FrameKind {
    /// Convert from the wire type byte, checking the version bits
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        if value & TYPE_MASK != TYPE_VER {
            return None;
        }
        match value & !TYPE_MASK {
            0x00 => Some(Self::Data),
            0x01 => Some(Self::DataRequest),
            0x02 => Some(Self::DataAcked),
            0x03 => Some(Self::Ack),
            0x04 => Some(Self::Nack),
            _ => None,
        }
    }

    /// Convert to the wire type byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether frames of this kind carry an object payload
    #[must_use]
    pub const fn carries_payload(self) -> bool {
        matches!(self, Self::Data | Self::DataAcked)
    }

    /// Response kind that completes an exchange started with this kind
    #[must_use]
    pub const fn expected_response(self) -> Option<Self> {
        match self {
            Self::DataAcked => Some(Self::Ack),
            Self::DataRequest => Some(Self::Data),
            Self::Data | Self::Ack | Self::Nack => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Data => "DATA",
            Self::DataRequest => "DATA_REQUEST",
            Self::DataAcked => "DATA_ACKED",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
        };
        write!(f, "{name}")
    }
}

/// Tells the codec whether an object id carries an instance id on the wire.
///
/// The bit pattern behind this is owned by the object model, so the codec
/// only ever asks.
pub trait InstanceLayout {
    /// Whether `object_id` names a multi-instance object type
    fn is_multi_instance(&self, object_id: u32) -> bool;
}

impl<F> InstanceLayout for F
where
    F: Fn(u32) -> bool,
{
    fn is_multi_instance(&self, object_id: u32) -> bool {
        self(object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_kind_roundtrip() {
        let kinds = [
            FrameKind::Data,
            FrameKind::DataRequest,
            FrameKind::DataAcked,
            FrameKind::Ack,
            FrameKind::Nack,
        ];

        for kind in kinds {
            let byte = kind.as_u8();
            assert_eq!(byte & TYPE_MASK, TYPE_VER);
            assert_eq!(FrameKind::from_u8(byte), Some(kind));
        }
    }

    #[test]
    fn test_wrong_version_rejected() {
        assert_eq!(FrameKind::from_u8(0x10), None);
        assert_eq!(FrameKind::from_u8(0x40), None);
        assert_eq!(FrameKind::from_u8(0x25), None);
        assert_eq!(FrameKind::from_u8(0x27), None);
    }

    #[test]
    fn test_expected_responses() {
        assert_eq!(FrameKind::DataAcked.expected_response(), Some(FrameKind::Ack));
        assert_eq!(FrameKind::DataRequest.expected_response(), Some(FrameKind::Data));
        assert_eq!(FrameKind::Data.expected_response(), None);
        assert!(FrameKind::DataAcked.carries_payload());
        assert!(!FrameKind::Nack.carries_payload());
    }

    #[test]
    fn test_closure_layout() {
        let layout = |object_id: u32| object_id & 1 == 1;
        assert!(layout.is_multi_instance(0x1001));
        assert!(!layout.is_multi_instance(0x1000));
    }
}

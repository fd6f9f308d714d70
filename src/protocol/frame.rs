//! Object link frame

use bytes::Bytes;

use super::{FrameKind, InstanceLayout, Result};

/// One complete protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    object_id: u32,
    instance_id: u16,
    payload: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(kind: FrameKind, object_id: u32, instance_id: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            object_id,
            instance_id,
            payload: payload.into(),
        }
    }

    /// Object snapshot frame
    pub fn data(object_id: u32, instance_id: u16, payload: impl Into<Bytes>) -> Self {
        Self::new(FrameKind::Data, object_id, instance_id, payload)
    }

    /// Snapshot request frame
    #[must_use]
    pub fn request(object_id: u32, instance_id: u16) -> Self {
        Self::new(FrameKind::DataRequest, object_id, instance_id, Bytes::new())
    }

    /// Positive acknowledgment frame
    #[must_use]
    pub fn ack(object_id: u32, instance_id: u16) -> Self {
        Self::new(FrameKind::Ack, object_id, instance_id, Bytes::new())
    }

    /// Negative acknowledgment frame
    #[must_use]
    pub fn nack(object_id: u32, instance_id: u16) -> Self {
        Self::new(FrameKind::Nack, object_id, instance_id, Bytes::new())
    }

    /// Get frame kind
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Get object ID
    #[must_use]
    pub const fn object_id(&self) -> u32 {
        self.object_id
    }

    /// Get instance ID
    #[must_use]
    pub const fn instance_id(&self) -> u16 {
        self.instance_id
    }

    /// Get payload
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the frame, returning its payload
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Encode frame to bytes
    pub fn encode(&self, multi_instance: bool) -> Result<Vec<u8>> {
        super::encode(
            self.kind,
            self.object_id,
            self.instance_id,
            &self.payload,
            multi_instance,
        )
    }

    /// Checksum this frame carries on the wire
    pub fn checksum(&self, multi_instance: bool) -> Result<u8> {
        let encoded = self.encode(multi_instance)?;
        Ok(encoded[encoded.len() - 1])
    }

    /// Decode the first frame in `bytes`
    pub fn decode<L: InstanceLayout + ?Sized>(bytes: &[u8], layout: &L) -> Result<Self> {
        super::decode(bytes, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc;

    fn single(_: u32) -> bool {
        false
    }

    #[test]
    fn test_frame_creation() {
        let frame = Frame::data(0x1000, 0, vec![1, 2, 3]);

        assert_eq!(frame.kind(), FrameKind::Data);
        assert_eq!(frame.object_id(), 0x1000);
        assert_eq!(frame.payload().as_ref(), &[1, 2, 3]);
        assert!(Frame::ack(1, 2).payload().is_empty());
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Frame::data(0x1000, 0, vec![0x01, 0x02, 0x03, 0x04]);
        let encoded = original.encode(false).unwrap();
        let decoded = Frame::decode(&encoded, &single).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_checksum_skips_sync() {
        let frame = Frame::request(0x2000, 0);
        let encoded = frame.encode(false).unwrap();
        let body = &encoded[1..encoded.len() - 1];
        assert_eq!(frame.checksum(false).unwrap(), crc::checksum(body));
    }
}

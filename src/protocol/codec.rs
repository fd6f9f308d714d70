//! Object link frame codec (encode/decode)

use bytes::{BufMut, BytesMut};

use super::crc;
use super::{
    CHECKSUM_LENGTH, DecodeStatus, Error, Frame, FrameDecoder, FrameHeader, FrameKind,
    InstanceLayout, MIN_HEADER_LENGTH, Result,
};

/// Encode a frame to bytes
///
/// # Format
///
/// ```text
/// [HEADER (8 or 10 bytes)] [PAYLOAD (0-256 bytes)] [CRC-8 (1 byte)]
/// ```
///
/// The instance id is written only when `multi_instance` is set.
///
/// # Errors
///
/// Returns an error if the payload exceeds 256 bytes, or if a payload is
/// supplied for a request or acknowledgment.
pub fn encode(
    kind: FrameKind,
    object_id: u32,
    instance_id: u16,
    payload: &[u8],
    multi_instance: bool,
) -> Result<Vec<u8>> {
    let mut out = BytesMut::new();
    encode_into(
        &mut out,
        kind,
        object_id,
        instance_id,
        payload,
        multi_instance,
    )?;
    Ok(out.to_vec())
}

/// Append an encoded frame to `out`, returning the number of bytes written.
///
/// Nothing is appended when encoding fails.
pub fn encode_into(
    out: &mut BytesMut,
    kind: FrameKind,
    object_id: u32,
    instance_id: u16,
    payload: &[u8],
    multi_instance: bool,
) -> Result<usize> {
    let header = FrameHeader::new(kind, object_id, instance_id, multi_instance, payload.len())?;
    let start = out.len();
    out.reserve(usize::from(header.length()) + CHECKSUM_LENGTH);

    header.write_to(out);
    out.put_slice(payload);

    // Checksum covers type..payload, sync excluded
    let checksum = crc::checksum(&out[start + 1..]);
    out.put_u8(checksum);

    Ok(out.len() - start)
}

/// Decode the first complete frame found in `bytes`
///
/// Leading garbage is skipped the same way the streaming decoder skips it.
///
/// # Errors
///
/// Returns the first decode error hit, or `BufferTooSmall` if the buffer
/// ends before a frame completes.
pub fn decode<L: InstanceLayout + ?Sized>(bytes: &[u8], layout: &L) -> Result<Frame> {
    let mut decoder = FrameDecoder::new();
    for &byte in bytes {
        match decoder.feed(byte, layout) {
            DecodeStatus::Incomplete => {}
            DecodeStatus::FrameReady(frame) => return Ok(frame),
            DecodeStatus::Error(err) => return Err(err),
        }
    }

    Err(Error::BufferTooSmall {
        needed: decoder.bytes_consumed().max(MIN_HEADER_LENGTH) + 1,
        got: bytes.len(),
    })
}

//! Streaming frame decoder.
//!
//! Bytes are fed one at a time through an explicit state machine:
//!
//! ```text
//! SYNC -> TYPE -> SIZE -> OBJID -> [INSTID] -> DATA -> CHECKSUM
//! ```
//!
//! Any byte that does not fit the frame in progress fails that frame and
//! returns the decoder to `SYNC`, where bytes are discarded until the next
//! sync marker. A rejected byte that is itself a sync marker starts the next
//! frame instead, as does a sync marker where the type byte was expected. A
//! corrupted or truncated frame therefore costs at most the bytes up to the
//! next sync byte, never a stuck decoder.

use bytes::{BufMut, BytesMut};

use super::crc;
use super::{
    Error, Frame, FrameHeader, FrameKind, InstanceLayout, MAX_FRAME_LENGTH, MAX_PACKET_LENGTH,
    MAX_PAYLOAD_LENGTH, MIN_HEADER_LENGTH, SYNC_VAL, header_length,
};

/// Outcome of feeding one byte.
#[derive(Debug)]
pub enum DecodeStatus {
    /// The byte was consumed; no frame is complete yet.
    Incomplete,
    /// The byte completed a valid frame.
    FrameReady(Frame),
    /// The frame in progress was rejected.
    Error(Error),
}

/// Decoder state, carrying the fields decoded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Sync,
    Type,
    Size {
        kind: FrameKind,
        value: u16,
        collected: u8,
    },
    ObjectId {
        kind: FrameKind,
        length: u16,
        value: u32,
        collected: u8,
    },
    InstanceId {
        kind: FrameKind,
        length: u16,
        object_id: u32,
        value: u16,
        collected: u8,
    },
    Data {
        header: FrameHeader,
        remaining: usize,
    },
    Checksum {
        header: FrameHeader,
    },
}

/// Byte-at-a-time frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    state: State,
    crc: u8,
    payload: BytesMut,
    raw: BytesMut,
}

impl FrameDecoder {
    /// Create a decoder waiting for a sync byte.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Sync,
            crc: 0,
            payload: BytesMut::with_capacity(MAX_PAYLOAD_LENGTH),
            raw: BytesMut::with_capacity(MAX_PACKET_LENGTH),
        }
    }

    /// Feed one byte.
    ///
    /// `layout` is consulted once the object id is complete to decide whether
    /// an instance id follows.
    pub fn feed<L: InstanceLayout + ?Sized>(&mut self, byte: u8, layout: &L) -> DecodeStatus {
        if self.state == State::Sync {
            if byte == SYNC_VAL {
                self.begin_frame();
            }
            return DecodeStatus::Incomplete;
        }

        if self.state == State::Type && byte == SYNC_VAL {
            // The previous sync byte was line noise.
            self.begin_frame();
            return DecodeStatus::Incomplete;
        }

        self.raw.put_u8(byte);

        match self.state {
            State::Sync => DecodeStatus::Incomplete,

            State::Type => match FrameKind::from_u8(byte) {
                Some(kind) => {
                    self.crc = crc::update(self.crc, byte);
                    self.state = State::Size {
                        kind,
                        value: 0,
                        collected: 0,
                    };
                    DecodeStatus::Incomplete
                }
                None => self.fail(Error::InvalidFrameType { type_byte: byte }),
            },

            State::Size {
                kind,
                value,
                collected,
            } => {
                self.crc = crc::update(self.crc, byte);
                let value = value | (u16::from(byte) << (8 * collected));
                if collected + 1 < 2 {
                    self.state = State::Size {
                        kind,
                        value,
                        collected: collected + 1,
                    };
                    return DecodeStatus::Incomplete;
                }

                let length = usize::from(value);
                if length > MAX_FRAME_LENGTH {
                    return self.fail(Error::FrameTooLarge {
                        length,
                        max: MAX_FRAME_LENGTH,
                    });
                }
                if length < MIN_HEADER_LENGTH {
                    return self.fail(Error::InvalidLength { length });
                }

                self.state = State::ObjectId {
                    kind,
                    length: value,
                    value: 0,
                    collected: 0,
                };
                DecodeStatus::Incomplete
            }

            State::ObjectId {
                kind,
                length,
                value,
                collected,
            } => {
                self.crc = crc::update(self.crc, byte);
                let value = (value << 8) | u32::from(byte);
                if collected + 1 < 4 {
                    self.state = State::ObjectId {
                        kind,
                        length,
                        value,
                        collected: collected + 1,
                    };
                    return DecodeStatus::Incomplete;
                }

                if layout.is_multi_instance(value) {
                    self.state = State::InstanceId {
                        kind,
                        length,
                        object_id: value,
                        value: 0,
                        collected: 0,
                    };
                    DecodeStatus::Incomplete
                } else {
                    self.enter_data(FrameHeader::from_wire(kind, length, value, 0, false))
                }
            }

            State::InstanceId {
                kind,
                length,
                object_id,
                value,
                collected,
            } => {
                self.crc = crc::update(self.crc, byte);
                let value = value | (u16::from(byte) << (8 * collected));
                if collected + 1 < 2 {
                    self.state = State::InstanceId {
                        kind,
                        length,
                        object_id,
                        value,
                        collected: collected + 1,
                    };
                    return DecodeStatus::Incomplete;
                }

                self.enter_data(FrameHeader::from_wire(kind, length, object_id, value, true))
            }

            State::Data { header, remaining } => {
                self.crc = crc::update(self.crc, byte);
                self.payload.put_u8(byte);
                self.state = if remaining > 1 {
                    State::Data {
                        header,
                        remaining: remaining - 1,
                    }
                } else {
                    State::Checksum { header }
                };
                DecodeStatus::Incomplete
            }

            State::Checksum { header } => {
                if byte != self.crc {
                    return self.fail(Error::ChecksumMismatch {
                        expected: self.crc,
                        found: byte,
                    });
                }

                self.state = State::Sync;
                let payload = self.payload.split().freeze();
                DecodeStatus::FrameReady(Frame::new(
                    header.kind(),
                    header.object_id(),
                    header.instance_id(),
                    payload,
                ))
            }
        }
    }

    /// Raw bytes of the frame in progress, or of the last completed one.
    ///
    /// Starts with the sync byte. Valid until the next sync byte is fed.
    #[must_use]
    pub fn raw_frame(&self) -> &[u8] {
        &self.raw
    }

    /// Bytes consumed for the current frame, sync byte included.
    ///
    /// Zero while searching for sync.
    #[must_use]
    pub fn bytes_consumed(&self) -> usize {
        if self.state == State::Sync {
            0
        } else {
            self.raw.len()
        }
    }

    /// Whether the decoder is between frames.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::Sync
    }

    /// Abandon the frame in progress and wait for the next sync byte.
    pub fn reset(&mut self) {
        self.state = State::Sync;
        self.crc = 0;
        self.payload.clear();
        self.raw.clear();
    }

    fn begin_frame(&mut self) {
        self.reset();
        self.raw.put_u8(SYNC_VAL);
        self.state = State::Type;
    }

    fn enter_data(&mut self, header: FrameHeader) -> DecodeStatus {
        let length = usize::from(header.length());
        let header_len = header_length(header.is_multi_instance());
        if length < header_len {
            return self.fail(Error::InvalidLength { length });
        }

        let payload_len = length - header_len;
        if payload_len > MAX_PAYLOAD_LENGTH {
            return self.fail(Error::FrameTooLarge {
                length,
                max: header_len + MAX_PAYLOAD_LENGTH,
            });
        }
        if payload_len > 0 && !header.kind().carries_payload() {
            return self.fail(Error::InvalidLength { length });
        }

        self.state = if payload_len == 0 {
            State::Checksum { header }
        } else {
            State::Data {
                header,
                remaining: payload_len,
            }
        };
        DecodeStatus::Incomplete
    }

    fn fail(&mut self, err: Error) -> DecodeStatus {
        if self.raw.last() == Some(&SYNC_VAL) {
            self.begin_frame();
        } else {
            self.state = State::Sync;
            self.crc = 0;
            self.payload.clear();
        }
        DecodeStatus::Error(err)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

//! Link traffic counters.

/// Direction of frame flow for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameDirection {
    Sent,
    Received,
}

/// Monotonic link counters, zero at engine creation.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Raw bytes written to the link.
    pub tx_bytes: u64,
    /// Raw bytes read from the link, garbage included.
    pub rx_bytes: u64,
    /// Object payload bytes sent.
    pub tx_object_bytes: u64,
    /// Object payload bytes received in valid frames.
    pub rx_object_bytes: u64,
    /// Frames sent.
    pub tx_objects: u64,
    /// Valid frames received.
    pub rx_objects: u64,
    /// Frames that could not be encoded or written.
    pub tx_errors: u64,
    /// Malformed frames and rejected object updates.
    pub rx_errors: u64,
}

impl Stats {
    #[inline]
    pub(crate) fn record_frame(&mut self, direction: FrameDirection, frame_len: usize, payload_len: usize) {
        match direction {
            FrameDirection::Sent => {
                self.tx_bytes += frame_len as u64;
                self.tx_object_bytes += payload_len as u64;
                self.tx_objects += 1;
            }
            FrameDirection::Received => {
                self.rx_object_bytes += payload_len as u64;
                self.rx_objects += 1;
            }
        }
    }

    #[inline]
    pub(crate) fn record_rx_bytes(&mut self, len: usize) {
        self.rx_bytes += len as u64;
    }

    #[inline]
    pub(crate) fn record_error(&mut self, direction: FrameDirection) {
        match direction {
            FrameDirection::Sent => self.tx_errors += 1,
            FrameDirection::Received => self.rx_errors += 1,
        }
    }

    /// Total errors in both directions.
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.tx_errors + self.rx_errors
    }
}

#![allow(dead_code)]

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use objlink::protocol::{self, Frame, SYNC_VAL};
use objlink::transport::{Direction, FrameMirror, Link};
use proptest::prelude::RngCore;
use proptest::test_runner::{RngAlgorithm, TestRng};

/// Link that keeps every written frame.
#[derive(Default)]
pub struct CaptureLink {
    frames: Mutex<Vec<Vec<u8>>>,
    fail: AtomicBool,
}

impl CaptureLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }

    /// Decode every captured frame with the given layout.
    pub fn take_frames(&self, multi_instance: fn(u32) -> bool) -> Vec<Frame> {
        self.take()
            .iter()
            .map(|bytes| protocol::decode(bytes, &multi_instance).expect("captured frame decodes"))
            .collect()
    }
}

impl Link for CaptureLink {
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link down"));
        }
        self.frames.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

/// Mirror that records what it sees.
#[derive(Default)]
pub struct CaptureMirror {
    pub seen: Mutex<Vec<(Direction, Vec<u8>)>>,
}

impl FrameMirror for CaptureMirror {
    fn mirror(&self, direction: Direction, frame: &[u8]) {
        self.seen.lock().unwrap().push((direction, frame.to_vec()));
    }
}

/// Seeded noise source for link simulations.
pub struct LineNoise(TestRng);

impl LineNoise {
    pub fn seeded(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        Self(TestRng::from_seed(RngAlgorithm::ChaCha, &bytes))
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.0.next_u64() % bound
    }

    /// Random byte that is never the sync marker.
    pub fn noise_byte(&mut self) -> u8 {
        let byte = self.0.next_u32() as u8;
        if byte == SYNC_VAL { 0 } else { byte }
    }
}

/// Object ids with bit 0 set are multi-instance in these tests.
pub fn odd_is_multi(object_id: u32) -> bool {
    object_id & 1 == 1
}

//! Two engines talking over a simulated lossy serial link.

mod common;

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use common::LineNoise;
use objlink::engine::{Completion, Engine, EngineConfig, MemoryStore, ObjectStore};
use objlink::protocol::{ALL_INSTANCES, FrameKind, SYNC_VAL};
use objlink::transport::Link;

const ATTITUDE: u32 = 0x0100;
const GAINS: u32 = 0x0200;
const WAYPOINT: u32 = 0x0301;

/// One direction of the wire; every write is one frame.
#[derive(Default)]
struct QueueLink {
    frames: Mutex<VecDeque<Vec<u8>>>,
}

impl Link for QueueLink {
    fn write_bytes(&self, bytes: &[u8]) -> io::Result<()> {
        self.frames.lock().unwrap().push_back(bytes.to_vec());
        Ok(())
    }
}

struct Node {
    engine: Engine,
    store: Arc<MemoryStore>,
    outbox: Arc<QueueLink>,
    completed: Arc<Mutex<Vec<Completion>>>,
    failed: Arc<Mutex<Vec<(u32, u16)>>>,
}

impl Node {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        store.register(ATTITUDE, 12, false).unwrap();
        store.register(GAINS, 6, false).unwrap();
        store.register(WAYPOINT, 8, true).unwrap();

        let outbox = Arc::new(QueueLink::default());
        let completed = Arc::new(Mutex::new(Vec::new()));
        let failed = Arc::new(Mutex::new(Vec::new()));
        let (sink, nacked) = (Arc::clone(&completed), Arc::clone(&failed));
        let engine = Engine::new(EngineConfig::default(), store.clone(), outbox.clone())
            .unwrap()
            .with_completion_sink(move |completion: Completion| {
                if !completion.success {
                    nacked
                        .lock()
                        .unwrap()
                        .push((completion.object_id, completion.instance_id));
                }
                sink.lock().unwrap().push(completion);
            });

        Self {
            engine,
            store,
            outbox,
            completed,
            failed,
        }
    }

    /// Re-send whatever is still waiting for an answer or was refused.
    fn retry_pending(&self) {
        let pending = self.engine.pending_transactions();

        // A damaged length can pass the checksum by chance; the peer then
        // refuses the mangled update and NACKs it.
        let refused: Vec<(u32, u16)> = self.failed.lock().unwrap().drain(..).collect();
        for (object_id, instance_id) in refused {
            self.engine.send_object(object_id, instance_id, true, false).unwrap();
        }

        for transaction in pending {
            let object_id = transaction.object_id();
            let instance_id = transaction.instance_id();
            match transaction.expected_response() {
                FrameKind::Ack => {
                    self.engine.send_object(object_id, instance_id, true, false).unwrap();
                }
                FrameKind::Data => {
                    self.engine.send_object_request(object_id, instance_id, false).unwrap();
                }
                other => panic!("unexpected pending response {other}"),
            }
        }
    }

    fn is_quiet(&self) -> bool {
        self.engine.pending_transactions().is_empty() && self.failed.lock().unwrap().is_empty()
    }

    fn successes(&self) -> usize {
        self.completed.lock().unwrap().iter().filter(|c| c.success).count()
    }
}

/// Move queued frames from `from` to `to`, dropping some, damaging some and
/// padding with line noise that may end in a stray sync byte.
fn deliver(from: &Node, to: &Node, rng: &mut LineNoise) {
    let frames: Vec<Vec<u8>> = from.outbox.frames.lock().unwrap().drain(..).collect();

    let mut wire = Vec::new();
    for mut frame in frames {
        for _ in 0..rng.below(4) {
            wire.push(rng.noise_byte());
        }
        if rng.below(4) == 0 {
            wire.push(SYNC_VAL);
        }
        match rng.below(6) {
            0 => continue,
            // Anywhere past the sync byte, length field included.
            1 => {
                let at = 1 + rng.below(frame.len() as u64 - 1) as usize;
                frame[at] ^= 1 + rng.below(255) as u8;
            }
            2 => {
                let at = 2 + rng.below(2) as usize;
                frame[at] ^= 1 << rng.below(8);
            }
            _ => {}
        }
        wire.extend_from_slice(&frame);
    }

    let mut rest = &wire[..];
    while !rest.is_empty() {
        let take = (1 + rng.below(32)) as usize;
        let (chunk, tail) = rest.split_at(take.min(rest.len()));
        to.engine.on_bytes_received(chunk);
        rest = tail;
    }
}

fn run_until_quiet(a: &Node, b: &Node, rng: &mut LineNoise) {
    for _ in 0..64 {
        deliver(a, b, rng);
        deliver(b, a, rng);
        if a.is_quiet() && b.is_quiet() {
            return;
        }
        a.retry_pending();
        b.retry_pending();
    }
    panic!("link did not settle");
}

#[test]
fn acked_updates_converge_over_lossy_link() {
    let mut rng = LineNoise::seeded(0x5EED);
    let a = Node::new();
    let b = Node::new();

    a.store.set(ATTITUDE, 0, &[7; 12]).unwrap();
    a.store.set(GAINS, 0, &[1, 2, 3, 4, 5, 6]).unwrap();
    a.store.set(WAYPOINT, 1, &[0x11; 8]).unwrap();
    a.store.set(WAYPOINT, 2, &[0x22; 8]).unwrap();

    a.engine.send_object(ATTITUDE, 0, true, false).unwrap();
    a.engine.send_object(GAINS, 0, true, false).unwrap();
    a.engine.send_object(WAYPOINT, ALL_INSTANCES, true, true).unwrap();

    run_until_quiet(&a, &b, &mut rng);

    assert_eq!(a.successes(), 5);
    for (object_id, instance_id) in [(ATTITUDE, 0), (GAINS, 0), (WAYPOINT, 0), (WAYPOINT, 1), (WAYPOINT, 2)] {
        assert_eq!(
            b.store.get(object_id, instance_id).unwrap(),
            a.store.get(object_id, instance_id).unwrap(),
            "object {object_id:#x} instance {instance_id}"
        );
    }

    let rx = b.engine.stats();
    assert!(rx.rx_objects >= 5);
    assert!(rx.rx_bytes > rx.rx_object_bytes);
}

#[test]
fn requests_pull_remote_state() {
    let mut rng = LineNoise::seeded(42);
    let a = Node::new();
    let b = Node::new();

    a.store.set(GAINS, 0, &[9, 8, 7, 6, 5, 4]).unwrap();
    a.store.set(WAYPOINT, 0, &[0xA0; 8]).unwrap();
    a.store.set(WAYPOINT, 1, &[0xA1; 8]).unwrap();
    b.store.set(WAYPOINT, 1, &[0; 8]).unwrap();

    b.engine.send_object_request(GAINS, 0, false).unwrap();
    b.engine.send_object_request(WAYPOINT, ALL_INSTANCES, false).unwrap();
    assert_eq!(b.engine.pending_transactions().len(), 3);

    run_until_quiet(&a, &b, &mut rng);

    assert_eq!(b.successes(), 3);
    assert_eq!(b.store.get(GAINS, 0).unwrap().as_ref(), &[9, 8, 7, 6, 5, 4]);
    assert_eq!(b.store.get(WAYPOINT, 0).unwrap().as_ref(), &[0xA0; 8]);
    assert_eq!(b.store.get(WAYPOINT, 1).unwrap().as_ref(), &[0xA1; 8]);

    // Plain DATA answers never need acknowledging.
    assert!(a.engine.pending_transactions().is_empty());
}

#[test]
fn noisy_link_counts_damage_without_losing_sync() {
    let mut rng = LineNoise::seeded(7);
    let a = Node::new();
    let b = Node::new();

    for round in 0..20u8 {
        a.store.set(GAINS, 0, &[round; 6]).unwrap();
        a.engine.send_object(GAINS, 0, false, false).unwrap();
    }
    let sent = a.engine.stats().tx_objects;
    deliver(&a, &b, &mut rng);

    let stats = b.engine.stats();
    assert_eq!(sent, 20);
    assert!(stats.rx_objects > 0);
    assert!(stats.rx_objects <= sent);
    assert!(stats.rx_errors > 0);
    // Only intact frames with the last value can leave it in the store.
    let last = b.store.get(GAINS, 0).unwrap();
    assert!(last.iter().all(|&byte| byte == last[0]));
}

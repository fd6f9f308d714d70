//! Protocol engine: binds an object store to a byte link.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use tracing::{debug, instrument, trace, warn};

use super::stats::{FrameDirection, Stats};
use super::store::{ObjectStore, StoreLayout};
use super::tracker::{Transaction, TransactionTracker};
use crate::protocol::{
    ALL_INSTANCES, DecodeStatus, Error, Frame, FrameDecoder, FrameKind, Result, TX_BUFFER_SIZE,
    encode_into,
};
use crate::transport::{Direction, FrameMirror, Link, MirrorConfig, UdpMirror};

/// Engine configuration options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial capacity of the outbound frame buffer.
    pub tx_buffer_size: usize,
    /// Mirror every raw frame over UDP when set.
    pub mirror: Option<MirrorConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tx_buffer_size: TX_BUFFER_SIZE,
            mirror: None,
        }
    }
}

/// Resolution of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Completion {
    /// Object id of the resolved exchange.
    pub object_id: u32,
    /// Instance id of the resolved exchange.
    pub instance_id: u16,
    /// `true` on ACK or requested DATA, `false` on NACK.
    pub success: bool,
}

/// Receives transaction completions.
///
/// Invoked after the engine lock is released, so a sink may call back into
/// the engine (for example to retry on failure).
pub trait CompletionSink: Send + Sync {
    /// One transaction resolved.
    fn transaction_completed(&self, completion: Completion);
}

impl<F> CompletionSink for F
where
    F: Fn(Completion) + Send + Sync,
{
    fn transaction_completed(&self, completion: Completion) {
        self(completion);
    }
}

/// Outcome for one instance targeted by a send call.
#[derive(Debug)]
pub struct InstanceOutcome {
    /// Instance the frame was built for.
    pub instance_id: u16,
    /// Whether the frame reached the link.
    pub result: Result<()>,
}

/// Per-instance results of a send call.
#[derive(Debug, Default)]
pub struct SendReport {
    outcomes: Vec<InstanceOutcome>,
}

impl SendReport {
    /// All per-instance outcomes, in transmission order.
    #[must_use]
    pub fn outcomes(&self) -> &[InstanceOutcome] {
        &self.outcomes
    }

    /// Whether every targeted instance was sent.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    /// Number of frames written to the link.
    #[must_use]
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Instances that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (u16, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|err| (o.instance_id, err)))
    }

    fn push(&mut self, instance_id: u16, result: Result<()>) {
        self.outcomes.push(InstanceOutcome {
            instance_id,
            result,
        });
    }
}

struct EngineState {
    decoder: FrameDecoder,
    tracker: TransactionTracker,
    stats: Stats,
    tx_buffer: BytesMut,
}

/// Protocol engine
///
/// Every public operation runs under one exclusive lock, so transactions,
/// decoder state, counters and outbound frames are never observed half
/// updated. Completions are delivered after the lock is released.
pub struct Engine {
    store: Arc<dyn ObjectStore>,
    link: Arc<dyn Link>,
    mirror: Option<Arc<dyn FrameMirror>>,
    sink: Option<Arc<dyn CompletionSink>>,
    state: Mutex<EngineState>,
}

impl Engine {
    /// Create an engine over `store` and `link`.
    ///
    /// Binds the UDP mirror socket when the configuration asks for one.
    pub fn new(config: EngineConfig, store: Arc<dyn ObjectStore>, link: Arc<dyn Link>) -> Result<Self> {
        let mirror = match &config.mirror {
            Some(mirror_config) => {
                let mirror: Arc<dyn FrameMirror> = Arc::new(UdpMirror::bind(mirror_config.clone())?);
                Some(mirror)
            }
            None => None,
        };

        Ok(Self {
            store,
            link,
            mirror,
            sink: None,
            state: Mutex::new(EngineState {
                decoder: FrameDecoder::new(),
                tracker: TransactionTracker::new(),
                stats: Stats::default(),
                tx_buffer: BytesMut::with_capacity(config.tx_buffer_size),
            }),
        })
    }

    /// Replace the frame mirror.
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn FrameMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Deliver transaction completions to `sink`.
    #[must_use]
    pub fn with_completion_sink(mut self, sink: impl CompletionSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Send a snapshot of an object.
    ///
    /// With `all_instances` (or the [`ALL_INSTANCES`] sentinel) one frame goes
    /// out per instance known to the store. With `acked` each frame is sent
    /// as `DATA_ACKED` and opens a transaction expecting `ACK`, replacing any
    /// transaction already open for that instance.
    ///
    /// Fails as a whole only if the instance set cannot be determined; a
    /// failure for one instance does not stop the others.
    #[instrument(level = "debug", skip(self))]
    pub fn send_object(
        &self,
        object_id: u32,
        instance_id: u16,
        acked: bool,
        all_instances: bool,
    ) -> Result<SendReport> {
        let kind = if acked {
            FrameKind::DataAcked
        } else {
            FrameKind::Data
        };

        let mut guard = self.lock();
        let state = &mut *guard;
        let multi_instance = self.store.is_multi_instance(object_id);
        let instances = self.expand(state, object_id, instance_id, all_instances, multi_instance)?;

        let mut report = SendReport::default();
        for instance_id in instances {
            let result = match self.store.get(object_id, instance_id) {
                Ok(payload) => self.transmit(
                    state,
                    kind,
                    object_id,
                    instance_id,
                    &payload,
                    multi_instance,
                ),
                Err(err) => {
                    state.stats.record_error(FrameDirection::Sent);
                    Err(err)
                }
            };
            if let Err(err) = &result {
                warn!(object_id, instance_id, error = %err, "object send failed");
            }
            report.push(instance_id, result);
        }
        Ok(report)
    }

    /// Ask the peer for a snapshot of an object.
    ///
    /// Expands instances like [`Engine::send_object`] and opens a transaction
    /// expecting `DATA` per instance.
    #[instrument(level = "debug", skip(self))]
    pub fn send_object_request(
        &self,
        object_id: u32,
        instance_id: u16,
        all_instances: bool,
    ) -> Result<SendReport> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let multi_instance = self.store.is_multi_instance(object_id);
        let instances = self.expand(state, object_id, instance_id, all_instances, multi_instance)?;

        let mut report = SendReport::default();
        for instance_id in instances {
            let result = self.transmit(
                state,
                FrameKind::DataRequest,
                object_id,
                instance_id,
                &[],
                multi_instance,
            );
            if let Err(err) = &result {
                warn!(object_id, instance_id, error = %err, "object request failed");
            }
            report.push(instance_id, result);
        }
        Ok(report)
    }

    /// Abandon the transaction open for this instance.
    ///
    /// The [`ALL_INSTANCES`] sentinel abandons every instance of the object.
    /// A response arriving later is ignored. Returns whether anything was open.
    #[instrument(level = "debug", skip(self))]
    pub fn cancel_transaction(&self, object_id: u32, instance_id: u16) -> bool {
        let mut state = self.lock();
        if instance_id == ALL_INSTANCES {
            state.tracker.cancel_object(object_id) > 0
        } else {
            state.tracker.cancel(object_id, instance_id).is_some()
        }
    }

    /// Abandon every open transaction.
    pub fn cancel_all_transactions(&self) -> usize {
        self.lock().tracker.cancel_all()
    }

    /// Forget the partial frame and all open transactions, as after a
    /// transport reconnect.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&self) {
        let mut state = self.lock();
        state.decoder.reset();
        let abandoned = state.tracker.cancel_all();
        debug!(abandoned, "engine reset");
    }

    /// Transaction open for this instance, if any.
    #[must_use]
    pub fn find_transaction(&self, object_id: u32, instance_id: u16) -> Option<Transaction> {
        self.lock().tracker.find(object_id, instance_id).copied()
    }

    /// Snapshot of every open transaction, for external timeout handling.
    #[must_use]
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.lock().tracker.iter().copied().collect()
    }

    /// Current link counters.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.lock().stats
    }

    /// Zero the link counters.
    pub fn reset_stats(&self) {
        self.lock().stats = Stats::default();
    }

    /// Feed bytes read from the link.
    ///
    /// Malformed frames are dropped and counted; the decoder resynchronizes on
    /// its own, so this never fails.
    pub fn on_bytes_received(&self, bytes: &[u8]) {
        let mut completions = Vec::new();
        {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.stats.record_rx_bytes(bytes.len());

            let layout = StoreLayout(self.store.as_ref());
            for &byte in bytes {
                match state.decoder.feed(byte, &layout) {
                    DecodeStatus::Incomplete => {}
                    DecodeStatus::FrameReady(frame) => {
                        if let Some(mirror) = &self.mirror {
                            mirror.mirror(Direction::Inbound, state.decoder.raw_frame());
                        }
                        state.stats.record_frame(
                            FrameDirection::Received,
                            state.decoder.raw_frame().len(),
                            frame.payload().len(),
                        );
                        trace!(kind = %frame.kind(), object_id = frame.object_id(), instance_id = frame.instance_id(), "frame received");
                        self.dispatch(state, &frame, &mut completions);
                    }
                    DecodeStatus::Error(err) => {
                        state.stats.record_error(FrameDirection::Received);
                        debug!(error = %err, "dropped malformed frame");
                    }
                }
            }
        }

        self.notify(completions);
    }

    fn dispatch(&self, state: &mut EngineState, frame: &Frame, completions: &mut Vec<Completion>) {
        let object_id = frame.object_id();
        let instance_id = frame.instance_id();

        match frame.kind() {
            FrameKind::Data | FrameKind::DataAcked => {
                self.apply_update(state, frame, completions);
            }
            FrameKind::DataRequest => self.answer_request(state, object_id, instance_id),
            FrameKind::Ack => {
                let pending = state.tracker.find(object_id, instance_id).copied();
                if let Some(transaction) = pending {
                    if transaction.expected_response() == FrameKind::Ack {
                        Self::resolve(state, &transaction, true, completions);
                    }
                }
            }
            FrameKind::Nack => {
                let pending = state.tracker.find(object_id, instance_id).copied();
                if let Some(transaction) = pending {
                    Self::resolve(state, &transaction, false, completions);
                }
            }
        }
    }

    fn apply_update(&self, state: &mut EngineState, frame: &Frame, completions: &mut Vec<Completion>) {
        let object_id = frame.object_id();
        let instance_id = frame.instance_id();
        let acked = frame.kind() == FrameKind::DataAcked;

        let applied = if instance_id == ALL_INSTANCES {
            Err(Error::UnknownInstance {
                object_id,
                instance_id,
            })
        } else {
            self.store.set(object_id, instance_id, frame.payload())
        };

        let reply = match applied {
            Ok(()) => {
                let pending = state.tracker.find(object_id, instance_id).copied();
                if let Some(transaction) = pending {
                    if transaction.expected_response() == FrameKind::Data {
                        Self::resolve(state, &transaction, true, completions);
                    }
                }
                FrameKind::Ack
            }
            Err(err) => {
                state.stats.record_error(FrameDirection::Received);
                warn!(object_id, instance_id, error = %err, "object update rejected");
                FrameKind::Nack
            }
        };

        if acked {
            let multi_instance = self.store.is_multi_instance(object_id);
            if let Err(err) = self.transmit(state, reply, object_id, instance_id, &[], multi_instance) {
                trace!(%reply, object_id, instance_id, error = %err, "update reply not sent");
            }
        }
    }

    fn answer_request(&self, state: &mut EngineState, object_id: u32, instance_id: u16) {
        let multi_instance = self.store.is_multi_instance(object_id);
        let instances = if instance_id == ALL_INSTANCES {
            self.store.list_instances(object_id)
        } else {
            Ok(vec![instance_id])
        };

        let instances = match instances {
            Ok(instances) => instances,
            Err(err) => {
                state.stats.record_error(FrameDirection::Received);
                warn!(object_id, instance_id, error = %err, "request for unknown object");
                if let Err(err) = self.transmit(state, FrameKind::Nack, object_id, instance_id, &[], multi_instance) {
                    trace!(object_id, instance_id, error = %err, "request NACK not sent");
                }
                return;
            }
        };

        for instance_id in instances {
            let answered = match self.store.get(object_id, instance_id) {
                Ok(payload) => self.transmit(
                    state,
                    FrameKind::Data,
                    object_id,
                    instance_id,
                    &payload,
                    multi_instance,
                ),
                Err(err) => {
                    state.stats.record_error(FrameDirection::Received);
                    warn!(object_id, instance_id, error = %err, "request for unknown instance");
                    self.transmit(state, FrameKind::Nack, object_id, instance_id, &[], multi_instance)
                }
            };
            if let Err(err) = answered {
                trace!(object_id, instance_id, error = %err, "request answer not sent");
            }
        }
    }

    /// Encode one frame into the outbound buffer and write it to the link.
    ///
    /// Frames that expect a response open their transaction before the write
    /// and roll it back if the write fails.
    fn transmit(
        &self,
        state: &mut EngineState,
        kind: FrameKind,
        object_id: u32,
        instance_id: u16,
        payload: &[u8],
        multi_instance: bool,
    ) -> Result<()> {
        state.tx_buffer.clear();
        if let Err(err) = encode_into(
            &mut state.tx_buffer,
            kind,
            object_id,
            instance_id,
            payload,
            multi_instance,
        ) {
            state.stats.record_error(FrameDirection::Sent);
            return Err(err);
        }

        let expected = kind.expected_response();
        if let Some(expected) = expected {
            if let Some(replaced) = state.tracker.open(expected, object_id, instance_id) {
                debug!(object_id, instance_id, expected = %replaced.expected_response(), "superseded open transaction");
            }
        }

        if let Err(err) = self.link.write_bytes(&state.tx_buffer) {
            state.stats.record_error(FrameDirection::Sent);
            if expected.is_some() {
                state.tracker.cancel(object_id, instance_id);
            }
            warn!(%kind, object_id, instance_id, error = %err, "link write failed");
            return Err(err.into());
        }

        if let Some(mirror) = &self.mirror {
            mirror.mirror(Direction::Outbound, &state.tx_buffer);
        }
        state
            .stats
            .record_frame(FrameDirection::Sent, state.tx_buffer.len(), payload.len());
        trace!(%kind, object_id, instance_id, len = state.tx_buffer.len(), "frame sent");
        Ok(())
    }

    fn expand(
        &self,
        state: &mut EngineState,
        object_id: u32,
        instance_id: u16,
        all_instances: bool,
        multi_instance: bool,
    ) -> Result<Vec<u16>> {
        if !all_instances && instance_id != ALL_INSTANCES {
            // Single-instance objects travel as instance 0; track them that way too.
            let instance_id = if multi_instance { instance_id } else { 0 };
            return Ok(vec![instance_id]);
        }
        self.store.list_instances(object_id).inspect_err(|err| {
            state.stats.record_error(FrameDirection::Sent);
            warn!(object_id, error = %err, "cannot expand instances");
        })
    }

    fn resolve(
        state: &mut EngineState,
        transaction: &Transaction,
        success: bool,
        completions: &mut Vec<Completion>,
    ) {
        if state.tracker.close(transaction) {
            completions.push(Completion {
                object_id: transaction.object_id(),
                instance_id: transaction.instance_id(),
                success,
            });
        }
    }

    fn notify(&self, completions: Vec<Completion>) {
        for completion in completions {
            debug!(
                object_id = completion.object_id,
                instance_id = completion.instance_id,
                success = completion.success,
                "transaction completed"
            );
            if let Some(sink) = &self.sink {
                sink.transaction_completed(completion);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("mirror", &self.mirror.is_some())
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

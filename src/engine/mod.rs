//! Protocol engine, transaction tracking, and the object store seam.

#[allow(clippy::module_inception)]
mod engine;
mod stats;
mod store;
mod tracker;

pub use engine::{Completion, CompletionSink, Engine, EngineConfig, InstanceOutcome, SendReport};
pub use stats::Stats;
pub use store::{MemoryStore, ObjectStore};
pub use tracker::{Transaction, TransactionTracker};

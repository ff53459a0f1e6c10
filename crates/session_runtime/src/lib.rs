//! session_runtime: sharded per-session actors.
//!
//! A firehose of fixed-size input records is split across shards by session
//! id. Inside a shard each session gets one actor task with a bounded queue;
//! actors are created on first record, yield after every record, and are
//! evicted after sitting idle past the timeout.
//!
//! - `record`: record layout, control messages, the state step.
//! - `actor`: the per-session task and its lifecycle events.
//! - `shard`: routing table, sweep, drain loop, graceful shutdown.
//! - `runtime`: one thread per shard plus the `Ingest` router.
//! - `synthetic`: a load generator for benchmarks.

pub mod actor;
pub mod record;
pub mod runtime;
pub mod shard;
pub mod synthetic;

pub use actor::{EventSink, SessionEvent};
pub use record::{Control, InputRecord, RecordError, SessionId, SessionState, INPUT_BYTES, RECORD_BYTES, STATE_BYTES};
pub use runtime::{Ingest, IngestError, SessionRuntime};
pub use shard::{RecordSource, Shard, ShardConfig, ShardReport, SlotHandle};
pub use synthetic::SyntheticFeed;

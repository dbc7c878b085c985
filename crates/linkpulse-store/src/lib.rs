//! linkpulse-store — measurement result store for LinkPulse.
//!
//! Backed by [rusqlite](https://docs.rs/rusqlite), provides a durable
//! append-only log of measurement attempts plus a small key/value
//! metadata table. Supports on-disk and in-memory backends (the latter
//! for testing).
//!
//! # Architecture
//!
//! All writes go through a single `Arc<Mutex<Connection>>` — the store
//! is `Clone` + `Send` + `Sync` and every call holds the lock for its
//! full duration, so concurrent callers (scheduler job vs. manual
//! trigger) are serialized and each read observes a consistent snapshot.
//!
//! Records are immutable once written; they are only removed en masse by
//! age-based pruning. Schema upgrades are additive: a column that
//! already exists is a non-fatal no-op, any other migration error
//! propagates.

pub mod error;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::ResultStore;
pub use types::{MeasurementRecord, NewRecord, NO_SERVER};

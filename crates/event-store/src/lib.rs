//! Event store for the showtime service.
//!
//! Every showing and movie is stored as a stream of events keyed by its
//! [`AggregateId`]. Appends carry the version the writer last saw; the store
//! accepts them only if the stream is still at that version. That
//! compare-and-swap is what makes seat transitions atomic per showing.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt};

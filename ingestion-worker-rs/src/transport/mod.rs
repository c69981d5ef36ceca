//! Collaborator boundaries
//!
//! The pipeline talks to the outside world through three traits: a job
//! source feeding raw requests, an envelope sink confirming delivery, and a
//! status store recording repository state. Each has a production backend
//! and an in-process one for embedding and tests.

pub mod sink;
pub mod source;
pub mod status;

pub use sink::{DeliveryReceipt, EnvelopeSink, HttpEnvelopeSink, MemoryEnvelopeSink, SinkError, StdoutEnvelopeSink};
pub use source::{ChannelJobSource, JobSource, LineJobSource};
pub use status::{MemoryStatusStore, PgStatusStore, StatusError, StatusStore, StatusTransition};

//! Ordered rule tables for change request classification.
//!
//! Each rule is a pure function over an evidence struct. The first rule
//! that fires decides the outcome, so precedence is the table order.

pub mod rejection;
pub mod revert;

pub use rejection::{classify_rejection, RejectionEvidence};
pub use revert::{classify_revert, mentions_revert, RevertEvidence};

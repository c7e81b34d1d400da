//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Every successful body is wrapped in an [`Envelope`].

pub mod auth;
pub mod referendum;
pub mod vote;
pub mod voter;

mod envelope;
mod id;

pub use envelope::{Empty, Envelope};
pub use id::ApiId;

//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod referendum;
pub mod scc;
pub mod vote;
pub mod voter;

pub use referendum::{NewReferendum, Referendum, ReferendumCore, ReferendumOption};
pub use scc::Scc;
pub use vote::{NewVote, Vote, VoteCore};
pub use voter::{NewVoter, Voter, VoterCore};

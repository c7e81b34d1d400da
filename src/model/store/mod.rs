//! The persistence boundary of the core.
//!
//! Every mutation of referendum, vote, or voter state happens inside a
//! [`Transaction`], which is all-or-nothing: dropping it without calling
//! [`Transaction::commit`] discards every change it made.

use crate::error::Result;
use crate::model::{
    common::{referendum::ReferendumStatus, tally::Tally},
    db::{NewReferendum, NewVote, NewVoter, Referendum, ReferendumOption, Vote, Voter},
    mongodb::Id,
};

mod memory;

pub use memory::MemoryStore;

/// A durable store for voters, referendums, and votes.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// Start a new transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction + '_>>;

    async fn voter(&self, id: Id) -> Result<Option<Voter>>;

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>>;

    /// All voters, oldest first.
    async fn voters(&self) -> Result<Vec<Voter>>;

    /// Make sure every given SCC exists. Existing codes keep their state.
    async fn ensure_sccs_exist(&self, codes: &[String]) -> Result<()>;
}

/// A unit of work against a [`Store`].
///
/// Mutating operations on the same referendum are serialised by
/// [`Transaction::lock_referendum`]: a transaction that has locked a referendum
/// either commits before any other transaction locking it, or fails.
#[rocket::async_trait]
pub trait Transaction: Send {
    /// Read a referendum without locking it.
    async fn referendum(&mut self, id: Id) -> Result<Option<Referendum>>;

    /// Read a referendum and claim it for writing until this transaction ends.
    async fn lock_referendum(&mut self, id: Id) -> Result<Option<Referendum>>;

    /// All referendums, oldest first.
    async fn referendums(&mut self) -> Result<Vec<Referendum>>;

    async fn insert_referendum(&mut self, referendum: &NewReferendum) -> Result<Id>;

    /// Replace the title, description, and the whole option set.
    async fn replace_content(
        &mut self,
        id: Id,
        title: &str,
        description: &str,
        options: &[ReferendumOption],
    ) -> Result<()>;

    async fn set_state(&mut self, id: Id, status: ReferendumStatus, locked: bool) -> Result<()>;

    /// The vote `voter` cast in `referendum`, if any.
    async fn vote(&mut self, referendum: Id, voter: Id) -> Result<Option<Vote>>;

    /// Record a vote. Fails with [`crate::error::Error::DuplicateVote`] if the
    /// voter already voted in this referendum, whatever the interleaving.
    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Id>;

    async fn tally(&mut self, referendum: Id) -> Result<Tally>;

    /// The number of registered voters.
    async fn count_voters(&mut self) -> Result<u64>;

    /// Register a voter. Fails with [`crate::error::Error::EmailTaken`] on a
    /// duplicate email.
    async fn insert_voter(&mut self, voter: &NewVoter) -> Result<Id>;

    /// Mark an unused SCC as used by `voter`. Returns false if the code does not
    /// exist or was already used.
    async fn claim_scc(&mut self, code: &str, voter: Id) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

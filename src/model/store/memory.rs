use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rocket::tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Error, Result};
use crate::model::{
    common::{referendum::ReferendumStatus, tally::Tally},
    db::{NewReferendum, NewVote, NewVoter, Referendum, ReferendumOption, Vote, Voter},
    mongodb::Id,
};

use super::{Store, Transaction};

/// Every row the store holds. IDs order by creation time, so the maps
/// iterate oldest first.
#[derive(Debug, Clone, Default)]
struct Tables {
    referendums: BTreeMap<Id, Referendum>,
    voters: BTreeMap<Id, Voter>,
    votes: BTreeMap<Id, Vote>,
    sccs: HashMap<String, Option<Id>>,
}

/// A process-local store.
///
/// A transaction holds the table lock from `begin` until it is committed or
/// dropped, so transactions are fully serialised. Writes are staged on a copy
/// of the tables and only published by `commit`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn voter(&self, id: Id) -> Result<Option<Voter>> {
        Ok(self.tables.lock().await.voters.get(&id).cloned())
    }

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .values()
            .find(|voter| voter.email == email)
            .cloned())
    }

    async fn voters(&self) -> Result<Vec<Voter>> {
        Ok(self.tables.lock().await.voters.values().cloned().collect())
    }

    async fn ensure_sccs_exist(&self, codes: &[String]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        for code in codes {
            tables.sccs.entry(code.clone()).or_insert(None);
        }
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

impl MemoryTransaction {
    fn referendum_mut(&mut self, id: Id) -> Result<&mut Referendum> {
        self.staged
            .referendums
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Referendum {id}")))
    }
}

#[rocket::async_trait]
impl Transaction for MemoryTransaction {
    async fn referendum(&mut self, id: Id) -> Result<Option<Referendum>> {
        Ok(self.staged.referendums.get(&id).cloned())
    }

    async fn lock_referendum(&mut self, id: Id) -> Result<Option<Referendum>> {
        // The whole store is already held exclusively.
        self.referendum(id).await
    }

    async fn referendums(&mut self) -> Result<Vec<Referendum>> {
        Ok(self.staged.referendums.values().cloned().collect())
    }

    async fn insert_referendum(&mut self, referendum: &NewReferendum) -> Result<Id> {
        let id = Id::new();
        self.staged.referendums.insert(
            id,
            Referendum {
                id,
                referendum: referendum.clone(),
            },
        );
        Ok(id)
    }

    async fn replace_content(
        &mut self,
        id: Id,
        title: &str,
        description: &str,
        options: &[ReferendumOption],
    ) -> Result<()> {
        let referendum = self.referendum_mut(id)?;
        referendum.title = title.to_string();
        referendum.description = description.to_string();
        referendum.options = options.to_vec();
        Ok(())
    }

    async fn set_state(&mut self, id: Id, status: ReferendumStatus, locked: bool) -> Result<()> {
        let referendum = self.referendum_mut(id)?;
        referendum.status = status;
        referendum.locked = locked;
        Ok(())
    }

    async fn vote(&mut self, referendum: Id, voter: Id) -> Result<Option<Vote>> {
        Ok(self
            .staged
            .votes
            .values()
            .find(|vote| vote.referendum_id == referendum && vote.voter_id == voter)
            .cloned())
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Id> {
        // Uniqueness on (referendum_id, voter_id).
        if self.vote(vote.referendum_id, vote.voter_id).await?.is_some() {
            return Err(Error::DuplicateVote(vote.referendum_id));
        }
        let id = Id::new();
        self.staged.votes.insert(
            id,
            Vote {
                id,
                vote: vote.clone(),
            },
        );
        Ok(id)
    }

    async fn tally(&mut self, referendum: Id) -> Result<Tally> {
        let mut counts = HashMap::new();
        for vote in self
            .staged
            .votes
            .values()
            .filter(|vote| vote.referendum_id == referendum)
        {
            *counts.entry(vote.option_id).or_insert(0) += 1;
        }
        Ok(Tally::new(counts))
    }

    async fn count_voters(&mut self) -> Result<u64> {
        Ok(self.staged.voters.len() as u64)
    }

    async fn insert_voter(&mut self, voter: &NewVoter) -> Result<Id> {
        // Uniqueness on email.
        if self.staged.voters.values().any(|v| v.email == voter.email) {
            return Err(Error::EmailTaken(voter.email.clone()));
        }
        let id = Id::new();
        self.staged.voters.insert(
            id,
            Voter {
                id,
                voter: voter.clone(),
            },
        );
        Ok(id)
    }

    async fn claim_scc(&mut self, code: &str, voter: Id) -> Result<bool> {
        match self.staged.sccs.get_mut(code) {
            Some(used_by @ None) => {
                *used_by = Some(voter);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

/// Helpers for tests.
#[cfg(test)]
impl MemoryStore {
    /// Register a voter directly, bypassing registration checks.
    pub async fn insert_voter(&self, voter: NewVoter) -> Id {
        let mut tx = self.begin().await.unwrap();
        let id = tx.insert_voter(&voter).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    /// Register `count` distinct example voters.
    pub async fn insert_example_voters(&self, count: usize) -> Vec<Id> {
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            ids.push(self.insert_voter(NewVoter::example(n)).await);
        }
        ids
    }

    /// The number of stored votes across all referendums.
    pub async fn vote_count(&self) -> usize {
        self.tables.lock().await.votes.len()
    }

    pub async fn scc_owner(&self, code: &str) -> Option<Id> {
        self.tables.lock().await.sccs.get(code).copied().flatten()
    }
}

use std::collections::HashMap;

use mongodb::{
    bson::{doc, to_bson},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument, UpdateOptions},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::{referendum::ReferendumStatus, tally::Tally},
    db::{NewReferendum, NewVote, NewVoter, Referendum, ReferendumOption, Scc, Vote, Voter},
    store::{Store, Transaction},
};

use super::{errors::is_duplicate_key, Coll, Id};

/// A [`Store`] backed by MongoDB.
///
/// Transactions need a replica set or sharded cluster; a standalone server
/// rejects `startTransaction`.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    fn collections(&self) -> Collections {
        Collections {
            referendums: Coll::from_db(&self.db),
            new_referendums: Coll::from_db(&self.db),
            voters: Coll::from_db(&self.db),
            new_voters: Coll::from_db(&self.db),
            votes: Coll::from_db(&self.db),
            new_votes: Coll::from_db(&self.db),
            sccs: Coll::from_db(&self.db),
        }
    }
}

#[derive(Clone)]
struct Collections {
    referendums: Coll<Referendum>,
    new_referendums: Coll<NewReferendum>,
    voters: Coll<Voter>,
    new_voters: Coll<NewVoter>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
    sccs: Coll<Scc>,
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(Box::new(MongoTransaction {
            session,
            colls: self.collections(),
        }))
    }

    async fn voter(&self, id: Id) -> Result<Option<Voter>> {
        Ok(Coll::<Voter>::from_db(&self.db)
            .find_one(id.as_doc(), None)
            .await?)
    }

    async fn voter_by_email(&self, email: &str) -> Result<Option<Voter>> {
        let filter = doc! {
            "email": email,
        };
        Ok(Coll::<Voter>::from_db(&self.db)
            .find_one(filter, None)
            .await?)
    }

    async fn voters(&self) -> Result<Vec<Voter>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        Ok(Coll::<Voter>::from_db(&self.db)
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn ensure_sccs_exist(&self, codes: &[String]) -> Result<()> {
        debug!("Ensuring {} SCC codes exist", codes.len());
        let sccs = Coll::<Scc>::from_db(&self.db);
        let upsert = UpdateOptions::builder().upsert(true).build();
        for code in codes {
            let update = doc! {
                "$setOnInsert": {
                    "used_by": null,
                }
            };
            sccs.update_one(doc! {"_id": code.as_str()}, update, upsert.clone())
                .await?;
        }
        Ok(())
    }
}

/// A MongoDB multi-document transaction. Dropping the session aborts it.
pub struct MongoTransaction {
    session: ClientSession,
    colls: Collections,
}

#[rocket::async_trait]
impl Transaction for MongoTransaction {
    async fn referendum(&mut self, id: Id) -> Result<Option<Referendum>> {
        Ok(self
            .colls
            .referendums
            .find_one_with_session(id.as_doc(), None, &mut self.session)
            .await?)
    }

    async fn lock_referendum(&mut self, id: Id) -> Result<Option<Referendum>> {
        // Writing to the document makes any concurrent transaction that also
        // writes it fail with a transient write conflict.
        let update = doc! {
            "$inc": {
                "revision": 1_i64,
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .colls
            .referendums
            .find_one_and_update_with_session(id.as_doc(), update, options, &mut self.session)
            .await?)
    }

    async fn referendums(&mut self) -> Result<Vec<Referendum>> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let mut cursor = self
            .colls
            .referendums
            .find_with_session(None, options, &mut self.session)
            .await?;
        let mut referendums = Vec::new();
        while let Some(referendum) = cursor.next(&mut self.session).await {
            referendums.push(referendum?);
        }
        Ok(referendums)
    }

    async fn insert_referendum(&mut self, referendum: &NewReferendum) -> Result<Id> {
        let id = self
            .colls
            .new_referendums
            .insert_one_with_session(referendum, None, &mut self.session)
            .await?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::Internal("Inserted referendum has no object ID".to_string()))?;
        Ok(id.into())
    }

    async fn replace_content(
        &mut self,
        id: Id,
        title: &str,
        description: &str,
        options: &[ReferendumOption],
    ) -> Result<()> {
        let options = to_bson(options).map_err(|e| Error::Internal(e.to_string()))?;
        let update = doc! {
            "$set": {
                "title": title,
                "description": description,
                "options": options,
            }
        };
        let result = self
            .colls
            .referendums
            .update_one_with_session(id.as_doc(), update, None, &mut self.session)
            .await?;
        if result.matched_count != 1 {
            return Err(Error::not_found(format!("Referendum {id}")));
        }
        Ok(())
    }

    async fn set_state(&mut self, id: Id, status: ReferendumStatus, locked: bool) -> Result<()> {
        let update = doc! {
            "$set": {
                "status": status,
                "locked": locked,
            }
        };
        let result = self
            .colls
            .referendums
            .update_one_with_session(id.as_doc(), update, None, &mut self.session)
            .await?;
        if result.matched_count != 1 {
            return Err(Error::not_found(format!("Referendum {id}")));
        }
        Ok(())
    }

    async fn vote(&mut self, referendum: Id, voter: Id) -> Result<Option<Vote>> {
        let filter = doc! {
            "referendum_id": referendum,
            "voter_id": voter,
        };
        Ok(self
            .colls
            .votes
            .find_one_with_session(filter, None, &mut self.session)
            .await?)
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Id> {
        let result = self
            .colls
            .new_votes
            .insert_one_with_session(vote, None, &mut self.session)
            .await;
        match result {
            Ok(inserted) => inserted
                .inserted_id
                .as_object_id()
                .map(Id::from)
                .ok_or_else(|| Error::Internal("Inserted vote has no object ID".to_string())),
            Err(e) if is_duplicate_key(&e) => Err(Error::DuplicateVote(vote.referendum_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn tally(&mut self, referendum: Id) -> Result<Tally> {
        let filter = doc! {
            "referendum_id": referendum,
        };
        let mut cursor = self
            .colls
            .votes
            .find_with_session(filter, None, &mut self.session)
            .await?;
        let mut counts = HashMap::new();
        while let Some(vote) = cursor.next(&mut self.session).await {
            *counts.entry(vote?.option_id).or_insert(0) += 1;
        }
        Ok(Tally::new(counts))
    }

    async fn count_voters(&mut self) -> Result<u64> {
        Ok(self
            .colls
            .voters
            .count_documents_with_session(None, None, &mut self.session)
            .await?)
    }

    async fn insert_voter(&mut self, voter: &NewVoter) -> Result<Id> {
        let result = self
            .colls
            .new_voters
            .insert_one_with_session(voter, None, &mut self.session)
            .await;
        match result {
            Ok(inserted) => inserted
                .inserted_id
                .as_object_id()
                .map(Id::from)
                .ok_or_else(|| Error::Internal("Inserted voter has no object ID".to_string())),
            Err(e) if is_duplicate_key(&e) => Err(Error::EmailTaken(voter.email.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_scc(&mut self, code: &str, voter: Id) -> Result<bool> {
        let filter = doc! {
            "_id": code,
            "used_by": null,
        };
        let update = doc! {
            "$set": {
                "used_by": voter,
            }
        };
        let result = self
            .colls
            .sccs
            .update_one_with_session(filter, update, None, &mut self.session)
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.session.commit_transaction().await?;
        Ok(())
    }
}

use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{NewReferendum, NewVote, NewVoter, Referendum, Scc, Vote, Voter};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Referendum collections
const REFERENDUMS: &str = "referendums";
impl MongoCollection for Referendum {
    const NAME: &'static str = REFERENDUMS;
}
impl MongoCollection for NewReferendum {
    const NAME: &'static str = REFERENDUMS;
}

// Voter collections
const VOTERS: &str = "voters";
impl MongoCollection for Voter {
    const NAME: &'static str = VOTERS;
}
impl MongoCollection for NewVoter {
    const NAME: &'static str = VOTERS;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// SCC collection
const SCCS: &str = "sccs";
impl MongoCollection for Scc {
    const NAME: &'static str = SCCS;
}

/// Ensure that every collection exists on the given database.
///
/// Servers before 4.4 cannot create a collection inside a transaction, so
/// the collections only ever written transactionally are created up front.
/// `voters` and `votes` are created by their indexes.
///
/// This operation is idempotent.
pub async fn ensure_collections_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collections exist");

    let existing = db.list_collection_names(None).await?;
    for name in [REFERENDUMS, SCCS] {
        if !existing.iter().any(|collection| collection == name) {
            db.create_collection(name, None).await?;
        }
    }

    Ok(())
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection: one account per email.
    let voter_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Vote collection: one vote per voter per referendum. This is the
    // authoritative guard against concurrent duplicate submissions.
    let vote_index = IndexModel::builder()
        .keys(doc! {"referendum_id": 1, "voter_id": 1})
        .options(unique)
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Tallies group votes of one referendum by option.
    let tally_index = IndexModel::builder()
        .keys(doc! {"referendum_id": 1, "option_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(tally_index, None)
        .await?;

    Ok(())
}

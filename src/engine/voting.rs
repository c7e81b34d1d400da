//! Casting votes and closing referendums on a majority.

use crate::error::{Error, Result};
use crate::model::{
    api::vote::{VoteOutcome, VoteRequest},
    auth::{Role, Session},
    common::{referendum::ReferendumStatus, tally::majority_threshold},
    db::NewVote,
    mongodb::Id,
};

use super::Engine;

impl Engine {
    /// Record the caller's vote. If that gives any option at least half of all
    /// registered voters, the referendum is closed in the same transaction.
    pub async fn cast_vote(&self, session: &Session, request: &VoteRequest) -> Result<VoteOutcome> {
        session.require(Role::Voter)?;
        let (referendum, option) = request.ids()?;
        let voter = session.principal_id;

        let outcome = self
            .retrying("cast vote", || self.try_cast_vote(voter, referendum, option))
            .await;
        match &outcome {
            Ok(VoteOutcome::Recorded) => debug!("Voter {voter} voted in referendum {referendum}"),
            Ok(VoteOutcome::RecordedAndClosed) => {
                info!("Referendum {referendum} reached a majority and was closed")
            }
            Err(e) => debug!("Vote by {voter} in referendum {referendum} rejected: {e}"),
        }
        outcome
    }

    async fn try_cast_vote(&self, voter: Id, referendum_id: Id, option: Id) -> Result<VoteOutcome> {
        let mut tx = self.store.begin().await?;

        // Serialises with every other mutation of this referendum.
        let referendum = tx
            .lock_referendum(referendum_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Referendum {referendum_id}")))?;
        if referendum.status != ReferendumStatus::Open {
            return Err(Error::NotOpen(referendum_id));
        }
        if tx.vote(referendum_id, voter).await?.is_some() {
            return Err(Error::DuplicateVote(referendum_id));
        }
        if referendum.option(option).is_none() {
            return Err(Error::InvalidOption {
                referendum: referendum_id,
                option,
            });
        }

        // The store's uniqueness constraint has the last word on duplicates.
        tx.insert_vote(&NewVote::new(voter, referendum_id, option))
            .await?;

        let tally = tx.tally(referendum_id).await?;
        let total_voters = tx.count_voters().await?;
        let outcome = if tally.has_majority(total_voters) {
            debug!(
                "Referendum {referendum_id} reached {} of {total_voters} voters",
                majority_threshold(total_voters)
            );
            let closed = referendum.lifecycle().transition(ReferendumStatus::Closed);
            tx.set_state(referendum_id, closed.status(), closed.locked())
                .await?;
            VoteOutcome::RecordedAndClosed
        } else {
            VoteOutcome::Recorded
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::futures::future::join_all;

    use crate::config::Config;
    use crate::engine::Engine;
    use crate::model::{
        api::referendum::{ReferendumSpec, ReferendumView},
        store::{MemoryStore, Store},
    };

    use super::*;

    use ReferendumStatus::{Closed, Open};

    fn ec(config: &Config) -> Session {
        let (email, _) = config.ec_credentials().unwrap();
        Session::election_commission(email)
    }

    /// Register `count` voters and return their sessions.
    async fn voters(store: &MemoryStore, count: usize) -> Vec<Session> {
        let mut sessions = Vec::with_capacity(count);
        for id in store.insert_example_voters(count).await {
            let voter = store.voter(id).await.unwrap().unwrap();
            sessions.push(Session::voter(&voter));
        }
        sessions
    }

    /// Create and open the example referendum.
    async fn open_referendum(engine: &Engine, config: &Config) -> ReferendumView {
        let ec = ec(config);
        let id = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();
        engine.set_status(&ec, id, Open).await.unwrap();
        engine.referendum(&ec, id).await.unwrap()
    }

    fn ballot(referendum: &ReferendumView, option: &str) -> VoteRequest {
        VoteRequest {
            referendum_id: referendum.referendum_id.to_string(),
            option_id: referendum.option(option).unwrap().option_id.to_string(),
        }
    }

    #[backend_test]
    async fn vote_is_counted(engine: Engine, store: MemoryStore, config: Config) {
        let sessions = voters(&store, 10).await;
        let referendum = open_referendum(&engine, &config).await;

        let outcome = engine
            .cast_vote(&sessions[0], &ballot(&referendum, "Yes"))
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Recorded);

        let view = engine
            .referendum(&ec(&config), *referendum.referendum_id)
            .await
            .unwrap();
        assert_eq!(view.option("Yes").unwrap().votes, 1);
        assert_eq!(view.option("No").unwrap().votes, 0);
        assert_eq!(view.total_votes, 1);

        let mine = engine.referendums_for_voter(&sessions[0]).await.unwrap();
        assert_eq!(
            mine[0].my_vote_option_id,
            Some(referendum.option("Yes").unwrap().option_id)
        );
        let theirs = engine.referendums_for_voter(&sessions[1]).await.unwrap();
        assert_eq!(theirs[0].my_vote_option_id, None);
    }

    #[backend_test]
    async fn majority_closes(engine: Engine, store: MemoryStore, config: Config) {
        // ceil(4 * 0.5) = 2.
        let sessions = voters(&store, 4).await;
        let referendum = open_referendum(&engine, &config).await;
        let yes = ballot(&referendum, "Yes");

        assert_eq!(
            engine.cast_vote(&sessions[0], &yes).await.unwrap(),
            VoteOutcome::Recorded
        );
        assert_eq!(
            engine.cast_vote(&sessions[1], &yes).await.unwrap(),
            VoteOutcome::RecordedAndClosed
        );

        let view = engine
            .referendum(&ec(&config), *referendum.referendum_id)
            .await
            .unwrap();
        assert_eq!(view.status, Closed);
        assert!(view.locked);
        assert_eq!(view.option("Yes").unwrap().votes, 2);

        let err = engine
            .cast_vote(&sessions[2], &ballot(&referendum, "No"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotOpen(_)));
        assert_eq!(store.vote_count().await, 2);
    }

    #[backend_test]
    async fn close_waits_for_threshold(engine: Engine, store: MemoryStore, config: Config) {
        // ceil(5 * 0.5) = 3.
        let sessions = voters(&store, 5).await;
        let referendum = open_referendum(&engine, &config).await;

        for (session, option) in sessions.iter().take(4).zip(["Yes", "No", "Yes", "No"]) {
            let outcome = engine
                .cast_vote(session, &ballot(&referendum, option))
                .await
                .unwrap();
            assert_eq!(outcome, VoteOutcome::Recorded);
        }
        let view = engine
            .referendum(&ec(&config), *referendum.referendum_id)
            .await
            .unwrap();
        assert_eq!(view.status, Open);
        assert_eq!(view.total_votes, 4);

        let outcome = engine
            .cast_vote(&sessions[4], &ballot(&referendum, "No"))
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::RecordedAndClosed);
    }

    #[backend_test]
    async fn vote_on_closed_is_not_open(engine: Engine, store: MemoryStore, config: Config) {
        let sessions = voters(&store, 3).await;
        let ec = ec(&config);
        let id = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();
        let referendum = engine.referendum(&ec, id).await.unwrap();

        let err = engine
            .cast_vote(&sessions[0], &ballot(&referendum, "Yes"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotOpen(closed) if closed == id));
    }

    #[backend_test]
    async fn missing_referendum_is_not_found(engine: Engine, store: MemoryStore) {
        let sessions = voters(&store, 1).await;
        let request = VoteRequest {
            referendum_id: Id::new().to_string(),
            option_id: Id::new().to_string(),
        };
        let err = engine.cast_vote(&sessions[0], &request).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[backend_test]
    async fn second_vote_is_duplicate(engine: Engine, store: MemoryStore, config: Config) {
        let sessions = voters(&store, 10).await;
        let referendum = open_referendum(&engine, &config).await;

        engine
            .cast_vote(&sessions[0], &ballot(&referendum, "Yes"))
            .await
            .unwrap();
        let err = engine
            .cast_vote(&sessions[0], &ballot(&referendum, "No"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVote(_)));
        assert_eq!(store.vote_count().await, 1);
    }

    #[backend_test]
    async fn foreign_option_is_invalid(engine: Engine, store: MemoryStore, config: Config) {
        let sessions = voters(&store, 10).await;
        let first = open_referendum(&engine, &config).await;
        let second = open_referendum(&engine, &config).await;

        let request = VoteRequest {
            referendum_id: first.referendum_id.to_string(),
            option_id: second.option("Yes").unwrap().option_id.to_string(),
        };
        let err = engine.cast_vote(&sessions[0], &request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOption { .. }));
        assert_eq!(store.vote_count().await, 0);
    }

    #[backend_test]
    async fn checks_run_in_order(engine: Engine, store: MemoryStore, config: Config) {
        // A duplicate vote with a foreign option is reported as a duplicate.
        let sessions = voters(&store, 10).await;
        let referendum = open_referendum(&engine, &config).await;
        engine
            .cast_vote(&sessions[0], &ballot(&referendum, "Yes"))
            .await
            .unwrap();
        let request = VoteRequest {
            referendum_id: referendum.referendum_id.to_string(),
            option_id: Id::new().to_string(),
        };
        let err = engine.cast_vote(&sessions[0], &request).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateVote(_)));
    }

    #[backend_test]
    async fn malformed_ids_are_rejected(engine: Engine, store: MemoryStore) {
        let sessions = voters(&store, 1).await;
        let request = VoteRequest {
            referendum_id: "1".to_string(),
            option_id: "2".to_string(),
        };
        let err = engine.cast_vote(&sessions[0], &request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[backend_test]
    async fn ec_cannot_vote(engine: Engine, config: Config) {
        let referendum = open_referendum(&engine, &config).await;
        let err = engine
            .cast_vote(&ec(&config), &ballot(&referendum, "Yes"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[backend_test]
    async fn concurrent_duplicates_admit_one(engine: Engine, store: MemoryStore, config: Config) {
        let sessions = voters(&store, 10).await;
        let referendum = open_referendum(&engine, &config).await;
        let request = ballot(&referendum, "Yes");

        let attempts = (0..8).map(|_| {
            let engine = engine.clone();
            let session = sessions[0].clone();
            let request = request.clone();
            rocket::tokio::spawn(async move { engine.cast_vote(&session, &request).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let successes = results.iter().filter(|result| result.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|result| matches!(result, Err(Error::DuplicateVote(_))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.vote_count().await, 1);
    }

    #[backend_test]
    async fn concurrent_voters_close_exactly_once(
        engine: Engine,
        store: MemoryStore,
        config: Config,
    ) {
        // ceil(10 * 0.5) = 5, but eight voters race for "Yes".
        let sessions = voters(&store, 10).await;
        let referendum = open_referendum(&engine, &config).await;
        let request = ballot(&referendum, "Yes");

        let attempts = sessions.iter().take(8).map(|session| {
            let engine = engine.clone();
            let session = session.clone();
            let request = request.clone();
            rocket::tokio::spawn(async move { engine.cast_vote(&session, &request).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let recorded = results
            .iter()
            .filter(|result| matches!(result, Ok(VoteOutcome::Recorded)))
            .count();
        let closing = results
            .iter()
            .filter(|result| matches!(result, Ok(VoteOutcome::RecordedAndClosed)))
            .count();
        let rejected = results
            .iter()
            .filter(|result| matches!(result, Err(Error::NotOpen(_))))
            .count();
        assert_eq!((recorded, closing, rejected), (4, 1, 3));

        let view = engine
            .referendum(&ec(&config), *referendum.referendum_id)
            .await
            .unwrap();
        assert_eq!(view.status, Closed);
        assert_eq!(view.option("Yes").unwrap().votes, 5);
    }

    #[backend_test]
    async fn concurrent_split_votes_tally_exactly(
        engine: Engine,
        store: MemoryStore,
        config: Config,
    ) {
        // Nobody can reach ceil(20 * 0.5) = 10 with a 6/6 split.
        let sessions = voters(&store, 20).await;
        let referendum = open_referendum(&engine, &config).await;

        let attempts = sessions.iter().take(12).enumerate().map(|(n, session)| {
            let engine = engine.clone();
            let session = session.clone();
            let request = ballot(&referendum, if n % 2 == 0 { "Yes" } else { "No" });
            rocket::tokio::spawn(async move { engine.cast_vote(&session, &request).await })
        });
        for joined in join_all(attempts).await {
            assert_eq!(joined.unwrap().unwrap(), VoteOutcome::Recorded);
        }

        let view = engine
            .referendum(&ec(&config), *referendum.referendum_id)
            .await
            .unwrap();
        assert_eq!(view.option("Yes").unwrap().votes, 6);
        assert_eq!(view.option("No").unwrap().votes, 6);
        assert_eq!(view.status, Open);
    }

    #[rocket::async_test]
    async fn votes_on_other_referendums_are_independent() {
        let store = MemoryStore::new();
        let engine = Engine::new(Arc::new(store.clone()), Config::example());
        let config = Config::example();
        let sessions = voters(&store, 4).await;

        let first = open_referendum(&engine, &config).await;
        let second = open_referendum(&engine, &config).await;
        for session in &sessions[..2] {
            engine
                .cast_vote(session, &ballot(&first, "Yes"))
                .await
                .unwrap();
        }
        // The first closed; the second is untouched and still takes votes.
        let outcome = engine
            .cast_vote(&sessions[0], &ballot(&second, "No"))
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Recorded);
        let view = engine
            .referendum(&ec(&config), *second.referendum_id)
            .await
            .unwrap();
        assert_eq!(view.status, Open);
        assert_eq!(view.total_votes, 1);
    }
}

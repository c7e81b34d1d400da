//! Creating, editing, and reading referendums.

use crate::error::{Error, Result};
use crate::model::{
    api::{
        referendum::{
            ReferendumResults, ReferendumSpec, ReferendumSummary, ReferendumView,
            ValidReferendumSpec, VoterReferendumView,
        },
        voter::VoterSummary,
    },
    auth::{Role, Session},
    db::{NewReferendum, ReferendumOption},
    mongodb::Id,
};

use super::Engine;

impl Engine {
    /// Create a referendum, closed and unlocked.
    pub async fn create_referendum(&self, session: &Session, spec: ReferendumSpec) -> Result<Id> {
        session.require(Role::Ec)?;
        let spec = spec.validate()?;
        let referendum = &NewReferendum::new(spec.title, spec.description, spec.options);

        let id = self
            .retrying("create referendum", || async move {
                let mut tx = self.store.begin().await?;
                let id = tx.insert_referendum(referendum).await?;
                tx.commit().await?;
                Ok(id)
            })
            .await?;
        info!("Created referendum {id} '{}'", referendum.title);
        Ok(id)
    }

    /// Replace the title, description, and options of a referendum that has
    /// never been opened.
    pub async fn update_referendum(
        &self,
        session: &Session,
        id: Id,
        spec: ReferendumSpec,
    ) -> Result<()> {
        session.require(Role::Ec)?;
        let spec = spec.validate()?;
        self.retrying("update referendum", || self.try_update(id, &spec))
            .await?;
        info!("Updated referendum {id}");
        Ok(())
    }

    async fn try_update(&self, id: Id, spec: &ValidReferendumSpec) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let referendum = tx
            .lock_referendum(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Referendum {id}")))?;
        if !referendum.lifecycle().is_editable() {
            return Err(Error::Locked(id));
        }
        let options = ReferendumOption::fresh(spec.options.clone());
        tx.replace_content(id, &spec.title, &spec.description, &options)
            .await?;
        tx.commit().await
    }

    /// One referendum with its vote counts.
    pub async fn referendum(&self, session: &Session, id: Id) -> Result<ReferendumView> {
        session.require(Role::Ec)?;
        self.view(id).await
    }

    /// Every referendum with its vote counts, oldest first.
    pub async fn referendums(&self, session: &Session) -> Result<Vec<ReferendumView>> {
        session.require(Role::Ec)?;
        let mut tx = self.store.begin().await?;
        let mut views = Vec::new();
        for referendum in tx.referendums().await? {
            let tally = tx.tally(referendum.id).await?;
            views.push(ReferendumView::new(referendum, &tally));
        }
        Ok(views)
    }

    /// Every referendum with its vote counts and the caller's own choice.
    pub async fn referendums_for_voter(
        &self,
        session: &Session,
    ) -> Result<Vec<VoterReferendumView>> {
        session.require(Role::Voter)?;
        let mut tx = self.store.begin().await?;
        let mut views = Vec::new();
        for referendum in tx.referendums().await? {
            let tally = tx.tally(referendum.id).await?;
            let mine = tx.vote(referendum.id, session.principal_id).await?;
            views.push(VoterReferendumView {
                referendum: ReferendumView::new(referendum, &tally),
                my_vote_option_id: mine.map(|vote| vote.option_id.into()),
            });
        }
        Ok(views)
    }

    async fn view(&self, id: Id) -> Result<ReferendumView> {
        let mut tx = self.store.begin().await?;
        let referendum = tx
            .referendum(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Referendum {id}")))?;
        let tally = tx.tally(id).await?;
        Ok(ReferendumView::new(referendum, &tally))
    }

    /// Public summaries of every referendum.
    pub async fn public_referendums(&self) -> Result<Vec<ReferendumSummary>> {
        let mut tx = self.store.begin().await?;
        Ok(tx
            .referendums()
            .await?
            .iter()
            .map(ReferendumSummary::from)
            .collect())
    }

    pub async fn public_referendum(&self, id: Id) -> Result<ReferendumSummary> {
        let mut tx = self.store.begin().await?;
        tx.referendum(id)
            .await?
            .as_ref()
            .map(ReferendumSummary::from)
            .ok_or_else(|| Error::not_found(format!("Referendum {id}")))
    }

    /// Public per-option results of one referendum.
    pub async fn public_results(&self, id: Id) -> Result<ReferendumResults> {
        Ok(self.view(id).await?.into())
    }

    /// The public voter directory. Password hashes never leave the store.
    pub async fn public_voters(&self) -> Result<Vec<VoterSummary>> {
        Ok(self
            .store
            .voters()
            .await?
            .into_iter()
            .map(VoterSummary::from)
            .collect())
    }

    pub async fn public_voter(&self, id: Id) -> Result<VoterSummary> {
        self.store
            .voter(id)
            .await?
            .map(VoterSummary::from)
            .ok_or_else(|| Error::not_found(format!("Voter {id}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::engine::Engine;
    use crate::model::{
        common::referendum::ReferendumStatus, db::NewVoter, store::MemoryStore,
    };

    use super::*;

    fn ec(config: &Config) -> Session {
        let (email, _) = config.ec_credentials().unwrap();
        Session::election_commission(email)
    }

    #[backend_test]
    async fn create_stores_closed_unlocked(engine: Engine, config: Config) {
        let ec = ec(&config);
        let id = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();

        let view = engine.referendum(&ec, id).await.unwrap();
        assert_eq!(view.title, "Raise fees?");
        assert_eq!(view.status, ReferendumStatus::Closed);
        assert!(!view.locked);
        assert_eq!(view.options.len(), 2);
        assert!(view.options.iter().all(|option| option.votes == 0));
        assert_eq!(view.total_votes, 0);
        assert_eq!(view.option("Yes").unwrap().votes, 0);
    }

    #[backend_test]
    async fn create_rejects_invalid_spec(engine: Engine, config: Config) {
        let spec = ReferendumSpec {
            options: vec!["Only".to_string()],
            ..ReferendumSpec::example()
        };
        let err = engine
            .create_referendum(&ec(&config), spec)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(engine.referendums(&ec(&config)).await.unwrap().is_empty());
    }

    #[backend_test]
    async fn update_replaces_everything(engine: Engine, config: Config) {
        let ec = ec(&config);
        let id = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();
        let before = engine.referendum(&ec, id).await.unwrap();

        engine
            .update_referendum(&ec, id, ReferendumSpec::example2())
            .await
            .unwrap();
        let after = engine.referendum(&ec, id).await.unwrap();
        assert_eq!(after.title, "Build a new library?");
        assert_eq!(after.description, "");
        let texts: Vec<_> = after.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Downtown", "Harbourside", "Neither"]);
        // Option identity does not survive an edit.
        assert!(after
            .options
            .iter()
            .all(|o| before.options.iter().all(|b| b.option_id != o.option_id)));
    }

    #[backend_test]
    async fn update_missing_is_not_found(engine: Engine, config: Config) {
        let err = engine
            .update_referendum(&ec(&config), Id::new(), ReferendumSpec::example())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[backend_test]
    async fn update_locked_fails_and_changes_nothing(engine: Engine, config: Config) {
        let ec = ec(&config);
        let id = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();
        engine
            .set_status(&ec, id, ReferendumStatus::Open)
            .await
            .unwrap();
        let before = engine.referendum(&ec, id).await.unwrap();

        let err = engine
            .update_referendum(&ec, id, ReferendumSpec::example2())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Locked(locked) if locked == id));
        assert_eq!(engine.referendum(&ec, id).await.unwrap(), before);

        // Closing again keeps the lock.
        engine
            .set_status(&ec, id, ReferendumStatus::Closed)
            .await
            .unwrap();
        let err = engine
            .update_referendum(&ec, id, ReferendumSpec::example2())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Locked(_)));
    }

    #[backend_test]
    async fn roles_are_enforced(engine: Engine, store: MemoryStore, config: Config) {
        let voter_id = store.insert_voter(NewVoter::example(0)).await;
        let voter = Session::voter(&engine.store.voter(voter_id).await.unwrap().unwrap());

        let err = engine
            .create_referendum(&voter, ReferendumSpec::example())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(matches!(
            engine.referendums(&voter).await,
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            engine.referendums_for_voter(&ec(&config)).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[backend_test]
    async fn listings_are_oldest_first(engine: Engine, store: MemoryStore, config: Config) {
        let ec = ec(&config);
        let first = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();
        let second = engine
            .create_referendum(&ec, ReferendumSpec::example2())
            .await
            .unwrap();

        let all = engine.referendums(&ec).await.unwrap();
        let ids: Vec<Id> = all.iter().map(|view| *view.referendum_id).collect();
        assert_eq!(ids, vec![first, second]);

        let voter_id = store.insert_voter(NewVoter::example(0)).await;
        let voter = Session::voter(&engine.store.voter(voter_id).await.unwrap().unwrap());
        let mine = engine.referendums_for_voter(&voter).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|view| view.my_vote_option_id.is_none()));

        let public = engine.public_referendums().await.unwrap();
        assert_eq!(public[1].title, "Build a new library?");
        assert_eq!(
            engine.public_referendum(first).await.unwrap().status,
            ReferendumStatus::Closed
        );
        assert!(matches!(
            engine.public_referendum(Id::new()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[backend_test]
    async fn public_voters_hide_credentials(engine: Engine, store: MemoryStore) {
        let ids = store.insert_example_voters(2).await;
        let voters = engine.public_voters().await.unwrap();
        assert_eq!(voters.len(), 2);
        assert_eq!(voters[0].email, NewVoter::example_email(0));

        let voter = engine.public_voter(ids[1]).await.unwrap();
        assert_eq!(voter.full_name, "Example Voter 1");
        assert!(matches!(
            engine.public_voter(Id::new()).await,
            Err(Error::NotFound(_))
        ));
    }
}

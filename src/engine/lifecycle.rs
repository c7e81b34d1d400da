//! Opening and closing referendums.

use crate::error::{Error, Result};
use crate::model::{
    api::referendum::StateView,
    auth::{Role, Session},
    common::referendum::ReferendumStatus,
    mongodb::Id,
};

use super::Engine;

impl Engine {
    /// Move a referendum to `target`. The first opening also locks it.
    /// Requesting the current status changes nothing.
    pub async fn set_status(
        &self,
        session: &Session,
        id: Id,
        target: ReferendumStatus,
    ) -> Result<StateView> {
        session.require(Role::Ec)?;
        self.retrying("set status", || self.try_set_status(id, target))
            .await
    }

    async fn try_set_status(&self, id: Id, target: ReferendumStatus) -> Result<StateView> {
        let mut tx = self.store.begin().await?;
        let referendum = tx
            .lock_referendum(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Referendum {id}")))?;

        let current = referendum.lifecycle();
        let next = current.transition(target);
        let state = StateView {
            status: next.status(),
            locked: next.locked(),
        };
        if (referendum.status, referendum.locked) == (state.status, state.locked) {
            debug!("Referendum {id} already {}", state.status);
            return Ok(state);
        }

        tx.set_state(id, state.status, state.locked).await?;
        tx.commit().await?;
        info!("Referendum {id}: {current:?} -> {next:?}");
        Ok(state)
    }
}

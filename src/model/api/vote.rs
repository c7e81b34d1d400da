use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::Id;

/// A voter's choice. IDs arrive as strings and are parsed by [`Self::ids`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub referendum_id: String,
    pub option_id: String,
}

impl VoteRequest {
    /// The referendum and option IDs, or a validation error naming the
    /// malformed one.
    pub fn ids(&self) -> Result<(Id, Id)> {
        Ok((
            Id::parse_for(&self.referendum_id, "referendum")?,
            Id::parse_for(&self.option_id, "option")?,
        ))
    }
}

/// What an accepted vote did to its referendum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was counted and the referendum stays open.
    Recorded,
    /// The vote gave some option a majority, so the referendum was closed.
    RecordedAndClosed,
}

/// Response to an accepted vote.
#[derive(Debug, Clone, Serialize)]
pub struct VoteReceipt {
    /// Whether this vote closed the referendum.
    pub closed: bool,
}

impl From<VoteOutcome> for VoteReceipt {
    fn from(outcome: VoteOutcome) -> Self {
        Self {
            closed: outcome == VoteOutcome::RecordedAndClosed,
        }
    }
}

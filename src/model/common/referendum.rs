use std::fmt::{Display, Formatter};

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

/// Whether a referendum is currently accepting votes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferendumStatus {
    Closed,
    Open,
}

impl Display for ReferendumStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

impl From<ReferendumStatus> for Bson {
    fn from(status: ReferendumStatus) -> Self {
        Bson::String(status.to_string())
    }
}

/// States in the referendum lifecycle.
///
/// The lock is one-way: it is set by the first opening and never cleared, so
/// there is no `OpenUnlocked` state and no way back to `ClosedUnlocked`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Freshly created. The only state in which content may be edited.
    ClosedUnlocked,
    /// Accepting votes.
    OpenLocked,
    /// Closed manually or by majority; may be reopened but never edited.
    ClosedLocked,
}

impl LifecycleState {
    /// Derive the lifecycle state from the stored `status` and `locked` columns.
    ///
    /// An open-but-unlocked row cannot be produced by this crate; should one be
    /// read anyway it is treated as open, and the next transition stores the lock.
    pub fn from_parts(status: ReferendumStatus, locked: bool) -> Self {
        match (status, locked) {
            (ReferendumStatus::Closed, false) => Self::ClosedUnlocked,
            (ReferendumStatus::Closed, true) => Self::ClosedLocked,
            (ReferendumStatus::Open, _) => Self::OpenLocked,
        }
    }

    pub fn status(self) -> ReferendumStatus {
        match self {
            Self::OpenLocked => ReferendumStatus::Open,
            Self::ClosedUnlocked | Self::ClosedLocked => ReferendumStatus::Closed,
        }
    }

    pub fn locked(self) -> bool {
        !matches!(self, Self::ClosedUnlocked)
    }

    pub fn is_editable(self) -> bool {
        self == Self::ClosedUnlocked
    }

    /// The state reached by requesting `target`. Requesting the current status
    /// is a no-op.
    pub fn transition(self, target: ReferendumStatus) -> Self {
        match (self, target) {
            (_, ReferendumStatus::Open) => Self::OpenLocked,
            (Self::ClosedUnlocked, ReferendumStatus::Closed) => Self::ClosedUnlocked,
            (_, ReferendumStatus::Closed) => Self::ClosedLocked,
        }
    }
}

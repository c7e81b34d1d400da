use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    common::referendum::{LifecycleState, ReferendumStatus},
    mongodb::Id,
};

/// Core referendum data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferendumCore {
    pub title: String,
    pub description: String,
    pub status: ReferendumStatus,
    pub locked: bool,
    /// The answers a voter can choose from, in display order.
    pub options: Vec<ReferendumOption>,
}

impl ReferendumCore {
    /// A new referendum: closed, unlocked, with a fresh ID for every option.
    pub fn new(title: String, description: String, options: Vec<String>) -> Self {
        Self {
            title,
            description,
            status: ReferendumStatus::Closed,
            locked: false,
            options: ReferendumOption::fresh(options),
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::from_parts(self.status, self.locked)
    }

    pub fn option(&self, option_id: Id) -> Option<&ReferendumOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

/// A referendum without an ID.
pub type NewReferendum = ReferendumCore;

/// A referendum from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referendum {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub referendum: ReferendumCore,
}

impl Deref for Referendum {
    type Target = ReferendumCore;

    fn deref(&self) -> &Self::Target {
        &self.referendum
    }
}

impl DerefMut for Referendum {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.referendum
    }
}

/// A single answer to a referendum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferendumOption {
    pub id: Id,
    pub text: String,
}

impl ReferendumOption {
    /// Give each option text a new ID. Option identity does not survive an edit.
    pub fn fresh(texts: Vec<String>) -> Vec<Self> {
        texts
            .into_iter()
            .map(|text| Self { id: Id::new(), text })
            .collect()
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ReferendumCore {
        pub fn example() -> Self {
            Self::new(
                "Raise fees?".to_string(),
                "Should the annual fee rise by 5%?".to_string(),
                vec!["Yes".to_string(), "No".to_string()],
            )
        }
    }
}

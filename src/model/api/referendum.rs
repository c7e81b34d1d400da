use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{referendum::ReferendumStatus, tally::Tally},
    db::Referendum,
    mongodb::Id,
};

use super::ApiId;

/// A referendum as submitted by the Election Commission, for creation or edit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferendumSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A [`ReferendumSpec`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReferendumSpec {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
}

impl ReferendumSpec {
    /// Trim every field, drop blank options, and require a title and at least
    /// two options.
    pub fn validate(self) -> Result<ValidReferendumSpec> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::Validation("Title is required.".to_string()));
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|option| option.trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();
        if options.len() < 2 {
            return Err(Error::Validation(
                "At least two non-empty options are required.".to_string(),
            ));
        }
        Ok(ValidReferendumSpec {
            title,
            description: self.description.unwrap_or_default().trim().to_string(),
            options,
        })
    }
}

/// A request to move a referendum to a new status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn status(&self) -> Result<ReferendumStatus> {
        match self.status.trim() {
            "open" => Ok(ReferendumStatus::Open),
            "closed" => Ok(ReferendumStatus::Closed),
            other => Err(Error::Validation(format!(
                "Unknown status '{other}', expected 'open' or 'closed'."
            ))),
        }
    }
}

/// The stored status and lock after a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateView {
    pub status: ReferendumStatus,
    pub locked: bool,
}

/// One option with its current vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub option_id: ApiId,
    pub text: String,
    pub votes: u64,
}

/// A referendum with its options and their vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferendumView {
    pub referendum_id: ApiId,
    pub title: String,
    pub description: String,
    pub status: ReferendumStatus,
    pub locked: bool,
    pub options: Vec<OptionView>,
    pub total_votes: u64,
}

impl ReferendumView {
    pub fn new(referendum: Referendum, tally: &Tally) -> Self {
        let options = referendum
            .referendum
            .options
            .into_iter()
            .map(|option| OptionView {
                option_id: option.id.into(),
                votes: tally.count(option.id),
                text: option.text,
            })
            .collect();
        Self {
            referendum_id: referendum.id.into(),
            title: referendum.referendum.title,
            description: referendum.referendum.description,
            status: referendum.referendum.status,
            locked: referendum.referendum.locked,
            options,
            total_votes: tally.total(),
        }
    }
}

/// A referendum as seen by one voter: the shared view plus their own choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterReferendumView {
    #[serde(flatten)]
    pub referendum: ReferendumView,
    pub my_vote_option_id: Option<ApiId>,
}

/// Payload of the EC referendum listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReferendumList {
    pub referendums: Vec<ReferendumView>,
}

/// Payload of a single referendum.
#[derive(Debug, Clone, Serialize)]
pub struct ReferendumDetail {
    pub referendum: ReferendumView,
}

/// Payload of the voter referendum listing.
#[derive(Debug, Clone, Serialize)]
pub struct VoterReferendumList {
    pub referendums: Vec<VoterReferendumView>,
}

/// Public summary of a referendum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferendumSummary {
    pub referendum_id: ApiId,
    pub title: String,
    pub status: ReferendumStatus,
}

impl From<&Referendum> for ReferendumSummary {
    fn from(referendum: &Referendum) -> Self {
        Self {
            referendum_id: referendum.id.into(),
            title: referendum.title.clone(),
            status: referendum.status,
        }
    }
}

/// Public per-option results of a referendum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferendumResults {
    pub referendum_id: ApiId,
    pub results: Vec<OptionView>,
}

impl From<ReferendumView> for ReferendumResults {
    fn from(view: ReferendumView) -> Self {
        Self {
            referendum_id: view.referendum_id,
            results: view.options,
        }
    }
}

/// The ID of a newly created referendum.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub referendum_id: ApiId,
}

impl Created {
    pub fn new(id: Id) -> Self {
        Self {
            referendum_id: id.into(),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ReferendumView {
        pub fn option(&self, text: &str) -> Option<&OptionView> {
            self.options.iter().find(|option| option.text == text)
        }
    }

    impl ReferendumSpec {
        pub fn example() -> Self {
            Self {
                title: "Raise fees?".to_string(),
                description: Some("Should the annual fee rise by 5%?".to_string()),
                options: vec!["Yes".to_string(), "No".to_string()],
            }
        }

        pub fn example2() -> Self {
            Self {
                title: "Build a new library?".to_string(),
                description: None,
                options: vec![
                    "Downtown".to_string(),
                    "Harbourside".to_string(),
                    "Neither".to_string(),
                ],
            }
        }
    }
}

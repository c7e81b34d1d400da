use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::db::Voter;

use super::ApiId;

/// A registration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "fullName")]
    pub full_name: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub password: String,
    /// Shangri-La Citizen Code.
    #[serde(default)]
    pub scc: String,
}

/// Limits a registration must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationRules {
    pub min_voter_age: u32,
    pub min_password_length: usize,
    pub today: NaiveDate,
}

/// A [`RegisterRequest`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub email: String,
    pub full_name: String,
    pub dob: NaiveDate,
    pub password: String,
    pub scc: String,
}

impl RegisterRequest {
    /// Check each field in form order and report the first that fails.
    pub fn validate(self, rules: &RegistrationRules) -> Result<ValidRegistration> {
        let invalid = |reason: &str| Err(Error::Validation(reason.to_string()));

        let email = self.email.trim().to_string();
        if !email.contains('@') {
            return invalid("Please enter a valid email address.");
        }
        let full_name = self.full_name.trim().to_string();
        if full_name.chars().count() < 2 {
            return invalid("Please enter your full name.");
        }
        let dob = match NaiveDate::parse_from_str(self.dob.trim(), "%Y-%m-%d") {
            Ok(dob) => dob,
            Err(_) => return invalid("Please enter your date of birth as YYYY-MM-DD."),
        };
        if age_on(dob, rules.today) < i64::from(rules.min_voter_age) {
            return Err(Error::Validation(format!(
                "You must be at least {} to register.",
                rules.min_voter_age
            )));
        }
        if self.password.chars().count() < rules.min_password_length {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters.",
                rules.min_password_length
            )));
        }
        let scc = self.scc.trim().to_string();
        if scc.is_empty() {
            return invalid("Please enter your SCC.");
        }

        Ok(ValidRegistration {
            email,
            full_name,
            dob,
            password: self.password,
            scc,
        })
    }
}

/// Whole years between `dob` and `today`.
fn age_on(dob: NaiveDate, today: NaiveDate) -> i64 {
    let years = i64::from(today.year() - dob.year());
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years - 1
    } else {
        years
    }
}

/// Public view of a voter. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoterSummary {
    pub voter_id: ApiId,
    pub email: String,
    pub full_name: String,
    pub dob: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Voter> for VoterSummary {
    fn from(voter: Voter) -> Self {
        Self {
            voter_id: voter.id.into(),
            email: voter.voter.email,
            full_name: voter.voter.full_name,
            dob: voter.voter.dob,
            created_at: voter.voter.created_at,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegisterRequest {
        pub fn example(scc: &str) -> Self {
            Self {
                email: "new.voter@example.com".to_string(),
                full_name: "New Voter".to_string(),
                dob: "1990-05-17".to_string(),
                password: "secret-ballot".to_string(),
                scc: scc.to_string(),
            }
        }
    }

    impl RegistrationRules {
        pub fn example() -> Self {
            Self {
                min_voter_age: 18,
                min_password_length: 6,
                today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            }
        }
    }
}

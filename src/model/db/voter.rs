use std::ops::Deref;

use argon2::Config as Argon2Config;
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::Id;

/// Core voter data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Login name; unique across voters.
    pub email: String,
    pub full_name: String,
    /// Stored as an ISO-8601 date string.
    pub dob: NaiveDate,
    pub password_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoterCore {
    /// Create a new voter, hashing the plaintext password.
    pub fn new(email: String, full_name: String, dob: NaiveDate, password: &str) -> Result<Self> {
        Ok(Self {
            email,
            full_name,
            dob,
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        match argon2::verify_encoded(&self.password_hash, password.as_ref()) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Stored password hash for {} is unusable: {e}", self.email);
                false
            }
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

/// Hash a password with Argon2 under a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is the recommended salt length for Argon2.
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Argon2Config::default(),
    )?)
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    pub const EXAMPLE_PASSWORD: &str = "referendum4all";

    impl VoterCore {
        /// The `n`th distinct example voter, all sharing [`EXAMPLE_PASSWORD`].
        pub fn example(n: usize) -> Self {
            Self::new(
                Self::example_email(n),
                format!("Example Voter {n}"),
                NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                EXAMPLE_PASSWORD,
            )
            .unwrap()
        }

        pub fn example_email(n: usize) -> String {
            format!("voter{n}@example.com")
        }
    }
}

//! Logging in, registering, and resolving sessions.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::LoginRequest,
        voter::{RegisterRequest, RegistrationRules, ValidRegistration},
    },
    auth::{Role, Session},
    db::NewVoter,
    mongodb::Id,
};

use super::Engine;

impl Engine {
    /// Resolve credentials to a session.
    ///
    /// The configured EC email always means the EC: a wrong password for it
    /// fails rather than falling through to the voter records.
    pub async fn login(&self, request: &LoginRequest) -> Result<Session> {
        let email = request.email.trim();
        if let Some((ec_email, ec_password)) = self.config.ec_credentials() {
            if email == ec_email {
                return if request.password == ec_password {
                    info!("EC logged in");
                    Ok(Session::election_commission(ec_email))
                } else {
                    warn!("Failed EC login");
                    Err(Error::InvalidCredentials)
                };
            }
        }

        match self.store.voter_by_email(email).await? {
            Some(voter) if voter.verify_password(&request.password) => {
                debug!("Voter {} logged in", voter.id);
                Ok(Session::voter(&voter))
            }
            _ => {
                debug!("Failed voter login for {email}");
                Err(Error::InvalidCredentials)
            }
        }
    }

    /// Enrol a new voter, consuming their citizen code.
    pub async fn register(&self, request: RegisterRequest) -> Result<Id> {
        let rules = RegistrationRules {
            min_voter_age: self.config.min_voter_age(),
            min_password_length: self.config.min_password_length(),
            today: Utc::now().date_naive(),
        };
        let ValidRegistration {
            email,
            full_name,
            dob,
            password,
            scc,
        } = request.validate(&rules)?;
        let voter = &NewVoter::new(email, full_name, dob, &password)?;
        let scc = scc.as_str();

        let id = self
            .retrying("register voter", || async move {
                let mut tx = self.store.begin().await?;
                let id = tx.insert_voter(voter).await?;
                if !tx.claim_scc(scc, id).await? {
                    return Err(Error::Validation("Invalid or already used SCC.".to_string()));
                }
                tx.commit().await?;
                Ok(id)
            })
            .await?;
        info!("Registered voter {id}");
        Ok(id)
    }

    /// Whether a session still names someone who may act. The EC always may; a
    /// voter may only while their record exists.
    pub async fn session_is_live(&self, session: &Session) -> Result<bool> {
        match session.role {
            Role::Ec => Ok(true),
            Role::Voter => Ok(self.store.voter(session.principal_id).await?.is_some()),
        }
    }
}

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::model::{db::Voter, mongodb::Id};

use super::Role;

pub const AUTH_TOKEN_COOKIE: &str = "mslr_session";

/// The resolved identity behind a request, passed explicitly into every core
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "pid")]
    pub principal_id: Id,
    pub email: String,
    #[serde(rename = "rgt")]
    pub role: Role,
}

impl Session {
    pub fn voter(voter: &Voter) -> Self {
        Self {
            principal_id: voter.id,
            email: voter.email.clone(),
            role: Role::Voter,
        }
    }

    /// The Election Commission has no stored record, so it gets the sentinel ID.
    pub fn election_commission(email: impl Into<String>) -> Self {
        Self {
            principal_id: Id::sentinel(),
            email: email.into(),
            role: Role::Ec,
        }
    }

    /// Fail with [`Error::Forbidden`] unless this session has the given role.
    pub fn require(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(Error::Forbidden(role.requirement().to_string()))
        }
    }

    /// Serialize this session into a signed cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            session: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build((AUTH_TOKEN_COOKIE, token))
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .build())
    }

    /// Deserialize a session from a cookie, checking signature and expiry.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self> {
        let session = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.session)?;
        Ok(session)
    }
}

/// Cookie claims: the session itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    session: Session,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Session {
    type Error = Error;

    /// Resolve the session from the cookie. A missing, invalid, or expired
    /// token, or one naming a voter that no longer exists, is
    /// [`Error::Unauthenticated`]. Role checks are left to the core.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (config, engine) = match (
            req.rocket().state::<Config>(),
            req.rocket().state::<Engine>(),
        ) {
            (Some(config), Some(engine)) => (config, engine),
            _ => {
                let err = Error::Internal("Config or engine not managed".to_string());
                return Outcome::Error((Status::InternalServerError, err));
            }
        };

        let session = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => match Self::from_cookie(cookie, config) {
                Ok(session) => session,
                Err(e) => {
                    debug!("Rejected session cookie: {e}");
                    return Outcome::Error((Status::Unauthorized, Error::Unauthenticated));
                }
            },
            None => return Outcome::Error((Status::Unauthorized, Error::Unauthenticated)),
        };

        match engine.session_is_live(&session).await {
            Ok(true) => Outcome::Success(session),
            Ok(false) => Outcome::Error((Status::Unauthorized, Error::Unauthenticated)),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}

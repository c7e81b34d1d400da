use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::{
    Error as DbError, ErrorKind, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT,
};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::mongodb::Id;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
///
/// All variants down to [`Error::InvalidOption`] are expected business outcomes
/// and are reported to the client verbatim. The remainder are infrastructure
/// failures whose detail is only logged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Not logged in")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    #[error("Referendum {0} is locked and can no longer be edited")]
    Locked(Id),
    #[error("Referendum {0} is not open")]
    NotOpen(Id),
    #[error("You have already voted in referendum {0}")]
    DuplicateVote(Id),
    #[error("Option {option} does not belong to referendum {referendum}")]
    InvalidOption { referendum: Id, option: Id },
    #[error("Store temporarily unavailable: {0}")]
    Transient(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Is this a failure that may succeed if the whole transaction is re-run?
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Db(err) => {
                err.contains_label(TRANSIENT_TRANSACTION_ERROR)
                    || err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    || matches!(
                        *err.kind,
                        ErrorKind::Io(_)
                            | ErrorKind::ServerSelection { .. }
                            | ErrorKind::ConnectionPoolCleared { .. }
                    )
            }
            _ => false,
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Unauthenticated | Self::InvalidCredentials => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::EmailTaken(_) | Self::Locked(_) | Self::NotOpen(_) | Self::DuplicateVote(_) => {
                Status::Conflict
            }
            Self::InvalidOption { .. } => Status::UnprocessableEntity,
            _ if self.is_transient() => Status::ServiceUnavailable,
            _ => Status::InternalServerError,
        }
    }

    /// Stable machine-readable name for this class of error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Unauthenticated | Self::InvalidCredentials => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::EmailTaken(_) => "email_taken",
            Self::Locked(_) => "locked",
            Self::NotOpen(_) => "not_open",
            Self::DuplicateVote(_) => "duplicate_vote",
            Self::InvalidOption { .. } => "invalid_option",
            _ if self.is_transient() => "transient",
            _ => "internal",
        }
    }

    /// The reason shown to the client.
    pub fn reason(&self) -> String {
        match self.status().class() {
            StatusClass::ServerError if self.is_transient() => {
                "Service temporarily unavailable, please retry".to_string()
            }
            StatusClass::ServerError => "Server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// The body of every failed API call.
#[derive(Debug, Serialize)]
pub struct Failure {
    pub ok: bool,
    pub kind: &'static str,
    pub error: String,
}

impl Failure {
    pub fn new(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            kind,
            error: error.into(),
        }
    }
}

impl From<&Error> for Failure {
    fn from(err: &Error) -> Self {
        Self::new(err.kind(), err.reason())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{} {}: {self}", req.method(), req.uri()),
            _ => debug!("{} {} rejected: {self}", req.method(), req.uri()),
        }
        (status, Json(Failure::from(&self))).respond_to(req)
    }
}

use serde::{Deserialize, Serialize};

use crate::model::auth::{Role, Session};

use super::ApiId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub role: &'static str,
}

impl From<Role> for LoginResponse {
    fn from(role: Role) -> Self {
        Self {
            role: role.as_str(),
        }
    }
}

/// The identity behind a session, as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub principal_id: ApiId,
    pub email: String,
    pub role: &'static str,
}

/// Who, if anyone, is logged in.
#[derive(Debug, Clone, Serialize)]
pub struct MeView {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl From<Option<Session>> for MeView {
    fn from(session: Option<Session>) -> Self {
        Self {
            logged_in: session.is_some(),
            user: session.map(|session| SessionUser {
                principal_id: session.principal_id.into(),
                email: session.email,
                role: session.role.as_str(),
            }),
        }
    }
}

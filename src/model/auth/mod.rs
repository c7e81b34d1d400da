mod role;
mod token;

pub use role::Role;
pub use token::{Session, AUTH_TOKEN_COOKIE};

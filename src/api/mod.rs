use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::Failure;

mod auth;
mod ec;
mod public;
mod voter;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(ec::routes());
    routes.extend(voter::routes());
    routes.extend(public::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Render every error that no handler turned into a body, such as unknown
/// routes or unparseable JSON, as a failure envelope.
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> (Status, Json<Failure>) {
    let (kind, reason) = match status.code {
        400 | 422 => ("validation", "Malformed request body"),
        401 => ("unauthenticated", "Not logged in"),
        403 => ("forbidden", "Forbidden"),
        404 => ("not_found", "No such endpoint"),
        415 => ("validation", "Expected a JSON body"),
        500..=599 => ("internal", "Server error"),
        _ => ("error", status.reason_lossy()),
    };
    debug!("Caught {status} for {} {}", req.method(), req.uri());
    (status, Json(Failure::new(kind, reason)))
}

use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    engine::Engine,
    error::Result,
    model::{
        api::{
            auth::{LoginRequest, LoginResponse, MeView},
            voter::RegisterRequest,
            Empty, Envelope,
        },
        auth::{Session, AUTH_TOKEN_COOKIE},
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout, me]
}

#[post("/api/register", data = "<request>", format = "json")]
pub async fn register(
    request: Json<RegisterRequest>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<Empty>>> {
    engine.register(request.into_inner()).await?;
    Ok(Json(Envelope::empty()))
}

#[post("/api/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<LoginRequest>,
    engine: &State<Engine>,
    config: &State<Config>,
) -> Result<Json<Envelope<LoginResponse>>> {
    let session = engine.login(&credentials).await?;
    let role = session.role;
    cookies.add(session.into_cookie(config)?);
    Ok(Json(Envelope::ok(role.into())))
}

#[post("/api/logout")]
pub async fn logout(cookies: &CookieJar<'_>) -> Json<Envelope<Empty>> {
    cookies.remove(Cookie::from(AUTH_TOKEN_COOKIE));
    Json(Envelope::empty())
}

#[get("/api/me")]
pub async fn me(session: Option<Session>) -> Json<Envelope<MeView>> {
    Json(Envelope::ok(session.into()))
}

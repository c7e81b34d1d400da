use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Engine,
    error::{Error, Result},
    model::{
        api::{
            referendum::{
                Created, ReferendumDetail, ReferendumList, ReferendumSpec, StateView, StatusRequest,
            },
            Empty, Envelope,
        },
        auth::Session,
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_referendums,
        create_referendum,
        get_referendum,
        update_referendum,
        set_status,
    ]
}

#[get("/api/ec/referendums")]
async fn get_referendums(
    session: std::result::Result<Session, Error>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<ReferendumList>>> {
    let referendums = engine.referendums(&session?).await?;
    Ok(Json(Envelope::ok(ReferendumList { referendums })))
}

#[post("/api/ec/referendums", data = "<spec>", format = "json")]
async fn create_referendum(
    session: std::result::Result<Session, Error>,
    spec: Json<ReferendumSpec>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<Created>>> {
    let id = engine
        .create_referendum(&session?, spec.into_inner())
        .await?;
    Ok(Json(Envelope::ok(Created::new(id))))
}

#[get("/api/ec/referendums/<id>")]
async fn get_referendum(
    session: std::result::Result<Session, Error>,
    id: &str,
    engine: &State<Engine>,
) -> Result<Json<Envelope<ReferendumDetail>>> {
    let session = session?;
    let id = Id::parse_for(id, "referendum")?;
    let referendum = engine.referendum(&session, id).await?;
    Ok(Json(Envelope::ok(ReferendumDetail { referendum })))
}

#[put("/api/ec/referendums/<id>", data = "<spec>", format = "json")]
async fn update_referendum(
    session: std::result::Result<Session, Error>,
    id: &str,
    spec: Json<ReferendumSpec>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<Empty>>> {
    let session = session?;
    let id = Id::parse_for(id, "referendum")?;
    engine
        .update_referendum(&session, id, spec.into_inner())
        .await?;
    Ok(Json(Envelope::empty()))
}

#[post("/api/ec/referendums/<id>/status", data = "<request>", format = "json")]
async fn set_status(
    session: std::result::Result<Session, Error>,
    id: &str,
    request: Json<StatusRequest>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<StateView>>> {
    let session = session?;
    let id = Id::parse_for(id, "referendum")?;
    let state = engine.set_status(&session, id, request.status()?).await?;
    Ok(Json(Envelope::ok(state)))
}

use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Engine,
    error::{Error, Result},
    model::{
        api::{
            referendum::VoterReferendumList,
            vote::{VoteReceipt, VoteRequest},
            Envelope,
        },
        auth::Session,
    },
};

pub fn routes() -> Vec<Route> {
    routes![get_referendums, vote]
}

#[get("/api/referendums")]
async fn get_referendums(
    session: std::result::Result<Session, Error>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<VoterReferendumList>>> {
    let referendums = engine.referendums_for_voter(&session?).await?;
    Ok(Json(Envelope::ok(VoterReferendumList { referendums })))
}

#[post("/api/vote", data = "<ballot>", format = "json")]
async fn vote(
    session: std::result::Result<Session, Error>,
    ballot: Json<VoteRequest>,
    engine: &State<Engine>,
) -> Result<Json<Envelope<VoteReceipt>>> {
    let outcome = engine.cast_vote(&session?, &ballot).await?;
    Ok(Json(Envelope::ok(outcome.into())))
}

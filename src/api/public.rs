use rocket::{serde::json::Json, Route, State};

use crate::{
    engine::Engine,
    error::Result,
    model::{
        api::{
            referendum::{ReferendumResults, ReferendumSummary},
            voter::VoterSummary,
        },
        mongodb::Id,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_voters,
        get_voter,
        get_referendums,
        get_referendum,
        get_results,
    ]
}

#[get("/mslr/voters")]
async fn get_voters(engine: &State<Engine>) -> Result<Json<Vec<VoterSummary>>> {
    Ok(Json(engine.public_voters().await?))
}

#[get("/mslr/voters/<id>")]
async fn get_voter(id: &str, engine: &State<Engine>) -> Result<Json<VoterSummary>> {
    let id = Id::parse_for(id, "voter")?;
    Ok(Json(engine.public_voter(id).await?))
}

#[get("/mslr/referendums")]
async fn get_referendums(engine: &State<Engine>) -> Result<Json<Vec<ReferendumSummary>>> {
    Ok(Json(engine.public_referendums().await?))
}

#[get("/mslr/referendums/<id>")]
async fn get_referendum(id: &str, engine: &State<Engine>) -> Result<Json<ReferendumSummary>> {
    let id = Id::parse_for(id, "referendum")?;
    Ok(Json(engine.public_referendum(id).await?))
}

#[get("/mslr/referendums/<id>/results")]
async fn get_results(id: &str, engine: &State<Engine>) -> Result<Json<ReferendumResults>> {
    let id = Id::parse_for(id, "referendum")?;
    Ok(Json(engine.public_results(id).await?))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::{json, Value},
    };

    use crate::config::Config;
    use crate::model::{
        api::referendum::ReferendumSpec, auth::Session, db::NewVoter, store::MemoryStore,
    };

    use super::*;

    #[backend_test]
    async fn voter_directory(client: Client, store: MemoryStore) {
        let ids = store.insert_example_voters(2).await;

        let response = client.get(uri!(get_voters)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        let voters = body.as_array().unwrap();
        assert_eq!(voters.len(), 2);
        assert_eq!(voters[0]["email"], json!(NewVoter::example_email(0)));
        assert_eq!(voters[0]["dob"], json!("1990-01-01"));
        assert!(voters[0].get("password_hash").is_none());

        let id = ids[1].to_string();
        let response = client.get(uri!(get_voter(id.as_str()))).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["voter_id"], json!(id));

        let response = client.get(uri!(get_voter("bogus"))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn referendum_summaries_and_results(client: Client, engine: Engine, config: Config) {
        let (email, _) = config.ec_credentials().unwrap();
        let ec = Session::election_commission(email);
        let id = engine
            .create_referendum(&ec, ReferendumSpec::example())
            .await
            .unwrap();
        let id = id.to_string();

        let response = client.get(uri!(get_referendums)).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(
            body,
            json!([{"referendum_id": id, "title": "Raise fees?", "status": "closed"}])
        );

        let response = client
            .get(uri!(get_referendum(id.as_str())))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!(get_results(id.as_str()))).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["referendum_id"], json!(id));
        assert_eq!(body["results"][0]["text"], json!("Yes"));
        assert_eq!(body["results"][0]["votes"], json!(0));

        let missing = Id::new().to_string();
        let response = client
            .get(uri!(get_results(missing.as_str())))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;

/// Build the server: config and store are loaded when the rocket ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// A server over the given store, bypassing the config and store fairings.
#[cfg(test)]
pub(crate) fn rocket_for_store(
    store: model::store::MemoryStore,
    config: config::Config,
) -> Rocket<Build> {
    let engine = engine::Engine::new(std::sync::Arc::new(store), config.clone());
    rocket::build()
        .attach(LoggerFairing)
        .manage(config)
        .manage(engine)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::engine::Engine;
use crate::model::{
    mongodb::{ensure_collections_exist, ensure_indexes_exist, MongoStore},
    store::{MemoryStore, Store},
};

const DATABASE: &str = "mslr";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_transaction_retry_window")]
    transaction_retry_window: u64,
    #[serde(default = "default_min_voter_age")]
    min_voter_age: u32,
    #[serde(default = "default_min_password_length")]
    min_password_length: usize,
    // secrets
    jwt_secret: String,
    #[serde(default)]
    ec_email: String,
    #[serde(default)]
    ec_password: String,
    #[serde(default)]
    scc_codes: Vec<String>,
}

fn default_transaction_retry_window() -> u64 {
    10_000
}

fn default_min_voter_age() -> u32 {
    18
}

fn default_min_password_length() -> usize {
    6
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How long a transaction that keeps failing transiently is re-run for.
    pub fn transaction_retry_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.transaction_retry_window)
    }

    pub fn min_voter_age(&self) -> u32 {
        self.min_voter_age
    }

    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// The Election Commission's email and password, unless EC login is
    /// disabled by leaving either empty.
    pub fn ec_credentials(&self) -> Option<(&str, &str)> {
        if self.ec_email.is_empty() || self.ec_password.is_empty() {
            None
        } else {
            Some((&self.ec_email, &self.ec_password))
        }
    }

    /// Shangri-La Citizen Codes seeded into the store on launch.
    pub fn scc_codes(&self) -> &[String] {
        &self.scc_codes
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if config.ec_credentials().is_none() {
            warn!("EC credentials not configured, EC login is disabled");
        }

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: Option<String>,
}

/// A fairing that connects to the store, performs any setup necessary, and
/// places the [`Engine`] into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.state::<Config>() {
            Some(config) => config.clone(),
            None => {
                error!("Application config must be loaded before the store");
                return Err(rocket);
            }
        };
        let db_config = match rocket.figment().extract::<DbConfig>() {
            Ok(db_config) => db_config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Arc<dyn Store> = match db_config.db_uri {
            Some(db_uri) => {
                info!("Loaded database config, connecting...");
                match connect(&db_uri).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Arc::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, using the in-memory store; nothing will persist");
                Arc::new(MemoryStore::new())
            }
        };

        // Seed the citizen codes.
        if let Err(e) = store.ensure_sccs_exist(config.scc_codes()).await {
            error!("Failed to seed SCC codes: {e}");
            return Err(rocket);
        }

        Ok(rocket.manage(Engine::new(store, config)))
    }
}

/// Connect to MongoDB and ensure the required collections and indexes exist.
async fn connect(db_uri: &str) -> Result<MongoStore, mongodb::error::Error> {
    let client = MongoClient::with_uri_str(db_uri).await?;
    let db = client.database(DATABASE);
    ensure_collections_exist(&db).await?;
    ensure_indexes_exist(&db).await?;
    Ok(MongoStore::new(client, db))
}


#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn defaults_apply() {
        let figment = Figment::new()
            .merge(Serialized::default("auth_ttl", 60))
            .merge(Serialized::default("jwt_secret", "secret"));
        let config: Config = figment.extract().unwrap();
        assert_eq!(
            config.transaction_retry_window(),
            std::time::Duration::from_secs(10)
        );
        assert_eq!(config.min_voter_age(), 18);
        assert_eq!(config.min_password_length(), 6);
        assert!(config.ec_credentials().is_none());
        assert!(config.scc_codes().is_empty());
    }

    #[test]
    fn ec_login_needs_both_credentials() {
        let mut config = Config::example();
        assert!(config.ec_credentials().is_some());
        config.ec_password.clear();
        assert!(config.ec_credentials().is_none());
    }
}

use std::env;

use super::error::{CouchDaoError, CouchResult};

/// Where the room database lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, without the database.
    pub base_url: String,
    /// Database holding room documents.
    pub database: String,
    /// Basic-auth user and password, used only when both are set.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` and `COUCH_DB`, plus `COUCH_USERNAME`/`COUCH_PASSWORD` when present.
    pub fn from_env() -> CouchResult<Self> {
        Ok(Self {
            base_url: required("COUCH_BASE_URL")?,
            database: required("COUCH_DB")?,
            credentials: env::var("COUCH_USERNAME")
                .ok()
                .zip(env::var("COUCH_PASSWORD").ok()),
        })
    }
}

fn required(var: &'static str) -> CouchResult<String> {
    env::var(var).map_err(|_| CouchDaoError::MissingEnvVar { var })
}

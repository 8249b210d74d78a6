use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use snafu::ResultExt as _;

use crate::auth::Authenticator;
use crate::database::DatabaseConfig;
use crate::error::{ConfigSnafu, InitError};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address")]
    pub host: SocketAddr,
    /// Shared with the identity provider; tokens it mints are the only
    /// accepted credentials.
    #[serde(rename = "token_secret")]
    pub token_secret: String,
    #[serde(rename = "log_dir", default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(flatten)]
    pub database: DatabaseConfig,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Config {
    pub fn from_env() -> Result<Config, InitError> {
        envy::from_env::<Config>().context(ConfigSnafu)
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(SecretString::new(self.token_secret.clone()))
    }
}

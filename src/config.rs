//! Service configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional `configuration`
//! file, then `APP__*` environment variables (a `.env` file is read first).

use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub nats_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// `memory://` selects the in-process store.
    pub fn is_in_memory(&self) -> bool { self.url.starts_with("memory://") }
}

fn default_port() -> u16 { 8083 }
fn default_log_level() -> String { "info".to_string() }
fn default_max_connections() -> u32 { 10 }

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

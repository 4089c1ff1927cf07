use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;

use crate::connection::DocumentDbSettings;

/// Where the server keeps its items
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Remote document database account
    Rest,
    /// Process memory, lost on exit
    Memory,
}

impl StoreBackend {
    fn from_env(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "rest" | "remote" | "documentdb" => Ok(Self::Rest),
            "memory" | "mem" | "in-memory" => Ok(Self::Memory),
            _ => Err(anyhow::anyhow!("DOCTODO_STORE must be one of: rest, memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub documentdb: DocumentDbSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("APP_PORT must be a valid u16")?;

        let store =
            StoreBackend::from_env(&env::var("DOCTODO_STORE").unwrap_or_else(|_| "rest".to_string()))?;

        let documentdb =
            DocumentDbSettings::from_env().context("invalid DOCUMENTDB_* settings")?;

        Ok(Self {
            host,
            port,
            store,
            documentdb,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

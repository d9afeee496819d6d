use std::{env, fmt::Display, str::FromStr};

use anyhow::{anyhow, bail};

/// Which adapter backs the habit and user stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(anyhow!("unknown store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    pub jwt_secret: String,
    pub jwt_access_ttl_secs: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = parse_or("STORE_BACKEND", StoreBackend::Memory)?;
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("PORT", 8080)?,

            store_backend,
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 20)?,

            jwt_secret,
            // 7 days
            jwt_access_ttl_secs: parse_or("JWT_ACCESS_TTL_SECS", 604_800)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

use std::{env, fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub min_withdrawal: Decimal,
    pub commission_rate: Decimal,
    pub platform_account_id: Uuid,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let store: StoreKind = try_load("WALLET_STORE", "postgres")?;

        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let config = Self {
            port: try_load("PORT", "8000")?,
            store,
            database_url,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            min_withdrawal: try_load("MIN_WITHDRAWAL_AMOUNT", "100")?,
            commission_rate: try_load("PLATFORM_COMMISSION_RATE", "0.20")?,
            platform_account_id: try_load("PLATFORM_ACCOUNT_ID", &Uuid::nil().to_string())?,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commission_rate < Decimal::ZERO || self.commission_rate >= Decimal::ONE {
            return Err(ConfigError::Invalid {
                key: "PLATFORM_COMMISSION_RATE",
                reason: "must be in [0, 1)".into(),
            });
        }
        if self.min_withdrawal <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "MIN_WITHDRAWAL_AMOUNT",
                reason: "must be positive".into(),
            });
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        Ok(())
    }

    /// In-memory configuration with the production business defaults.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            port: 0,
            store: StoreKind::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt_secret: jwt_secret.into(),
            min_withdrawal: Decimal::from(100),
            commission_rate: Decimal::new(20, 2),
            platform_account_id: Uuid::nil(),
        }
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

//! Process configuration read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LINENROOM_FLOORS` | `3-11` |
//! | `LINENROOM_RESTOCK_QUANTITY` | `5` |
//! | `LINENROOM_HISTORY_LIMIT` | `50` |
//! | `LINENROOM_CATALOG` | the default linen items, comma separated |
//! | `LINENROOM_UTC_OFFSET_MINUTES` | `0` |
//! | `LINENROOM_BIND_ADDR` | `0.0.0.0:8080` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent |
//! | `DATABASE_MAX_CONNECTIONS` | `5` |

use core::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

use linenroom_supplies::{Catalog, DEFAULT_RESTOCK_QUANTITY, FloorRange, ItemName};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

#[derive(Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

// The URL may carry credentials.
impl core::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageConfig::InMemory => f.write_str("InMemory"),
            StorageConfig::Postgres {
                max_connections, ..
            } => f
                .debug_struct("Postgres")
                .field("database_url", &"<redacted>")
                .field("max_connections", max_connections)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinenConfig {
    pub floors: FloorRange,
    pub restock_quantity: u32,
    pub history_limit: usize,
    pub catalog: Catalog,
    pub utc_offset: FixedOffset,
    pub bind_addr: String,
    pub storage: StorageConfig,
}

impl Default for LinenConfig {
    fn default() -> Self {
        Self {
            floors: FloorRange::default(),
            restock_quantity: DEFAULT_RESTOCK_QUANTITY,
            history_limit: DEFAULT_HISTORY_LIMIT,
            catalog: Catalog::defaults(),
            utc_offset: Utc.fix(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            storage: StorageConfig::InMemory,
        }
    }
}

impl LinenConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let floors = match get("LINENROOM_FLOORS") {
            Some(raw) => raw.parse::<FloorRange>().map_err(|e| invalid("LINENROOM_FLOORS", e))?,
            None => defaults.floors,
        };

        let restock_quantity = parse_or("LINENROOM_RESTOCK_QUANTITY", get("LINENROOM_RESTOCK_QUANTITY"), defaults.restock_quantity)?;
        let history_limit = parse_or("LINENROOM_HISTORY_LIMIT", get("LINENROOM_HISTORY_LIMIT"), defaults.history_limit)?;
        if history_limit == 0 {
            return Err(invalid("LINENROOM_HISTORY_LIMIT", "must be at least 1"));
        }

        let catalog = match get("LINENROOM_CATALOG") {
            Some(raw) => parse_catalog(&raw)?,
            None => defaults.catalog,
        };

        let offset_minutes: i32 = parse_or("LINENROOM_UTC_OFFSET_MINUTES", get("LINENROOM_UTC_OFFSET_MINUTES"), 0)?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| invalid("LINENROOM_UTC_OFFSET_MINUTES", format!("{offset_minutes} is out of range")))?;

        let bind_addr = get("LINENROOM_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let persistent: bool = parse_or("USE_PERSISTENT_STORES", get("USE_PERSISTENT_STORES"), false)?;
        let storage = if persistent {
            StorageConfig::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    DEFAULT_MAX_CONNECTIONS,
                )?,
            }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self {
            floors,
            restock_quantity,
            history_limit,
            catalog,
            utc_offset,
            bind_addr,
            storage,
        })
    }
}

fn invalid(var: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| invalid(var, format!("'{raw}': {e}"))),
        None => Ok(default),
    }
}

fn parse_catalog(raw: &str) -> Result<Catalog, ConfigError> {
    let names = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(ItemName::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid("LINENROOM_CATALOG", e))?;
    Catalog::new(names).map_err(|e| invalid("LINENROOM_CATALOG", e))
}

//! Database connection descriptors.
//!
//! Contains the engine enumeration and the per-database target loaded
//! from the backup configuration.

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

/// Database engine declared by a backup target.
///
/// Unknown engine names are kept verbatim so the run can skip that target
/// instead of rejecting the whole configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum DbType {
    /// PostgreSQL database.
    Postgres,
    /// MariaDB / MySQL database.
    MariaDB,
    /// Redis key-value store.
    Redis,
    /// Any engine without a backup strategy.
    Unsupported(String),
}

impl DbType {
    /// Returns the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbType::Postgres => Some(5432),
            DbType::MariaDB => Some(3306),
            DbType::Redis => Some(6379),
            DbType::Unsupported(_) => None,
        }
    }

    /// Whether a backup strategy exists for this engine.
    pub fn is_supported(&self) -> bool {
        !matches!(self, DbType::Unsupported(_))
    }
}

impl From<String> for DbType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => DbType::Postgres,
            "mariadb" | "mysql" => DbType::MariaDB,
            "redis" => DbType::Redis,
            _ => DbType::Unsupported(s),
        }
    }
}

impl From<&str> for DbType {
    fn from(s: &str) -> Self {
        DbType::from(s.to_string())
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::Postgres => write!(f, "postgres"),
            DbType::MariaDB => write!(f, "mariadb"),
            DbType::Redis => write!(f, "redis"),
            DbType::Unsupported(name) => write!(f, "{}", name),
        }
    }
}

/// A single database to back up.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_display_name"))]
pub struct DatabaseTarget {
    /// Declared engine.
    #[serde(rename = "type")]
    pub engine: DbType,
    /// Database host.
    #[validate(length(min = 1, message = "host must not be empty"))]
    #[serde(default)]
    pub host: String,
    /// Database port (engine default if not specified).
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    #[serde(default)]
    pub port: Option<u16>,
    /// Database username.
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub username: String,
    /// Database password.
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub password: String,
    /// Database name, or the logical database index for Redis.
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub database: String,
    /// Optional alias used for artifact naming.
    #[serde(default)]
    pub alias: Option<String>,
    /// Whether the connection should use TLS.
    #[serde(default, rename = "enablessl", deserialize_with = "deserialize_flag")]
    pub enable_ssl: bool,
}

impl DatabaseTarget {
    /// Name used for artifact files and log lines: alias if set, else the database.
    pub fn display_name(&self) -> &str {
        match self.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => alias,
            _ => self.database.trim(),
        }
    }

    /// Effective port: configured value or the engine default.
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| self.engine.default_port())
            .unwrap_or_default()
    }
}

fn validate_display_name(target: &DatabaseTarget) -> Result<(), ValidationError> {
    if target.display_name().is_empty() {
        let mut err = ValidationError::new("display_name");
        err.message = Some("either alias or database must be set".into());
        return Err(err);
    }
    Ok(())
}

/// Accepts unquoted YAML scalars (`database: 0`, `password: 1234`) as text.
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

/// Accepts `"0"`/`"1"`, `true`/`false` and `0`/`1` for boolean flags.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Text(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
    })
}

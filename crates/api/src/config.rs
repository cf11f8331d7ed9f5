//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_REALTIME_CAPACITY: usize = 256;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Buffer of the SSE broadcast; slow clients drop messages beyond it.
    pub realtime_capacity: usize,
    /// Run the low-stock trigger on every inventory update.
    pub low_stock_monitor: bool,
    /// Postgres event store; only read with the `postgres` feature.
    pub database_url: Option<String>,
}

impl ApiConfig {
    /// Defaults for tests and local runs.
    pub fn for_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            realtime_capacity: DEFAULT_REALTIME_CAPACITY,
            low_stock_monitor: true,
            database_url: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("GLOWDESK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "GLOWDESK_BIND_ADDR",
            expected: "socket address",
            value: bind_raw.clone(),
        })?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let realtime_capacity = match lookup("GLOWDESK_REALTIME_CAPACITY") {
            None => DEFAULT_REALTIME_CAPACITY,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "GLOWDESK_REALTIME_CAPACITY",
                        expected: "positive integer",
                        value: raw,
                    });
                }
            },
        };

        let low_stock_monitor = match lookup("GLOWDESK_LOW_STOCK_MONITOR") {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid {
                var: "GLOWDESK_LOW_STOCK_MONITOR",
                expected: "boolean",
                value: raw.clone(),
            })?,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            realtime_capacity,
            low_stock_monitor,
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

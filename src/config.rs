use chrono::{FixedOffset, Offset, Utc};

use crate::error::ConfigError;

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub utc_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Reads values through `get` so tests can supply their own lookup.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match get("COACHING_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    key: "COACHING_DB_MAX_CONNECTIONS",
                    value: raw,
                    reason: "expected a positive integer",
                })?,
            None => 5,
        };

        let utc_offset = match get("COACHING_UTC_OFFSET_MINUTES") {
            Some(raw) => parse_offset(&raw).ok_or(ConfigError::Invalid {
                key: "COACHING_UTC_OFFSET_MINUTES",
                value: raw,
                reason: "expected minutes within +/-840",
            })?,
            None => Utc.fix(),
        };

        Ok(Self {
            database_url,
            max_connections,
            utc_offset,
        })
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let minutes: i32 = raw.trim().parse().ok()?;
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return None;
    }
    FixedOffset::east_opt(minutes * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_database_url() {
        let res = Config::from_env_with(|_| None);
        assert_eq!(res.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_env_with(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/coaching".into()),
            _ => None,
        })
        .expect("cfg");
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.utc_offset.local_minus_utc(), 0);
    }

    #[test]
    fn reads_values() {
        let cfg = Config::from_env_with(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/coaching".into()),
            "COACHING_DB_MAX_CONNECTIONS" => Some("12".into()),
            "COACHING_UTC_OFFSET_MINUTES" => Some("-300".into()),
            _ => None,
        })
        .expect("cfg");
        assert_eq!(cfg.max_connections, 12);
        assert_eq!(cfg.utc_offset.local_minus_utc(), -300 * 60);
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let res = Config::from_env_with(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/coaching".into()),
            "COACHING_UTC_OFFSET_MINUTES" => Some("900".into()),
            _ => None,
        });
        assert!(matches!(
            res,
            Err(ConfigError::Invalid {
                key: "COACHING_UTC_OFFSET_MINUTES",
                ..
            })
        ));
    }

    #[test]
    fn rejects_zero_connections() {
        let res = Config::from_env_with(|k| match k {
            "DATABASE_URL" => Some("postgres://localhost/coaching".into()),
            "COACHING_DB_MAX_CONNECTIONS" => Some("0".into()),
            _ => None,
        });
        assert!(res.is_err());
    }
}

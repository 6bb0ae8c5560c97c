//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the REST server binds to.
    pub bind_addr: SocketAddr,
    /// libSQL database file.
    pub db_path: PathBuf,
    /// How long a successful code match is acknowledged before handoff.
    pub handoff_delay: Duration,
    /// bcrypt work factor for stored password hashes.
    pub bcrypt_cost: u32,
    /// Wizards and linking sessions untouched for this long are dropped.
    pub session_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: PathBuf::from("./data/fitlink.db"),
            handoff_delay: Duration::from_millis(1500),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            session_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl AppConfig {
    /// Build the config from `FITLINK_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = get("FITLINK_BIND") {
            config.bind_addr = raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "FITLINK_BIND".to_string(),
                message: format!("{raw:?} is not a socket address: {e}"),
            })?;
        }

        if let Some(raw) = get("FITLINK_DB_PATH") {
            config.db_path = PathBuf::from(raw);
        }

        if let Some(raw) = get("FITLINK_HANDOFF_DELAY_MS") {
            let ms: u64 = raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "FITLINK_HANDOFF_DELAY_MS".to_string(),
                message: format!("{raw:?}: {e}"),
            })?;
            config.handoff_delay = Duration::from_millis(ms);
        }

        if let Some(raw) = get("FITLINK_BCRYPT_COST") {
            let cost: u32 = raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "FITLINK_BCRYPT_COST".to_string(),
                message: format!("{raw:?}: {e}"),
            })?;
            // bcrypt rejects costs outside 4..=31
            if !(4..=31).contains(&cost) {
                return Err(ConfigError::InvalidValue {
                    key: "FITLINK_BCRYPT_COST".to_string(),
                    message: format!("{cost} is outside 4..=31"),
                });
            }
            config.bcrypt_cost = cost;
        }

        if let Some(raw) = get("FITLINK_SESSION_TTL_SECS") {
            let secs: u64 = raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "FITLINK_SESSION_TTL_SECS".to_string(),
                message: format!("{raw:?}: {e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "FITLINK_SESSION_TTL_SECS".to_string(),
                    message: "must be at least 1".to_string(),
                });
            }
            config.session_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.handoff_delay, Duration::from_millis(1500));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FITLINK_BIND", "127.0.0.1:9000"),
            ("FITLINK_DB_PATH", "/tmp/x.db"),
            ("FITLINK_HANDOFF_DELAY_MS", "0"),
            ("FITLINK_BCRYPT_COST", "4"),
            ("FITLINK_SESSION_TTL_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.handoff_delay, Duration::ZERO);
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.session_ttl, Duration::from_secs(120));
    }

    #[test]
    fn rejects_bad_values() {
        let err = AppConfig::from_lookup(lookup(&[("FITLINK_BIND", "nope")])).unwrap_err();
        assert!(err.to_string().contains("FITLINK_BIND"));

        let err =
            AppConfig::from_lookup(lookup(&[("FITLINK_BCRYPT_COST", "99")])).unwrap_err();
        assert!(err.to_string().contains("outside"));

        let err =
            AppConfig::from_lookup(lookup(&[("FITLINK_SESSION_TTL_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("FITLINK_SESSION_TTL_SECS"));
    }
}

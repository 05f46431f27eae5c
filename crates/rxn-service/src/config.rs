//! Service configuration.
//!
//! Read once at startup from the environment. Every variable has a
//! default except `DATABASE_URL`, whose absence selects in-memory storage.

/// Runtime configuration of the reaction services.
///
/// Custom `Debug` implementation redacts `database_url`, which commonly
/// embeds credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Postgres connection string; `None` runs in-memory only.
    pub database_url: Option<String>,
    /// How many recent roots a proof may be checked against.
    pub root_window: usize,
    /// Number of reaction slots (ciphertext array length).
    pub reaction_slots: usize,
    /// Extra attempts after a tally version conflict.
    pub tally_max_retries: u32,
    /// Postgres pool size.
    pub db_max_connections: u32,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("root_window", &self.root_window)
            .field("reaction_slots", &self.reaction_slots)
            .field("tally_max_retries", &self.tally_max_retries)
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            root_window: 5,
            reaction_slots: 6,
            tally_max_retries: 3,
            db_max_connections: 10,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DATABASE_URL` (optional; absent means in-memory stores)
    /// - `RXN_ROOT_WINDOW` (default: 5)
    /// - `RXN_REACTION_SLOTS` (default: 6)
    /// - `RXN_TALLY_MAX_RETRIES` (default: 3)
    /// - `RXN_DB_MAX_CONNECTIONS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            root_window: parse_var(&lookup, "RXN_ROOT_WINDOW", defaults.root_window)?,
            reaction_slots: parse_var(&lookup, "RXN_REACTION_SLOTS", defaults.reaction_slots)?,
            tally_max_retries: parse_var(
                &lookup,
                "RXN_TALLY_MAX_RETRIES",
                defaults.tally_max_retries,
            )?,
            db_max_connections: parse_var(
                &lookup,
                "RXN_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no deployment can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_window == 0 {
            return Err(ConfigError::OutOfRange("RXN_ROOT_WINDOW", "must be at least 1"));
        }
        if self.reaction_slots == 0 {
            return Err(ConfigError::OutOfRange("RXN_REACTION_SLOTS", "must be at least 1"));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::OutOfRange(
                "RXN_DB_MAX_CONNECTIONS",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(var, raw)),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
    #[error("{0} {1}")]
    OutOfRange(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.root_window, 5);
        assert_eq!(cfg.reaction_slots, 6);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("RXN_ROOT_WINDOW", "3"),
            ("RXN_REACTION_SLOTS", " 8 "),
            ("DATABASE_URL", "postgres://u:p@localhost/rxn"),
        ]))
        .unwrap();
        assert_eq!(cfg.root_window, 3);
        assert_eq!(cfg.reaction_slots, 8);
        assert!(cfg.database_url.is_some());
    }

    #[test]
    fn garbage_is_an_error_not_a_default() {
        let err = ServiceConfig::from_lookup(lookup(&[("RXN_TALLY_MAX_RETRIES", "many")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Invalid("RXN_TALLY_MAX_RETRIES", "many".into()));
    }

    #[test]
    fn zero_window_rejected() {
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[("RXN_ROOT_WINDOW", "0")])),
            Err(ConfigError::OutOfRange("RXN_ROOT_WINDOW", _))
        ));
    }

    #[test]
    fn debug_redacts_database_url() {
        let cfg = ServiceConfig {
            database_url: Some("postgres://user:secret@db/rxn".into()),
            ..ServiceConfig::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn blank_database_url_means_memory() {
        let cfg = ServiceConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(cfg.database_url.is_none());
    }
}

//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::RaceRules;

/// Room every client lands in unless the URL names another one
pub const DEFAULT_ROOM: &str = "racing_game_room";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Allowed client origins for CORS; any origin when empty
    pub client_origins: Vec<String>,
    /// Room used by `/ws/game`
    pub default_room: String,
    /// Race tuning
    pub rules: RaceRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            log_level: "info".to_string(),
            log_json: false,
            client_origins: Vec::new(),
            default_room: DEFAULT_ROOM.to_string(),
            rules: RaceRules::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Hosting platforms hand out PORT; fall back to SERVER_ADDR
        let server_addr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port)
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            (None, Some(addr)) => addr.parse().map_err(|_| ConfigError::InvalidAddress)?,
            (None, None) => defaults.server_addr,
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let rules = RaceRules {
            max_speed: parse_or(&lookup, "MAX_SPEED", defaults.rules.max_speed)?,
            laps_to_win: parse_or(&lookup, "LAPS_TO_WIN", defaults.rules.laps_to_win)?,
            lap_debounce: parse_or(&lookup, "LAP_DEBOUNCE", defaults.rules.lap_debounce)?,
        };

        if rules.max_speed.is_nan() || rules.max_speed <= 0.0 {
            return Err(ConfigError::Invalid {
                var: "MAX_SPEED",
                value: rules.max_speed.to_string(),
            });
        }
        if rules.laps_to_win == 0 {
            return Err(ConfigError::Invalid {
                var: "LAPS_TO_WIN",
                value: "0".to_string(),
            });
        }

        let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json,
            client_origins,
            default_room: lookup("DEFAULT_ROOM").unwrap_or(defaults.default_room),
            rules,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 8000);
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.default_room, DEFAULT_ROOM);
        assert!(config.client_origins.is_empty());
        assert_eq!(config.rules.laps_to_win, 3);
        assert_eq!(config.rules.max_speed, 5.0);
        assert!(config.rules.lap_debounce);
    }

    #[test]
    fn port_wins_over_server_addr() {
        let config = load(&[("PORT", "9100"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:9100".parse().unwrap());

        let config = load(&[("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn bad_address_is_rejected() {
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }

    #[test]
    fn parses_rules_and_origins() {
        let config = load(&[
            ("LAPS_TO_WIN", "5"),
            ("MAX_SPEED", "7.5"),
            ("LAP_DEBOUNCE", "false"),
            ("CLIENT_ORIGIN", "http://a.test, http://b.test,"),
        ])
        .unwrap();
        assert_eq!(config.rules.laps_to_win, 5);
        assert_eq!(config.rules.max_speed, 7.5);
        assert!(!config.rules.lap_debounce);
        assert_eq!(config.client_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn log_format_switch() {
        assert!(load(&[("LOG_FORMAT", "json")]).unwrap().log_json);
        assert!(!load(&[("LOG_FORMAT", "text")]).unwrap().log_json);
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        ));
    }

    #[test]
    fn rejects_nonsense_rules() {
        for vars in [
            [("LAPS_TO_WIN", "0")],
            [("LAPS_TO_WIN", "three")],
            [("MAX_SPEED", "-1")],
            [("LAP_DEBOUNCE", "maybe")],
        ] {
            assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
        }
    }
}

use rocket::fairing::AdHoc;
use serde::Deserialize;

fn default_login_ttl_hours() -> i64 {
    12
}

fn default_session_cleanup_interval_secs() -> u64 {
    3600
}

fn default_mastery_threshold() -> u8 {
    7
}

/// Application settings read from Rocket's figment, so `Rocket.toml` and
/// `ROCKET_*` variables both apply.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_login_ttl_hours")]
    pub login_ttl_hours: i64,
    #[serde(default = "default_session_cleanup_interval_secs")]
    pub session_cleanup_interval_secs: u64,
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            login_ttl_hours: default_login_ttl_hours(),
            session_cleanup_interval_secs: default_session_cleanup_interval_secs(),
            mastery_threshold: default_mastery_threshold(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, rocket::figment::Error> {
        rocket::Config::figment().extract()
    }

    pub fn fairing() -> AdHoc {
        AdHoc::config::<AppConfig>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_apply_without_overrides() {
        temp_env::with_vars_unset(
            [
                "ROCKET_LOGIN_TTL_HOURS",
                "ROCKET_SESSION_CLEANUP_INTERVAL_SECS",
                "ROCKET_MASTERY_THRESHOLD",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.login_ttl_hours, 12);
                assert_eq!(config.session_cleanup_interval_secs, 3600);
                assert_eq!(config.mastery_threshold, 7);
            },
        );
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("ROCKET_LOGIN_TTL_HOURS", Some("2")),
                ("ROCKET_MASTERY_THRESHOLD", Some("8")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.login_ttl_hours, 2);
                assert_eq!(config.mastery_threshold, 8);
                assert_eq!(config.session_cleanup_interval_secs, 3600);
            },
        );
    }

    #[test]
    #[serial]
    fn test_invalid_value_is_an_error() {
        temp_env::with_var("ROCKET_MASTERY_THRESHOLD", Some("lots"), || {
            assert!(AppConfig::load().is_err());
        });
    }
}

use std::path::Path;

use tracing::{info, warn};

const COMMON_ENV: &str = "config/common.env";
const SECRETS_ENV: &str = ".secrets.env";

fn profile_env_file() -> &'static str {
    match dotenvy::var("ROCKET_PROFILE").as_deref() {
        Ok("production") | Ok("release") => "config/prod.env",
        _ => "config/dev.env",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFile {
    Loaded(&'static str),
    Missing(&'static str),
}

impl EnvFile {
    /// Env files are read before the subscriber exists, so they are reported afterwards.
    pub fn log(&self) {
        match self {
            EnvFile::Loaded(path) => info!(path, "Loaded environment file"),
            EnvFile::Missing(path) => warn!(path, "Environment file not found, skipping"),
        }
    }
}

/// Loads the shared env file, then the profile's, then local secrets. Later files win.
pub fn load_environment() -> anyhow::Result<Vec<EnvFile>> {
    [COMMON_ENV, profile_env_file(), SECRETS_ENV]
        .into_iter()
        .map(load_env_file)
        .collect()
}

fn load_env_file(path: &'static str) -> anyhow::Result<EnvFile> {
    if !Path::new(path).exists() {
        return Ok(EnvFile::Missing(path));
    }

    dotenvy::from_filename_override(path)?;
    Ok(EnvFile::Loaded(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_profile_selects_env_file() {
        temp_env::with_var("ROCKET_PROFILE", Some("production"), || {
            assert_eq!(profile_env_file(), "config/prod.env");
        });
        temp_env::with_var("ROCKET_PROFILE", None::<&str>, || {
            assert_eq!(profile_env_file(), "config/dev.env");
        });
    }

    #[test]
    fn test_missing_file_is_skipped() {
        assert_eq!(
            load_env_file("config/does-not-exist.env").unwrap(),
            EnvFile::Missing("config/does-not-exist.env")
        );
    }
}

//! Runtime configuration.

use crate::error::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "studydesk.toml";

/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE_FILE: &str = "studydesk.db";

/// Application configuration managed by Figment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// SQLite database file.
    /// Env: `STUDYDESK_DATABASE_PATH`. Default: `studydesk.db`.
    pub database_path: PathBuf,

    /// Tracing filter used when `RUST_LOG` is unset.
    /// Env: `STUDYDESK_LOG_LEVEL`. Default: `warn`.
    pub log_level: String,

    /// Argon2 memory cost in KiB.
    /// Env: `STUDYDESK_PASSWORD_MEMORY_KIB`. Default: `19456`.
    pub password_memory_kib: u32,

    /// Argon2 iteration count.
    /// Env: `STUDYDESK_PASSWORD_ITERATIONS`. Default: `2`.
    pub password_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            log_level: "warn".to_string(),
            password_memory_kib: argon2::Params::DEFAULT_M_COST,
            password_iterations: argon2::Params::DEFAULT_T_COST,
        }
    }
}

impl Config {
    /// Builds a Figment that merges defaults, the TOML file, and
    /// `STUDYDESK_`-prefixed environment variables, in that order.
    pub fn figment<P: AsRef<Path>>(config_file: P) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("STUDYDESK_"))
    }

    /// Loads configuration from `studydesk.toml` and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        Ok(Self::figment(config_file).extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let cfg: Config = Config::figment(DEFAULT_CONFIG_FILE).extract()?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.database_path, PathBuf::from("studydesk.db"));
            assert_eq!(cfg.password_iterations, argon2::Params::DEFAULT_T_COST);
            Ok(())
        });
    }

    #[test]
    fn test_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                "database_path = \"other.db\"\npassword_iterations = 1\n",
            )?;

            let cfg: Config = Config::figment(DEFAULT_CONFIG_FILE).extract()?;
            assert_eq!(cfg.database_path, PathBuf::from("other.db"));
            assert_eq!(cfg.password_iterations, 1);
            assert_eq!(cfg.log_level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                "database_path = \"other.db\"\npassword_iterations = 1\n",
            )?;
            jail.set_env("STUDYDESK_PASSWORD_ITERATIONS", "3");
            jail.set_env("STUDYDESK_LOG_LEVEL", "debug");

            let cfg: Config = Config::figment(DEFAULT_CONFIG_FILE).extract()?;
            assert_eq!(cfg.password_iterations, 3);
            assert_eq!(cfg.log_level, "debug");
            assert_eq!(cfg.database_path, PathBuf::from("other.db"));
            Ok(())
        });
    }

    #[test]
    fn test_load_reports_bad_value() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("STUDYDESK_PASSWORD_ITERATIONS", "many");
            assert!(matches!(Config::load(), Err(crate::StoreError::Config(_))));
            Ok(())
        });
    }
}

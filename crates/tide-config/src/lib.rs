//! Configuration for Tidegate, merged from TOML files and the environment.
//!
//! A value is resolved by starting from built-in defaults and overlaying, in
//! order, the user-global file (`~/.config/tidegate/config.toml`), the
//! project-local file (`.tidegate/config.toml`), and finally any `TIDEGATE_*`
//! environment variables. Later layers win. Nested sections use a double
//! underscore in the variable name, so `TIDEGATE_AUTH__BASE_URL` sets
//! `auth.base_url`.
//!
//! Embedding applications usually call [`TideConfig::load_with_dotenv`] once
//! at startup:
//!
//! ```no_run
//! let config = tide_config::TideConfig::load_with_dotenv()?;
//! if config.auth.is_configured() {
//!     println!("auth service at {}", config.auth.base_url);
//! }
//! # Ok::<(), tide_config::ConfigError>(())
//! ```

mod auth;
mod error;

pub use auth::AuthConfig;
pub use error::ConfigError;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TideConfig {
    #[serde(default)]
    pub auth: AuthConfig,
}

impl TideConfig {
    /// Resolve configuration from the TOML files and the environment.
    ///
    /// Skips the `.env` lookup; any `TIDEGATE_*` variables must already be
    /// in the process environment. See [`Self::load_with_dotenv`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a layer fails to parse or a value
    /// has the wrong shape.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Resolve configuration after loading a `.env` file, if one exists
    /// anywhere between the crate directory and the workspace root.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a layer fails to parse or a value
    /// has the wrong shape.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_nearest_dotenv();
        Self::load()
    }

    /// The raw provider chain, exposed so tests can extract from it inside a
    /// `figment::Jail` or stack extra providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global) = Self::global_config_path()
            && global.exists()
        {
            figment = figment.merge(Toml::file(global));
        }

        let local = PathBuf::from(".tidegate/config.toml");
        if local.exists() {
            figment = figment.merge(Toml::file(local));
        }

        // Environment last, so it overrides both files.
        figment.merge(Env::prefixed("TIDEGATE_").split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tidegate").join("config.toml"))
    }

    /// Walk up from `CARGO_MANIFEST_DIR` toward the workspace root and load
    /// the first `.env` found. A missing file is not an error.
    fn load_nearest_dotenv() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // Three levels covers crate -> crates/ -> workspace root.
            for _ in 0..3 {
                let candidate = dir.join(".env");
                if candidate.exists() {
                    let _ = dotenvy::from_path(&candidate);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_loads() {
        let config = TideConfig::default();
        assert!(!config.auth.is_configured());
        assert_eq!(config.auth.default_session_secs, 28_800);
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config: TideConfig = TideConfig::figment().extract()?;
            assert!(!config.auth.is_configured());
            assert_eq!(config.auth.request_timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("TIDEGATE_AUTH__BASE_URL", "https://api.fisheries.example");
            jail.set_env("TIDEGATE_AUTH__DEFAULT_SESSION_SECS", "3600");
            let config: TideConfig = TideConfig::figment().extract()?;
            assert!(config.auth.is_configured());
            assert_eq!(config.auth.base_url, "https://api.fisheries.example");
            assert_eq!(config.auth.default_session_secs, 3600);
            Ok(())
        });
    }
}

//! Configuration for a load test run.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `LOADGEN__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! # Environment Variables
//!
//! Environment variables use `LOADGEN__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `LOADGEN__HOST=http://localhost:3002` sets the target host
//! - `LOADGEN__USER=product_service` selects the product-service user
//! - `LOADGEN__THINK_TIME__MIN=500ms` overrides the shortest pause
//!
//! # YAML Configuration File
//!
//! ```yaml
//! host: http://localhost:3002
//! user: product_service
//! users: 20
//! spawn_rate: 2
//! duration: 5m
//! tags: [list, detail]
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, bail};
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::session::ThinkTime;
use crate::users::UserKind;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "LOADGEN__";

/// The log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    #[default]
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

/// Logging configuration. Logs are always written to stderr.
#[derive(Debug, Deserialize, Serialize)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable takes precedence if set.
    ///
    /// # Default
    ///
    /// `INFO`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format.
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration of a load test run.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the target, e.g. `http://localhost:8080`.
    pub host: String,

    /// Which simulated user to run.
    pub user: UserKind,

    /// Number of concurrently active simulated users.
    pub users: usize,

    /// Simulated users started per second until `users` are running.
    pub spawn_rate: f64,

    /// How long the run lasts, measured from the start of the first user.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Restricts the run to actions with one of these tags. Empty enables every action.
    pub tags: Vec<String>,

    /// Pause between actions. Falls back to the default of the selected user.
    pub think_time: Option<ThinkTime>,

    /// Seed for reproducible runs. Each simulated user derives its own RNG from it.
    pub seed: Option<u64>,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_owned(),
            user: UserKind::default(),
            users: 1,
            spawn_rate: 1.0,
            duration: Duration::from_secs(60),
            tags: Vec::new(),
            think_time: None,
            seed: None,
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration, merging defaults, the optional YAML file at `path` and the
    /// environment, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file cannot be read or parsed
    /// - Environment variables contain invalid values
    /// - The merged values fail [`validation`](Self::validate)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.users == 0 {
            bail!("`users` must be at least 1");
        }
        crate::runner::spawn_interval(self.spawn_rate)?;
        if let Some(ThinkTime { min, max }) = self.think_time {
            if min > max {
                bail!("`think_time.min` ({min:?}) exceeds `think_time.max` ({max:?})");
            }
        }
        self.user.check_tags(&self.tags)?;
        Ok(())
    }

    /// The effective pause between actions.
    pub fn think_time(&self) -> ThinkTime {
        self.think_time.unwrap_or_else(|| self.user.default_think_time())
    }
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();
            assert_eq!(config.host, "http://localhost:8080");
            assert_eq!(config.user, UserKind::Storefront);
            assert_eq!(config.users, 1);
            assert_eq!(config.think_time(), UserKind::Storefront.default_think_time());
            assert_eq!(config.logging.level, LevelFilter::INFO);
            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LOADGEN__HOST", "http://localhost:3002");
            jail.set_env("LOADGEN__USER", "product_service");
            jail.set_env("LOADGEN__USERS", "25");
            jail.set_env("LOADGEN__DURATION", "2m");
            jail.set_env("LOADGEN__THINK_TIME__MIN", "100ms");
            jail.set_env("LOADGEN__THINK_TIME__MAX", "1s");
            jail.set_env("LOADGEN__LOGGING__LEVEL", "debug");

            let config = Config::load(None).unwrap();
            assert_eq!(config.host, "http://localhost:3002");
            assert_eq!(config.user, UserKind::ProductService);
            assert_eq!(config.users, 25);
            assert_eq!(config.duration, Duration::from_secs(120));
            assert_eq!(
                config.think_time(),
                ThinkTime::between(Duration::from_millis(100), Duration::from_secs(1))
            );
            assert_eq!(config.logging.level, LevelFilter::DEBUG);
            Ok(())
        });
    }

    #[test]
    fn configured_with_env_and_yaml() {
        let mut tempfile = tempfile::NamedTempFile::new().unwrap();
        tempfile
            .write_all(
                br#"
            host: http://storefront:8080
            users: 10
            spawn_rate: 2.5
            tags:
                - cart
                - checkout
            logging:
                format: json
            "#,
            )
            .unwrap();

        figment::Jail::expect_with(|jail| {
            jail.set_env("LOADGEN__USERS", "3");

            let config = Config::load(Some(tempfile.path())).unwrap();
            assert_eq!(config.host, "http://storefront:8080");
            // Env should overwrite the yaml config
            assert_eq!(config.users, 3);
            assert_eq!(config.spawn_rate, 2.5);
            assert_eq!(config.tags, ["cart", "checkout"]);
            assert_eq!(config.logging.format, LogFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn rejects_spawn_rate_without_interval() {
        let config = Config {
            spawn_rate: 1e-20,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too low"), "{err}");
    }

    #[test]
    fn rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LOADGEN__USERS", "0");
            assert!(Config::load(None).is_err());

            jail.set_env("LOADGEN__USERS", "1");
            jail.set_env("LOADGEN__SPAWN_RATE", "0");
            assert!(Config::load(None).is_err());

            jail.set_env("LOADGEN__SPAWN_RATE", "1");
            jail.set_env("LOADGEN__THINK_TIME__MIN", "3s");
            jail.set_env("LOADGEN__THINK_TIME__MAX", "1s");
            assert!(Config::load(None).is_err());

            jail.set_env("LOADGEN__THINK_TIME__MIN", "1s");
            jail.set_env("LOADGEN__USER", "product_service");
            jail.set_env("LOADGEN__TAGS", r#"["checkout"]"#);
            let err = Config::load(None).unwrap_err();
            assert!(err.to_string().contains("no actions match"), "{err}");
            Ok(())
        });
    }
}

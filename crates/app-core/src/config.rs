//! Read-once configuration: a YAML file layered with environment overrides.
//!
//! The configuration is loaded a single time at startup and shared behind an
//! `Arc`. Secrets are expected to come from the environment, e.g.
//! `APP__JWT__SECRET` overrides `jwt.secret`.

use std::path::{Path, PathBuf};

use config::{Config as RawConfig, Environment, File};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load or parse configuration")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone)]
pub struct Config {
    inner: RawConfig,
}

impl Config {
    pub fn builder<P: AsRef<Path>>(path: P) -> ConfigBuilder {
        ConfigBuilder::new(path.as_ref().to_path_buf())
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn builder_test() -> test_utils::TestConfigBuilder {
        test_utils::TestConfigBuilder::new()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.inner.get(key).map_err(ConfigError::from)
    }

    /// Like [`Config::get`], but falls back to `default` when the key is absent.
    /// A present but malformed value is still an error.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.inner.get(key) {
            Ok(value) => Ok(value),
            Err(config::ConfigError::NotFound(_)) => Ok(default),
            Err(err) => Err(err.into()),
        }
    }
}

pub struct ConfigBuilder {
    path: PathBuf,
    env_prefix: Option<String>,
}

impl ConfigBuilder {
    fn new(path: PathBuf) -> Self {
        Self { path, env_prefix: None }
    }

    /// Enables environment overrides: `{PREFIX}__SECTION__KEY` maps to
    /// `section.key`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let mut builder = RawConfig::builder().add_source(File::from(self.path.as_path()).required(true));

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let raw = builder.build()?;
        tracing::info!("Configuration loaded from {}", self.path.to_string_lossy());

        Ok(Config { inner: raw })
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod test_utils {
    use std::collections::HashMap;

    use config::Value;

    use super::*;

    #[derive(Default)]
    pub struct TestConfigBuilder {
        values: HashMap<String, Value>,
    }

    impl TestConfigBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
            self.values.insert(key.to_string(), value.into());
            self
        }

        pub fn build(self) -> Config {
            let mut builder = RawConfig::builder();

            for (key, value) in self.values {
                builder = builder.set_override(key, value).expect("invalid test config key");
            }

            Config { inner: builder.build().expect("Failed to create config from test values") }
        }
    }
}

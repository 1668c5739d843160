//! Handle configuration read from the environment.
//!
//! A [`HandleConfig`] is consumed once, when the handle object is built. It
//! carries the connection target, the credential string, and the runtime
//! environment that decides how chatty the handle is.

use std::fmt;

/// Environment variable holding the connection target.
pub const TARGET_VAR: &str = "DATABASE_URL";
/// Environment variable holding the credential string.
pub const CREDENTIALS_VAR: &str = "DATABASE_CREDENTIALS";
/// Environment variable naming the runtime environment.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";

/// Errors produced while loading a [`HandleConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("required configuration variable {key} is not set")]
    Missing {
        /// Name of the variable.
        key: &'static str,
    },

    /// A variable is set but blank.
    #[error("configuration variable {key} is empty")]
    Empty {
        /// Name of the variable.
        key: &'static str,
    },
}

/// Runtime environment of the process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub enum Environment {
    /// Local development: every attempt is logged.
    Development,
    /// Any other environment, identified by name.
    Other(String),
    /// Production (the default when nothing is configured).
    #[default]
    Production,
}

impl Environment {
    /// Parses an environment name. Matching is case-insensitive.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("development") {
            Environment::Development
        } else if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Other(trimmed.to_string())
        }
    }

    /// Returns true for the development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Returns the environment name.
    pub fn as_str(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Other(name) => name,
        }
    }
}

impl From<String> for Environment {
    fn from(name: String) -> Self {
        Environment::parse(&name)
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration used to build a resource handle.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandleConfig {
    /// Name used in events, logs, and metric labels.
    #[cfg_attr(feature = "serde", serde(default = "default_name"))]
    pub name: String,
    /// Connection target, e.g. a database URL.
    pub target: String,
    /// Credential string handed to the endpoint.
    #[cfg_attr(feature = "serde", serde(default))]
    pub credentials: String,
    /// Runtime environment.
    #[cfg_attr(feature = "serde", serde(default))]
    pub environment: Environment,
}

fn default_name() -> String {
    "default".to_string()
}

impl HandleConfig {
    /// Creates a configuration for `target` with no credentials, running in
    /// production.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            name: default_name(),
            target: target.into(),
            credentials: String::new(),
            environment: Environment::Production,
        }
    }

    /// Sets the handle name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the credential string.
    pub fn credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = credentials.into();
        self
    }

    /// Sets the runtime environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Returns true when the handle should log every attempt.
    pub fn is_verbose(&self) -> bool {
        self.environment.is_development()
    }

    /// Loads the configuration from the process environment.
    ///
    /// Reads `DATABASE_URL` (required), `DATABASE_CREDENTIALS` and `APP_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target = lookup(TARGET_VAR).ok_or(ConfigError::Missing { key: TARGET_VAR })?;
        if target.trim().is_empty() {
            return Err(ConfigError::Empty { key: TARGET_VAR });
        }

        let credentials = lookup(CREDENTIALS_VAR).unwrap_or_default();
        let environment = lookup(ENVIRONMENT_VAR)
            .map(|name| Environment::parse(&name))
            .unwrap_or_default();

        Ok(Self {
            name: default_name(),
            target,
            credentials,
            environment,
        })
    }
}

impl fmt::Debug for HandleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credentials = if self.credentials.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("HandleConfig")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("credentials", &credentials)
            .field("environment", &self.environment)
            .finish()
    }
}

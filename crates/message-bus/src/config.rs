//! Bus configuration.
//!
//! Loaded from the environment, from JSON, or built in code:
//!
//! ```ignore
//! use message_bus::{BusConfig, ErrorPolicy};
//!
//! let config = BusConfig::default()
//!     .with_name("gameplay")
//!     .with_log_messages(true)
//!     .with_error_policy(ErrorPolicy::Log);
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::DEFAULT_BUS_NAME;

/// What `broadcast` does with listener errors once the pass is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return every error to the broadcaster as an `AggregateError`.
    #[default]
    Aggregate,
    /// Log every error and report success to the broadcaster.
    Log,
}

impl FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aggregate" => Ok(Self::Aggregate),
            "log" => Ok(Self::Log),
            other => Err(ConfigError::InvalidErrorPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aggregate => "aggregate",
            Self::Log => "log",
        })
    }
}

/// Configuration for a [`MessageBus`](crate::MessageBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Name used in log lines, to tell bus instances apart.
    pub name: String,

    /// Log every broadcast (tag and `Debug` rendering of the payload).
    pub log_messages: bool,

    /// Return or log listener errors.
    pub error_policy: ErrorPolicy,

    /// Contain panicking listeners instead of unwinding into the broadcaster.
    pub catch_panics: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_BUS_NAME.to_string(),
            log_messages: false,
            error_policy: ErrorPolicy::Aggregate,
            catch_panics: true,
        }
    }
}

impl BusConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MESSAGE_BUS_NAME`: Bus name (default: message-bus)
    /// - `MESSAGE_BUS_LOG_MESSAGES`: Log every broadcast (default: false)
    /// - `MESSAGE_BUS_ERROR_POLICY`: `aggregate` or `log` (default: aggregate)
    /// - `MESSAGE_BUS_CATCH_PANICS`: Contain listener panics (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            name: env::var("MESSAGE_BUS_NAME").unwrap_or(defaults.name),

            log_messages: env::var("MESSAGE_BUS_LOG_MESSAGES")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.log_messages),

            error_policy: env::var("MESSAGE_BUS_ERROR_POLICY")
                .ok()
                .and_then(|v| match v.parse() {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        warn!(error = %e, "Ignoring MESSAGE_BUS_ERROR_POLICY");
                        None
                    }
                })
                .unwrap_or(defaults.error_policy),

            catch_panics: env::var("MESSAGE_BUS_CATCH_PANICS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.catch_panics),
        }
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style method to set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style method to toggle message logging
    pub fn with_log_messages(mut self, enabled: bool) -> Self {
        self.log_messages = enabled;
        self
    }

    /// Builder-style method to set the error policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Builder-style method to toggle panic containment
    pub fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }
}

//! Runtime configuration
//!
//! Selects the execution contexts and the error policy a loop is built
//! with. Values come from the environment or from JSON.

use crate::error::ErrorHook;
use crate::runner::{ImmediateWorkRunner, TokioWorkRunner, WorkRunner};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const PROCESSING_RUNNER_VAR: &str = "LOOP_PROCESSING_RUNNER";
pub const NOTIFICATION_RUNNER_VAR: &str = "LOOP_NOTIFICATION_RUNNER";
pub const ERROR_POLICY_VAR: &str = "LOOP_ERROR_POLICY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid runtime config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which serial execution context to run on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// Drained on the posting thread
    #[default]
    Immediate,
    /// Dedicated task on the ambient tokio runtime
    Tokio,
}

impl FromStr for RunnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(Self::Immediate),
            "tokio" => Ok(Self::Tokio),
            other => Err(format!("unknown runner kind: {other}")),
        }
    }
}

impl RunnerKind {
    /// Build a runner of this kind. A tokio runner needs an ambient
    /// runtime; without one this falls back to the immediate runner.
    pub fn build(self) -> Arc<dyn WorkRunner> {
        match self {
            Self::Immediate => Arc::new(ImmediateWorkRunner::new()),
            Self::Tokio => {
                if let Some(runner) = TokioWorkRunner::current() {
                    Arc::new(runner)
                } else {
                    tracing::warn!("No tokio runtime available, using the immediate runner");
                    Arc::new(ImmediateWorkRunner::new())
                }
            }
        }
    }
}

/// What happens when a configuration error is found on a path that
/// cannot return it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log and abort the process
    #[default]
    #[serde(alias = "panic")]
    Abort,
    Log,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "panic" => Ok(Self::Abort),
            "log" => Ok(Self::Log),
            other => Err(format!("unknown error policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub processing: RunnerKind,
    pub notification: RunnerKind,
    pub error_policy: ErrorPolicy,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults and
    /// unparseable ones are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            processing: parse_or_default(&lookup, PROCESSING_RUNNER_VAR),
            notification: parse_or_default(&lookup, NOTIFICATION_RUNNER_VAR),
            error_policy: parse_or_default(&lookup, ERROR_POLICY_VAR),
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if `json` is not a valid config object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn error_hook(&self) -> ErrorHook {
        match self.error_policy {
            ErrorPolicy::Abort => ErrorHook::aborting(),
            ErrorPolicy::Log => ErrorHook::logging(),
        }
    }
}

fn parse_or_default<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> T
where
    T: FromStr<Err = String> + Default,
{
    let Some(raw) = lookup(key) else {
        return T::default();
    };
    raw.parse().unwrap_or_else(|err: String| {
        tracing::warn!(key, value = %raw, error = %err, "Ignoring invalid config value");
        T::default()
    })
}

//! Security configuration and the process-wide enforcement toggle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Security settings the guard is constructed with.
///
/// An unset `authorization_enabled` means enforcement is on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub authorization_enabled: Option<bool>,
}

impl SecurityConfig {
    pub const ENV_AUTHORIZATION_ENABLED: &'static str = "WARDEN_AUTHORIZATION_ENABLED";

    pub fn enabled() -> Self {
        Self {
            authorization_enabled: Some(true),
        }
    }

    pub fn disabled() -> Self {
        Self {
            authorization_enabled: Some(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.authorization_enabled.unwrap_or(true)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. A present but unparseable value is an
    /// error rather than a fallback.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = Self::ENV_AUTHORIZATION_ENABLED;
        let authorization_enabled = match lookup(key) {
            None => None,
            Some(raw) => Some(parse_flag(&raw).ok_or(ConfigError::InvalidValue { key, value: raw })?),
        };

        Ok(Self {
            authorization_enabled,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Shared enforcement switch, read once per guarded invocation.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct SecurityToggle(Arc<AtomicBool>);

impl SecurityToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.is_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag, returning the previous value.
    pub fn set(&self, enabled: bool) -> bool {
        self.0.swap(enabled, Ordering::AcqRel)
    }
}

impl Default for SecurityToggle {
    fn default() -> Self {
        Self::new(true)
    }
}

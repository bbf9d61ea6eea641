//! Runtime configuration, validation, and error types.
//!
//! [`RuntimeConfig`] is the input for constructing a [`Runtime`](crate::Runtime).
//! [`validate()`](RuntimeConfig::validate) checks it once at startup; all
//! values are immutable afterwards.

use std::error::Error;
use std::fmt;

use plexus_core::Status;

// ── RuntimeConfig ──────────────────────────────────────────────────

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Runtime name, attached to every log record. Default: `"plexus"`.
    pub name: String,
    /// Capacity of each change-event subscription channel. Events sent
    /// to a full channel are dropped. Default: 256. Minimum: 1.
    pub event_capacity: usize,
    /// Log rejected operations (wiring and property errors) at `warn`
    /// level instead of `debug`. Default: `true`.
    pub warn_on_config_error: bool,
}

impl RuntimeConfig {
    /// Default subscription channel capacity.
    pub const DEFAULT_EVENT_CAPACITY: usize = 256;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::EventCapacityZero);
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: "plexus".to_owned(),
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
            warn_on_config_error: true,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`RuntimeConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The runtime name is empty or whitespace.
    EmptyName,
    /// `event_capacity` is zero; a rendezvous channel would block emitters.
    EventCapacityZero,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "runtime name must not be empty"),
            Self::EventCapacityZero => write!(f, "event_capacity must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

impl From<&ConfigError> for Status {
    fn from(_e: &ConfigError) -> Self {
        Status::InvalidConfig
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(RuntimeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn empty_name_rejected() {
        let config = RuntimeConfig {
            name: "  ".into(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = RuntimeConfig {
            event_capacity: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err, ConfigError::EventCapacityZero);
        assert_eq!(Status::from(&err), Status::InvalidConfig);
    }
}

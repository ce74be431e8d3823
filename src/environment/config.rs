//! Environment configuration with sensible defaults, following the same
//! builder-plus-validate shape as the rest of this crate's config types.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Default mailbox capacity for agents that don't specify one (0 =
/// unbounded).
pub const DEFAULT_MAILBOX_CAPACITY: usize = 0;

/// Default timeout given to `environment.stop()` to let dispatchers drain
/// before giving up on a graceful join.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default exception reaction: deregister the offending cooperation.
pub const DEFAULT_EXCEPTION_REACTION: ExceptionReaction = ExceptionReaction::ShutdownOnException;

/// Default infrastructure kind: ordinary multi-threaded dispatchers.
pub const DEFAULT_INFRASTRUCTURE: InfrastructureKind = InfrastructureKind::MultiThreaded;

/// How an unhandled handler error is routed (spec §4.2 step 4, §7 item 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionReaction {
    /// Write a diagnostic and terminate the process immediately.
    AbortOnException,
    /// Deregister the offending agent's cooperation; the rest of the
    /// environment keeps running. Default.
    ShutdownOnException,
    /// Log and continue as if nothing happened.
    IgnoreException,
}

/// Which run mode `environment.run()` drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfrastructureKind {
    /// Ordinary mode: every dispatcher owns its own worker thread(s);
    /// `environment.run()` just waits for shutdown.
    MultiThreaded,
    /// No worker threads: a single `single_threaded_not_mt_safe` dispatcher
    /// is driven to completion on the caller's own thread.
    SingleThreadedCooperative,
}

/// Environment-wide configuration (spec §3 "Environment").
///
/// # Examples
///
/// ```rust
/// use agentrt::environment::{EnvironmentConfig, DEFAULT_MAILBOX_CAPACITY};
///
/// let config = EnvironmentConfig::default();
/// assert_eq!(config.default_mailbox_capacity(), DEFAULT_MAILBOX_CAPACITY);
///
/// let config = EnvironmentConfig::builder()
///     .with_mailbox_capacity(256)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_mailbox_capacity(), 256);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    infrastructure: InfrastructureKind,
    exception_reaction: ExceptionReaction,
    default_mailbox_capacity: usize,
    #[serde(with = "crate::util::serde_helpers::duration_serde")]
    shutdown_timeout: Duration,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            infrastructure: DEFAULT_INFRASTRUCTURE,
            exception_reaction: DEFAULT_EXCEPTION_REACTION,
            default_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl EnvironmentConfig {
    /// Start building a custom configuration.
    pub fn builder() -> EnvironmentConfigBuilder {
        EnvironmentConfigBuilder::default()
    }

    /// Which infrastructure mode `environment.run()` should drive.
    pub fn infrastructure(&self) -> InfrastructureKind {
        self.infrastructure
    }

    /// The configured exception reaction.
    pub fn exception_reaction(&self) -> ExceptionReaction {
        self.exception_reaction
    }

    /// Default event-queue capacity for agents that don't override it (0 =
    /// unbounded).
    pub fn default_mailbox_capacity(&self) -> usize {
        self.default_mailbox_capacity
    }

    /// How long `environment.stop()` waits for dispatchers to drain.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    fn validate(&self) -> Result<(), String> {
        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builder for [`EnvironmentConfig`].
#[derive(Debug, Default)]
pub struct EnvironmentConfigBuilder {
    config: EnvironmentConfig,
}

impl EnvironmentConfigBuilder {
    /// Set the infrastructure mode.
    pub fn with_infrastructure(mut self, kind: InfrastructureKind) -> Self {
        self.config.infrastructure = kind;
        self
    }

    /// Set the exception reaction.
    pub fn with_exception_reaction(mut self, reaction: ExceptionReaction) -> Self {
        self.config.exception_reaction = reaction;
        self
    }

    /// Set the default event-queue capacity for agents (0 = unbounded).
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.default_mailbox_capacity = capacity;
        self
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<EnvironmentConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.default_mailbox_capacity(), 0);
        assert_eq!(config.exception_reaction(), ExceptionReaction::ShutdownOnException);
        assert_eq!(config.infrastructure(), InfrastructureKind::MultiThreaded);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EnvironmentConfig::builder()
            .with_mailbox_capacity(128)
            .with_exception_reaction(ExceptionReaction::AbortOnException)
            .with_infrastructure(InfrastructureKind::SingleThreadedCooperative)
            .build()
            .unwrap();
        assert_eq!(config.default_mailbox_capacity(), 128);
        assert_eq!(config.exception_reaction(), ExceptionReaction::AbortOnException);
        assert_eq!(config.infrastructure(), InfrastructureKind::SingleThreadedCooperative);
    }

    #[test]
    fn test_zero_shutdown_timeout_rejected() {
        let result = EnvironmentConfig::builder().with_shutdown_timeout(Duration::from_secs(0)).build();
        assert!(result.is_err());
    }
}

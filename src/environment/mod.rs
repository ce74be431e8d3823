//! Environment: process-wide runtime scope (spec §3 "Environment", §6
//! "Environment launch").

pub mod config;
pub mod handle;

pub use config::{EnvironmentConfig, EnvironmentConfigBuilder, ExceptionReaction, InfrastructureKind};
pub use handle::{Environment, EnvironmentHandle, EnvironmentParams, COOPERATIVE_DISPATCHER_NAME};

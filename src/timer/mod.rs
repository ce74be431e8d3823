//! Timer service: single-shot and periodic delivery onto a target mailbox
//! (spec §4.8). Kept pluggable behind [`TimerBackend`] — the environment
//! owns one concrete backend instance, [`TokioTimerBackend`] by default.

pub mod backend;
pub mod error;
pub mod service;

pub use backend::{TimerBackend, TimerId, TokioTimerBackend};
pub use error::TimerError;
pub use service::TimerService;

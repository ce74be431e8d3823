//! Lightweight delivery counters kept alongside each mailbox for
//! diagnostics. Not a pluggable monitoring subsystem — just enough for
//! `tracing` spans and tests to observe delivery outcomes.

pub mod atomic;

pub use atomic::MailboxMetrics;

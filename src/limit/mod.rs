//! Per-`(agent, message_type)` message-limit policies.
//!
//! Grounded on spec §4.6: a counter guards a cap, and one of four reactions
//! fires on overflow (`drop`, `abort_app`, `redirect`, `transform`).

pub mod counter;
pub mod policy;

pub use counter::LimitCounter;
pub use policy::{LimitReaction, MessageLimiter, RedirectFn, TransformFn, REDIRECT_HOP_LIMIT};

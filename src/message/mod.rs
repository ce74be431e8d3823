//! Message types: the `Message`/`Signal` traits, priority scale, and the
//! type-erased [`Envelope`] used for delivery.

pub mod envelope;
pub mod traits;

pub use envelope::{Envelope, Mutability};
pub use traits::{Message, MessagePriority, Signal};

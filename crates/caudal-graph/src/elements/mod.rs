//! Generic processing elements.
//!
//! These are the reusable leaves a graph is assembled from: buffering
//! ([`Queue`]), format conversion ([`Convert`]), fan-out ([`Tee`]), and a
//! discarding terminal sink ([`FakeSink`]). Domain-specific sinks and sources
//! (device output, file decode) live with the player, not here.

mod convert;
mod fake_sink;
mod queue;
mod tee;

pub use convert::Convert;
pub use fake_sink::FakeSink;
pub use queue::Queue;
pub use tee::Tee;

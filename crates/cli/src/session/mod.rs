//! Session orchestration module.

mod forward;
mod orchestrator;
mod stats;

pub use forward::{forward_callback, ForwardedPacket};
pub use orchestrator::{Session, SessionConfig};
pub use stats::{SessionStats, StopReason};

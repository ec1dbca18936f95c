//! consolet: file-based command bridge for hosts that only expose a
//! scripting console.
//!
//! An external agent process publishes a JSON command into a shared
//! channel directory; a listener running inside the host application
//! executes it and writes a JSON reply; the client polls for the reply,
//! correlating by id. Atomic rename on publish and delete-on-read on
//! consume keep the channel race-free without any cross-process lock.

pub mod bridge;
mod client;
pub mod config;
pub mod install;
pub mod jsonconfig;

pub use bridge::channel::ChannelDir;
pub use bridge::poll::AwaitError;
pub use bridge::protocol::{CommandEnvelope, CommandId, ResponseEnvelope};
pub use bridge::publish::PublishError;
pub use client::{ConsoleBridge, HostClient, Outcome};
pub use config::ChannelConfig;

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

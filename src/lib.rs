//! Stdio bridge exposing Replicate's Flux 1.1 Pro image generation as a
//! line-delimited JSON tool protocol.
//!
//! One request line in, one response line out. Three message kinds:
//! `hello` (handshake), `list_tools` (capability discovery), and `run_tool`
//! (invoke `generate_image` against the Replicate API). Diagnostics go to
//! stderr; stdout carries only protocol lines.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod server;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{ConfigError, ProviderError};
pub use protocol::{ErrorCode, Request, PROTOCOL_VERSION};
pub use provider::{ImageProvider, ReplicateProvider};
pub use registry::{default_registry, ToolDescriptor, ToolRegistry};
pub use server::serve;

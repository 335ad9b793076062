#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod api;
mod config;
pub mod resolver;
mod server;

pub use config::Config;
pub use server::GatewayServer;

/// Leaf fanout for sled.
pub const LEAF_FANOUT: usize = 1024;

//! CLI command implementations

pub mod config;
pub mod receive;
pub mod send;

pub use config::*;
pub use receive::*;
pub use send::*;

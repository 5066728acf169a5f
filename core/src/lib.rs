pub mod cli;
pub mod config;
pub mod interpreter;

// Re-export main types
pub use config::{Config, ConfigError, EngineConfig};
pub use interpreter::engine::{Engine, HostValue, RuntimeError};
pub use interpreter::session::Session;

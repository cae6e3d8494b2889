//! Logger bootstrap.
//!
//! The engine only logs through the `log` facade; binaries and tools call
//! [`init_logging`] once to install `env_logger` behind it.

mod init;

pub use init::{LoggingConfig, init_logging};

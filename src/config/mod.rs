//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ConfigError)
//! - [`xlines`]: Ban line subsystem settings and configured lines (XLinesConfig)
//! - [`limits`]: Per-channel list limits (BanListLimit)
//! - [`validation`]: Startup checks (ValidationError)

mod limits;
mod types;
mod validation;
mod xlines;

pub use limits::BanListLimit;
pub use types::{Config, ConfigError, ServerConfig};
pub use validation::{ValidationError, validate};
pub use xlines::{ConfiguredLine, XLinesConfig};

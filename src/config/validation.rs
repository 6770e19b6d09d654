//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::xline::{ApplyPolicy, LineType};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("xlines.expiry_interval_secs must be at least 1")]
    ZeroInterval,
    #[error("xlines.mailbox_capacity must be at least 1")]
    ZeroMailbox,
    #[error("xlines.apply contains unknown entry '{0}'")]
    UnknownApply(String),
    #[error("xlines.line[{index}] has unknown type '{tag}'")]
    UnknownLineType { index: usize, tag: char },
    #[error("xlines.line[{index}] has an empty mask")]
    EmptyMask { index: usize },
    #[error("xlines.line[{index}] has invalid duration '{duration}'")]
    InvalidDuration { index: usize, duration: String },
    #[error("banlist[{index}] for '{chan}' has a zero limit")]
    ZeroLimit { index: usize, chan: String },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let xlines = &config.xlines;
    if xlines.expiry_interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if xlines.mailbox_capacity == 0 {
        errors.push(ValidationError::ZeroMailbox);
    }
    for name in &xlines.apply {
        if ApplyPolicy::from_apply_name(name).is_none() {
            errors.push(ValidationError::UnknownApply(name.clone()));
        }
    }

    for (index, line) in xlines.lines.iter().enumerate() {
        if LineType::from_char(line.line_type).is_none() {
            errors.push(ValidationError::UnknownLineType {
                index,
                tag: line.line_type,
            });
        }
        if line.mask.is_empty() {
            errors.push(ValidationError::EmptyMask { index });
        }
        if line.duration_secs().is_none() {
            errors.push(ValidationError::InvalidDuration {
                index,
                duration: line.duration.clone().unwrap_or_default(),
            });
        }
    }

    for (index, limit) in config.banlist.iter().enumerate() {
        if limit.limit == 0 {
            errors.push(ValidationError::ZeroLimit {
                index,
                chan: limit.chan.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Error types for the X-line subsystem.
//!
//! Every variant is a local, recoverable condition reported to whoever asked
//! for the operation (an operator command handler or the server link layer).
//! Nothing here is fatal to the daemon.

use crate::xline::LineType;
use thiserror::Error;

/// Errors returned by the line store, the factory registry and the service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XLineError {
    /// A line of this type with exactly this pattern is already set.
    #[error("{line_type} for {mask} already exists")]
    Duplicate { line_type: LineType, mask: String },

    /// No line of this type with this pattern is set.
    #[error("no such {line_type}: {mask}")]
    NotFound { line_type: LineType, mask: String },

    /// A temporary line arrived after its expiry time.
    #[error("{line_type} for {mask} has already expired")]
    Expired { line_type: LineType, mask: String },

    /// No factory is registered for this type tag.
    #[error("no factory registered for line type '{0}'")]
    UnregisteredKind(char),

    /// Tried to register a second factory for a tag.
    #[error("a factory is already registered for line type '{0}'")]
    FactoryExists(char),

    /// Tried to unregister a factory that is not the registered one.
    #[error("factory for line type '{0}' is not the registered instance")]
    FactoryMismatch(char),

    /// The tag does not name one of the built-in line kinds.
    #[error("unknown line type '{0}'")]
    UnknownType(char),

    /// An operator duration string did not parse.
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    /// The X-line service task has shut down.
    #[error("xline service unavailable")]
    ServiceGone,
}

impl XLineError {
    /// Static error code for log labelling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Duplicate { .. } => "duplicate",
            Self::NotFound { .. } => "not_found",
            Self::Expired { .. } => "expired",
            Self::UnregisteredKind(_) => "unregistered_kind",
            Self::FactoryExists(_) => "factory_exists",
            Self::FactoryMismatch(_) => "factory_mismatch",
            Self::UnknownType(_) => "unknown_type",
            Self::InvalidDuration(_) => "invalid_duration",
            Self::ServiceGone => "service_gone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_line() {
        let err = XLineError::Duplicate {
            line_type: LineType::Gline,
            mask: "*@bad.host".to_string(),
        };
        assert_eq!(err.to_string(), "G-Line for *@bad.host already exists");
        assert_eq!(err.error_code(), "duplicate");

        let err = XLineError::NotFound {
            line_type: LineType::Qline,
            mask: "Bad*".to_string(),
        };
        assert_eq!(err.to_string(), "no such Q-Line: Bad*");
    }

    #[test]
    fn registry_errors_name_the_tag() {
        assert_eq!(
            XLineError::FactoryExists('G').to_string(),
            "a factory is already registered for line type 'G'"
        );
        assert_eq!(XLineError::UnregisteredKind('R').error_code(), "unregistered_kind");
        assert_eq!(
            XLineError::InvalidDuration("5x".to_string()).to_string(),
            "invalid duration '5x'"
        );
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types.

use std::io;
use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedType,
    Rehydration,
    CorruptStream,
    Serialization,
    Io,
}

/// Session-fatal codec failure.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{trace}: cannot serialize object of type '{type_name}' ({category}), as these are not supported")]
    UnsupportedType {
        type_name: String,
        category: String,
        trace: String,
    },

    #[error("{trace}: no service of type '{service}' is available in the target context")]
    Rehydration { service: String, trace: String },

    #[error("corrupt stream at byte {offset}: {reason}")]
    CorruptStream { offset: u64, reason: String },

    #[error("{trace}: {message}")]
    Serialization { trace: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::Rehydration { .. } => ErrorKind::Rehydration,
            Self::CorruptStream { .. } => ErrorKind::CorruptStream,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// `true` when the stream was fine but the hosting environment was not.
    pub fn is_environment_defect(&self) -> bool {
        matches!(self, Self::Rehydration { .. })
    }

    /// Property path of the failing value, if the error carries one.
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::UnsupportedType { trace, .. }
            | Self::Rehydration { trace, .. }
            | Self::Serialization { trace, .. } => Some(trace),
            _ => None,
        }
    }
}

/// Registry construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate binding for {matcher}: '{first}' and '{second}'")]
    DuplicateBinding {
        matcher: String,
        first: String,
        second: String,
    },

    #[error("registry has no fallback codec")]
    MissingFallback,

    #[error("fallback codec already set to '{0}'")]
    FallbackAlreadySet(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config file extension: {0}")]
    UnknownFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_variants() {
        let err = CodecError::UnsupportedType {
            type_name: "Thread".into(),
            category: "live runtime state".into(),
            trace: "$.worker".into(),
        };
        assert_eq!(
            err.to_string(),
            "$.worker: cannot serialize object of type 'Thread' (live runtime state), as these are not supported"
        );

        let err = CodecError::CorruptStream {
            offset: 12,
            reason: "truncated payload".into(),
        };
        assert_eq!(err.to_string(), "corrupt stream at byte 12: truncated payload");
    }

    #[test]
    fn test_kind_and_environment_classification() {
        let err = CodecError::Rehydration {
            service: "ObjectFactory".into(),
            trace: "$".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Rehydration);
        assert!(err.is_environment_defect());
        assert_eq!(err.trace(), Some("$"));

        let err = CodecError::Io(io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!err.is_environment_defect());
        assert_eq!(err.trace(), None);
    }
}

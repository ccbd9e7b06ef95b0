//! SNT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Top-level error type for chain_sentinel.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("[SNT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SNT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SNT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SNT-1101] unknown protocol: {name}")]
    UnknownProtocol { name: String },

    #[error("[SNT-2001] authority fetch failed for {protocol}: {details}")]
    AuthorityFetch {
        protocol: &'static str,
        details: String,
    },

    #[error("[SNT-2002] authority action {action} failed for {entity}: {details}")]
    ActionFailed {
        entity: String,
        action: &'static str,
        details: String,
    },

    #[error("[SNT-2003] batch finalization failed at cycle {cycle}: {details}")]
    FinalizeFailed { cycle: u64, details: String },

    #[error("[SNT-2004] entity not found: {entity}")]
    EntityNotFound { entity: String },

    #[error("[SNT-2005] payload sealing failed: {details}")]
    Seal { details: String },

    #[error("[SNT-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SNT-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[SNT-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SNT-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[SNT-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SentinelError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SNT-1001",
            Self::MissingConfig { .. } => "SNT-1002",
            Self::ConfigParse { .. } => "SNT-1003",
            Self::UnknownProtocol { .. } => "SNT-1101",
            Self::AuthorityFetch { .. } => "SNT-2001",
            Self::ActionFailed { .. } => "SNT-2002",
            Self::FinalizeFailed { .. } => "SNT-2003",
            Self::EntityNotFound { .. } => "SNT-2004",
            Self::Seal { .. } => "SNT-2005",
            Self::Serialization { .. } => "SNT-2101",
            Self::Sql { .. } => "SNT-2102",
            Self::Io { .. } => "SNT-3002",
            Self::ChannelClosed { .. } => "SNT-3003",
            Self::Runtime { .. } => "SNT-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AuthorityFetch { .. }
                | Self::ActionFailed { .. }
                | Self::FinalizeFailed { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Sql { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for a failed authority action.
    #[must_use]
    pub fn action(entity: impl Into<String>, action: &'static str, details: impl Into<String>) -> Self {
        Self::ActionFailed {
            entity: entity.into(),
            action,
            details: details.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SentinelError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SentinelError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_of_each() -> Vec<SentinelError> {
        vec![
            SentinelError::InvalidConfig {
                details: String::new(),
            },
            SentinelError::MissingConfig {
                path: PathBuf::new(),
            },
            SentinelError::ConfigParse {
                context: "",
                details: String::new(),
            },
            SentinelError::UnknownProtocol {
                name: String::new(),
            },
            SentinelError::AuthorityFetch {
                protocol: "",
                details: String::new(),
            },
            SentinelError::action("", "alert", ""),
            SentinelError::FinalizeFailed {
                cycle: 0,
                details: String::new(),
            },
            SentinelError::EntityNotFound {
                entity: String::new(),
            },
            SentinelError::Seal {
                details: String::new(),
            },
            SentinelError::Serialization {
                context: "",
                details: String::new(),
            },
            SentinelError::Sql {
                context: "",
                details: String::new(),
            },
            SentinelError::io("", std::io::Error::other("test")),
            SentinelError::ChannelClosed { component: "" },
            SentinelError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = one_of_each();
        let codes: Vec<&str> = errors.iter().map(SentinelError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_carries_code_prefix() {
        for err in one_of_each() {
            let msg = err.to_string();
            assert!(err.code().starts_with("SNT-"));
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
        }
    }

    #[test]
    fn retryable_errors_are_correct() {
        assert!(SentinelError::action("v1", "slash", "timeout").is_retryable());
        assert!(
            SentinelError::AuthorityFetch {
                protocol: "oracle_drift",
                details: String::new()
            }
            .is_retryable()
        );
        assert!(SentinelError::ChannelClosed { component: "ledger" }.is_retryable());

        assert!(
            !SentinelError::InvalidConfig {
                details: String::new()
            }
            .is_retryable()
        );
        assert!(
            !SentinelError::EntityNotFound {
                entity: "x".to_string()
            }
            .is_retryable()
        );
        assert!(
            !SentinelError::UnknownProtocol {
                name: "x".to_string()
            }
            .is_retryable()
        );
        assert!(
            !SentinelError::Seal {
                details: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn action_constructor_fills_fields() {
        let err = SentinelError::action("validator-7", "slash", "quorum lost");
        assert_eq!(err.code(), "SNT-2002");
        let msg = err.to_string();
        assert!(msg.contains("validator-7"));
        assert!(msg.contains("slash"));
        assert!(msg.contains("quorum lost"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SentinelError = json_err.into();
        assert_eq!(err.code(), "SNT-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: SentinelError = toml_err.into();
        assert_eq!(err.code(), "SNT-1003");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn from_rusqlite_error() {
        let sql_err =
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some("test".to_string()));
        let err: SentinelError = sql_err.into();
        assert_eq!(err.code(), "SNT-2102");
    }
}

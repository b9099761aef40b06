//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating arguments, before anything is rendered.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {kind} path `{}`: {reason}", path.display())]
    InvalidPath {
        kind: &'static str,
        path: PathBuf,
        reason: &'static str,
    },

    #[error("unsupported {kind} `{name}`, available: {}", available.join(", "))]
    UnsupportedStyle {
        kind: &'static str,
        name: String,
        available: Vec<&'static str>,
    },

    #[error("{0}")]
    Validation(String),
}

impl ConfigError {
    pub(crate) fn invalid_path(kind: &'static str, path: impl Into<PathBuf>, reason: &'static str) -> Self {
        Self::InvalidPath {
            kind,
            path: path.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid_path("markdown", "notes/missing.md", "not a file or directory");
        let display = format!("{err}");
        assert!(display.contains("markdown"));
        assert!(display.contains("notes/missing.md"));
        assert!(display.contains("not a file or directory"));

        let err = ConfigError::UnsupportedStyle {
            kind: "code style",
            name: "nope".into(),
            available: vec!["github", "monokai"],
        };
        assert_eq!(
            format!("{err}"),
            "unsupported code style `nope`, available: github, monokai"
        );

        let err = ConfigError::Validation("needs --output".into());
        assert_eq!(format!("{err}"), "needs --output");
    }
}

//! Error types for marketkit-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Result type for marketkit-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in marketkit-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable project configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Target name not present in the registry.
    #[error("unknown target '{name}' (available: {available})")]
    UnknownTarget { name: String, available: String },

    /// External tool could not be located or spawned.
    #[error("toolchain error: {0}")]
    Toolchain(String),

    /// External tool ran and exited with a non-zero status.
    #[error("{tool} exited with status {status}{}", stderr_suffix(.stderr))]
    ExternalTool {
        tool: String,
        status: i32,
        stderr: String,
    },

    /// The compiler listing did not contain the requested function.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Sandbox reported a payload that is not valid hex.
    #[error("invalid payload: {0}")]
    Payload(String),

    /// Failed to read a file.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing a constants snapshot back failed. The file may still hold
    /// substituted values.
    #[error("failed to restore {}: {source}; the file may still contain substituted constants", .path.display())]
    Restore {
        path: PathBuf,
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline stage failed for one target.
    #[error("{stage} stage failed for {target}: {source}")]
    Stage {
        target: String,
        stage: Stage,
        source: Box<Error>,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{}", stderr)
    }
}

impl Error {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Process exit status reported for this error.
    ///
    /// External tool failures propagate the tool's own status so a batch
    /// reports what the compiler or runner returned.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExternalTool { status, .. } if *status != 0 => *status,
            Self::ExternalTool { .. } => 1,
            Self::Config(_) | Self::UnknownTarget { .. } => 2,
            Self::Extraction(_) => 3,
            Self::Payload(_) => 4,
            Self::Read { .. } | Self::Write { .. } | Self::Restore { .. } | Self::Io(_) => 5,
            Self::Toolchain(_) => 127,
            Self::Stage { source, .. } => source.exit_code(),
        }
    }

    /// Pipeline stage the error was raised in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_tool_status_propagates() {
        let err = Error::ExternalTool {
            tool: "npx blueprint".to_string(),
            status: 7,
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 7);
        assert_eq!(err.to_string(), "npx blueprint exited with status 7");
    }

    #[test]
    fn test_stage_wraps_source_code() {
        let err = Error::Stage {
            target: "TonSimpleSale".to_string(),
            stage: Stage::Extracted,
            source: Box::new(Error::Extraction("no PROGRAM{ marker".to_string())),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.stage(), Some(Stage::Extracted));
        assert!(err.to_string().contains("TonSimpleSale"));
    }

    #[test]
    fn test_restore_message_warns_about_mutation() {
        let restore = Error::Restore {
            path: PathBuf::from("constants.tolk"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(restore.exit_code(), 5);
        assert!(restore.to_string().contains("substituted constants"));
    }
}

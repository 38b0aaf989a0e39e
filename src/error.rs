//! Structured error kinds, mapped 1:1 onto the process exit codes in spec §6.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldgenError {
    /// Invalid flag values. Reported before any simulation runs.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File create/write failed for PNG or IR output.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A post-stage invariant check failed. Indicates a bug, never user error.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The caller's cancellation token was observed.
    #[error("generation cancelled")]
    Cancelled,

    /// Allocation for a W*H field failed.
    #[error("resource exhausted allocating field {field}: {detail}")]
    ResourceExhaustion { field: &'static str, detail: String },
}

impl WorldgenError {
    /// Process exit code for this error, per spec §6.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorldgenError::Config(_) => 2,
            WorldgenError::Io(_) => 3,
            WorldgenError::Cancelled => 4,
            WorldgenError::Invariant(_) => 5,
            WorldgenError::ResourceExhaustion { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(WorldgenError::Config("x".into()).exit_code(), 2);
        assert_eq!(WorldgenError::Cancelled.exit_code(), 4);
        assert_eq!(WorldgenError::Invariant("x".into()).exit_code(), 5);
        assert_eq!(
            WorldgenError::ResourceExhaustion {
                field: "elevation",
                detail: "oom".into()
            }
            .exit_code(),
            5
        );
    }
}

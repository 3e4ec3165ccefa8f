//! Error types for engine calls.

use thiserror::Error;

/// Errors reported by a rendering engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine core could not be started.
    #[error("Engine startup failed: {0}")]
    StartupFailed(String),

    /// Video subsystem rejected its configuration.
    #[error("Video reset rejected: {0}")]
    VideoRejected(String),

    /// Audio subsystem rejected its configuration.
    #[error("Audio reset rejected: {0}")]
    AudioRejected(String),

    /// An object could not be created.
    #[error("Failed to create {kind} '{id}'")]
    CreateFailed { kind: &'static str, id: String },

    /// An output refused to start.
    #[error("Output {0} could not be started")]
    StartFailed(u64),

    /// The engine refused a call.
    #[error("{0} was rejected")]
    Rejected(&'static str),

    /// A handle does not refer to a live object.
    #[error("Unknown handle {0}")]
    UnknownHandle(u64),
}

impl EngineError {
    pub fn create_failed(kind: &'static str, id: impl Into<String>) -> Self {
        Self::CreateFailed {
            kind,
            id: id.into(),
        }
    }
}

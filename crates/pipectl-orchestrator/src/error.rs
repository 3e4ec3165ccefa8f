//! Error types for building and running the pipeline.

use thiserror::Error;

use pipectl_engine::EngineError;

/// Errors that abort building the resource graph.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Engine core failed to start.
    #[error("Engine startup failed: {0}")]
    Startup(#[source] EngineError),

    /// Video subsystem rejected the settings.
    #[error("Couldn't initialize video: {0}")]
    Video(#[source] EngineError),

    /// Audio subsystem rejected the settings.
    #[error("Couldn't initialize audio: {0}")]
    Audio(#[source] EngineError),

    /// Scene could not be created.
    #[error("Couldn't create scene: {0}")]
    Scene(#[source] EngineError),

    /// An encoder could not be created or configured.
    #[error("Encoder {index} failed: {source}")]
    Encoder { index: usize, source: EngineError },

    /// An output of a kind this orchestrator does not drive.
    #[error("Unsupported output '{kind}' on encoder {encoder}")]
    UnsupportedOutput { encoder: usize, kind: String },

    /// An output could not be started.
    #[error("Output {output} of encoder {encoder} could not be started: {source}")]
    OutputStart {
        encoder: usize,
        output: usize,
        source: EngineError,
    },

    /// A source could not be created or placed.
    #[error("Source {index} ('{kind}') failed: {source}")]
    Source {
        index: usize,
        kind: String,
        source: EngineError,
    },

    /// A phase ran before the scene existed.
    #[error("No scene to use while {0}")]
    NoScene(&'static str),

    /// Any other engine call failed.
    #[error("Engine call failed: {0}")]
    Engine(#[from] EngineError),
}

/// Errors from driving the orchestrator lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The requested action is not valid in the current state.
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// Building the pipeline failed. Everything created was released.
    #[error(transparent)]
    Build(#[from] BuildError),
}

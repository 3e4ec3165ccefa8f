//! Events emitted by the orchestrator while it builds and tears down.

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use crate::state::{BuildPhase, LifecycleState, ShutdownPhase};

/// Channel capacity for lifecycle events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events that observers of the orchestrator can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Lifecycle state has changed.
    StateChanged {
        previous: LifecycleState,
        current: LifecycleState,
    },

    /// A build phase has begun.
    BuildPhase(BuildPhase),

    /// A shutdown phase has begun.
    ShutdownPhase(ShutdownPhase),

    /// An output started streaming.
    OutputStarted {
        /// Index of the encoder in the document.
        encoder: usize,

        /// Index of the output under its encoder.
        output: usize,
    },

    /// An output could not be set up or started.
    OutputFailed {
        encoder: usize,
        output: usize,
        message: String,
    },
}

/// Creates a bounded lifecycle event channel.
pub fn event_channel() -> (Sender<LifecycleEvent>, Receiver<LifecycleEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}

/// Send an event without blocking. A full or disconnected channel only
/// loses the event.
pub(crate) fn emit(tx: Option<&Sender<LifecycleEvent>>, event: LifecycleEvent) {
    if let Some(tx) = tx {
        if let Err(e) = tx.try_send(event) {
            warn!("Failed to send lifecycle event: {}", e);
        }
    }
}

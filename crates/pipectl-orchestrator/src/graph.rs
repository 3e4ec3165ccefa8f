//! The live resource graph.
//!
//! The collections here are the only record of what has to be released.
//! Handles enter a collection as soon as the engine hands them out and
//! leave it when they are released.

use pipectl_engine::{EncoderHandle, OutputHandle, SceneHandle, SceneItemHandle, ServiceHandle};

use crate::collection::OrderedCollection;

/// How far an output got through its setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Output object exists.
    Created,

    /// Streaming service is bound.
    ServiceBound,

    /// Output is streaming.
    Started,
}

/// A live output and the service bound to it.
#[derive(Debug)]
pub struct OutputNode {
    pub output: OutputHandle,
    pub service: Option<ServiceHandle>,
    pub state: OutputState,
}

impl OutputNode {
    pub(crate) fn new(output: OutputHandle) -> Self {
        Self {
            output,
            service: None,
            state: OutputState::Created,
        }
    }

    /// Returns true if the output needs to be stopped before release.
    pub fn is_started(&self) -> bool {
        self.state == OutputState::Started
    }
}

/// A live encoder pair and the outputs it feeds.
#[derive(Debug, Default)]
pub struct EncoderNode {
    pub video: Option<EncoderHandle>,
    pub audio: Option<EncoderHandle>,
    pub outputs: OrderedCollection<OutputNode>,
}

/// Everything the builder created, in creation order.
#[derive(Debug, Default)]
pub struct LiveGraph {
    pub scene: Option<SceneHandle>,
    pub sources: OrderedCollection<SceneItemHandle>,
    pub encoders: OrderedCollection<EncoderNode>,
}

impl LiveGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing in the graph is still live.
    pub fn is_empty(&self) -> bool {
        self.scene.is_none() && self.sources.is_empty() && self.encoders.is_empty()
    }

    /// Number of outputs across all encoders.
    pub fn output_count(&self) -> usize {
        self.encoders.iter().map(|e| e.outputs.len()).sum()
    }

    /// Number of outputs currently streaming.
    pub fn started_output_count(&self) -> usize {
        self.encoders
            .iter()
            .flat_map(|e| e.outputs.iter())
            .filter(|o| o.is_started())
            .count()
    }
}

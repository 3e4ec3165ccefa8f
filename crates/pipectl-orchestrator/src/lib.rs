//! Pipeline orchestration for pipectl.
//!
//! Takes a loaded [`Configuration`](pipectl_config::Configuration), builds
//! the scene, encoder and output graph on a
//! [`RenderEngine`](pipectl_engine::RenderEngine), keeps it alive until a
//! termination request arrives and then releases everything in reverse order.

mod builder;
mod collection;
mod error;
mod events;
mod flatten;
mod graph;
mod lifecycle;
mod profiler;
mod state;

pub use builder::{audio_info, bounds_type, video_info, GraphBuilder};
pub use collection::{Key, OrderedCollection};
pub use error::{BuildError, LifecycleError};
pub use events::{event_channel, LifecycleEvent, EVENT_CHANNEL_CAPACITY};
pub use flatten::{flatten, to_engine_data};
pub use graph::{EncoderNode, LiveGraph, OutputNode, OutputState};
pub use lifecycle::{Orchestrator, OrchestratorOptions, ShutdownReport, ShutdownSignal};
pub use profiler::{PhaseTiming, ProfileReport, Profiler};
pub use state::{BuildPhase, LifecycleState, ShutdownPhase};

/// Name of the single scene.
pub const SCENE_NAME: &str = "main_scene";

pub const VIDEO_ENCODER_ID: &str = "obs_x264";
pub const VIDEO_ENCODER_NAME: &str = "x264 encoder";
pub const AUDIO_ENCODER_ID: &str = "ffmpeg_aac";
pub const AUDIO_ENCODER_NAME: &str = "aac encoder";

/// The only output kind that is driven.
pub const RTMP_OUTPUT_ID: &str = "rtmp_output";
pub const RTMP_SERVICE_ID: &str = "rtmp_common";
pub const SERVICE_NAME: &str = "default_service";

/// Canvas frame rate.
pub const FPS_NUM: u32 = 25;
pub const FPS_DEN: u32 = 1;

/// Audio sample rate in Hz.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Keyframe interval for video encoders, in seconds.
pub const KEYFRAME_INTERVAL_SECS: i64 = 1;

/// Global output channel the scene is bound to.
pub const OUTPUT_CHANNEL: u32 = 0;

/// Audio mixer and track index.
pub const MIXER_INDEX: usize = 0;

pub const DEFAULT_LOCALE: &str = "en-US";
pub const PROFILER_ROOT: &str = "pipectl";

/// Default wait loop poll interval, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

//! Rendering engine contract for pipectl.
//!
//! The rendering/compositing engine owns video and audio processing, the
//! render, encode and network threads, and every object it hands out. The
//! orchestrator only drives it through [`RenderEngine`] and keeps the opaque
//! handles it returns. [`RecordingEngine`] is an in-process implementation
//! that validates and journals every call without touching any media.

mod data;
mod error;
mod handle;
mod info;
mod recording;

pub use data::{DataValue, EngineData};
pub use error::EngineError;
pub use handle::{
    EncoderHandle, OutputHandle, SceneHandle, SceneItemHandle, ServiceHandle, SourceHandle,
};
pub use info::{
    AudioInfo, BoundsType, ScaleType, SpeakerLayout, TransformInfo, Vec2, VideoFormat, VideoInfo,
    ALIGN_CENTER, ALIGN_LEFT, ALIGN_TOP,
};
pub use recording::{CallJournal, EngineCall, FailurePlan, RecordingEngine};

/// Result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// The rendering/compositing engine as seen by the orchestrator.
///
/// Every call is synchronous: it either completes or reports failure before
/// returning. Release calls consume their handle.
pub trait RenderEngine {
    /// Engine name for diagnostics.
    fn name(&self) -> &'static str;

    /// Start the engine core.
    fn startup(&mut self, locale: &str) -> EngineResult<()>;

    /// Engine version string.
    fn version(&self) -> String;

    /// Load every available plugin module and return their names.
    fn load_all_modules(&mut self) -> Vec<String>;

    /// (Re)initialize the video subsystem.
    fn reset_video(&mut self, info: &VideoInfo) -> EngineResult<()>;

    /// (Re)initialize the audio subsystem.
    fn reset_audio(&mut self, info: &AudioInfo) -> EngineResult<()>;

    fn create_scene(&mut self, name: &str) -> EngineResult<SceneHandle>;

    /// Make a scene the source of a global output channel.
    fn set_output_source(&mut self, channel: u32, scene: &SceneHandle) -> EngineResult<()>;

    fn release_scene(&mut self, scene: SceneHandle) -> EngineResult<()>;

    fn create_source(
        &mut self,
        id: &str,
        name: &str,
        settings: &EngineData,
    ) -> EngineResult<SourceHandle>;

    /// Release a source that was never placed in a scene.
    fn release_source(&mut self, source: SourceHandle) -> EngineResult<()>;

    /// Set a source's volume as a fraction (0.0 - 1.0).
    fn set_source_volume(&mut self, source: &SourceHandle, volume: f32) -> EngineResult<()>;

    /// Place a source in a scene. The scene item takes over the source.
    fn scene_add(
        &mut self,
        scene: &SceneHandle,
        source: SourceHandle,
    ) -> EngineResult<SceneItemHandle>;

    fn sceneitem_info(&self, item: &SceneItemHandle) -> EngineResult<TransformInfo>;

    fn set_sceneitem_info(
        &mut self,
        item: &SceneItemHandle,
        info: &TransformInfo,
    ) -> EngineResult<()>;

    fn release_sceneitem(&mut self, item: SceneItemHandle) -> EngineResult<()>;

    fn create_video_encoder(&mut self, id: &str, name: &str) -> EngineResult<EncoderHandle>;

    fn create_audio_encoder(
        &mut self,
        id: &str,
        name: &str,
        mixer: usize,
    ) -> EngineResult<EncoderHandle>;

    fn set_encoder_scaled_size(
        &mut self,
        encoder: &EncoderHandle,
        width: u32,
        height: u32,
    ) -> EngineResult<()>;

    fn set_encoder_preferred_format(
        &mut self,
        encoder: &EncoderHandle,
        format: VideoFormat,
    ) -> EngineResult<()>;

    fn update_encoder(&mut self, encoder: &EncoderHandle, settings: &EngineData)
        -> EngineResult<()>;

    /// Connect an encoder to the global video pipeline.
    fn attach_encoder_video(&mut self, encoder: &EncoderHandle) -> EngineResult<()>;

    /// Connect an encoder to the global audio pipeline.
    fn attach_encoder_audio(&mut self, encoder: &EncoderHandle) -> EngineResult<()>;

    fn release_encoder(&mut self, encoder: EncoderHandle) -> EngineResult<()>;

    fn create_output(&mut self, id: &str, name: &str) -> EngineResult<OutputHandle>;

    fn set_output_video_encoder(
        &mut self,
        output: &OutputHandle,
        encoder: &EncoderHandle,
    ) -> EngineResult<()>;

    fn set_output_audio_encoder(
        &mut self,
        output: &OutputHandle,
        encoder: &EncoderHandle,
        track: usize,
    ) -> EngineResult<()>;

    fn create_service(
        &mut self,
        id: &str,
        name: &str,
        settings: &EngineData,
    ) -> EngineResult<ServiceHandle>;

    fn set_output_service(
        &mut self,
        output: &OutputHandle,
        service: &ServiceHandle,
    ) -> EngineResult<()>;

    fn set_output_delay(
        &mut self,
        output: &OutputHandle,
        delay_secs: u32,
        flags: u32,
    ) -> EngineResult<()>;

    fn set_output_mixer(&mut self, output: &OutputHandle, mixer: usize) -> EngineResult<()>;

    fn start_output(&mut self, output: &OutputHandle) -> EngineResult<()>;

    fn stop_output(&mut self, output: &OutputHandle) -> EngineResult<()>;

    fn release_output(&mut self, output: OutputHandle) -> EngineResult<()>;

    fn release_service(&mut self, service: ServiceHandle) -> EngineResult<()>;

    /// Number of engine allocations still outstanding (leak diagnostic).
    fn outstanding_allocations(&self) -> u64;
}

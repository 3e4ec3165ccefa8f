//! Headless engine that validates and journals every call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument, trace, warn};

use crate::data::EngineData;
use crate::error::EngineError;
use crate::handle::{
    EncoderHandle, OutputHandle, SceneHandle, SceneItemHandle, ServiceHandle, SourceHandle,
};
use crate::info::{AudioInfo, TransformInfo, VideoFormat, VideoInfo};
use crate::{EngineResult, RenderEngine};

/// Modules reported by [`RecordingEngine::load_all_modules`].
const MODULES: &[&str] = &[
    "image-source",
    "linux-pulseaudio",
    "obs-ffmpeg",
    "obs-outputs",
    "obs-x264",
    "rtmp-services",
];

/// One engine call, as seen by the [`RecordingEngine`].
///
/// Object ids are the raw values of the handles involved.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Startup { locale: String },
    LoadModules,
    ResetVideo(VideoInfo),
    ResetAudio(AudioInfo),
    CreateScene { scene: u64, name: String },
    SetOutputSource { channel: u32, scene: u64 },
    ReleaseScene(u64),
    CreateSource { source: u64, id: String, settings: EngineData },
    ReleaseSource(u64),
    SetSourceVolume { source: u64, volume: f32 },
    SceneAdd { scene: u64, source: u64, item: u64 },
    SetSceneItemInfo { item: u64, info: TransformInfo },
    ReleaseSceneItem(u64),
    CreateVideoEncoder { encoder: u64, id: String },
    CreateAudioEncoder { encoder: u64, id: String, mixer: usize },
    SetEncoderScaledSize { encoder: u64, width: u32, height: u32 },
    SetEncoderPreferredFormat { encoder: u64, format: VideoFormat },
    UpdateEncoder { encoder: u64, settings: EngineData },
    AttachEncoderVideo(u64),
    AttachEncoderAudio(u64),
    ReleaseEncoder(u64),
    CreateOutput { output: u64, id: String },
    SetOutputVideoEncoder { output: u64, encoder: u64 },
    SetOutputAudioEncoder { output: u64, encoder: u64, track: usize },
    CreateService { service: u64, id: String, settings: EngineData },
    SetOutputService { output: u64, service: u64 },
    SetOutputDelay { output: u64, delay_secs: u32, flags: u32 },
    SetOutputMixer { output: u64, mixer: usize },
    StartOutput { output: u64, started: bool },
    StopOutput(u64),
    ReleaseOutput(u64),
    ReleaseService(u64),
}

/// Shared, append-only log of engine calls.
///
/// Clones share the same log, so a test can keep one while the engine is
/// owned elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl CallJournal {
    fn record(&self, call: EngineCall) {
        trace!(?call, "Engine call");
        self.calls.lock().push(call);
    }

    /// Snapshot of every call so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Number of calls matching a predicate.
    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| pred(*call)).count()
    }

    /// Index of the first call matching a predicate.
    pub fn position(&self, pred: impl Fn(&EngineCall) -> bool) -> Option<usize> {
        self.calls.lock().iter().position(pred)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Calls the [`RecordingEngine`] should fail on purpose.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    pub fail_startup: bool,
    pub reject_video: bool,
    pub reject_audio: bool,
    pub fail_output_start: bool,
    pub fail_source_volume: bool,

    /// Source kinds whose creation fails.
    pub fail_source_kinds: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
    Scene,
    Source,
    SceneItem,
    Encoder,
    Output,
    Service,
}

impl ObjectKind {
    fn name(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Source => "source",
            Self::SceneItem => "scene item",
            Self::Encoder => "encoder",
            Self::Output => "output",
            Self::Service => "service",
        }
    }
}

/// An engine that renders nothing but behaves like one at the API level.
///
/// It checks handles, rejects unusable video/audio configurations, keeps
/// per-item transform state and counts live objects, so the orchestrator can
/// be run end to end without a media stack.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    journal: CallJournal,
    failures: FailurePlan,
    started: bool,
    next_id: u64,
    objects: HashMap<u64, ObjectKind>,
    item_info: HashMap<u64, TransformInfo>,
    running_outputs: HashSet<u64>,
}

impl RecordingEngine {
    /// Create an engine where every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that fails the calls named in `failures`.
    pub fn with_failures(failures: FailurePlan) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    /// Handle to the call journal.
    pub fn journal(&self) -> CallJournal {
        self.journal.clone()
    }

    /// Number of outputs currently started.
    pub fn running_outputs(&self) -> usize {
        self.running_outputs.len()
    }

    fn alloc(&mut self, kind: ObjectKind) -> u64 {
        self.next_id += 1;
        self.objects.insert(self.next_id, kind);
        debug!(id = self.next_id, kind = kind.name(), "Allocated object");
        self.next_id
    }

    fn expect(&self, id: u64, kind: ObjectKind) -> EngineResult<()> {
        match self.objects.get(&id) {
            Some(found) if *found == kind => Ok(()),
            _ => Err(EngineError::UnknownHandle(id)),
        }
    }

    fn free(&mut self, id: u64, kind: ObjectKind) -> EngineResult<()> {
        self.expect(id, kind)?;
        self.objects.remove(&id);
        debug!(id, kind = kind.name(), "Released object");
        Ok(())
    }

    fn require_started(&self, what: &str) -> EngineResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(EngineError::StartupFailed(format!(
                "{what} called before startup"
            )))
        }
    }
}

impl RenderEngine for RecordingEngine {
    fn name(&self) -> &'static str {
        "recording"
    }

    #[instrument(name = "recording_startup", skip(self))]
    fn startup(&mut self, locale: &str) -> EngineResult<()> {
        self.journal.record(EngineCall::Startup {
            locale: locale.to_string(),
        });

        if self.failures.fail_startup {
            return Err(EngineError::StartupFailed("startup refused".into()));
        }

        self.started = true;
        Ok(())
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn load_all_modules(&mut self) -> Vec<String> {
        self.journal.record(EngineCall::LoadModules);
        MODULES.iter().map(|m| m.to_string()).collect()
    }

    fn reset_video(&mut self, info: &VideoInfo) -> EngineResult<()> {
        self.journal.record(EngineCall::ResetVideo(info.clone()));
        self.require_started("reset_video")?;

        if self.failures.reject_video {
            return Err(EngineError::VideoRejected("rejected by failure plan".into()));
        }
        if info.graphics_module.is_empty() {
            return Err(EngineError::VideoRejected("no graphics module".into()));
        }
        if info.base_width == 0 || info.base_height == 0 {
            return Err(EngineError::VideoRejected(format!(
                "invalid canvas {}x{}",
                info.base_width, info.base_height
            )));
        }
        if info.fps_num == 0 || info.fps_den == 0 {
            return Err(EngineError::VideoRejected(format!(
                "invalid frame rate {}/{}",
                info.fps_num, info.fps_den
            )));
        }

        Ok(())
    }

    fn reset_audio(&mut self, info: &AudioInfo) -> EngineResult<()> {
        self.journal.record(EngineCall::ResetAudio(*info));
        self.require_started("reset_audio")?;

        if self.failures.reject_audio {
            return Err(EngineError::AudioRejected("rejected by failure plan".into()));
        }
        if info.samples_per_sec == 0 {
            return Err(EngineError::AudioRejected("invalid sample rate".into()));
        }

        Ok(())
    }

    fn create_scene(&mut self, name: &str) -> EngineResult<SceneHandle> {
        self.require_started("create_scene")?;
        let scene = self.alloc(ObjectKind::Scene);
        self.journal.record(EngineCall::CreateScene {
            scene,
            name: name.to_string(),
        });
        Ok(SceneHandle::from_raw(scene))
    }

    fn set_output_source(&mut self, channel: u32, scene: &SceneHandle) -> EngineResult<()> {
        self.expect(scene.raw(), ObjectKind::Scene)?;
        self.journal.record(EngineCall::SetOutputSource {
            channel,
            scene: scene.raw(),
        });
        Ok(())
    }

    fn release_scene(&mut self, scene: SceneHandle) -> EngineResult<()> {
        self.journal.record(EngineCall::ReleaseScene(scene.raw()));
        self.free(scene.raw(), ObjectKind::Scene)
    }

    fn create_source(
        &mut self,
        id: &str,
        _name: &str,
        settings: &EngineData,
    ) -> EngineResult<SourceHandle> {
        self.require_started("create_source")?;
        if self.failures.fail_source_kinds.iter().any(|kind| kind == id) {
            return Err(EngineError::create_failed(ObjectKind::Source.name(), id));
        }

        let source = self.alloc(ObjectKind::Source);
        self.journal.record(EngineCall::CreateSource {
            source,
            id: id.to_string(),
            settings: settings.clone(),
        });
        Ok(SourceHandle::from_raw(source))
    }

    fn release_source(&mut self, source: SourceHandle) -> EngineResult<()> {
        self.journal.record(EngineCall::ReleaseSource(source.raw()));
        self.free(source.raw(), ObjectKind::Source)
    }

    fn set_source_volume(&mut self, source: &SourceHandle, volume: f32) -> EngineResult<()> {
        self.expect(source.raw(), ObjectKind::Source)?;
        self.journal.record(EngineCall::SetSourceVolume {
            source: source.raw(),
            volume,
        });

        if self.failures.fail_source_volume {
            return Err(EngineError::Rejected("set_source_volume"));
        }
        Ok(())
    }

    fn scene_add(
        &mut self,
        scene: &SceneHandle,
        source: SourceHandle,
    ) -> EngineResult<SceneItemHandle> {
        self.expect(scene.raw(), ObjectKind::Scene)?;
        // The item owns the source from here on.
        self.free(source.raw(), ObjectKind::Source)?;

        let item = self.alloc(ObjectKind::SceneItem);
        self.item_info.insert(item, TransformInfo::default());
        self.journal.record(EngineCall::SceneAdd {
            scene: scene.raw(),
            source: source.raw(),
            item,
        });
        Ok(SceneItemHandle::from_raw(item))
    }

    fn sceneitem_info(&self, item: &SceneItemHandle) -> EngineResult<TransformInfo> {
        self.item_info
            .get(&item.raw())
            .copied()
            .ok_or(EngineError::UnknownHandle(item.raw()))
    }

    fn set_sceneitem_info(
        &mut self,
        item: &SceneItemHandle,
        info: &TransformInfo,
    ) -> EngineResult<()> {
        let slot = self
            .item_info
            .get_mut(&item.raw())
            .ok_or(EngineError::UnknownHandle(item.raw()))?;
        *slot = *info;
        self.journal.record(EngineCall::SetSceneItemInfo {
            item: item.raw(),
            info: *info,
        });
        Ok(())
    }

    fn release_sceneitem(&mut self, item: SceneItemHandle) -> EngineResult<()> {
        self.journal.record(EngineCall::ReleaseSceneItem(item.raw()));
        self.item_info.remove(&item.raw());
        self.free(item.raw(), ObjectKind::SceneItem)
    }

    fn create_video_encoder(&mut self, id: &str, _name: &str) -> EngineResult<EncoderHandle> {
        self.require_started("create_video_encoder")?;
        let encoder = self.alloc(ObjectKind::Encoder);
        self.journal.record(EngineCall::CreateVideoEncoder {
            encoder,
            id: id.to_string(),
        });
        Ok(EncoderHandle::from_raw(encoder))
    }

    fn create_audio_encoder(
        &mut self,
        id: &str,
        _name: &str,
        mixer: usize,
    ) -> EngineResult<EncoderHandle> {
        self.require_started("create_audio_encoder")?;
        let encoder = self.alloc(ObjectKind::Encoder);
        self.journal.record(EngineCall::CreateAudioEncoder {
            encoder,
            id: id.to_string(),
            mixer,
        });
        Ok(EncoderHandle::from_raw(encoder))
    }

    fn set_encoder_scaled_size(
        &mut self,
        encoder: &EncoderHandle,
        width: u32,
        height: u32,
    ) -> EngineResult<()> {
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal.record(EngineCall::SetEncoderScaledSize {
            encoder: encoder.raw(),
            width,
            height,
        });
        Ok(())
    }

    fn set_encoder_preferred_format(
        &mut self,
        encoder: &EncoderHandle,
        format: VideoFormat,
    ) -> EngineResult<()> {
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal.record(EngineCall::SetEncoderPreferredFormat {
            encoder: encoder.raw(),
            format,
        });
        Ok(())
    }

    fn update_encoder(
        &mut self,
        encoder: &EncoderHandle,
        settings: &EngineData,
    ) -> EngineResult<()> {
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal.record(EngineCall::UpdateEncoder {
            encoder: encoder.raw(),
            settings: settings.clone(),
        });
        Ok(())
    }

    fn attach_encoder_video(&mut self, encoder: &EncoderHandle) -> EngineResult<()> {
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal
            .record(EngineCall::AttachEncoderVideo(encoder.raw()));
        Ok(())
    }

    fn attach_encoder_audio(&mut self, encoder: &EncoderHandle) -> EngineResult<()> {
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal
            .record(EngineCall::AttachEncoderAudio(encoder.raw()));
        Ok(())
    }

    fn release_encoder(&mut self, encoder: EncoderHandle) -> EngineResult<()> {
        self.journal.record(EngineCall::ReleaseEncoder(encoder.raw()));
        self.free(encoder.raw(), ObjectKind::Encoder)
    }

    fn create_output(&mut self, id: &str, _name: &str) -> EngineResult<OutputHandle> {
        self.require_started("create_output")?;
        let output = self.alloc(ObjectKind::Output);
        self.journal.record(EngineCall::CreateOutput {
            output,
            id: id.to_string(),
        });
        Ok(OutputHandle::from_raw(output))
    }

    fn set_output_video_encoder(
        &mut self,
        output: &OutputHandle,
        encoder: &EncoderHandle,
    ) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal.record(EngineCall::SetOutputVideoEncoder {
            output: output.raw(),
            encoder: encoder.raw(),
        });
        Ok(())
    }

    fn set_output_audio_encoder(
        &mut self,
        output: &OutputHandle,
        encoder: &EncoderHandle,
        track: usize,
    ) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        self.expect(encoder.raw(), ObjectKind::Encoder)?;
        self.journal.record(EngineCall::SetOutputAudioEncoder {
            output: output.raw(),
            encoder: encoder.raw(),
            track,
        });
        Ok(())
    }

    fn create_service(
        &mut self,
        id: &str,
        _name: &str,
        settings: &EngineData,
    ) -> EngineResult<ServiceHandle> {
        self.require_started("create_service")?;
        let service = self.alloc(ObjectKind::Service);
        self.journal.record(EngineCall::CreateService {
            service,
            id: id.to_string(),
            settings: settings.clone(),
        });
        Ok(ServiceHandle::from_raw(service))
    }

    fn set_output_service(
        &mut self,
        output: &OutputHandle,
        service: &ServiceHandle,
    ) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        self.expect(service.raw(), ObjectKind::Service)?;
        self.journal.record(EngineCall::SetOutputService {
            output: output.raw(),
            service: service.raw(),
        });
        Ok(())
    }

    fn set_output_delay(
        &mut self,
        output: &OutputHandle,
        delay_secs: u32,
        flags: u32,
    ) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        self.journal.record(EngineCall::SetOutputDelay {
            output: output.raw(),
            delay_secs,
            flags,
        });
        Ok(())
    }

    fn set_output_mixer(&mut self, output: &OutputHandle, mixer: usize) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        self.journal.record(EngineCall::SetOutputMixer {
            output: output.raw(),
            mixer,
        });
        Ok(())
    }

    fn start_output(&mut self, output: &OutputHandle) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        let started = !self.failures.fail_output_start;
        self.journal.record(EngineCall::StartOutput {
            output: output.raw(),
            started,
        });

        if !started {
            return Err(EngineError::StartFailed(output.raw()));
        }

        self.running_outputs.insert(output.raw());
        Ok(())
    }

    fn stop_output(&mut self, output: &OutputHandle) -> EngineResult<()> {
        self.expect(output.raw(), ObjectKind::Output)?;
        self.journal.record(EngineCall::StopOutput(output.raw()));
        self.running_outputs.remove(&output.raw());
        Ok(())
    }

    fn release_output(&mut self, output: OutputHandle) -> EngineResult<()> {
        self.journal.record(EngineCall::ReleaseOutput(output.raw()));
        if self.running_outputs.remove(&output.raw()) {
            warn!(output = output.raw(), "Releasing an output that is still running");
        }
        self.free(output.raw(), ObjectKind::Output)
    }

    fn release_service(&mut self, service: ServiceHandle) -> EngineResult<()> {
        self.journal.record(EngineCall::ReleaseService(service.raw()));
        self.free(service.raw(), ObjectKind::Service)
    }

    fn outstanding_allocations(&self) -> u64 {
        self.objects.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{ScaleType, SpeakerLayout};

    fn video_info() -> VideoInfo {
        VideoInfo {
            graphics_module: "libobs-opengl".into(),
            adapter: 0,
            base_width: 1280,
            base_height: 720,
            output_width: 1280,
            output_height: 720,
            fps_num: 25,
            fps_den: 1,
            output_format: VideoFormat::Rgba,
            scale_type: ScaleType::Bilinear,
        }
    }

    #[test]
    fn test_reset_video_requires_startup() {
        let mut engine = RecordingEngine::new();
        assert!(engine.reset_video(&video_info()).is_err());

        engine.startup("en-US").unwrap();
        assert!(engine.reset_video(&video_info()).is_ok());
    }

    #[test]
    fn test_reset_video_rejects_bad_canvas() {
        let mut engine = RecordingEngine::new();
        engine.startup("en-US").unwrap();

        let mut info = video_info();
        info.base_width = 0;
        assert!(matches!(
            engine.reset_video(&info),
            Err(EngineError::VideoRejected(_))
        ));

        let mut info = video_info();
        info.graphics_module.clear();
        assert!(matches!(
            engine.reset_video(&info),
            Err(EngineError::VideoRejected(_))
        ));
    }

    #[test]
    fn test_reset_audio_failure_plan() {
        let mut engine = RecordingEngine::with_failures(FailurePlan {
            reject_audio: true,
            ..Default::default()
        });
        engine.startup("en-US").unwrap();

        let info = AudioInfo {
            samples_per_sec: 44_100,
            speakers: SpeakerLayout::Stereo,
        };
        assert!(matches!(
            engine.reset_audio(&info),
            Err(EngineError::AudioRejected(_))
        ));
    }

    #[test]
    fn test_scene_add_moves_source_into_item() {
        let mut engine = RecordingEngine::new();
        engine.startup("en-US").unwrap();

        let scene = engine.create_scene("main").unwrap();
        let source = engine
            .create_source("image_source", "", &EngineData::new())
            .unwrap();
        assert_eq!(engine.outstanding_allocations(), 2);

        let item = engine.scene_add(&scene, source).unwrap();
        assert_eq!(engine.outstanding_allocations(), 2);
        assert_eq!(engine.sceneitem_info(&item).unwrap(), TransformInfo::default());

        engine.release_sceneitem(item).unwrap();
        engine.release_scene(scene).unwrap();
        assert_eq!(engine.outstanding_allocations(), 0);
    }

    #[test]
    fn test_release_unknown_handle() {
        let mut engine = RecordingEngine::new();
        let err = engine
            .release_encoder(EncoderHandle::from_raw(42))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownHandle(42)));
    }

    #[test]
    fn test_output_start_failure() {
        let mut engine = RecordingEngine::with_failures(FailurePlan {
            fail_output_start: true,
            ..Default::default()
        });
        engine.startup("en-US").unwrap();

        let output = engine.create_output("rtmp_output", "").unwrap();
        assert!(matches!(
            engine.start_output(&output),
            Err(EngineError::StartFailed(_))
        ));
        assert_eq!(engine.running_outputs(), 0);

        let journal = engine.journal();
        assert_eq!(
            journal.count(|c| matches!(c, EngineCall::StartOutput { started: false, .. })),
            1
        );
    }

    #[test]
    fn test_journal_is_shared() {
        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        engine.startup("en-US").unwrap();
        engine.load_all_modules();

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.position(|c| *c == EngineCall::LoadModules), Some(1));
    }
}

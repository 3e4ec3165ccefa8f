//! Resource graph construction.
//!
//! Phases run in a fixed order because later phases consume handles that
//! earlier ones produce. Every handle is recorded in the [`LiveGraph`] before
//! the call that created it returns an error, so whatever was built before a
//! failure is still there for shutdown to release. Nothing is unwound here.

use crossbeam_channel::Sender;
use tracing::{debug, error, info, instrument, warn};

use pipectl_config::{Configuration, EncoderSpec, OutputSpec, ScaleMode, Settings, SourceSpec};
use pipectl_engine::{
    AudioInfo, BoundsType, EncoderHandle, EngineData, EngineError, EngineResult, RenderEngine,
    SceneHandle, SceneItemHandle, ScaleType, SpeakerLayout, Vec2, VideoFormat, VideoInfo,
};

use crate::collection::OrderedCollection;
use crate::error::BuildError;
use crate::events::{emit, LifecycleEvent};
use crate::flatten::to_engine_data;
use crate::graph::{EncoderNode, LiveGraph, OutputNode, OutputState};
use crate::profiler::Profiler;
use crate::state::BuildPhase;
use crate::{
    AUDIO_ENCODER_ID, AUDIO_ENCODER_NAME, AUDIO_SAMPLE_RATE, FPS_DEN, FPS_NUM,
    KEYFRAME_INTERVAL_SECS, MIXER_INDEX, OUTPUT_CHANNEL, RTMP_OUTPUT_ID, RTMP_SERVICE_ID,
    SCENE_NAME, SERVICE_NAME, VIDEO_ENCODER_ID, VIDEO_ENCODER_NAME,
};

/// Video subsystem settings for a canvas.
pub fn video_info(settings: &Settings) -> VideoInfo {
    VideoInfo {
        graphics_module: settings.graphics.clone(),
        adapter: 0,
        base_width: settings.width,
        base_height: settings.height,
        output_width: settings.width,
        output_height: settings.height,
        fps_num: FPS_NUM,
        fps_den: FPS_DEN,
        output_format: VideoFormat::Rgba,
        scale_type: ScaleType::Bilinear,
    }
}

/// Audio subsystem settings.
pub fn audio_info() -> AudioInfo {
    AudioInfo {
        samples_per_sec: AUDIO_SAMPLE_RATE,
        speakers: SpeakerLayout::Stereo,
    }
}

/// Engine bounds type for a document scale mode.
pub fn bounds_type(mode: ScaleMode) -> BoundsType {
    match mode {
        ScaleMode::Inner => BoundsType::ScaleInner,
        ScaleMode::Stretch => BoundsType::Stretch,
        ScaleMode::None => BoundsType::None,
    }
}

/// Builds the resource graph for one configuration.
pub struct GraphBuilder<'a, E: RenderEngine> {
    engine: &'a mut E,
    config: &'a Configuration,
    graph: &'a mut LiveGraph,
    profiler: &'a Profiler,
    locale: &'a str,
    events: Option<&'a Sender<LifecycleEvent>>,
}

impl<'a, E: RenderEngine> GraphBuilder<'a, E> {
    pub fn new(
        engine: &'a mut E,
        config: &'a Configuration,
        graph: &'a mut LiveGraph,
        profiler: &'a Profiler,
    ) -> Self {
        Self {
            engine,
            config,
            graph,
            profiler,
            locale: crate::DEFAULT_LOCALE,
            events: None,
        }
    }

    /// Locale passed to engine startup.
    pub fn locale(mut self, locale: &'a str) -> Self {
        self.locale = locale;
        self
    }

    /// Send output events to this channel.
    pub fn events(mut self, events: Option<&'a Sender<LifecycleEvent>>) -> Self {
        self.events = events;
        self
    }

    /// Run every phase in order.
    pub fn build(&mut self) -> Result<(), BuildError> {
        for phase in BuildPhase::ALL {
            self.run_phase(phase)?;
        }
        Ok(())
    }

    /// Run a single phase.
    #[instrument(name = "build_phase", skip(self))]
    pub fn run_phase(&mut self, phase: BuildPhase) -> Result<(), BuildError> {
        info!("Building phase: {}", phase.name());

        match phase {
            BuildPhase::Startup => self.start_engine(),
            BuildPhase::ResetVideo => self.reset_video(),
            BuildPhase::ResetAudio => self.reset_audio(),
            BuildPhase::CreateScene => self.create_scene(),
            BuildPhase::CreateEncoders => self.create_encoders(),
            BuildPhase::BindScene => self.bind_scene(),
            BuildPhase::AddSources => self.add_sources(),
        }
    }

    fn start_engine(&mut self) -> Result<(), BuildError> {
        self.engine
            .startup(self.locale)
            .map_err(BuildError::Startup)?;
        info!(
            engine = self.engine.name(),
            version = %self.engine.version(),
            "Engine started"
        );

        for module in self.engine.load_all_modules() {
            debug!(%module, "Loaded module");
        }
        Ok(())
    }

    fn reset_video(&mut self) -> Result<(), BuildError> {
        let info = video_info(&self.config.settings);
        self.engine.reset_video(&info).map_err(BuildError::Video)?;

        debug!(
            width = info.base_width,
            height = info.base_height,
            graphics = %info.graphics_module,
            "Video initialized"
        );
        Ok(())
    }

    fn reset_audio(&mut self) -> Result<(), BuildError> {
        self.engine
            .reset_audio(&audio_info())
            .map_err(BuildError::Audio)?;

        debug!("Audio initialized");
        Ok(())
    }

    fn create_scene(&mut self) -> Result<(), BuildError> {
        let scene = self
            .engine
            .create_scene(SCENE_NAME)
            .map_err(BuildError::Scene)?;
        self.profiler.record_created();
        self.graph.scene = Some(scene);

        debug!("Scene created");
        Ok(())
    }

    fn create_encoders(&mut self) -> Result<(), BuildError> {
        let config = self.config;

        for (index, spec) in config.encoders.iter().enumerate() {
            if spec.outputs.is_empty() {
                debug!(index, "Skipping encoder without outputs");
                continue;
            }
            if !spec.has_video() && !spec.has_audio() {
                warn!(index, "Skipping encoder without video or audio bitrate");
                continue;
            }

            let mut node = EncoderNode::default();
            let result = self
                .create_encoder_pair(index, spec, &mut node)
                .and_then(|()| self.create_outputs(index, spec, &mut node));
            self.graph.encoders.append(node);
            result?;
        }

        Ok(())
    }

    fn create_encoder_pair(
        &mut self,
        index: usize,
        spec: &EncoderSpec,
        node: &mut EncoderNode,
    ) -> Result<(), BuildError> {
        let encoder_error = |source| BuildError::Encoder { index, source };

        if spec.has_video() {
            let video = self
                .engine
                .create_video_encoder(VIDEO_ENCODER_ID, VIDEO_ENCODER_NAME)
                .map_err(encoder_error)?;
            self.profiler.record_created();

            let configured = self.configure_video_encoder(&video, spec);
            node.video = Some(video);
            configured.map_err(encoder_error)?;
        }

        if spec.has_audio() {
            let audio = self
                .engine
                .create_audio_encoder(AUDIO_ENCODER_ID, AUDIO_ENCODER_NAME, MIXER_INDEX)
                .map_err(encoder_error)?;
            self.profiler.record_created();

            let configured = self.configure_audio_encoder(&audio, spec);
            node.audio = Some(audio);
            configured.map_err(encoder_error)?;
        }

        debug!(
            index,
            video = node.video.is_some(),
            audio = node.audio.is_some(),
            "Encoders created"
        );
        Ok(())
    }

    fn configure_video_encoder(
        &mut self,
        encoder: &EncoderHandle,
        spec: &EncoderSpec,
    ) -> EngineResult<()> {
        self.engine
            .set_encoder_scaled_size(encoder, spec.width, spec.height)?;
        self.engine
            .set_encoder_preferred_format(encoder, VideoFormat::I420)?;

        let mut settings = EngineData::new();
        settings.set_int("bitrate", spec.video_bitrate);
        settings.set_int("keyint_sec", KEYFRAME_INTERVAL_SECS);
        settings.set_string("preset", spec.preset.as_str());
        settings.set_string("profile", spec.profile.as_str());
        self.engine.update_encoder(encoder, &settings)
    }

    fn configure_audio_encoder(
        &mut self,
        encoder: &EncoderHandle,
        spec: &EncoderSpec,
    ) -> EngineResult<()> {
        let mut settings = EngineData::new();
        settings.set_int("bitrate", spec.audio_bitrate);
        settings.set_bool("cbr", true);
        self.engine.update_encoder(encoder, &settings)
    }

    fn create_outputs(
        &mut self,
        index: usize,
        spec: &EncoderSpec,
        node: &mut EncoderNode,
    ) -> Result<(), BuildError> {
        for (output_index, output_spec) in spec.outputs.iter().enumerate() {
            if output_spec.kind != RTMP_OUTPUT_ID {
                error!(
                    encoder = index,
                    output = output_index,
                    kind = %output_spec.kind,
                    "Currently unsupported output"
                );
                self.emit(LifecycleEvent::OutputFailed {
                    encoder: index,
                    output: output_index,
                    message: format!("unsupported output '{}'", output_spec.kind),
                });
                return Err(BuildError::UnsupportedOutput {
                    encoder: index,
                    kind: output_spec.kind.clone(),
                });
            }

            let output = self.engine.create_output(RTMP_OUTPUT_ID, "")?;
            self.profiler.record_created();

            let mut output_node = OutputNode::new(output);
            let result = self
                .setup_output(
                    &mut output_node,
                    node.video.as_ref(),
                    node.audio.as_ref(),
                    output_spec,
                )
                .map_err(BuildError::Engine)
                .and_then(|()| self.start_output(index, output_index, &mut output_node));
            node.outputs.append(output_node);
            result?;
        }

        Ok(())
    }

    fn setup_output(
        &mut self,
        node: &mut OutputNode,
        video: Option<&EncoderHandle>,
        audio: Option<&EncoderHandle>,
        spec: &OutputSpec,
    ) -> EngineResult<()> {
        if let Some(video) = video {
            self.engine.set_output_video_encoder(&node.output, video)?;
        }
        if let Some(audio) = audio {
            self.engine
                .set_output_audio_encoder(&node.output, audio, MIXER_INDEX)?;
        }

        if let Some(video) = video {
            self.engine.attach_encoder_video(video)?;
        }
        if let Some(audio) = audio {
            self.engine.attach_encoder_audio(audio)?;
        }

        let mut settings = EngineData::new();
        settings.set_string("server", spec.server.as_str());
        settings.set_string("key", spec.key.as_str());
        let service = self
            .engine
            .create_service(RTMP_SERVICE_ID, SERVICE_NAME, &settings)?;
        self.profiler.record_created();

        let bound = self.engine.set_output_service(&node.output, &service);
        node.service = Some(service);
        bound?;
        node.state = OutputState::ServiceBound;

        self.engine.set_output_delay(&node.output, 0, 0)?;
        self.engine.set_output_mixer(&node.output, MIXER_INDEX)
    }

    fn start_output(
        &mut self,
        encoder: usize,
        output: usize,
        node: &mut OutputNode,
    ) -> Result<(), BuildError> {
        match self.engine.start_output(&node.output) {
            Ok(()) => {
                node.state = OutputState::Started;
                info!(encoder, output, "Translation started");
                self.emit(LifecycleEvent::OutputStarted { encoder, output });
                Ok(())
            }
            Err(source) => {
                error!(encoder, output, "Translation could not be started: {}", source);
                self.emit(LifecycleEvent::OutputFailed {
                    encoder,
                    output,
                    message: source.to_string(),
                });
                Err(BuildError::OutputStart {
                    encoder,
                    output,
                    source,
                })
            }
        }
    }

    fn bind_scene(&mut self) -> Result<(), BuildError> {
        let scene = self
            .graph
            .scene
            .as_ref()
            .ok_or(BuildError::NoScene(BuildPhase::BindScene.name()))?;
        self.engine.set_output_source(OUTPUT_CHANNEL, scene)?;

        debug!(channel = OUTPUT_CHANNEL, "Scene bound to video pipeline");
        Ok(())
    }

    fn add_sources(&mut self) -> Result<(), BuildError> {
        let config = self.config;
        let scene = self
            .graph
            .scene
            .as_ref()
            .ok_or(BuildError::NoScene(BuildPhase::AddSources.name()))?;

        for (index, spec) in config.sources.iter().enumerate() {
            add_source(
                &mut *self.engine,
                self.profiler,
                scene,
                spec,
                &mut self.graph.sources,
            )
            .map_err(|source| BuildError::Source {
                index,
                kind: spec.kind.clone(),
                source,
            })?;

            debug!(index, kind = %spec.kind, "Source added");
        }

        Ok(())
    }

    fn emit(&self, event: LifecycleEvent) {
        emit(self.events, event);
    }
}

/// Create one source, place it in the scene and record the scene item.
fn add_source<E: RenderEngine>(
    engine: &mut E,
    profiler: &Profiler,
    scene: &SceneHandle,
    spec: &SourceSpec,
    sources: &mut OrderedCollection<SceneItemHandle>,
) -> Result<(), EngineError> {
    let settings = to_engine_data(&spec.parameters);
    let source = engine.create_source(&spec.kind, "", &settings)?;

    if let Err(e) = engine.set_source_volume(&source, spec.volume_fraction()) {
        if let Err(release) = engine.release_source(source) {
            warn!("Failed to release source after volume error: {}", release);
        }
        return Err(e);
    }

    let item = engine.scene_add(scene, source)?;
    profiler.record_created();

    let placed = place_item(engine, &item, spec);
    sources.append(item);
    placed
}

/// Apply scale mode, bounds and position to a scene item. Bounds and
/// position keep the engine's defaults unless the document gives a
/// positive value.
fn place_item<E: RenderEngine>(
    engine: &mut E,
    item: &SceneItemHandle,
    spec: &SourceSpec,
) -> EngineResult<()> {
    let mut info = engine.sceneitem_info(item)?;

    info.bounds_type = bounds_type(spec.scale_mode());
    if spec.has_bounds() {
        info.bounds = Vec2::new(spec.width as f32, spec.height as f32);
    }
    if spec.has_position() {
        info.pos = Vec2::new(spec.pos_x as f32, spec.pos_y as f32);
    }

    engine.set_sceneitem_info(item, &info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipectl_config::{OutputSpec, ParamValue, Parameter};
    use pipectl_engine::{EngineCall, FailurePlan, RecordingEngine, TransformInfo};

    fn settings() -> Settings {
        Settings {
            graphics: "libobs-opengl".into(),
            width: 1280,
            height: 720,
        }
    }

    fn rtmp(key: &str) -> OutputSpec {
        OutputSpec {
            kind: RTMP_OUTPUT_ID.into(),
            server: "rtmp://localhost/live".into(),
            key: key.into(),
        }
    }

    fn build(
        engine: &mut RecordingEngine,
        config: &Configuration,
    ) -> (LiveGraph, Result<(), BuildError>) {
        let mut graph = LiveGraph::new();
        let profiler = Profiler::default();
        let result = GraphBuilder::new(engine, config, &mut graph, &profiler).build();
        (graph, result)
    }

    #[test]
    fn test_video_info_constants() {
        let info = video_info(&settings());
        assert_eq!((info.fps_num, info.fps_den), (25, 1));
        assert_eq!(info.output_format, VideoFormat::Rgba);
        assert_eq!(info.scale_type, ScaleType::Bilinear);
        assert_eq!((info.output_width, info.output_height), (1280, 720));

        let audio = audio_info();
        assert_eq!(audio.samples_per_sec, 44_100);
        assert_eq!(audio.speakers, SpeakerLayout::Stereo);
    }

    #[test]
    fn test_bounds_type_mapping() {
        assert_eq!(bounds_type(ScaleMode::from_name("inner")), BoundsType::ScaleInner);
        assert_eq!(bounds_type(ScaleMode::from_name("stretch")), BoundsType::Stretch);
        assert_eq!(bounds_type(ScaleMode::from_name("")), BoundsType::None);
    }

    #[test]
    fn test_encoder_settings() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![EncoderSpec {
                width: 640,
                height: 360,
                video_bitrate: 2000,
                audio_bitrate: 128,
                preset: "veryfast".into(),
                profile: "main".into(),
                outputs: vec![rtmp("abc")],
            }],
            sources: vec![],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);
        result.unwrap();

        let updates: Vec<EngineData> = journal
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::UpdateEncoder { settings, .. } => Some(settings),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].get_int("bitrate"), Some(2000));
        assert_eq!(updates[0].get_int("keyint_sec"), Some(1));
        assert_eq!(updates[0].get_string("preset"), Some("veryfast"));
        assert_eq!(updates[0].get_string("profile"), Some("main"));
        assert_eq!(updates[1].get_int("bitrate"), Some(128));
        assert_eq!(updates[1].get_bool("cbr"), Some(true));

        assert_eq!(
            journal.count(|c| matches!(
                c,
                EngineCall::SetEncoderScaledSize { width: 640, height: 360, .. }
            )),
            1
        );
        assert_eq!(
            journal.count(|c| matches!(
                c,
                EngineCall::SetEncoderPreferredFormat { format: VideoFormat::I420, .. }
            )),
            1
        );
        assert_eq!(graph.started_output_count(), 1);
    }

    #[test]
    fn test_zero_bitrate_skips_encoder() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![EncoderSpec {
                video_bitrate: 0,
                audio_bitrate: 96,
                outputs: vec![rtmp("audio-only")],
                ..Default::default()
            }],
            sources: vec![],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);
        result.unwrap();

        assert_eq!(journal.count(|c| matches!(c, EngineCall::CreateVideoEncoder { .. })), 0);
        assert_eq!(journal.count(|c| matches!(c, EngineCall::SetOutputVideoEncoder { .. })), 0);
        assert_eq!(journal.count(|c| matches!(c, EngineCall::AttachEncoderVideo(_))), 0);

        let node = graph.encoders.iter().next().unwrap();
        assert!(node.video.is_none());
        assert!(node.audio.is_some());
    }

    #[test]
    fn test_encoder_without_bitrates_is_skipped() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![EncoderSpec {
                video_bitrate: 0,
                audio_bitrate: -1,
                outputs: vec![rtmp("silent")],
                ..Default::default()
            }],
            sources: vec![],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);
        result.unwrap();

        assert!(graph.encoders.is_empty());
        assert_eq!(
            journal.count(|c| matches!(
                c,
                EngineCall::CreateOutput { .. }
                    | EngineCall::CreateService { .. }
                    | EngineCall::StartOutput { .. }
            )),
            0
        );
        assert_eq!(engine.running_outputs(), 0);
    }

    #[test]
    fn test_empty_outputs_make_no_calls() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![EncoderSpec {
                video_bitrate: 2000,
                audio_bitrate: 128,
                outputs: vec![],
                ..Default::default()
            }],
            sources: vec![],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);
        result.unwrap();

        assert!(graph.encoders.is_empty());
        assert_eq!(
            journal.count(|c| matches!(
                c,
                EngineCall::CreateVideoEncoder { .. }
                    | EngineCall::CreateAudioEncoder { .. }
                    | EngineCall::CreateOutput { .. }
                    | EngineCall::CreateService { .. }
            )),
            0
        );
    }

    #[test]
    fn test_zero_geometry_keeps_engine_defaults() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![],
            sources: vec![SourceSpec {
                kind: "image_source".into(),
                scale: "stretch".into(),
                ..Default::default()
            }],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);
        result.unwrap();

        let defaults = TransformInfo::default();
        let info = journal
            .calls()
            .into_iter()
            .find_map(|call| match call {
                EngineCall::SetSceneItemInfo { info, .. } => Some(info),
                _ => None,
            })
            .unwrap();
        assert_eq!(info.pos, defaults.pos);
        assert_eq!(info.bounds, defaults.bounds);
        assert_eq!(info.bounds_type, BoundsType::Stretch);
        assert_eq!(graph.sources.len(), 1);
    }

    #[test]
    fn test_positive_geometry_overrides() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![],
            sources: vec![SourceSpec {
                kind: "image_source".into(),
                scale: "inner".into(),
                pos_x: 10,
                pos_y: 0,
                width: 320,
                height: 0,
                ..Default::default()
            }],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (_graph, result) = build(&mut engine, &config);
        result.unwrap();

        let info = journal
            .calls()
            .into_iter()
            .find_map(|call| match call {
                EngineCall::SetSceneItemInfo { info, .. } => Some(info),
                _ => None,
            })
            .unwrap();
        assert_eq!(info.pos, Vec2::new(10.0, 0.0));
        assert_eq!(info.bounds, Vec2::new(320.0, 0.0));
        assert_eq!(info.bounds_type, BoundsType::ScaleInner);
    }

    #[test]
    fn test_source_volume_and_settings() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![],
            sources: vec![SourceSpec {
                kind: "audio_line".into(),
                volume: 50,
                parameters: vec![Parameter::new("channel", ParamValue::Integer(2))],
                ..Default::default()
            }],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (_graph, result) = build(&mut engine, &config);
        result.unwrap();

        assert_eq!(
            journal.count(
                |c| matches!(c, EngineCall::SetSourceVolume { volume, .. } if *volume == 0.5)
            ),
            1
        );
        let settings = journal
            .calls()
            .into_iter()
            .find_map(|call| match call {
                EngineCall::CreateSource { id, settings, .. } if id == "audio_line" => {
                    Some(settings)
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.get_int("channel"), Some(2));
    }

    #[test]
    fn test_volume_failure_releases_source() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![],
            sources: vec![SourceSpec {
                kind: "audio_line".into(),
                volume: 80,
                ..Default::default()
            }],
        };

        let mut engine = RecordingEngine::with_failures(FailurePlan {
            fail_source_volume: true,
            ..Default::default()
        });
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);

        assert!(matches!(result, Err(BuildError::Source { index: 0, .. })));
        assert_eq!(journal.count(|c| matches!(c, EngineCall::ReleaseSource(_))), 1);
        assert!(graph.sources.is_empty());
        // Only the scene is left.
        assert_eq!(engine.outstanding_allocations(), 1);
    }

    #[test]
    fn test_video_rejection_is_fatal() {
        let config = Configuration {
            settings: Settings::default(),
            encoders: vec![],
            sources: vec![],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);

        assert!(matches!(result, Err(BuildError::Video(_))));
        assert!(graph.is_empty());
        assert_eq!(journal.count(|c| matches!(c, EngineCall::ResetAudio(_))), 0);
    }

    #[test]
    fn test_unsupported_output_stops_build() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![
                EncoderSpec {
                    video_bitrate: 2000,
                    outputs: vec![
                        OutputSpec {
                            kind: "unsupported_output".into(),
                            ..Default::default()
                        },
                        rtmp("never"),
                    ],
                    ..Default::default()
                },
                EncoderSpec {
                    video_bitrate: 2000,
                    outputs: vec![rtmp("second")],
                    ..Default::default()
                },
            ],
            sources: vec![SourceSpec {
                kind: "image_source".into(),
                ..Default::default()
            }],
        };

        let mut engine = RecordingEngine::new();
        let journal = engine.journal();
        let (graph, result) = build(&mut engine, &config);

        assert!(matches!(
            result,
            Err(BuildError::UnsupportedOutput { encoder: 0, ref kind })
                if kind == "unsupported_output"
        ));
        assert_eq!(journal.count(|c| matches!(c, EngineCall::CreateOutput { .. })), 0);
        assert_eq!(journal.count(|c| matches!(c, EngineCall::CreateVideoEncoder { .. })), 1);
        assert_eq!(journal.count(|c| matches!(c, EngineCall::SetOutputSource { .. })), 0);
        assert_eq!(graph.encoders.len(), 1);
        assert!(graph.sources.is_empty());
    }

    #[test]
    fn test_output_start_failure_keeps_handles() {
        let config = Configuration {
            settings: settings(),
            encoders: vec![EncoderSpec {
                video_bitrate: 2000,
                audio_bitrate: 128,
                outputs: vec![rtmp("abc")],
                ..Default::default()
            }],
            sources: vec![],
        };

        let mut engine = RecordingEngine::with_failures(FailurePlan {
            fail_output_start: true,
            ..Default::default()
        });
        let (graph, result) = build(&mut engine, &config);

        assert!(matches!(result, Err(BuildError::OutputStart { encoder: 0, output: 0, .. })));
        let node = graph.encoders.iter().next().unwrap();
        let output = node.outputs.iter().next().unwrap();
        assert_eq!(output.state, OutputState::ServiceBound);
        assert!(output.service.is_some());
        // scene, two encoders, output, service
        assert_eq!(engine.outstanding_allocations(), 5);
    }
}

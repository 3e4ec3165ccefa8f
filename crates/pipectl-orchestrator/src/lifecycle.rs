//! Lifecycle controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, error, info, instrument, warn};

use pipectl_config::Configuration;
use pipectl_engine::{EngineResult, RenderEngine};

use crate::builder::GraphBuilder;
use crate::error::{BuildError, LifecycleError};
use crate::events::{emit, LifecycleEvent};
use crate::graph::{EncoderNode, LiveGraph, OutputNode};
use crate::profiler::{ProfileReport, Profiler};
use crate::state::{BuildPhase, LifecycleState, ShutdownPhase};

/// Termination flag shared with the signal handler.
///
/// `request` is a single atomic store, so it is safe to call from any
/// thread or handler context.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the orchestrator to shut down.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// How often the wait loop checks the termination flag.
    pub poll_interval: Duration,

    /// Locale passed to engine startup.
    pub locale: String,

    /// Name the profiler reports under.
    pub profiler_root: String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(crate::DEFAULT_POLL_INTERVAL_MS),
            locale: crate::DEFAULT_LOCALE.to_string(),
            profiler_root: crate::PROFILER_ROOT.to_string(),
        }
    }
}

/// What shutdown released.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    pub sources_released: usize,
    pub outputs_stopped: usize,
    pub outputs_released: usize,
    pub services_released: usize,
    pub encoders_released: usize,
    pub scene_released: bool,

    /// Release calls the engine refused.
    pub release_failures: usize,

    /// Engine allocations still alive after shutdown.
    pub outstanding_allocations: u64,

    pub profile: Option<ProfileReport>,
}

/// Drives one configuration from build to teardown.
pub struct Orchestrator<E: RenderEngine> {
    engine: E,
    config: Option<Configuration>,
    graph: LiveGraph,
    state: LifecycleState,
    signal: ShutdownSignal,
    profiler: Profiler,
    options: OrchestratorOptions,
    event_tx: Option<Sender<LifecycleEvent>>,
    report: Option<ShutdownReport>,
}

impl<E: RenderEngine> Orchestrator<E> {
    /// Create an orchestrator with default options.
    pub fn new(engine: E, config: Configuration) -> Self {
        Self::with_options(engine, config, OrchestratorOptions::default())
    }

    pub fn with_options(engine: E, config: Configuration, options: OrchestratorOptions) -> Self {
        Self {
            engine,
            config: Some(config),
            graph: LiveGraph::new(),
            state: LifecycleState::Idle,
            signal: ShutdownSignal::new(),
            profiler: Profiler::new(options.profiler_root.clone()),
            options,
            event_tx: None,
            report: None,
        }
    }

    /// Send lifecycle events to `tx`.
    pub fn with_events(mut self, tx: Sender<LifecycleEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Flag to hand to a signal handler or another thread.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn graph(&self) -> &LiveGraph {
        &self.graph
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The configuration, until shutdown drops it.
    pub fn config(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    /// Report from the last shutdown, including one run after a failed build.
    pub fn shutdown_report(&self) -> Option<&ShutdownReport> {
        self.report.as_ref()
    }

    /// Build the pipeline.
    ///
    /// If any phase fails, everything created so far is released before the
    /// error is returned and the orchestrator ends up `Stopped`.
    #[instrument(name = "orchestrator_start", skip(self))]
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if !self.state.is_idle() {
            return Err(self.invalid("start"));
        }
        let Some(config) = self.config.take() else {
            return Err(self.invalid("start"));
        };

        info!("Building pipeline");
        self.profiler.start();

        let result = self.build(&config);
        self.config = Some(config);

        match result {
            Ok(()) => {
                self.transition_to(LifecycleState::Running);
                info!(
                    outputs = self.graph.started_output_count(),
                    sources = self.graph.sources.len(),
                    "Pipeline running"
                );
                Ok(())
            }
            Err(e) => {
                error!("Pipeline build failed: {}", e);
                let report = self.teardown();
                self.report = Some(report);
                Err(e.into())
            }
        }
    }

    fn build(&mut self, config: &Configuration) -> Result<(), BuildError> {
        let mut next = Some(BuildPhase::Startup);

        while let Some(phase) = next {
            self.transition_to(LifecycleState::Building { phase });
            self.emit(LifecycleEvent::BuildPhase(phase));
            self.profiler.enter(phase.name());

            GraphBuilder::new(&mut self.engine, config, &mut self.graph, &self.profiler)
                .locale(&self.options.locale)
                .events(self.event_tx.as_ref())
                .run_phase(phase)?;

            next = phase.next();
        }
        Ok(())
    }

    /// Block until shutdown is requested.
    pub fn wait_for_termination(&self) -> Result<(), LifecycleError> {
        if !self.state.is_running() {
            return Err(self.invalid("wait for termination"));
        }

        info!("Running, waiting for termination request");
        let ticker = crossbeam_channel::tick(self.options.poll_interval);
        while !self.signal.is_requested() {
            if ticker.recv().is_err() {
                break;
            }
        }

        info!("Termination requested");
        Ok(())
    }

    /// Release everything the build created.
    pub fn shutdown(&mut self) -> Result<ShutdownReport, LifecycleError> {
        if !self.state.is_running() {
            return Err(self.invalid("shut down"));
        }

        let report = self.teardown();
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Start, wait for a termination request, then shut down.
    pub fn run(&mut self) -> Result<ShutdownReport, LifecycleError> {
        self.start()?;
        self.wait_for_termination()?;
        self.shutdown()
    }

    #[instrument(name = "orchestrator_shutdown", skip(self))]
    fn teardown(&mut self) -> ShutdownReport {
        info!("Shutting down");
        let mut report = ShutdownReport::default();

        let mut next = Some(ShutdownPhase::ReleaseSources);
        while let Some(phase) = next {
            self.transition_to(LifecycleState::ShuttingDown { phase });
            self.emit(LifecycleEvent::ShutdownPhase(phase));
            if self.profiler.is_running() {
                self.profiler.enter(phase.name());
            }

            self.run_shutdown_phase(phase, &mut report);
            next = phase.next();
        }

        self.transition_to(LifecycleState::Stopped);
        report
    }

    fn run_shutdown_phase(&mut self, phase: ShutdownPhase, report: &mut ShutdownReport) {
        debug!("Shutdown phase: {}", phase.name());

        match phase {
            ShutdownPhase::ReleaseSources => self.release_sources(report),
            ShutdownPhase::ReleaseEncoders => self.release_encoders(report),
            ShutdownPhase::ReleaseScene => {
                if let Some(scene) = self.graph.scene.take() {
                    let result = self.engine.release_scene(scene);
                    let released = self.released("scene", result, report);
                    report.scene_released = released;
                }
            }
            ShutdownPhase::FlushProfiler => {
                self.profiler.stop();
                self.profiler.print();
                report.profile = Some(self.profiler.report());
            }
            ShutdownPhase::ReleaseConfig => {
                self.config = None;
            }
            ShutdownPhase::ReportLeaks => {
                report.outstanding_allocations = self.engine.outstanding_allocations();
                info!("Number of memory leaks: {}", report.outstanding_allocations);
            }
        }
    }

    fn release_sources(&mut self, report: &mut ShutdownReport) {
        let mut cursor = self.graph.sources.first();
        while let Some(key) = cursor {
            cursor = self.graph.sources.next(key);
            let Some(item) = self.graph.sources.remove(key) else {
                continue;
            };

            let result = self.engine.release_sceneitem(item);
            if self.released("scene item", result, report) {
                report.sources_released += 1;
            }
        }
    }

    fn release_encoders(&mut self, report: &mut ShutdownReport) {
        let mut cursor = self.graph.encoders.first();
        while let Some(key) = cursor {
            cursor = self.graph.encoders.next(key);
            if let Some(node) = self.graph.encoders.remove(key) {
                self.release_encoder_node(node, report);
            }
        }
    }

    fn release_encoder_node(&mut self, mut node: EncoderNode, report: &mut ShutdownReport) {
        let mut cursor = node.outputs.first();
        while let Some(key) = cursor {
            cursor = node.outputs.next(key);
            if let Some(output) = node.outputs.remove(key) {
                self.release_output(output, report);
            }
        }

        for encoder in [node.video.take(), node.audio.take()].into_iter().flatten() {
            let result = self.engine.release_encoder(encoder);
            if self.released("encoder", result, report) {
                report.encoders_released += 1;
            }
        }
    }

    fn release_output(&mut self, node: OutputNode, report: &mut ShutdownReport) {
        if node.is_started() {
            match self.engine.stop_output(&node.output) {
                Ok(()) => report.outputs_stopped += 1,
                Err(e) => warn!("Failed to stop output: {}", e),
            }
        }

        if let Some(service) = node.service {
            let result = self.engine.release_service(service);
            if self.released("service", result, report) {
                report.services_released += 1;
            }
        }

        let result = self.engine.release_output(node.output);
        if self.released("output", result, report) {
            report.outputs_released += 1;
        }
    }

    /// Account for one release call. Failures are logged and counted only.
    fn released(&self, what: &str, result: EngineResult<()>, report: &mut ShutdownReport) -> bool {
        match result {
            Ok(()) => {
                self.profiler.record_released();
                true
            }
            Err(e) => {
                warn!("Failed to release {}: {}", what, e);
                self.profiler.record_release_failure();
                report.release_failures += 1;
                false
            }
        }
    }

    fn transition_to(&mut self, new_state: LifecycleState) {
        let previous = std::mem::replace(&mut self.state, new_state);
        if previous == new_state {
            return;
        }

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );
        self.emit(LifecycleEvent::StateChanged {
            previous,
            current: new_state,
        });
    }

    fn invalid(&self, action: &'static str) -> LifecycleError {
        LifecycleError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        emit(self.event_tx.as_ref(), event);
    }
}

impl<E: RenderEngine> Drop for Orchestrator<E> {
    fn drop(&mut self) {
        if self.state.is_running() {
            warn!("Orchestrator dropped while running, shutting down");
            self.teardown();
        }
    }
}

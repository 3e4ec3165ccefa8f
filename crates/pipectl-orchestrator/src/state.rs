//! Orchestrator state machine types.

/// Lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, nothing built yet.
    #[default]
    Idle,

    /// Building the resource graph.
    Building {
        /// Current build phase.
        phase: BuildPhase,
    },

    /// Pipeline is live, waiting for a termination request.
    Running,

    /// Releasing resources.
    ShuttingDown {
        /// Current shutdown phase.
        phase: ShutdownPhase,
    },

    /// Everything has been released.
    Stopped,
}

impl LifecycleState {
    /// Returns true if the orchestrator has not started.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the graph is being built.
    pub fn is_building(&self) -> bool {
        matches!(self, Self::Building { .. })
    }

    /// Returns true if the pipeline is live.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if shutdown is in progress.
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, Self::ShuttingDown { .. })
    }

    /// Returns true if everything has been released.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Building { .. } => "Building",
            Self::Running => "Running",
            Self::ShuttingDown { .. } => "ShuttingDown",
            Self::Stopped => "Stopped",
        }
    }
}

/// Build phases, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    /// Starting the engine core and loading modules.
    Startup,

    /// Initializing the video subsystem.
    ResetVideo,

    /// Initializing the audio subsystem.
    ResetAudio,

    /// Creating the scene.
    CreateScene,

    /// Creating encoders and starting their outputs.
    CreateEncoders,

    /// Binding the scene to the video pipeline.
    BindScene,

    /// Creating sources and placing them in the scene.
    AddSources,
}

impl BuildPhase {
    /// All phases in order.
    pub const ALL: [BuildPhase; 7] = [
        Self::Startup,
        Self::ResetVideo,
        Self::ResetAudio,
        Self::CreateScene,
        Self::CreateEncoders,
        Self::BindScene,
        Self::AddSources,
    ];

    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Startup => Some(Self::ResetVideo),
            Self::ResetVideo => Some(Self::ResetAudio),
            Self::ResetAudio => Some(Self::CreateScene),
            Self::CreateScene => Some(Self::CreateEncoders),
            Self::CreateEncoders => Some(Self::BindScene),
            Self::BindScene => Some(Self::AddSources),
            Self::AddSources => None,
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::Startup => "Starting engine",
            Self::ResetVideo => "Initializing video",
            Self::ResetAudio => "Initializing audio",
            Self::CreateScene => "Creating scene",
            Self::CreateEncoders => "Creating encoders",
            Self::BindScene => "Binding scene",
            Self::AddSources => "Adding sources",
        }
    }
}

/// Shutdown phases, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownPhase {
    /// Releasing scene items.
    ReleaseSources,

    /// Stopping outputs and releasing encoders.
    ReleaseEncoders,

    /// Releasing the scene.
    ReleaseScene,

    /// Stopping and reporting the profiler.
    FlushProfiler,

    /// Dropping the configuration document.
    ReleaseConfig,

    /// Reporting outstanding engine allocations.
    ReportLeaks,
}

impl ShutdownPhase {
    /// All phases in order.
    pub const ALL: [ShutdownPhase; 6] = [
        Self::ReleaseSources,
        Self::ReleaseEncoders,
        Self::ReleaseScene,
        Self::FlushProfiler,
        Self::ReleaseConfig,
        Self::ReportLeaks,
    ];

    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::ReleaseSources => Some(Self::ReleaseEncoders),
            Self::ReleaseEncoders => Some(Self::ReleaseScene),
            Self::ReleaseScene => Some(Self::FlushProfiler),
            Self::FlushProfiler => Some(Self::ReleaseConfig),
            Self::ReleaseConfig => Some(Self::ReportLeaks),
            Self::ReportLeaks => None,
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::ReleaseSources => "Releasing sources",
            Self::ReleaseEncoders => "Releasing encoders",
            Self::ReleaseScene => "Releasing scene",
            Self::FlushProfiler => "Flushing profiler",
            Self::ReleaseConfig => "Releasing configuration",
            Self::ReportLeaks => "Reporting leaks",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_phases_chain() {
        let mut phase = BuildPhase::ALL[0];
        let mut chain = vec![phase];
        while let Some(next) = phase.next() {
            chain.push(next);
            phase = next;
        }
        assert_eq!(chain, BuildPhase::ALL);
    }

    #[test]
    fn test_shutdown_phases_chain() {
        let mut phase = ShutdownPhase::ALL[0];
        let mut chain = vec![phase];
        while let Some(next) = phase.next() {
            chain.push(next);
            phase = next;
        }
        assert_eq!(chain, ShutdownPhase::ALL);
    }

    #[test]
    fn test_state_predicates() {
        assert!(LifecycleState::default().is_idle());
        assert!(LifecycleState::Building {
            phase: BuildPhase::Startup
        }
        .is_building());
        assert_eq!(LifecycleState::Running.name(), "Running");
        assert!(LifecycleState::ShuttingDown {
            phase: ShutdownPhase::ReportLeaks
        }
        .is_shutting_down());
    }
}

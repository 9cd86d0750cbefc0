//! Typed progress reporting for the aggregation pipeline
//!
//! Each stage reports a stage-local percentage; the stage maps it onto a
//! fixed global range so overall progress is monotonically non-decreasing
//! across the whole run.

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Bids,
    ProjectDetails,
    Threads,
    Payments,
    Clients,
    Merge,
    Complete,
}

impl Stage {
    /// Global progress range this stage occupies
    pub fn range(&self) -> (f32, f32) {
        match self {
            Self::Bids => (10.0, 25.0),
            Self::ProjectDetails => (30.0, 50.0),
            Self::Threads => (50.0, 70.0),
            Self::Payments => (70.0, 85.0),
            Self::Clients => (85.0, 95.0),
            Self::Merge => (95.0, 100.0),
            Self::Complete => (100.0, 100.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bids => "bids",
            Self::ProjectDetails => "project details",
            Self::Threads => "threads",
            Self::Payments => "payments",
            Self::Clients => "clients",
            Self::Merge => "merge",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One progress step emitted by the pipeline
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: Stage,

    /// Overall pipeline progress in [0, 100]
    pub percent: f32,

    pub message: String,
}

/// Observer receiving pipeline progress events
///
/// Events form a finite, non-restartable sequence per run; the final event
/// is always `Stage::Complete` at 100%.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// Observer that discards all events
#[derive(Debug, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_progress(&self, _event: ProgressEvent) {}
}

/// Handle a stage uses to report its local progress
pub struct StageProgress<'a> {
    observer: &'a dyn ProgressObserver,
    stage: Stage,
}

impl<'a> StageProgress<'a> {
    pub fn new(observer: &'a dyn ProgressObserver, stage: Stage) -> Self {
        Self { observer, stage }
    }

    /// Reports stage-local progress, mapped onto the stage's global range
    pub fn report(&self, local_percent: f32, message: impl Into<String>) {
        let (start, end) = self.stage.range();
        let local = local_percent.clamp(0.0, 100.0);
        let percent = start + (end - start) * local / 100.0;

        self.observer.on_progress(ProgressEvent {
            stage: self.stage,
            percent,
            message: message.into(),
        });
    }
}

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod decision;
pub mod export;
pub mod loader;
pub mod metrics;
pub mod night;
pub mod rng;
pub mod stepper;
pub mod subject;
pub mod synth;

pub use config::{SimConfig, TieBreak};
pub use coordinator::{CoordinatorInitError, RunError, SimulationCoordinator};
pub use decision::{Decision, NightDecisionEngine};
pub use metrics::{RoundMetrics, RunStatus, RunSummary, SkippedSubject, SubjectFrame};
pub use night::{ActionEffect, ActionEffects, NightRecord, NightStatus};
pub use stepper::{PendingAdvance, SubjectStepper};
pub use subject::{DecisionResult, SubjectInput, SubjectState, SubjectTrajectory};

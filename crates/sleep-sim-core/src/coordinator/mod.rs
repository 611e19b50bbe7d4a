use crate::config::{SimConfig, SimConfigError};
use crate::decision::NightDecisionEngine;
use crate::metrics::{
    action_distribution, collect_round_metrics, collect_subject_frame, RoundMetrics, RunStatus,
    RunSummary, SkippedSubject, SubjectFrame,
};
use crate::stepper::{PendingAdvance, SubjectStepper};
use crate::subject::{DecisionResult, SubjectInput, SubjectTrajectory};
use rayon::prelude::*;
use std::{error::Error, fmt};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorInitError {
    Config(SimConfigError),
}

impl fmt::Display for CoordinatorInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorInitError::Config(e) => write!(f, "{}", e),
        }
    }
}

impl From<SimConfigError> for CoordinatorInitError {
    fn from(err: SimConfigError) -> Self {
        CoordinatorInitError::Config(err)
    }
}

impl Error for CoordinatorInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CoordinatorInitError::Config(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    TooManyRounds { max: usize, actual: usize },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::TooManyRounds { max, actual } => {
                write!(f, "max_rounds ({actual}) exceeds supported maximum ({max})")
            }
        }
    }
}

impl Error for RunError {}

/// Owns the cohort and moves every subject forward one night per round.
///
/// Rounds are two-phase: all subjects are planned from the state at the
/// start of the round, then every plan is committed. No subject can observe
/// a peer's update from the same round.
pub struct SimulationCoordinator {
    subjects: Vec<SubjectTrajectory>,
    config: SimConfig,
    stepper: SubjectStepper,
    round: usize,
    skipped: Vec<SkippedSubject>,
    /// Reporters for the current round, rebuilt from scratch after each one.
    report: RoundMetrics,
    samples: Vec<RoundMetrics>,
    subject_frames: Vec<SubjectFrame>,
}

impl SimulationCoordinator {
    pub const MAX_ROUNDS: usize = crate::constants::MAX_ROUNDS;

    /// Create a coordinator with an empty cohort.
    pub fn new(config: SimConfig) -> Result<Self, CoordinatorInitError> {
        config.validate()?;
        let stepper = SubjectStepper::new(NightDecisionEngine::from_config(&config));
        let mut coordinator = Self {
            subjects: Vec::new(),
            config,
            stepper,
            round: 0,
            skipped: Vec::new(),
            report: RoundMetrics::default(),
            samples: Vec::new(),
            subject_frames: Vec::new(),
        };
        coordinator.reset_reporting();
        Ok(coordinator)
    }

    pub fn with_subjects(
        subjects: Vec<SubjectInput>,
        config: SimConfig,
    ) -> Result<Self, CoordinatorInitError> {
        let mut coordinator = Self::new(config)?;
        coordinator.initialize(subjects);
        Ok(coordinator)
    }

    /// Replace the cohort. Subjects without nights are skipped and reported;
    /// the rest are loaded in the given order. Returns the number loaded.
    pub fn initialize(&mut self, subjects: Vec<SubjectInput>) -> usize {
        self.subjects.clear();
        self.skipped.clear();
        for input in subjects {
            let subject_id = input.subject_id.clone();
            match SubjectTrajectory::new(input) {
                Ok(trajectory) => self.subjects.push(trajectory),
                Err(e) => {
                    warn!(subject_id = %subject_id, error = %e, "skipping malformed subject");
                    self.skipped.push(SkippedSubject {
                        source: subject_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        self.reset_reporting();
        self.subjects.len()
    }

    /// Carry skips found upstream (e.g. by the file loader) into the summary.
    pub fn record_skipped(&mut self, skipped: impl IntoIterator<Item = SkippedSubject>) {
        self.skipped.extend(skipped);
    }

    fn reset_reporting(&mut self) {
        self.round = 0;
        self.samples.clear();
        self.subject_frames.clear();
        self.report = collect_round_metrics(0, 0, &self.subjects);
        self.sample_current_round();
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn subjects(&self) -> &[SubjectTrajectory] {
        &self.subjects
    }

    pub fn subject(&self, subject_id: &str) -> Option<&SubjectTrajectory> {
        self.subjects.iter().find(|s| s.subject_id() == subject_id)
    }

    pub fn skipped(&self) -> &[SkippedSubject] {
        &self.skipped
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn report(&self) -> &RoundMetrics {
        &self.report
    }

    pub fn samples(&self) -> &[RoundMetrics] {
        &self.samples
    }

    pub fn subject_frames(&self) -> &[SubjectFrame] {
        &self.subject_frames
    }

    pub fn average_primary_index(&self) -> f64 {
        self.report.average_primary_index
    }

    pub fn average_sleep_debt(&self) -> f64 {
        self.report.average_sleep_debt
    }

    /// True once every subject has consumed all of its nights. An empty
    /// cohort is trivially complete.
    pub fn is_complete(&self) -> bool {
        self.subjects.iter().all(SubjectTrajectory::is_terminal)
    }

    /// Flattened history: subjects in cohort order, nights in the order
    /// they were simulated.
    pub fn results(&self) -> Vec<DecisionResult> {
        self.subjects
            .iter()
            .flat_map(|s| s.history().iter().cloned())
            .collect()
    }

    fn plan_round(&self) -> Vec<Option<PendingAdvance>> {
        let stepper = &self.stepper;
        if self.config.parallel_planning && self.subjects.len() > 1 {
            self.subjects.par_iter().map(|s| stepper.plan(s)).collect()
        } else {
            self.subjects.iter().map(|s| stepper.plan(s)).collect()
        }
    }

    fn sample_current_round(&mut self) {
        self.samples.push(self.report.clone());
        if self.config.collect_subject_frames {
            self.subject_frames
                .push(collect_subject_frame(self.round, &self.subjects));
        }
    }

    /// Advance every non-terminal subject by one night and rebuild the
    /// reporters.
    pub fn step_round(&mut self) -> RoundMetrics {
        let plans = self.plan_round();

        let mut decisions = 0usize;
        for (subject, pending) in self.subjects.iter_mut().zip(plans) {
            if let Some(pending) = pending {
                self.stepper.commit(subject, pending);
                decisions += 1;
            }
        }

        self.round = self.round.saturating_add(1);
        self.report = collect_round_metrics(self.round, decisions, &self.subjects);
        if self.round.is_multiple_of(self.config.sample_every) {
            self.sample_current_round();
        }
        debug!(
            round = self.round,
            decisions,
            active = self.report.active_count,
            average_primary_index = self.report.average_primary_index,
            average_sleep_debt = self.report.average_sleep_debt,
            "round committed"
        );
        self.report.clone()
    }

    /// Step until every subject is done or `max_rounds` rounds have run in
    /// this call. Hitting the cap is reported in the summary status, with the
    /// results so far.
    pub fn run(&mut self, max_rounds: usize) -> Result<RunSummary, RunError> {
        if max_rounds > Self::MAX_ROUNDS {
            return Err(RunError::TooManyRounds {
                max: Self::MAX_ROUNDS,
                actual: max_rounds,
            });
        }
        info!(
            subjects = self.subjects.len(),
            skipped = self.skipped.len(),
            max_rounds,
            "starting simulation"
        );

        let mut executed = 0usize;
        while !self.is_complete() && executed < max_rounds {
            self.step_round();
            executed += 1;
        }

        if self.samples.last().map(|m| m.round) != Some(self.round) {
            self.sample_current_round();
        }

        let status = if self.is_complete() {
            info!(rounds = self.round, "simulation finished");
            RunStatus::Completed
        } else {
            warn!(
                rounds = self.round,
                max_rounds,
                active = self.report.active_count,
                "round cap reached before every subject finished"
            );
            RunStatus::RoundCapExceeded
        };

        let results = self.results();
        Ok(RunSummary {
            schema_version: 1,
            status,
            rounds: self.round,
            max_rounds,
            subject_count: self.subjects.len(),
            skipped_subjects: self.skipped.clone(),
            final_metrics: self.report.clone(),
            samples: self.samples.clone(),
            subject_frames: self.subject_frames.clone(),
            action_counts: action_distribution(&results),
            results,
        })
    }

    /// Run with the configured round cap.
    pub fn run_to_completion(&mut self) -> Result<RunSummary, RunError> {
        self.run(self.config.max_rounds)
    }
}

#[cfg(test)]
mod tests;

use crate::subject::{DecisionResult, SubjectTrajectory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cohort-level reporters for one round. Round 0 is the state right after
/// initialization.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RoundMetrics {
    pub round: usize,
    pub average_primary_index: f64,
    pub average_stability_index: f64,
    pub average_sleep_debt: f64,
    pub subject_count: usize,
    pub active_count: usize,
    pub completed_count: usize,
    pub decisions_this_round: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubjectSnapshot {
    pub subject_id: String,
    pub primary_index: f64,
    pub stability_index: f64,
    pub sleep_debt: i64,
    pub cursor: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubjectFrame {
    pub round: usize,
    pub subjects: Vec<SubjectSnapshot>,
}

/// How many nights ended with each action. `action: None` counts nights with
/// no candidate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionCount {
    pub action: Option<String>,
    pub count: usize,
}

/// A subject or source file left out of the run, with the reason.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedSubject {
    pub source: String,
    pub reason: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every subject consumed all of its nights.
    Completed,
    /// The round cap was reached first; results so far remain valid.
    RoundCapExceeded,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub status: RunStatus,
    pub rounds: usize,
    pub max_rounds: usize,
    pub subject_count: usize,
    #[serde(default)]
    pub skipped_subjects: Vec<SkippedSubject>,
    pub final_metrics: RoundMetrics,
    pub samples: Vec<RoundMetrics>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_frames: Vec<SubjectFrame>,
    #[serde(default)]
    pub action_counts: Vec<ActionCount>,
    #[serde(default)]
    pub results: Vec<DecisionResult>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Compute the reporters from scratch over every subject, terminal ones
/// included.
pub fn collect_round_metrics(
    round: usize,
    decisions_this_round: usize,
    subjects: &[SubjectTrajectory],
) -> RoundMetrics {
    let mut primary_sum = 0.0f64;
    let mut stability_sum = 0.0f64;
    let mut debt_sum = 0i64;
    let mut completed = 0usize;

    for subject in subjects {
        let state = subject.state();
        primary_sum += state.primary_index;
        stability_sum += state.stability_index;
        debt_sum += state.sleep_debt;
        if subject.is_terminal() {
            completed += 1;
        }
    }

    let n = subjects.len();
    RoundMetrics {
        round,
        average_primary_index: mean(primary_sum, n),
        average_stability_index: mean(stability_sum, n),
        average_sleep_debt: mean(debt_sum as f64, n),
        subject_count: n,
        active_count: n - completed,
        completed_count: completed,
        decisions_this_round,
    }
}

pub fn collect_subject_frame(round: usize, subjects: &[SubjectTrajectory]) -> SubjectFrame {
    let subjects = subjects
        .iter()
        .map(|s| {
            let state = s.state();
            SubjectSnapshot {
                subject_id: state.subject_id.clone(),
                primary_index: state.primary_index,
                stability_index: state.stability_index,
                sleep_debt: state.sleep_debt,
                cursor: state.cursor,
            }
        })
        .collect();
    SubjectFrame { round, subjects }
}

/// Count chosen actions, no-action nights first, then by action name.
pub fn action_distribution(results: &[DecisionResult]) -> Vec<ActionCount> {
    let mut counts: BTreeMap<Option<&str>, usize> = BTreeMap::new();
    for result in results {
        *counts.entry(result.chosen_action.as_deref()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(action, count)| ActionCount {
            action: action.map(str::to_string),
            count,
        })
        .collect()
}

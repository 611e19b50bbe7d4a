use crate::night::{NightRecord, NightStatus};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Record set for one subject as delivered by a data source.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubjectInput {
    pub subject_id: String,
    pub nights: Vec<NightRecord>,
}

impl SubjectInput {
    pub fn new(subject_id: impl Into<String>, nights: Vec<NightRecord>) -> Self {
        Self {
            subject_id: subject_id.into(),
            nights,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubjectState {
    pub subject_id: String,
    pub primary_index: f64,
    pub stability_index: f64,
    pub sleep_debt: i64,
    /// Index of the next unconsumed night.
    pub cursor: usize,
}

/// Outcome of one simulated night.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionResult {
    pub subject_id: String,
    pub night_index: String,
    pub chosen_action: Option<String>,
    #[serde(rename = "resulting_CSI")]
    pub resulting_primary: f64,
    #[serde(rename = "resulting_CStab")]
    pub resulting_stability: f64,
    pub sleep_debt: i64,
    pub night_status: NightStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectDataError {
    NoNights { subject_id: String },
}

impl fmt::Display for SubjectDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectDataError::NoNights { subject_id } => {
                write!(f, "subject {subject_id} has no nights")
            }
        }
    }
}

impl Error for SubjectDataError {}

/// A subject's nights, evolving state and history log.
#[derive(Clone, Debug)]
pub struct SubjectTrajectory {
    // Fields are private so the cursor invariant and the append-only history
    // can only be changed through the stepper.
    state: SubjectState,
    nights: Vec<NightRecord>,
    history: Vec<DecisionResult>,
}

impl SubjectTrajectory {
    /// Seed a trajectory from the first night's declared starting metrics.
    pub fn new(input: SubjectInput) -> Result<Self, SubjectDataError> {
        let SubjectInput { subject_id, nights } = input;
        let Some(first) = nights.first() else {
            return Err(SubjectDataError::NoNights { subject_id });
        };
        let state = SubjectState {
            primary_index: first.initial_primary.unwrap_or(0.0),
            stability_index: first.initial_stability.unwrap_or(0.0),
            subject_id,
            sleep_debt: 0,
            cursor: 0,
        };
        let history = Vec::with_capacity(nights.len());
        Ok(Self {
            state,
            nights,
            history,
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.state.subject_id
    }

    pub fn state(&self) -> &SubjectState {
        &self.state
    }

    pub fn nights(&self) -> &[NightRecord] {
        &self.nights
    }

    pub fn history(&self) -> &[DecisionResult] {
        &self.history
    }

    /// The next unconsumed night, or `None` once terminal.
    pub fn current_night(&self) -> Option<&NightRecord> {
        self.nights.get(self.state.cursor)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.cursor >= self.nights.len()
    }

    pub fn remaining_nights(&self) -> usize {
        self.nights.len().saturating_sub(self.state.cursor)
    }

    pub(crate) fn state_mut(&mut self) -> &mut SubjectState {
        &mut self.state
    }

    pub(crate) fn record(&mut self, result: DecisionResult) {
        self.history.push(result);
    }
}

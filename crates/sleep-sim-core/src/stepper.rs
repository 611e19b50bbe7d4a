use crate::decision::{Decision, NightDecisionEngine};
use crate::night::NightStatus;
use crate::subject::{DecisionResult, SubjectTrajectory};

/// Everything needed to commit one night, computed without mutating the
/// subject.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingAdvance {
    /// Cursor the plan was computed from.
    pub cursor: usize,
    pub night_index: String,
    pub night_status: NightStatus,
    pub decision: Decision,
}

/// Advances a subject by exactly one night.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubjectStepper {
    engine: NightDecisionEngine,
}

impl SubjectStepper {
    pub fn new(engine: NightDecisionEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &NightDecisionEngine {
        &self.engine
    }

    /// Decide the next night from the subject's current state. Returns
    /// `None` once every night has been consumed.
    pub fn plan(&self, trajectory: &SubjectTrajectory) -> Option<PendingAdvance> {
        let night = trajectory.current_night()?;
        let decision = self.engine.choose(trajectory.state(), &night.action_effects);
        Some(PendingAdvance {
            cursor: trajectory.state().cursor,
            night_index: night.night_index.clone(),
            night_status: night.night_status.clone(),
            decision,
        })
    }

    /// Apply a plan: move both indices by the chosen deltas, settle sleep
    /// debt from the night status, append the result and move the cursor.
    ///
    /// # Panics
    ///
    /// Panics if `pending` was planned from a different cursor than the
    /// subject's current one.
    pub fn commit(
        &self,
        trajectory: &mut SubjectTrajectory,
        pending: PendingAdvance,
    ) -> DecisionResult {
        assert_eq!(
            pending.cursor,
            trajectory.state().cursor,
            "stale advance for subject {}",
            trajectory.subject_id()
        );
        let PendingAdvance {
            night_index,
            night_status,
            decision,
            ..
        } = pending;

        let state = trajectory.state_mut();
        state.primary_index += decision.delta_primary;
        state.stability_index += decision.delta_stability;
        state.sleep_debt += night_status.debt_delta();
        state.cursor += 1;

        let result = DecisionResult {
            subject_id: state.subject_id.clone(),
            night_index,
            chosen_action: decision.action,
            resulting_primary: state.primary_index,
            resulting_stability: state.stability_index,
            sleep_debt: state.sleep_debt,
            night_status,
        };
        trajectory.record(result.clone());
        result
    }

    /// Plan and commit in one call. A terminal subject is left untouched.
    pub fn advance(&self, trajectory: &mut SubjectTrajectory) -> Option<DecisionResult> {
        let pending = self.plan(trajectory)?;
        Some(self.commit(trajectory, pending))
    }
}

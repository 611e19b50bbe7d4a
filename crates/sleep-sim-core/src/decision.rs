use crate::config::{SimConfig, TieBreak};
use crate::night::ActionEffects;
use crate::subject::SubjectState;

/// Action picked for one night together with the deltas to apply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decision {
    /// `None` when the night offered no candidate.
    pub action: Option<String>,
    pub delta_primary: f64,
    pub delta_stability: f64,
    /// Distance from the predicted point to the target, when an action was chosen.
    pub predicted_distance: Option<f64>,
}

impl Decision {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Single-step greedy chooser: every candidate is scored by the Euclidean
/// distance of its predicted point to the target and the closest one wins.
///
/// Future nights are never consulted. Ties go to the first candidate in the
/// configured evaluation order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NightDecisionEngine {
    target: (f64, f64),
    tie_break: TieBreak,
}

impl Default for NightDecisionEngine {
    fn default() -> Self {
        Self::new(
            (
                crate::constants::TARGET_PRIMARY,
                crate::constants::TARGET_STABILITY,
            ),
            TieBreak::default(),
        )
    }
}

impl NightDecisionEngine {
    pub fn new(target: (f64, f64), tie_break: TieBreak) -> Self {
        Self { target, tie_break }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.target(), config.tie_break)
    }

    pub fn target(&self) -> (f64, f64) {
        self.target
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn distance_to_target(&self, primary: f64, stability: f64) -> f64 {
        let dp = primary - self.target.0;
        let ds = stability - self.target.1;
        (dp * dp + ds * ds).sqrt()
    }

    pub fn choose(&self, state: &SubjectState, effects: &ActionEffects) -> Decision {
        let mut best = Decision::none();
        let mut min_distance = f64::INFINITY;

        for (name, effect) in effects.ordered(self.tie_break) {
            let distance = self.distance_to_target(
                state.primary_index + effect.delta_primary,
                state.stability_index + effect.delta_stability,
            );
            // Strict comparison: the first candidate at the minimum is kept,
            // and NaN distances never win.
            if distance < min_distance {
                min_distance = distance;
                best = Decision {
                    action: Some(name.to_string()),
                    delta_primary: effect.delta_primary,
                    delta_stability: effect.delta_stability,
                    predicted_distance: Some(distance),
                };
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::night::ActionEffect;
    use proptest::prelude::*;

    fn state_at(primary: f64, stability: f64) -> SubjectState {
        SubjectState {
            subject_id: "s".to_string(),
            primary_index: primary,
            stability_index: stability,
            sleep_debt: 0,
            cursor: 0,
        }
    }

    fn effects(entries: &[(&str, f64, f64)]) -> ActionEffects {
        entries
            .iter()
            .map(|&(name, dp, ds)| (name, ActionEffect::new(dp, ds)))
            .collect()
    }

    #[test]
    fn picks_candidate_closest_to_target() {
        let engine = NightDecisionEngine::default();
        let decision = engine.choose(
            &state_at(0.0, 0.0),
            &effects(&[("A", 0.5, 0.3), ("B", 0.1, 0.1)]),
        );
        assert_eq!(decision.action.as_deref(), Some("A"));
        assert_eq!((decision.delta_primary, decision.delta_stability), (0.5, 0.3));
        let distance = decision.predicted_distance.expect("distance for chosen action");
        assert!((distance - 0.74f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_candidates_choose_nothing() {
        let decision = NightDecisionEngine::default().choose(&state_at(0.2, 0.4), &ActionEffects::new());
        assert_eq!(decision, Decision::none());
    }

    #[test]
    fn tie_goes_to_first_in_insertion_order() {
        let engine = NightDecisionEngine::default();
        let decision = engine.choose(
            &state_at(0.0, 0.0),
            &effects(&[("zeta", 0.5, 0.0), ("alpha", 0.0, 0.5)]),
        );
        assert_eq!(decision.action.as_deref(), Some("zeta"));
    }

    #[test]
    fn tie_goes_to_first_name_in_lexicographic_order() {
        let engine = NightDecisionEngine::new((1.0, 1.0), TieBreak::Lexicographic);
        let decision = engine.choose(
            &state_at(0.0, 0.0),
            &effects(&[("zeta", 0.5, 0.0), ("alpha", 0.0, 0.5)]),
        );
        assert_eq!(decision.action.as_deref(), Some("alpha"));
    }

    #[test]
    fn overshooting_candidate_loses_to_closer_one() {
        let engine = NightDecisionEngine::default();
        let decision = engine.choose(
            &state_at(0.9, 0.9),
            &effects(&[("big", 1.0, 1.0), ("small", 0.05, 0.05)]),
        );
        assert_eq!(decision.action.as_deref(), Some("small"));
    }

    #[test]
    fn nan_candidate_is_never_chosen() {
        let engine = NightDecisionEngine::default();
        let decision = engine.choose(
            &state_at(0.0, 0.0),
            &effects(&[("broken", f64::NAN, 0.0), ("ok", 0.1, 0.1)]),
        );
        assert_eq!(decision.action.as_deref(), Some("ok"));
    }

    #[test]
    fn custom_target_is_respected() {
        let engine = NightDecisionEngine::new((0.0, 0.0), TieBreak::Insertion);
        let decision = engine.choose(
            &state_at(0.5, 0.5),
            &effects(&[("up", 0.2, 0.2), ("down", -0.4, -0.4)]),
        );
        assert_eq!(decision.action.as_deref(), Some("down"));
    }

    #[test]
    fn from_config_carries_target_and_tie_break() {
        let config = SimConfig {
            target_primary: 0.8,
            target_stability: 0.6,
            tie_break: TieBreak::Lexicographic,
            ..SimConfig::default()
        };
        let engine = NightDecisionEngine::from_config(&config);
        assert_eq!(engine.target(), (0.8, 0.6));
        assert_eq!(engine.tie_break(), TieBreak::Lexicographic);
        assert_eq!(NightDecisionEngine::default().target(), (1.0, 1.0));
        assert_eq!(NightDecisionEngine::default().tie_break(), TieBreak::Insertion);
    }

    proptest! {
        #[test]
        fn proptest_chosen_candidate_is_never_beaten(
            primary in -2.0f64..2.0,
            stability in -2.0f64..2.0,
            deltas in proptest::collection::vec((-1.0f64..1.0, -1.0f64..1.0), 1..8),
        ) {
            let engine = NightDecisionEngine::default();
            let candidates: ActionEffects = deltas
                .iter()
                .enumerate()
                .map(|(i, &(dp, ds))| (format!("a{i}"), ActionEffect::new(dp, ds)))
                .collect();
            let decision = engine.choose(&state_at(primary, stability), &candidates);
            let chosen = decision.action.clone().expect("non-empty set must choose");
            let chosen_distance = decision.predicted_distance.expect("distance recorded");
            let mut first_at_min = None;
            for (name, effect) in candidates.iter() {
                let d = engine.distance_to_target(
                    primary + effect.delta_primary,
                    stability + effect.delta_stability,
                );
                prop_assert!(chosen_distance <= d);
                if d == chosen_distance && first_at_min.is_none() {
                    first_at_min = Some(name.to_string());
                }
            }
            prop_assert_eq!(Some(chosen), first_at_min);
        }
    }
}

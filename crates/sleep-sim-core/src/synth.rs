use crate::night::{ActionEffect, ActionEffects, NightRecord, NightStatus};
use crate::rng::derive_subject_rng;
use crate::subject::SubjectInput;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Intervention names used for generated cohorts.
pub const ACTION_CATALOGUE: [&str; 6] = [
    "sleep_hygiene",
    "light_therapy",
    "caffeine_cut",
    "exercise",
    "meditation",
    "melatonin",
];

/// Shape of a generated cohort.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CohortSpec {
    pub num_subjects: usize,
    pub nights_per_subject: usize,
    /// Candidates per night, capped at the catalogue size.
    pub actions_per_night: usize,
    pub seed: u64,
}

impl Default for CohortSpec {
    fn default() -> Self {
        Self {
            num_subjects: 10,
            nights_per_subject: 30,
            actions_per_night: 3,
            seed: 42,
        }
    }
}

fn random_status<R: Rng>(rng: &mut R) -> NightStatus {
    match rng.random_range(0..3) {
        0 => NightStatus::Good,
        1 => NightStatus::Moderate,
        _ => NightStatus::Bad,
    }
}

fn random_effects<R: Rng>(rng: &mut R, count: usize) -> ActionEffects {
    let start = rng.random_range(0..ACTION_CATALOGUE.len());
    (0..count.min(ACTION_CATALOGUE.len()))
        .map(|i| {
            let name = ACTION_CATALOGUE[(start + i) % ACTION_CATALOGUE.len()];
            let effect = ActionEffect::new(
                rng.random_range(-0.15..0.25),
                rng.random_range(-0.15..0.25),
            );
            (name, effect)
        })
        .collect()
}

/// Build a deterministic synthetic cohort. Subject ids are zero-padded
/// indices starting at `01`, like the study's file naming. A night draws
/// an empty action set one time in ten.
pub fn generate_cohort(spec: &CohortSpec) -> Vec<SubjectInput> {
    (0..spec.num_subjects)
        .map(|idx| {
            let mut rng = derive_subject_rng(spec.seed, idx);
            let nights = (0..spec.nights_per_subject)
                .map(|n| {
                    let status = random_status(&mut rng);
                    let effects = if rng.random_bool(0.1) {
                        ActionEffects::new()
                    } else {
                        random_effects(&mut rng, spec.actions_per_night)
                    };
                    let record = NightRecord::new(format!("night_{}", n + 1), status, effects);
                    if n == 0 {
                        let primary = rng.random_range(0.0..0.6);
                        let stability = rng.random_range(0.0..0.6);
                        record.with_initial_state(primary, stability)
                    } else {
                        record
                    }
                })
                .collect();
            SubjectInput::new(format!("{:02}", idx + 1), nights)
        })
        .collect()
}

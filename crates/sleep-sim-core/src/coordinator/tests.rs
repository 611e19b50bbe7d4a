use super::*;
use crate::night::{ActionEffect, ActionEffects, NightRecord, NightStatus};
use crate::synth::{generate_cohort, CohortSpec};

fn night(label: &str, status: NightStatus, entries: &[(&str, f64, f64)]) -> NightRecord {
    let effects: ActionEffects = entries
        .iter()
        .map(|&(name, dp, ds)| (name, ActionEffect::new(dp, ds)))
        .collect();
    NightRecord::new(label, status, effects)
}

fn plain_subject(id: &str, statuses: &[NightStatus]) -> SubjectInput {
    let nights = statuses
        .iter()
        .enumerate()
        .map(|(i, s)| night(&format!("n{i}"), s.clone(), &[("rest", 0.1, 0.05)]))
        .collect();
    SubjectInput::new(id, nights)
}

fn make_coordinator(subjects: Vec<SubjectInput>) -> SimulationCoordinator {
    SimulationCoordinator::with_subjects(subjects, SimConfig::default())
        .expect("default config should be valid")
}

#[test]
fn two_night_scenario_runs_to_completion() {
    let subject = SubjectInput::new(
        "01",
        vec![
            night("n1", NightStatus::Bad, &[("A", 0.5, 0.3), ("B", 0.1, 0.1)]),
            night("n2", NightStatus::Moderate, &[]),
        ],
    );
    let mut coordinator = make_coordinator(vec![subject]);
    let summary = coordinator.run(1000).expect("cap within limits");

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.rounds, 2);
    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.results[0].chosen_action.as_deref(), Some("A"));
    assert_eq!(summary.results[0].sleep_debt, 1);
    assert_eq!(summary.results[1].chosen_action, None);
    assert_eq!(summary.results[1].resulting_primary, 0.5);
    assert_eq!(summary.results[1].resulting_stability, 0.3);

    let state = coordinator.subject("01").expect("subject loaded").state();
    assert_eq!(state.cursor, 2);
    assert_eq!(state.sleep_debt, 1);
}

#[test]
fn empty_actions_every_night_only_move_debt() {
    let nights = [NightStatus::Good, NightStatus::Bad, NightStatus::Good]
        .into_iter()
        .enumerate()
        .map(|(i, s)| night(&format!("n{i}"), s, &[]).with_initial_state(0.4, 0.2))
        .collect();
    let mut coordinator = make_coordinator(vec![SubjectInput::new("01", nights)]);
    let summary = coordinator.run(10).expect("cap within limits");
    for result in &summary.results {
        assert_eq!(result.resulting_primary, 0.4);
        assert_eq!(result.resulting_stability, 0.2);
    }
    let debts: Vec<i64> = summary.results.iter().map(|r| r.sleep_debt).collect();
    assert_eq!(debts, [-1, 0, -1]);
}

#[test]
fn malformed_subject_is_skipped_and_excluded_from_reporters() {
    let good_a = SubjectInput::new(
        "01",
        vec![night("n1", NightStatus::Bad, &[]).with_initial_state(0.2, 0.0)],
    );
    let malformed = SubjectInput::new("02", Vec::new());
    let good_b = SubjectInput::new(
        "03",
        vec![night("n1", NightStatus::Bad, &[]).with_initial_state(0.6, 0.0)],
    );
    let mut coordinator = make_coordinator(vec![good_a, malformed, good_b]);
    assert_eq!(coordinator.subjects().len(), 2);
    assert_eq!(coordinator.skipped().len(), 1);
    assert_eq!(coordinator.skipped()[0].source, "02");

    let summary = coordinator.run(10).expect("cap within limits");
    assert_eq!(summary.subject_count, 2);
    assert_eq!(summary.skipped_subjects.len(), 1);
    assert!((summary.final_metrics.average_primary_index - 0.4).abs() < 1e-12);
    assert!((summary.final_metrics.average_sleep_debt - 1.0).abs() < 1e-12);
}

#[test]
fn empty_cohort_is_trivially_complete() {
    let mut coordinator = make_coordinator(Vec::new());
    assert!(coordinator.is_complete());
    assert_eq!(coordinator.average_primary_index(), 0.0);
    assert_eq!(coordinator.average_sleep_debt(), 0.0);
    let summary = coordinator.run(1000).expect("cap within limits");
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.rounds, 0);
    assert!(summary.results.is_empty());
    assert_eq!(summary.samples.len(), 1);
}

#[test]
fn run_finishes_within_longest_subject_length() {
    let mut coordinator = make_coordinator(vec![
        plain_subject("short", &[NightStatus::Good]),
        plain_subject("long", &vec![NightStatus::Bad; 4]),
        plain_subject("mid", &vec![NightStatus::Moderate; 2]),
    ]);
    let summary = coordinator.run(1000).expect("cap within limits");
    assert_eq!(summary.rounds, 4);
    assert!(coordinator.is_complete());
    assert_eq!(summary.results.len(), 7);
    // Results are grouped by subject in cohort order.
    let ids: Vec<&str> = summary.results.iter().map(|r| r.subject_id.as_str()).collect();
    assert_eq!(ids, ["short", "long", "long", "long", "long", "mid", "mid"]);
}

#[test]
fn terminal_subjects_keep_contributing_frozen_state() {
    let mut coordinator = make_coordinator(vec![
        plain_subject("short", &[NightStatus::Bad]),
        plain_subject("long", &vec![NightStatus::Moderate; 3]),
    ]);
    coordinator.step_round();
    let after_first = coordinator.report().clone();
    assert_eq!(after_first.completed_count, 1);
    assert_eq!(after_first.decisions_this_round, 2);

    let report = coordinator.step_round();
    assert_eq!(report.decisions_this_round, 1);
    assert_eq!(report.subject_count, 2);
    // Short subject stays at debt 1, long subject never gains debt.
    assert!((report.average_sleep_debt - 0.5).abs() < 1e-12);
    let short = coordinator.subject("short").expect("loaded").state();
    let long = coordinator.subject("long").expect("loaded").state();
    let expected = (short.primary_index + long.primary_index) / 2.0;
    assert!((report.average_primary_index - expected).abs() < 1e-12);
}

#[test]
fn round_cap_returns_partial_results() {
    let mut coordinator = make_coordinator(vec![plain_subject("01", &vec![NightStatus::Bad; 5])]);
    let summary = coordinator.run(3).expect("cap within limits");
    assert_eq!(summary.status, RunStatus::RoundCapExceeded);
    assert!(!summary.is_complete());
    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.final_metrics.active_count, 1);

    // A later call picks up where the capped run stopped.
    let resumed = coordinator.run(10).expect("cap within limits");
    assert_eq!(resumed.status, RunStatus::Completed);
    assert_eq!(resumed.rounds, 5);
    assert_eq!(resumed.results.len(), 5);
}

#[test]
fn zero_round_cap_with_pending_nights_is_cap_exceeded() {
    let mut coordinator = make_coordinator(vec![plain_subject("01", &[NightStatus::Good])]);
    let summary = coordinator.run(0).expect("zero cap is allowed");
    assert_eq!(summary.status, RunStatus::RoundCapExceeded);
    assert!(summary.results.is_empty());
}

#[test]
fn run_rejects_cap_above_maximum() {
    let mut coordinator = make_coordinator(Vec::new());
    assert!(matches!(
        coordinator.run(SimulationCoordinator::MAX_ROUNDS + 1),
        Err(RunError::TooManyRounds { .. })
    ));
}

#[test]
fn new_rejects_invalid_config() {
    let config = SimConfig {
        sample_every: 0,
        ..SimConfig::default()
    };
    assert!(matches!(
        SimulationCoordinator::new(config),
        Err(CoordinatorInitError::Config(SimConfigError::InvalidSampleEvery))
    ));
}

#[test]
fn is_complete_tracks_every_cursor() {
    let mut coordinator = make_coordinator(vec![
        plain_subject("a", &vec![NightStatus::Good; 2]),
        plain_subject("b", &[NightStatus::Good]),
    ]);
    assert!(!coordinator.is_complete());
    coordinator.step_round();
    assert!(!coordinator.is_complete());
    coordinator.step_round();
    assert!(coordinator.is_complete());
    for subject in coordinator.subjects() {
        assert_eq!(subject.state().cursor, subject.nights().len());
    }
}

#[test]
fn samples_follow_sample_every_and_include_final_round() {
    let config = SimConfig {
        sample_every: 2,
        collect_subject_frames: true,
        ..SimConfig::default()
    };
    let mut coordinator = SimulationCoordinator::with_subjects(
        vec![plain_subject("01", &vec![NightStatus::Moderate; 5])],
        config,
    )
    .expect("config should be valid");
    let summary = coordinator.run(100).expect("cap within limits");
    let rounds: Vec<usize> = summary.samples.iter().map(|m| m.round).collect();
    assert_eq!(rounds, [0, 2, 4, 5]);
    let frame_rounds: Vec<usize> = summary.subject_frames.iter().map(|f| f.round).collect();
    assert_eq!(frame_rounds, rounds);
    assert_eq!(summary.subject_frames[3].subjects[0].cursor, 5);
}

#[test]
fn initialize_replaces_cohort_and_resets_rounds() {
    let mut coordinator = make_coordinator(vec![plain_subject("a", &vec![NightStatus::Good; 2])]);
    coordinator.step_round();
    let loaded = coordinator.initialize(vec![
        plain_subject("x", &[NightStatus::Bad]),
        plain_subject("y", &[NightStatus::Bad]),
    ]);
    assert_eq!(loaded, 2);
    assert_eq!(coordinator.round(), 0);
    assert_eq!(coordinator.samples().len(), 1);
    assert!(coordinator.subject("a").is_none());
}

#[test]
fn action_counts_summarise_choices() {
    let subject = SubjectInput::new(
        "01",
        vec![
            night("n1", NightStatus::Good, &[("A", 0.5, 0.3), ("B", 0.1, 0.1)]),
            night("n2", NightStatus::Good, &[]),
            night("n3", NightStatus::Good, &[("A", 0.1, 0.1)]),
        ],
    );
    let mut coordinator = make_coordinator(vec![subject]);
    let summary = coordinator.run(10).expect("cap within limits");
    let counts: Vec<(Option<&str>, usize)> = summary
        .action_counts
        .iter()
        .map(|c| (c.action.as_deref(), c.count))
        .collect();
    assert_eq!(counts, [(None, 1), (Some("A"), 2)]);
}

#[test]
fn parallel_planning_matches_sequential_rounds() {
    let cohort = generate_cohort(&CohortSpec {
        num_subjects: 24,
        nights_per_subject: 12,
        actions_per_night: 4,
        seed: 7,
    });
    let mut sequential = make_coordinator(cohort.clone());
    let mut parallel = SimulationCoordinator::with_subjects(
        cohort,
        SimConfig {
            parallel_planning: true,
            ..SimConfig::default()
        },
    )
    .expect("config should be valid");

    let a = sequential.run(1000).expect("cap within limits");
    let b = parallel.run(1000).expect("cap within limits");
    assert_eq!(a.results, b.results);
    assert_eq!(a.samples, b.samples);
}

#[test]
fn rounds_only_read_pre_round_state() {
    let mut coordinator = make_coordinator(vec![
        plain_subject("a", &vec![NightStatus::Bad; 3]),
        plain_subject("b", &vec![NightStatus::Bad; 3]),
    ]);
    let plans = coordinator.plan_round();
    let before: Vec<_> = coordinator.subjects().iter().map(|s| s.state().clone()).collect();
    // Planning is read-only; every plan refers to the pre-round cursor.
    for (plan, state) in plans.iter().zip(&before) {
        let plan = plan.as_ref().expect("nights remain");
        assert_eq!(plan.cursor, state.cursor);
    }
    coordinator.step_round();
    for (subject, state) in coordinator.subjects().iter().zip(&before) {
        assert_eq!(subject.state().cursor, state.cursor + 1);
    }
}

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use sleep_sim_core::loader::load_directory;
use sleep_sim_core::{RunSummary, SimConfig, SimulationCoordinator, SkippedSubject, SubjectInput};
use std::path::Path;

/// Minimal PyO3 module exposing sleep-sim-core to Python.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(format!("failed to serialize default config: {e}")))
}

#[pyfunction]
fn validate_config_json(config_json: &str) -> PyResult<bool> {
    parse_config(Some(config_json))
        .map(|_| true)
        .map_err(PyValueError::new_err)
}

/// Run a cohort given as a JSON array of `{subject_id, nights}` objects and
/// return the run summary as JSON.
#[pyfunction]
#[pyo3(signature = (subjects_json, config_json=None))]
fn simulate_json(subjects_json: &str, config_json: Option<&str>) -> PyResult<String> {
    simulate(subjects_json, config_json).map_err(PyValueError::new_err)
}

/// Load a directory of subject files, run it and return the summary as JSON.
#[pyfunction]
#[pyo3(signature = (data_dir, config_json=None))]
fn simulate_directory_json(data_dir: &str, config_json: Option<&str>) -> PyResult<String> {
    let config = parse_config(config_json).map_err(PyValueError::new_err)?;
    let report = load_directory(Path::new(data_dir))
        .map_err(|e| PyValueError::new_err(format!("failed to load subject data: {e}")))?;
    let mut coordinator = SimulationCoordinator::with_subjects(report.subjects, config)
        .map_err(|e| PyValueError::new_err(format!("invalid simulation configuration: {e}")))?;
    coordinator.record_skipped(report.skipped);
    let summary = coordinator
        .run_to_completion()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    summary_to_json(&summary).map_err(PyValueError::new_err)
}

fn parse_config(config_json: Option<&str>) -> Result<SimConfig, String> {
    let config = match config_json {
        Some(json) => serde_json::from_str::<SimConfig>(json)
            .map_err(|e| format!("invalid config json: {e}"))?,
        None => SimConfig::default(),
    };
    config
        .validate()
        .map_err(|e| format!("invalid simulation configuration: {e}"))?;
    Ok(config)
}

/// Split a JSON array of subjects into the ones that parse and the ones that
/// don't. Only a non-array document is an error.
fn parse_subjects(
    subjects_json: &str,
) -> Result<(Vec<SubjectInput>, Vec<SkippedSubject>), String> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(subjects_json).map_err(|e| format!("invalid subjects json: {e}"))?;
    let mut subjects = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();
    for (idx, entry) in entries.into_iter().enumerate() {
        let source = entry
            .get("subject_id")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| format!("subjects[{idx}]"), str::to_string);
        match serde_json::from_value::<SubjectInput>(entry) {
            Ok(subject) => subjects.push(subject),
            Err(e) => skipped.push(SkippedSubject {
                source,
                reason: format!("malformed subject data: {e}"),
            }),
        }
    }
    Ok((subjects, skipped))
}

fn simulate(subjects_json: &str, config_json: Option<&str>) -> Result<String, String> {
    let config = parse_config(config_json)?;
    let (subjects, skipped) = parse_subjects(subjects_json)?;
    let mut coordinator = SimulationCoordinator::with_subjects(subjects, config)
        .map_err(|e| format!("invalid simulation configuration: {e}"))?;
    coordinator.record_skipped(skipped);
    let summary = coordinator.run_to_completion().map_err(|e| e.to_string())?;
    summary_to_json(&summary)
}

fn summary_to_json(summary: &RunSummary) -> Result<String, String> {
    serde_json::to_string(summary).map_err(|e| format!("failed to serialize summary: {e}"))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_json, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_directory_json, m)?)?;
    Ok(())
}

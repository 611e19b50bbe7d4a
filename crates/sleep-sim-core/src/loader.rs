//! Subject data source: one `subject_<ID>_state.json` file per subject.

use crate::metrics::SkippedSubject;
use crate::night::NightRecord;
use crate::subject::SubjectInput;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::{error::Error, fmt, io};
use tracing::{info, warn};

const FILE_PREFIX: &str = "subject_";
const FILE_SUFFIX: &str = "_state.json";

#[derive(Debug)]
pub enum LoadError {
    Io { path: PathBuf, source: io::Error },
    Json { path: PathBuf, source: serde_json::Error },
    InvalidFileName { path: PathBuf },
    NoNights { path: PathBuf },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            LoadError::Json { path, source } => {
                write!(f, "malformed subject data in {}: {source}", path.display())
            }
            LoadError::InvalidFileName { path } => write!(
                f,
                "{} does not follow the {FILE_PREFIX}<ID>{FILE_SUFFIX} naming scheme",
                path.display()
            ),
            LoadError::NoNights { path } => {
                write!(f, "{} has an empty nights list", path.display())
            }
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct SubjectFile {
    nights: Vec<NightRecord>,
}

/// Subjects that loaded, plus the files that did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub subjects: Vec<SubjectInput>,
    pub skipped: Vec<SkippedSubject>,
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn matches_naming_scheme(name: &str) -> bool {
    name.len() >= FILE_PREFIX.len() + FILE_SUFFIX.len()
        && name.starts_with(FILE_PREFIX)
        && name.ends_with(FILE_SUFFIX)
}

/// Subject id: the second `_`-separated token of the file name.
pub fn subject_id_from_path(path: &Path) -> Result<String, LoadError> {
    file_name(path)
        .filter(|name| matches_naming_scheme(name))
        .and_then(|name| name.split('_').nth(1))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LoadError::InvalidFileName {
            path: path.to_path_buf(),
        })
}

/// Files in `dir` named `subject_*_state.json`, sorted by path.
pub fn discover_subject_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let io_err = |source: io::Error| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && file_name(&path).is_some_and(matches_naming_scheme) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Parse one subject's record set. `path` is only used for error messages.
pub fn parse_subject(
    subject_id: &str,
    json: &str,
    path: &Path,
) -> Result<SubjectInput, LoadError> {
    let file: SubjectFile = serde_json::from_str(json).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if file.nights.is_empty() {
        return Err(LoadError::NoNights {
            path: path.to_path_buf(),
        });
    }
    Ok(SubjectInput::new(subject_id, file.nights))
}

pub fn load_subject_file(path: &Path) -> Result<SubjectInput, LoadError> {
    let subject_id = subject_id_from_path(path)?;
    let json = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_subject(&subject_id, &json, path)
}

/// Load every subject file in `dir`. A file that fails to load is logged
/// and listed in `skipped`; only an unreadable directory is an error.
pub fn load_directory(dir: &Path) -> Result<LoadReport, LoadError> {
    let files = discover_subject_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no subject files found");
    }

    let mut report = LoadReport::default();
    for path in files {
        match load_subject_file(&path) {
            Ok(subject) => report.subjects.push(subject),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping subject file");
                report.skipped.push(SkippedSubject {
                    source: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
    info!(
        dir = %dir.display(),
        loaded = report.subjects.len(),
        skipped = report.skipped.len(),
        "subject data loaded"
    );
    Ok(report)
}

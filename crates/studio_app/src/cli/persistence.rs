use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use studio_core::JobId;
use studio_engine::{ensure_output_dir, AtomicFileWriter};
use studio_logging::{studio_error, studio_info, studio_warn};

const SESSION_FILENAME: &str = ".studio_session.ron";

/// The job a previous invocation left behind, so follow-up commands can
/// omit the job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PersistedJob {
    pub job_id: String,
    pub api_base: String,
    pub mode: Option<String>,
    pub submitted_at: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub video_path: Option<PathBuf>,
}

impl PersistedJob {
    pub fn job_id(&self) -> JobId {
        JobId::new(self.job_id.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedSession {
    last_job: Option<PersistedJob>,
}

pub(crate) fn load_last_job(state_dir: &Path) -> Option<PersistedJob> {
    let path = state_dir.join(SESSION_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            studio_warn!("Failed to read session from {:?}: {}", path, err);
            return None;
        }
    };

    let session: PersistedSession = match ron::from_str(&content) {
        Ok(session) => session,
        Err(err) => {
            studio_warn!("Failed to parse session from {:?}: {}", path, err);
            return None;
        }
    };

    if let Some(job) = &session.last_job {
        studio_info!(job = job.job_id; "resumed from {:?}", path);
    }
    session.last_job
}

pub(crate) fn save_last_job(state_dir: &Path, job: &PersistedJob) {
    write_session(
        state_dir,
        &PersistedSession {
            last_job: Some(job.clone()),
        },
    );
}

/// Forgets the remembered job. Returns whether there was one.
pub(crate) fn clear_last_job(state_dir: &Path) -> bool {
    let had_job = load_last_job(state_dir).is_some();
    let path = state_dir.join(SESSION_FILENAME);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => studio_error!("Failed to remove session file {:?}: {}", path, err),
    }
    had_job
}

fn write_session(state_dir: &Path, session: &PersistedSession) {
    if let Err(err) = ensure_output_dir(state_dir) {
        studio_error!("Failed to ensure state dir {:?}: {}", state_dir, err);
        return;
    }

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(session, pretty) {
        Ok(text) => text,
        Err(err) => {
            studio_error!("Failed to serialize session: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(state_dir));
    if let Err(err) = writer.write(SESSION_FILENAME, &content) {
        studio_error!("Failed to write session to {:?}: {}", state_dir, err);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::{clear_last_job, load_last_job, save_last_job, PersistedJob, SESSION_FILENAME};

    fn job(status: &str) -> PersistedJob {
        PersistedJob {
            job_id: "abc123".to_string(),
            api_base: "https://tunnel.example".to_string(),
            mode: Some("audio".to_string()),
            submitted_at: "2026-10-16T09:30:00+00:00".to_string(),
            status: status.to_string(),
            error: None,
            video_path: None,
        }
    }

    #[test]
    fn saved_job_is_loaded_back() {
        let temp = TempDir::new().unwrap();
        let mut saved = job("processing");
        save_last_job(temp.path(), &saved);
        assert_eq!(load_last_job(temp.path()), Some(saved.clone()));

        saved.status = "completed".to_string();
        saved.video_path = Some(PathBuf::from("video_abc123.mp4"));
        save_last_job(temp.path(), &saved);
        assert_eq!(load_last_job(temp.path()), Some(saved));
    }

    #[test]
    fn missing_or_corrupt_session_yields_nothing() {
        let temp = TempDir::new().unwrap();
        assert_eq!(load_last_job(temp.path()), None);

        fs::write(temp.path().join(SESSION_FILENAME), "not ron at all (").unwrap();
        assert_eq!(load_last_job(temp.path()), None);
    }

    #[test]
    fn clearing_removes_the_session_file() {
        let temp = TempDir::new().unwrap();
        save_last_job(temp.path(), &job("failed"));
        assert!(clear_last_job(temp.path()));
        assert!(!temp.path().join(SESSION_FILENAME).exists());
        assert!(!clear_last_job(temp.path()));
    }

    #[test]
    fn state_dir_is_created_on_save() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("state").join("studio");
        save_last_job(&nested, &job("processing"));
        assert_eq!(load_last_job(&nested).map(|job| job.job_id), Some("abc123".to_string()));
    }
}

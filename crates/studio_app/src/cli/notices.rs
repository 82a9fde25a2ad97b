use std::sync::Mutex;

use studio_core::{JobStatus, Notice, NoticeLevel, StudioViewModel};
use studio_engine::{LogNoticeSink, NoticeSink};

/// Prints notices and poll progress to stderr, keeping stdout for results.
#[derive(Default)]
pub(crate) struct TerminalNoticeSink {
    log: LogNoticeSink,
    last_progress: Mutex<Option<String>>,
}

impl NoticeSink for TerminalNoticeSink {
    fn notify(&self, notice: &Notice) {
        self.log.notify(notice);
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{prefix}] {}", notice.message);
    }

    fn progress(&self, view: &StudioViewModel) {
        self.log.progress(view);
        let Some(line) = progress_line(view) else {
            return;
        };
        // Only print when something visible changed.
        if let Ok(mut last) = self.last_progress.lock() {
            if last.as_deref() != Some(line.as_str()) {
                eprintln!("{line}");
                *last = Some(line);
            }
        }
    }
}

fn progress_line(view: &StudioViewModel) -> Option<String> {
    if view.submitting {
        return Some("Uploading and creating the job...".to_string());
    }
    if view.status != JobStatus::Processing || !view.polling {
        return None;
    }
    let job = view.job_id.as_ref()?;
    let remote = view.remote_status.as_deref().unwrap_or("waiting for first status");
    let mut line = format!("Job {job}: {remote}");
    if view.transient_errors > 0 {
        let reason = view.last_transient_error.as_deref().unwrap_or("unknown error");
        line.push_str(&format!(
            " (status check failed {}x, retrying: {reason})",
            view.transient_errors
        ));
    }
    Some(line)
}

use std::fmt;

use crate::view_model::StudioViewModel;
use crate::{ApiRoutes, MediaFailure, StatusReport};

/// Opaque backend-assigned job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one tracked generation request.
///
/// `result_url` is only ever set together with `Completed` and
/// `error_message` only together with `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Job {
    job_id: Option<JobId>,
    status: JobStatus,
    result_url: Option<String>,
    error_message: Option<String>,
}

impl Job {
    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Outcome of applying a poll response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Stale,
    StillProcessing,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioState {
    routes: ApiRoutes,
    job: Job,
    submitting: bool,
    /// Generation counter of submissions; answers to older ones are ignored.
    submission: u64,
    polling: bool,
    /// Never rewinds, so answers for a superseded job cannot match a new one.
    poll_seq: u64,
    applied_seq: u64,
    remote_status: Option<String>,
    transient_errors: u32,
    last_transient_error: Option<String>,
    last_submit_error: Option<String>,
    media_error: Option<MediaFailure>,
    dirty: bool,
}

impl StudioState {
    pub fn new(routes: ApiRoutes) -> Self {
        Self {
            routes,
            job: Job::default(),
            submitting: false,
            submission: 0,
            polling: false,
            poll_seq: 0,
            applied_seq: 0,
            remote_status: None,
            transient_errors: 0,
            last_transient_error: None,
            last_submit_error: None,
            media_error: None,
            dirty: false,
        }
    }

    pub fn routes(&self) -> &ApiRoutes {
        &self.routes
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Sequence number of the most recently issued status request.
    pub fn poll_seq(&self) -> u64 {
        self.poll_seq
    }

    pub fn view(&self) -> StudioViewModel {
        let status = self.job.status;
        StudioViewModel {
            status,
            job_id: self.job.job_id.clone(),
            result_url: self.job.result_url.clone(),
            error_message: self.job.error_message.clone(),
            submitting: self.submitting,
            polling: self.polling,
            can_submit: !self.submitting && status != JobStatus::Processing,
            download_url: self.download_url(),
            remote_status: self.remote_status.clone(),
            transient_errors: self.transient_errors,
            last_transient_error: self.last_transient_error.clone(),
            last_submit_error: self.last_submit_error.clone(),
            media_error: self.media_error,
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn download_url(&self) -> Option<String> {
        match (&self.job.job_id, self.job.status) {
            (Some(job_id), JobStatus::Completed) => {
                Some(self.routes.download(job_id).to_string())
            }
            _ => None,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.submitting || self.job.status == JobStatus::Processing
    }

    /// Starts a new lifecycle and returns its submission token.
    pub(crate) fn begin_submission(&mut self) -> u64 {
        self.clear_job();
        self.submission += 1;
        self.submitting = true;
        self.dirty = true;
        self.submission
    }

    pub(crate) fn accept_submission(&mut self, submission: u64, job_id: crate::JobId) -> bool {
        if !self.submitting || submission != self.submission {
            return false;
        }
        self.submitting = false;
        self.start_tracking(job_id);
        true
    }

    pub(crate) fn fail_submission(&mut self, submission: u64, detail: String) -> bool {
        if !self.submitting || submission != self.submission {
            return false;
        }
        self.submitting = false;
        self.job = Job::default();
        self.last_submit_error = Some(detail);
        self.dirty = true;
        true
    }

    /// Tracks a job created elsewhere (an earlier session, another client).
    pub(crate) fn adopt_job(&mut self, job_id: crate::JobId) {
        self.clear_job();
        // Invalidates any submission still in flight.
        self.submission += 1;
        self.start_tracking(job_id);
    }

    fn start_tracking(&mut self, job_id: crate::JobId) {
        self.job = Job {
            job_id: Some(job_id),
            status: JobStatus::Processing,
            result_url: None,
            error_message: None,
        };
        self.polling = true;
        self.applied_seq = self.poll_seq;
        self.dirty = true;
    }

    /// Issues the next poll sequence number if a poll is due.
    pub(crate) fn next_poll(&mut self) -> Option<(crate::JobId, u64)> {
        if !self.polling || self.job.status != JobStatus::Processing {
            return None;
        }
        let job_id = self.job.job_id.clone()?;
        self.poll_seq += 1;
        Some((job_id, self.poll_seq))
    }

    fn is_current_poll(&self, seq: u64) -> bool {
        self.polling && seq > self.applied_seq && seq <= self.poll_seq
    }

    pub(crate) fn apply_status(
        &mut self,
        seq: u64,
        report: StatusReport,
        now_ms: i64,
    ) -> PollOutcome {
        if !self.is_current_poll(seq) {
            return PollOutcome::Stale;
        }
        self.applied_seq = seq;
        self.transient_errors = 0;
        self.last_transient_error = None;
        self.remote_status = Some(report.label().to_string());
        self.dirty = true;

        let Some(job_id) = self.job.job_id.clone() else {
            return PollOutcome::Stale;
        };
        match report {
            StatusReport::Processing | StatusReport::Other(_) => PollOutcome::StillProcessing,
            StatusReport::Completed => {
                self.polling = false;
                self.job.status = JobStatus::Completed;
                self.job.result_url = Some(self.routes.video(&job_id, now_ms).to_string());
                PollOutcome::Completed
            }
            StatusReport::Failed { detail } => {
                self.polling = false;
                self.job.status = JobStatus::Failed;
                self.job.error_message = Some(detail.clone());
                PollOutcome::Failed(detail)
            }
        }
    }

    pub(crate) fn apply_transient(&mut self, seq: u64, reason: String) -> bool {
        if !self.is_current_poll(seq) {
            return false;
        }
        self.transient_errors += 1;
        self.last_transient_error = Some(reason);
        self.dirty = true;
        true
    }

    /// Stops the poll loop without forgetting the job. Returns whether it ran.
    pub(crate) fn stop_polling(&mut self) -> bool {
        let was_polling = std::mem::replace(&mut self.polling, false);
        if was_polling {
            self.dirty = true;
        }
        was_polling
    }

    /// Returns to the initial idle state. Returns whether polling was active.
    pub(crate) fn reset(&mut self) -> bool {
        let was_polling = self.polling;
        if self.submitting {
            self.submission += 1;
        }
        self.clear_job();
        self.dirty = true;
        was_polling
    }

    pub(crate) fn set_media_error(&mut self, failure: MediaFailure) -> bool {
        if self.job.status != JobStatus::Completed {
            return false;
        }
        self.media_error = Some(failure);
        self.dirty = true;
        true
    }

    fn clear_job(&mut self) {
        self.job = Job::default();
        self.submitting = false;
        self.polling = false;
        self.applied_seq = self.poll_seq;
        self.remote_status = None;
        self.transient_errors = 0;
        self.last_transient_error = None;
        self.last_submit_error = None;
        self.media_error = None;
    }
}

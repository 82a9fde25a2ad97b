use crate::{JobId, JobStatus, MediaFailure};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudioViewModel {
    pub status: JobStatus,
    pub job_id: Option<JobId>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub submitting: bool,
    pub polling: bool,
    pub can_submit: bool,
    pub download_url: Option<String>,
    /// Last status label reported by the backend, for display only.
    pub remote_status: Option<String>,
    pub transient_errors: u32,
    pub last_transient_error: Option<String>,
    pub last_submit_error: Option<String>,
    pub media_error: Option<MediaFailure>,
    pub dirty: bool,
}

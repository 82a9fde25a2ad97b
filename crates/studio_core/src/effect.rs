use crate::{JobId, Submission};

/// Work the host must perform after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Post the payload; answer with `SubmitAccepted`/`SubmitFailed` carrying `submission`.
    SendSubmission { submission: u64, payload: Submission },
    StartPolling { job_id: JobId },
    /// Query the status endpoint; answer with `StatusReceived`/`StatusUnavailable` carrying `seq`.
    RequestStatus { job_id: JobId, seq: u64 },
    StopPolling,
    OpenDownload { url: String },
    Notify(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message, the equivalent of an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

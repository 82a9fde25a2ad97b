use std::fmt;
use std::path::PathBuf;

use studio_core::{JobId, MediaFailure, SubmitFailure, ValidationError};

use crate::persist::PersistError;

/// A request that produced no usable answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Network,
    HttpStatus(u16),
    NotJson { content_type: Option<String> },
    MalformedBody,
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Network => write!(f, "network error"),
            TransportErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            TransportErrorKind::NotJson { content_type } => match content_type {
                Some(ct) => write!(f, "non-json response ({ct})"),
                None => write!(f, "non-json response"),
            },
            TransportErrorKind::MalformedBody => write!(f, "malformed response body"),
            TransportErrorKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
        }
    }
}

/// Non-success answer to a job-creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRejection {
    pub status: u16,
    pub body: String,
}

impl BackendRejection {
    /// The JSON `error` field when the body carries one, else the raw body.
    pub fn detail(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|value| value.get("error")?.as_str().map(str::to_string))
            .filter(|error| !error.trim().is_empty())
            .unwrap_or_else(|| {
                let body = self.body.trim();
                if body.is_empty() {
                    format!("http status {}", self.status)
                } else {
                    body.to_string()
                }
            })
    }
}

impl fmt::Display for BackendRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "backend rejected the job (http {}): {}",
            self.status,
            self.detail()
        )
    }
}

impl std::error::Error for BackendRejection {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] BackendRejection),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SubmitError {
    pub(crate) fn to_failure(&self) -> SubmitFailure {
        match self {
            SubmitError::Rejected(rejection) => SubmitFailure::Rejected {
                status: rejection.status,
                detail: rejection.detail(),
            },
            SubmitError::Transport(err) => SubmitFailure::Transport {
                message: err.to_string(),
            },
        }
    }
}

/// The inline video could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaError {
    pub failure: MediaFailure,
    pub message: String,
}

impl MediaError {
    pub(crate) fn new(failure: MediaFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.failure, self.message)
    }
}

impl std::error::Error for MediaError {}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),
    #[error("a job is already in progress")]
    Busy,
    #[error(transparent)]
    Rejected(#[from] BackendRejection),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("job {job_id} failed: {detail}")]
    JobFailed { job_id: JobId, detail: String },
    #[error("no job is being polled")]
    NotPolling,
    #[error("job is not completed yet")]
    NotCompleted,
    #[error("polling was cancelled")]
    Cancelled,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl From<SubmitError> for LifecycleError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(rejection) => LifecycleError::Rejected(rejection),
            SubmitError::Transport(err) => LifecycleError::Transport(err),
        }
    }
}

/// A job that reached `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub result_url: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSource {
    /// The inline playable endpoint.
    Inline,
    /// The download endpoint, after the inline one failed.
    Download,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedVideo {
    pub path: PathBuf,
    pub byte_len: u64,
    pub sha256: String,
    pub source: VideoSource,
}

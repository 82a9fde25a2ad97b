use std::fmt;

const FALLBACK_FAILURE: &str = "video generation failed";

/// Decoded body of a status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Processing,
    Completed,
    Failed { detail: String },
    /// Any status label the client does not act on; polling continues.
    Other(String),
}

impl StatusReport {
    /// Interprets `{status, message?, error?}`. A failure always carries a
    /// non-empty detail, preferring `message` over `error`.
    pub fn from_parts(status: &str, message: Option<&str>, error: Option<&str>) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "processing" => StatusReport::Processing,
            "completed" => StatusReport::Completed,
            "failed" => {
                let detail = [message, error]
                    .into_iter()
                    .flatten()
                    .map(str::trim)
                    .find(|text| !text.is_empty())
                    .unwrap_or(FALLBACK_FAILURE)
                    .to_string();
                StatusReport::Failed { detail }
            }
            _ => StatusReport::Other(status.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StatusReport::Processing => "processing",
            StatusReport::Completed => "completed",
            StatusReport::Failed { .. } => "failed",
            StatusReport::Other(label) => label,
        }
    }
}

/// Why a job-creation request did not produce a job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// The backend answered with a non-success status.
    Rejected { status: u16, detail: String },
    /// No usable answer at all.
    Transport { message: String },
}

impl fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitFailure::Rejected { status, detail } => {
                write!(f, "backend rejected the job (http {status}): {detail}")
            }
            SubmitFailure::Transport { message } => {
                write!(f, "could not reach the video backend: {message}")
            }
        }
    }
}

/// Why the finished video could not be loaded for inline playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFailure {
    Network,
    UnsupportedFormat,
    Other,
}

impl MediaFailure {
    /// Classifies a `MediaError.code` as reported by HTML media elements.
    pub fn from_media_error_code(code: u16) -> Self {
        match code {
            2 => MediaFailure::Network,
            4 => MediaFailure::UnsupportedFormat,
            _ => MediaFailure::Other,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            MediaFailure::Network => "Network error loading video. Check your connection.",
            MediaFailure::UnsupportedFormat => "Video file format is not supported by the player.",
            MediaFailure::Other => "Failed to load video. Try downloading it instead.",
        }
    }
}

impl fmt::Display for MediaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

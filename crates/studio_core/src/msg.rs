use crate::{JobId, MediaFailure, StatusReport, SubmitFailure, Submission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked to generate a video from a validated payload.
    SubmitRequested(Submission),
    /// Backend created the job.
    SubmitAccepted { submission: u64, job_id: JobId },
    /// Job creation failed; the studio returns to idle.
    SubmitFailed {
        submission: u64,
        failure: SubmitFailure,
    },
    /// Track an existing backend job, e.g. one remembered from an earlier session.
    JobAdopted { job_id: JobId },
    /// Poll timer fired.
    PollTick,
    /// Status endpoint answered with a decodable body.
    StatusReceived {
        seq: u64,
        report: StatusReport,
        /// Wall clock in milliseconds, used as the result URL cache buster.
        now_ms: i64,
    },
    /// Status request failed transiently (http error, non-JSON, timeout).
    StatusUnavailable { seq: u64, reason: String },
    /// The view owning the poll loop went away.
    PollingCancelled,
    /// User asked for the finished video as a download.
    DownloadClicked,
    /// The inline player could not load the result.
    MediaFailed(MediaFailure),
    /// User wants to start over.
    ResetClicked,
}

use crate::state::PollOutcome;
use crate::{Effect, JobStatus, Msg, Notice, StudioState};

const BUSY_NOTICE: &str = "A video is already being generated. Wait for it to finish or reset first.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: StudioState, msg: Msg) -> (StudioState, Vec<Effect>) {
    let effects = match msg {
        Msg::SubmitRequested(payload) => {
            if state.is_busy() {
                return (state, vec![Effect::Notify(Notice::warning(BUSY_NOTICE))]);
            }
            let submission = state.begin_submission();
            vec![Effect::SendSubmission {
                submission,
                payload,
            }]
        }
        Msg::SubmitAccepted { submission, job_id } => {
            if state.accept_submission(submission, job_id.clone()) {
                vec![
                    Effect::StartPolling { job_id },
                    Effect::Notify(Notice::info("Video generation started.")),
                ]
            } else {
                Vec::new()
            }
        }
        Msg::SubmitFailed {
            submission,
            failure,
        } => {
            let message = failure.to_string();
            if state.fail_submission(submission, message.clone()) {
                vec![Effect::Notify(Notice::error(message))]
            } else {
                Vec::new()
            }
        }
        Msg::JobAdopted { job_id } => {
            if state.is_busy() {
                return (state, vec![Effect::Notify(Notice::warning(BUSY_NOTICE))]);
            }
            state.adopt_job(job_id.clone());
            vec![Effect::StartPolling { job_id }]
        }
        Msg::PollTick => match state.next_poll() {
            Some((job_id, seq)) => vec![Effect::RequestStatus { job_id, seq }],
            None => Vec::new(),
        },
        Msg::StatusReceived {
            seq,
            report,
            now_ms,
        } => match state.apply_status(seq, report, now_ms) {
            PollOutcome::Stale | PollOutcome::StillProcessing => Vec::new(),
            PollOutcome::Completed => vec![
                Effect::StopPolling,
                Effect::Notify(Notice::info("Video generation completed!")),
            ],
            PollOutcome::Failed(detail) => vec![
                Effect::StopPolling,
                Effect::Notify(Notice::error(format!(
                    "Video generation failed: {detail}"
                ))),
            ],
        },
        Msg::StatusUnavailable { seq, reason } => {
            // Transient: the loop keeps ticking.
            state.apply_transient(seq, reason);
            Vec::new()
        }
        Msg::PollingCancelled => {
            if state.stop_polling() {
                vec![Effect::StopPolling]
            } else {
                Vec::new()
            }
        }
        Msg::DownloadClicked => match state.download_url() {
            Some(url) => vec![Effect::OpenDownload { url }],
            None => vec![Effect::Notify(Notice::warning(
                "There is no finished video to download yet.",
            ))],
        },
        Msg::MediaFailed(failure) => {
            if state.set_media_error(failure) {
                vec![Effect::Notify(Notice::error(failure.message()))]
            } else {
                Vec::new()
            }
        }
        Msg::ResetClicked => {
            let was_polling = state.reset();
            if was_polling {
                vec![Effect::StopPolling]
            } else {
                Vec::new()
            }
        }
    };

    debug_assert!(
        state.job().result_url().is_some() == (state.job().status() == JobStatus::Completed)
    );
    (state, effects)
}

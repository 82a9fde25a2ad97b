use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use studio_core::{
    update, ApiRoutes, Effect, GenerationRequest, JobId, JobStatus, Msg, StudioState,
    StudioViewModel, VoiceResolver, WeightsDirVoiceResolver,
};
use studio_logging::{studio_debug, studio_info, studio_warn};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::filename::{sha256_hex, video_filename};
use crate::persist::AtomicFileWriter;
use crate::{
    JobBackend, JobOutcome, LifecycleError, LogNoticeSink, NoticeSink, SavedVideo, SubmitError,
    VideoSource,
};

/// Wall clock in milliseconds since the Unix epoch.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Delay between status requests. The first request goes out one
    /// interval after the job is created.
    pub poll_interval: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// What executing a batch of effects produced for the caller.
#[derive(Default)]
struct EffectRun {
    created: Option<Result<JobId, SubmitError>>,
    download_url: Option<String>,
    status_requests: usize,
}

/// Drives one generation job against a backend: submit, poll until a
/// terminal status, then fetch or download the result.
///
/// All state transitions go through [`studio_core::update`]; this type only
/// performs the effects it asks for.
pub struct JobLifecycleClient {
    state: StudioState,
    backend: Arc<dyn JobBackend>,
    resolver: Arc<dyn VoiceResolver>,
    sink: Arc<dyn NoticeSink>,
    clock: Clock,
    settings: LifecycleSettings,
}

impl JobLifecycleClient {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        let routes: ApiRoutes = backend.routes().clone();
        Self {
            state: StudioState::new(routes),
            backend,
            resolver: Arc::new(WeightsDirVoiceResolver::default()),
            sink: Arc::new(LogNoticeSink),
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
            settings: LifecycleSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_voice_resolver(mut self, resolver: Arc<dyn VoiceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_notice_sink(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> &StudioState {
        &self.state
    }

    pub fn view(&self) -> StudioViewModel {
        self.state.view()
    }

    /// Download link for the finished video, once the job completed.
    pub fn download_url(&self) -> Option<String> {
        self.state.view().download_url
    }

    /// Validates the request, posts it and starts tracking the created job.
    ///
    /// Validation runs before any network traffic. The call returns once the
    /// backend assigned a job id; use [`Self::poll_until_terminal`] to wait
    /// for the video.
    pub async fn submit(&mut self, request: GenerationRequest) -> Result<JobId, LifecycleError> {
        let payload = request.into_submission(self.resolver.as_ref())?;
        studio_debug!(
            "submitting {:?} ({} bytes)",
            payload.mode(),
            payload.total_bytes()
        );
        let effects = self.dispatch(Msg::SubmitRequested(payload));
        let run = self.run_effects(effects).await;
        match run.created {
            Some(Ok(job_id)) => Ok(job_id),
            Some(Err(err)) => Err(err.into()),
            None => Err(LifecycleError::Busy),
        }
    }

    /// Starts polling a job created elsewhere, e.g. in an earlier session.
    pub async fn adopt(&mut self, job_id: JobId) -> Result<(), LifecycleError> {
        let effects = self.dispatch(Msg::JobAdopted { job_id });
        let started = effects
            .iter()
            .any(|effect| matches!(effect, Effect::StartPolling { .. }));
        self.run_effects(effects).await;
        if started {
            Ok(())
        } else {
            Err(LifecycleError::Busy)
        }
    }

    /// Issues a single status request and applies its answer.
    pub async fn poll_once(&mut self) -> Result<JobStatus, LifecycleError> {
        let effects = self.dispatch(Msg::PollTick);
        let run = self.run_effects(effects).await;
        if run.status_requests == 0 {
            return Err(LifecycleError::NotPolling);
        }
        Ok(self.state.job().status())
    }

    /// Polls every `poll_interval` until the job completes or fails.
    ///
    /// Transient errors (timeouts, http errors, non-JSON answers) keep the
    /// loop going. Cancelling the token stops polling and discards any
    /// answer still in flight; the job itself is kept.
    pub async fn poll_until_terminal(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, LifecycleError> {
        if !self.state.is_polling() {
            return self.outcome();
        }

        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.state.is_polling() {
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = ticker.tick() => false,
            };
            if cancelled {
                return self.cancel_polling().await;
            }

            let effects = self.dispatch(Msg::PollTick);
            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = self.run_effects(effects) => false,
            };
            if cancelled {
                return self.cancel_polling().await;
            }
        }
        self.outcome()
    }

    /// Returns to idle, stopping any poll loop and forgetting the job.
    pub async fn reset(&mut self) {
        let effects = self.dispatch(Msg::ResetClicked);
        self.run_effects(effects).await;
    }

    /// Saves the finished video through the download endpoint.
    pub async fn download_to(&mut self, dir: &Path) -> Result<SavedVideo, LifecycleError> {
        let effects = self.dispatch(Msg::DownloadClicked);
        let run = self.run_effects(effects).await;
        let url = run.download_url.ok_or(LifecycleError::NotCompleted)?;
        let job_id = self.completed_job_id()?;
        let bytes = self.backend.download(&url).await?;
        write_video(dir, &job_id, &bytes, VideoSource::Download)
    }

    /// Saves the finished video, preferring the inline video endpoint and
    /// falling back to the download endpoint when it cannot be loaded.
    pub async fn save_video(&mut self, dir: &Path) -> Result<SavedVideo, LifecycleError> {
        let job_id = self.completed_job_id()?;
        let result_url = self
            .state
            .job()
            .result_url()
            .map(str::to_string)
            .ok_or(LifecycleError::NotCompleted)?;

        match self.backend.fetch_video(&result_url).await {
            Ok(bytes) => write_video(dir, &job_id, &bytes, VideoSource::Inline),
            Err(err) => {
                studio_warn!(job = job_id; "inline video unavailable: {}", err);
                let effects = self.dispatch(Msg::MediaFailed(err.failure));
                self.run_effects(effects).await;
                self.download_to(dir).await
            }
        }
    }

    fn completed_job_id(&self) -> Result<JobId, LifecycleError> {
        let job = self.state.job();
        match (job.status(), job.job_id()) {
            (JobStatus::Completed, Some(job_id)) => Ok(job_id.clone()),
            _ => Err(LifecycleError::NotCompleted),
        }
    }

    fn outcome(&self) -> Result<JobOutcome, LifecycleError> {
        let job = self.state.job();
        let Some(job_id) = job.job_id().cloned() else {
            return Err(LifecycleError::NotPolling);
        };
        match job.status() {
            JobStatus::Completed => Ok(JobOutcome {
                result_url: job.result_url().unwrap_or_default().to_string(),
                download_url: self.state.routes().download(&job_id).to_string(),
                job_id,
            }),
            JobStatus::Failed => Err(LifecycleError::JobFailed {
                detail: job.error_message().unwrap_or_default().to_string(),
                job_id,
            }),
            JobStatus::Idle | JobStatus::Processing => Err(LifecycleError::NotPolling),
        }
    }

    async fn cancel_polling(&mut self) -> Result<JobOutcome, LifecycleError> {
        let effects = self.dispatch(Msg::PollingCancelled);
        self.run_effects(effects).await;
        Err(LifecycleError::Cancelled)
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let (state, effects) = update(self.state.clone(), msg);
        self.state = state;
        if self.state.consume_dirty() {
            self.sink.progress(&self.state.view());
        }
        effects
    }

    async fn run_effects(&mut self, effects: Vec<Effect>) -> EffectRun {
        let mut run = EffectRun::default();
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::SendSubmission {
                    submission,
                    payload,
                } => {
                    let result = self.backend.create_job(&payload).await;
                    let msg = match &result {
                        Ok(job_id) => Msg::SubmitAccepted {
                            submission,
                            job_id: job_id.clone(),
                        },
                        Err(err) => Msg::SubmitFailed {
                            submission,
                            failure: err.to_failure(),
                        },
                    };
                    run.created = Some(result);
                    queue.extend(self.dispatch(msg));
                }
                Effect::StartPolling { job_id } => {
                    studio_info!(job = job_id; "polling every {:?}", self.settings.poll_interval);
                }
                Effect::RequestStatus { job_id, seq } => {
                    run.status_requests += 1;
                    let msg = match self.backend.job_status(&job_id).await {
                        Ok(report) => {
                            studio_debug!(job = job_id; "poll #{} -> {}", seq, report.label());
                            Msg::StatusReceived {
                                seq,
                                report,
                                now_ms: (self.clock)(),
                            }
                        }
                        Err(err) => {
                            studio_warn!(job = job_id; "poll #{} failed: {}", seq, err);
                            Msg::StatusUnavailable {
                                seq,
                                reason: err.to_string(),
                            }
                        }
                    };
                    queue.extend(self.dispatch(msg));
                }
                Effect::StopPolling => {
                    studio_debug!("poll loop stopped");
                }
                Effect::OpenDownload { url } => {
                    run.download_url = Some(url);
                }
                Effect::Notify(notice) => self.sink.notify(&notice),
            }
        }
        run
    }
}

fn write_video(
    dir: &Path,
    job_id: &JobId,
    bytes: &Bytes,
    source: VideoSource,
) -> Result<SavedVideo, LifecycleError> {
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let path = writer.write(&video_filename(job_id), bytes)?;
    let saved = SavedVideo {
        path,
        byte_len: bytes.len() as u64,
        sha256: sha256_hex(bytes),
        source,
    };
    studio_info!(job = job_id; "saved {} bytes to {}", saved.byte_len, saved.path.display());
    Ok(saved)
}

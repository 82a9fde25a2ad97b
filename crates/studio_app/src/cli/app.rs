use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use studio_core::{
    ApiRoutes, Asset, AudioToVideoRequest, GenerationMode, GenerationRequest, JobStatus, Notice,
    SpeakerRoster, TextToVideoRequest, WeightsDirVoiceResolver, MAX_AUDIO_FILES,
};
use studio_engine::{JobLifecycleClient, LifecycleError, NoticeSink, ReqwestBackend, VideoSource};
use studio_logging::{studio_info, studio_warn};
use tokio_util::sync::CancellationToken;

use super::args::{AudioArgs, JobCommand, TtsArgs, WaitArgs};
use super::config::ResolvedConfig;
use super::notices::TerminalNoticeSink;
use super::persistence::{clear_last_job, load_last_job, save_last_job, PersistedJob};

pub(crate) struct Studio {
    client: JobLifecycleClient,
    config: ResolvedConfig,
    sink: Arc<TerminalNoticeSink>,
}

impl Studio {
    pub fn new(config: ResolvedConfig) -> Result<Self> {
        let routes = ApiRoutes::new(&config.api_base).context("invalid backend address")?;
        let backend = ReqwestBackend::new(routes, config.backend.clone())
            .context("could not set up the http client")?;
        let sink = Arc::new(TerminalNoticeSink::default());
        let client = JobLifecycleClient::new(Arc::new(backend))
            .with_settings(config.lifecycle.clone())
            .with_voice_resolver(Arc::new(WeightsDirVoiceResolver::new(
                config.weights_dir.clone(),
            )))
            .with_notice_sink(sink.clone());
        Ok(Self {
            client,
            config,
            sink,
        })
    }

    pub async fn execute(&mut self, command: JobCommand) -> Result<()> {
        match command {
            JobCommand::Tts(args) => self.tts(args).await,
            JobCommand::Audio(args) => self.audio(args).await,
            JobCommand::Status { job_id } => self.status(job_id).await,
            JobCommand::Watch { job_id, output } => {
                let mut record = self.resume(job_id).await?;
                let output = output.unwrap_or_else(|| self.config.output_dir.clone());
                self.follow(&mut record, &output).await
            }
            JobCommand::Download { job_id, output } => self.download(job_id, output).await,
        }
    }

    async fn tts(&mut self, args: TtsArgs) -> Result<()> {
        let image = read_asset(&args.image).await?;

        let highest = args.lines.iter().map(|line| line.speaker).max().unwrap_or(1);
        let requested = args.speakers.unwrap_or(highest);
        let mut roster = SpeakerRoster::with_count(requested);
        if roster.len() < requested {
            self.sink.notify(&Notice::warning(format!(
                "The roster holds at most {} speakers.",
                roster.len()
            )));
        }
        for (number, voice) in &args.voices {
            if !roster.set_voice(*number, *voice) {
                bail!("--voice {number}: there is no speaker {number} (roster of {})", roster.len());
            }
        }
        for (number, name) in &args.names {
            if !roster.set_name(*number, name.clone()) {
                bail!("--name {number}: there is no speaker {number} (roster of {})", roster.len());
            }
        }

        let request = GenerationRequest::TextToVideo(TextToVideoRequest {
            image: Some(image),
            prompt: args.prompt,
            roster,
            dialogue: args.lines,
        });
        self.submit_and_follow(request, args.wait).await
    }

    async fn audio(&mut self, args: AudioArgs) -> Result<()> {
        let image = read_asset(&args.image).await?;
        let mut tracks = Vec::with_capacity(args.audio.len());
        for path in &args.audio {
            tracks.push(read_asset(path).await?);
        }

        let mut request = AudioToVideoRequest {
            image: Some(image),
            audio_files: Vec::new(),
            prompt: args.prompt,
        };
        let dropped = request.add_audio_files(tracks);
        if dropped > 0 {
            self.sink.notify(&Notice::warning(format!(
                "Only the first {MAX_AUDIO_FILES} audio files are used; {dropped} ignored."
            )));
        }
        self.submit_and_follow(GenerationRequest::AudioToVideo(request), args.wait)
            .await
    }

    async fn submit_and_follow(&mut self, request: GenerationRequest, wait: WaitArgs) -> Result<()> {
        let mode = request.mode();
        let job_id = self
            .client
            .submit(request)
            .await
            .context("could not start video generation")?;
        println!("{job_id}");

        let mut record = PersistedJob {
            job_id: job_id.to_string(),
            api_base: self.config.api_base.clone(),
            mode: Some(mode_label(mode).to_string()),
            submitted_at: Utc::now().to_rfc3339(),
            status: JobStatus::Processing.as_str().to_string(),
            error: None,
            video_path: None,
        };
        save_last_job(&self.config.state_dir, &record);

        if wait.no_wait {
            eprintln!("Follow it later with `avatar-studio watch`.");
            return Ok(());
        }
        let output = wait
            .output
            .unwrap_or_else(|| self.config.output_dir.clone());
        self.follow(&mut record, &output).await
    }

    /// Polls until the job settles, then saves the video.
    async fn follow(&mut self, record: &mut PersistedJob, output: &Path) -> Result<()> {
        let cancel = cancel_on_ctrl_c();
        match self.client.poll_until_terminal(&cancel).await {
            Ok(outcome) => {
                record.status = JobStatus::Completed.as_str().to_string();
                record.error = None;
                save_last_job(&self.config.state_dir, record);

                let saved = self.client.save_video(output).await.with_context(|| {
                    format!(
                        "job {} completed but the video could not be saved; try {}",
                        outcome.job_id, outcome.download_url
                    )
                })?;
                record.video_path = Some(saved.path.clone());
                save_last_job(&self.config.state_dir, record);

                let source = match saved.source {
                    VideoSource::Inline => "video",
                    VideoSource::Download => "download",
                };
                eprintln!(
                    "Saved {} bytes from the {source} endpoint (sha256 {}).",
                    saved.byte_len, saved.sha256
                );
                println!("{}", saved.path.display());
                Ok(())
            }
            Err(LifecycleError::JobFailed { job_id, detail }) => {
                record.status = JobStatus::Failed.as_str().to_string();
                record.error = Some(detail.clone());
                save_last_job(&self.config.state_dir, record);
                Err(anyhow!("job {job_id} failed: {detail}"))
            }
            Err(LifecycleError::Cancelled) => {
                eprintln!(
                    "Stopped watching job {}. Resume with `avatar-studio watch`.",
                    record.job_id
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn status(&mut self, job_id: Option<String>) -> Result<()> {
        let mut record = self.resume(job_id).await?;
        let status = self.client.poll_once().await?;
        let view = self.client.view();
        if status == JobStatus::Processing {
            if let Some(reason) = view.last_transient_error {
                bail!("could not get the status of job {}: {reason}", record.job_id);
            }
        }

        record.status = status.as_str().to_string();
        record.error = view.error_message.clone();
        save_last_job(&self.config.state_dir, &record);

        match status {
            JobStatus::Completed => {
                println!("{}: completed", record.job_id);
                if let Some(url) = self.client.download_url() {
                    println!("download: {url}");
                }
            }
            JobStatus::Failed => println!(
                "{}: failed: {}",
                record.job_id,
                view.error_message.unwrap_or_default()
            ),
            _ => println!(
                "{}: {}",
                record.job_id,
                view.remote_status.unwrap_or_else(|| status.to_string())
            ),
        }
        Ok(())
    }

    async fn download(&mut self, job_id: Option<String>, output: Option<PathBuf>) -> Result<()> {
        let mut record = self.resume(job_id).await?;
        let status = self.client.poll_once().await?;
        let view = self.client.view();
        match status {
            JobStatus::Completed => {}
            JobStatus::Failed => bail!(
                "job {} failed: {}",
                record.job_id,
                view.error_message.unwrap_or_default()
            ),
            _ => match view.last_transient_error {
                Some(reason) => bail!("could not get the status of job {}: {reason}", record.job_id),
                None => bail!("job {} is still processing; nothing to download yet", record.job_id),
            },
        }

        let output = output.unwrap_or_else(|| self.config.output_dir.clone());
        let saved = self.client.download_to(&output).await?;
        record.status = JobStatus::Completed.as_str().to_string();
        record.error = None;
        record.video_path = Some(saved.path.clone());
        save_last_job(&self.config.state_dir, &record);
        println!("{}", saved.path.display());
        Ok(())
    }

    /// Starts tracking the given job, or the remembered one.
    async fn resume(&mut self, job_id: Option<String>) -> Result<PersistedJob> {
        let remembered = load_last_job(&self.config.state_dir);
        let Some(record) = select_job(job_id, remembered, &self.config.api_base) else {
            bail!(
                "no job id given and no job remembered in {}",
                self.config.state_dir.display()
            );
        };
        if record.api_base != self.config.api_base {
            studio_warn!(
                job = record.job_id;
                "was created on {}, checking it on {}",
                record.api_base,
                self.config.api_base
            );
        }
        self.client.adopt(record.job_id()).await?;
        save_last_job(&self.config.state_dir, &record);
        Ok(record)
    }
}

/// Forgets the remembered job.
pub(crate) fn reset(state_dir: &Path) {
    if clear_last_job(state_dir) {
        studio_info!("session cleared in {:?}", state_dir);
        eprintln!("Forgot the remembered job.");
    } else {
        eprintln!("No job was remembered.");
    }
}

/// An explicit id wins; the remembered record is reused when it names the
/// same job.
fn select_job(
    job_id: Option<String>,
    remembered: Option<PersistedJob>,
    api_base: &str,
) -> Option<PersistedJob> {
    match (job_id.map(|id| id.trim().to_string()), remembered) {
        (Some(id), Some(last)) if last.job_id == id => Some(last),
        (Some(id), _) if !id.is_empty() => Some(PersistedJob {
            job_id: id,
            api_base: api_base.to_string(),
            mode: None,
            submitted_at: Utc::now().to_rfc3339(),
            status: JobStatus::Processing.as_str().to_string(),
            error: None,
            video_path: None,
        }),
        (Some(_), _) => None,
        (None, remembered) => remembered,
    }
}

fn mode_label(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::TextToVideo => "tts",
        GenerationMode::AudioToVideo => "audio",
    }
}

async fn read_asset(path: &Path) -> Result<Asset> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Asset::new(name, bytes))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::select_job;
    use crate::cli::persistence::PersistedJob;

    fn remembered(id: &str) -> PersistedJob {
        PersistedJob {
            job_id: id.to_string(),
            api_base: "https://old.example".to_string(),
            mode: Some("tts".to_string()),
            submitted_at: "2026-10-16T08:00:00+00:00".to_string(),
            status: "completed".to_string(),
            error: None,
            video_path: None,
        }
    }

    #[test]
    fn remembered_job_is_used_without_an_id() {
        let picked = select_job(None, Some(remembered("abc")), "https://new.example");
        assert_eq!(picked, Some(remembered("abc")));
        assert_eq!(select_job(None, None, "https://new.example"), None);
    }

    #[test]
    fn explicit_id_replaces_a_different_remembered_job() {
        let picked = select_job(
            Some("xyz".to_string()),
            Some(remembered("abc")),
            "https://new.example",
        )
        .unwrap();
        assert_eq!(picked.job_id, "xyz");
        assert_eq!(picked.api_base, "https://new.example");
        assert_eq!(picked.mode, None);
    }

    #[test]
    fn explicit_id_matching_the_remembered_job_keeps_its_record() {
        let picked = select_job(
            Some(" abc ".to_string()),
            Some(remembered("abc")),
            "https://new.example",
        );
        assert_eq!(picked, Some(remembered("abc")));
    }

    #[test]
    fn blank_id_is_refused() {
        assert_eq!(select_job(Some("  ".to_string()), None, "https://x.example"), None);
    }
}

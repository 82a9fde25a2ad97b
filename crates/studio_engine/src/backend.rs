use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use studio_core::{ApiRoutes, Asset, JobId, MediaFailure, StatusReport, Submission};
use studio_logging::{studio_debug, studio_info};

use crate::{BackendRejection, MediaError, SubmitError, TransportError, TransportErrorKind};

/// Header that makes tunnelling proxies answer with the backend response
/// instead of an HTML interstitial.
pub const TUNNEL_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub connect_timeout: Duration,
    /// Budget for a status request. Exceeding it counts as a transient error.
    pub request_timeout: Duration,
    /// Budget for uploads and video transfers.
    pub transfer_timeout: Duration,
    pub max_media_bytes: u64,
    pub skip_tunnel_warning: bool,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(300),
            max_media_bytes: 1024 * 1024 * 1024,
            skip_tunnel_warning: true,
        }
    }
}

/// The remote video-generation service, as seen by the lifecycle client.
#[async_trait::async_trait]
pub trait JobBackend: Send + Sync {
    fn routes(&self) -> &ApiRoutes;

    async fn create_job(&self, submission: &Submission) -> Result<JobId, SubmitError>;

    async fn job_status(&self, job_id: &JobId) -> Result<StatusReport, TransportError>;

    /// Loads the inline playable video.
    async fn fetch_video(&self, url: &str) -> Result<Bytes, MediaError>;

    /// Loads the video through the download endpoint.
    async fn download(&self, url: &str) -> Result<Bytes, TransportError>;
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    routes: ApiRoutes,
    settings: BackendSettings,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(routes: ApiRoutes, settings: BackendSettings) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        if settings.skip_tunnel_warning {
            headers.insert(
                HeaderName::from_static(TUNNEL_WARNING_HEADER),
                HeaderValue::from_static("true"),
            );
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| TransportError::new(TransportErrorKind::Network, err.to_string()))?;
        Ok(Self {
            routes,
            settings,
            client,
        })
    }

    fn build_form(submission: &Submission) -> Result<Form, TransportError> {
        let mut form = Form::new().part("image", file_part(submission.image())?);
        for audio in submission.audio_files() {
            form = form.part("audio_files", file_part(audio)?);
        }
        Ok(form.text("config", submission.config_json().to_string()))
    }

    async fn read_limited(&self, response: reqwest::Response) -> Result<Bytes, TransportError> {
        let max_bytes = self.settings.max_media_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(TransportError::new(
                    TransportErrorKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(TransportError::new(
                    TransportErrorKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(bytes))
    }
}

fn file_part(asset: &Asset) -> Result<Part, TransportError> {
    let part = Part::bytes(asset.bytes().to_vec()).file_name(asset.file_name().to_string());
    match asset.content_type() {
        Some(content_type) => part
            .mime_str(content_type)
            .map_err(|err| TransportError::new(TransportErrorKind::MalformedBody, err.to_string())),
        None => Ok(part),
    }
}

#[async_trait::async_trait]
impl JobBackend for ReqwestBackend {
    fn routes(&self) -> &ApiRoutes {
        &self.routes
    }

    async fn create_job(&self, submission: &Submission) -> Result<JobId, SubmitError> {
        let url = self.routes.create_job(submission.mode());
        studio_debug!(
            "POST {} image={} audio_files={} bytes={}",
            url,
            submission.image().file_name(),
            submission.audio_files().len(),
            submission.total_bytes()
        );
        let form = Self::build_form(submission)?;
        let response = self
            .client
            .post(url)
            .timeout(self.settings.transfer_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(BackendRejection {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let created: CreatedBody = serde_json::from_str(&body).map_err(|err| {
            TransportError::new(TransportErrorKind::MalformedBody, err.to_string())
        })?;
        if created.job_id.trim().is_empty() {
            return Err(TransportError::new(TransportErrorKind::MalformedBody, "empty job_id").into());
        }
        let job_id = JobId::new(created.job_id);
        studio_info!(job = job_id; "created via {:?}", submission.mode());
        Ok(job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> Result<StatusReport, TransportError> {
        let response = self
            .client
            .get(self.routes.status(job_id))
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = header_value(&response, CONTENT_TYPE);
        if !content_type.as_deref().is_some_and(is_json) {
            return Err(TransportError::new(
                TransportErrorKind::NotJson { content_type },
                "status endpoint did not answer with json",
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: StatusBody = serde_json::from_slice(&body).map_err(|err| {
            TransportError::new(TransportErrorKind::MalformedBody, err.to_string())
        })?;
        Ok(StatusReport::from_parts(
            &parsed.status,
            parsed.message.as_deref(),
            parsed.error.as_deref(),
        ))
    }

    async fn fetch_video(&self, url: &str) -> Result<Bytes, MediaError> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.transfer_timeout)
            .send()
            .await
            .map_err(|err| MediaError::new(MediaFailure::Network, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::new(
                MediaFailure::Other,
                format!("http status {}", status.as_u16()),
            ));
        }
        if let Some(content_type) = header_value(&response, CONTENT_TYPE) {
            if !is_playable(&content_type) {
                return Err(MediaError::new(
                    MediaFailure::UnsupportedFormat,
                    format!("unexpected content type {content_type}"),
                ));
            }
        }

        self.read_limited(response).await.map_err(|err| {
            let failure = match err.kind {
                TransportErrorKind::Timeout | TransportErrorKind::Network => MediaFailure::Network,
                _ => MediaFailure::Other,
            };
            MediaError::new(failure, err.to_string())
        })
    }

    async fn download(&self, url: &str) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.settings.transfer_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(
                TransportErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        self.read_limited(response).await
    }
}

fn header_value(response: &reqwest::Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

fn is_json(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "application/json" || essence.ends_with("+json")
}

fn is_playable(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence.starts_with("video/") || essence == "application/octet-stream"
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportErrorKind::Timeout, err.to_string());
    }
    TransportError::new(TransportErrorKind::Network, err.to_string())
}

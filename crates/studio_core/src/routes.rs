use url::Url;

use crate::JobId;

/// Which studio flow a submission belongs to. Each mode has its own
/// job-creation endpoint and payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMode {
    TextToVideo,
    AudioToVideo,
}

impl GenerationMode {
    fn endpoint(self) -> &'static str {
        match self {
            GenerationMode::TextToVideo => "generate-tts-video",
            GenerationMode::AudioToVideo => "generate-audio-video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutesError {
    #[error("invalid api base url: {0}")]
    Parse(#[from] url::ParseError),
    #[error("api base url must be an http(s) url: {0}")]
    UnsupportedBase(String),
}

/// Backend endpoint layout, rooted at an operator-supplied base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    base: Url,
}

impl ApiRoutes {
    pub fn new(base: &str) -> Result<Self, RoutesError> {
        let base = Url::parse(base.trim())?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(RoutesError::UnsupportedBase(base.to_string()));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn create_job(&self, mode: GenerationMode) -> Url {
        self.endpoint(&["api", mode.endpoint()])
    }

    pub fn status(&self, job_id: &JobId) -> Url {
        self.endpoint(&["api", "status", job_id.as_str()])
    }

    /// Inline playable URL. `cache_buster` keeps players from reusing a
    /// stale response for a job id that was polled before completion.
    pub fn video(&self, job_id: &JobId, cache_buster: i64) -> Url {
        let mut url = self.endpoint(&["api", "video", job_id.as_str()]);
        url.query_pairs_mut()
            .append_pair("t", &cache_buster.to_string());
        url
    }

    pub fn download(&self, job_id: &JobId) -> Url {
        self.endpoint(&["api", "download", job_id.as_str()])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // Cannot fail: `new` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

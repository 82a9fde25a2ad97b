use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use studio_core::WeightsDirVoiceResolver;
use studio_engine::{BackendSettings, LifecycleSettings};

use super::args::GlobalArgs;

const DEFAULT_STATE_DIR: &str = ".";
const DEFAULT_OUTPUT_DIR: &str = ".";

/// Optional settings file. Every key may be omitted; command-line flags and
/// environment variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub api_base: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub transfer_timeout_secs: Option<u64>,
    pub max_media_mb: Option<u64>,
    pub skip_tunnel_warning: Option<bool>,
    pub weights_dir: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        ron::from_str(&content)
            .with_context(|| format!("could not parse config file {}", path.display()))
    }
}

/// Effective settings after merging flags, environment, file and defaults.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base: String,
    pub backend: BackendSettings,
    pub lifecycle: LifecycleSettings,
    pub weights_dir: String,
    pub state_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ResolvedConfig {
    pub fn resolve(file: StudioConfig, args: &GlobalArgs) -> Result<Self> {
        let state_dir = state_dir(&file, args);
        let Some(api_base) = args
            .api_base
            .clone()
            .or(file.api_base)
            .filter(|base| !base.trim().is_empty())
        else {
            bail!("no backend address: pass --api-base or set STUDIO_API_BASE");
        };

        let defaults = BackendSettings::default();
        let backend = BackendSettings {
            connect_timeout: file
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            request_timeout: args
                .request_timeout
                .or(file.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            transfer_timeout: file
                .transfer_timeout_secs
                .map_or(defaults.transfer_timeout, Duration::from_secs),
            max_media_bytes: file
                .max_media_mb
                .map_or(defaults.max_media_bytes, |mb| mb.saturating_mul(1024 * 1024)),
            skip_tunnel_warning: file
                .skip_tunnel_warning
                .unwrap_or(defaults.skip_tunnel_warning),
        };

        let lifecycle = match args.poll_interval.or(file.poll_interval_secs) {
            Some(0) => bail!("poll interval must be at least one second"),
            Some(secs) => LifecycleSettings {
                poll_interval: Duration::from_secs(secs),
            },
            None => LifecycleSettings::default(),
        };

        Ok(Self {
            api_base,
            backend,
            lifecycle,
            weights_dir: args
                .weights_dir
                .clone()
                .or(file.weights_dir)
                .unwrap_or_else(|| WeightsDirVoiceResolver::DEFAULT_WEIGHTS_DIR.to_string()),
            state_dir,
            output_dir: file
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }
}

/// Session directory; needed even by commands that never talk to the backend.
pub fn state_dir(file: &StudioConfig, args: &GlobalArgs) -> PathBuf {
    args.state_dir
        .clone()
        .or_else(|| file.state_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
}

//! Studio engine: backend IO and effect execution for the job lifecycle.
mod backend;
mod filename;
mod lifecycle;
mod notice;
mod persist;
mod types;

pub use backend::{BackendSettings, JobBackend, ReqwestBackend, TUNNEL_WARNING_HEADER};
pub use filename::{sha256_hex, video_filename};
pub use lifecycle::{Clock, JobLifecycleClient, LifecycleSettings};
pub use notice::{LogNoticeSink, NoticeSink};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{
    BackendRejection, JobOutcome, LifecycleError, MediaError, SavedVideo, SubmitError,
    TransportError, TransportErrorKind, VideoSource,
};

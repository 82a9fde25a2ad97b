//! Studio core: pure job lifecycle state machine, generation config builder
//! and backend route layout.
mod config;
mod effect;
mod msg;
mod report;
mod routes;
mod state;
mod submission;
mod update;
mod view_model;

pub use config::{
    DialogueLine, Speaker, SpeakerRoster, TtsAudio, UnknownVoice, Voice, VoiceResolver,
    WeightsDirVoiceResolver, MAX_SPEAKERS, MAX_VOICED_SPEAKERS,
};
pub use effect::{Effect, Notice, NoticeLevel};
pub use msg::Msg;
pub use report::{MediaFailure, StatusReport, SubmitFailure};
pub use routes::{ApiRoutes, GenerationMode, RoutesError};
pub use state::{Job, JobId, JobStatus, StudioState};
pub use submission::{
    Asset, AudioToVideoRequest, GenerationRequest, Submission, TextToVideoRequest,
    ValidationError, DEFAULT_AUDIO_PROMPT, DEFAULT_TTS_PROMPT, MAX_AUDIO_FILES,
};
pub use update::update;
pub use view_model::StudioViewModel;

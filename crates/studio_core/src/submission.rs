use std::path::Path;

use bytes::Bytes;

use crate::config::{AudioConfig, SpeakerRoster, TtsConfig};
use crate::{DialogueLine, GenerationMode, TtsAudio, VoiceResolver};

/// The backend mixes at most this many uploaded speaker tracks.
pub const MAX_AUDIO_FILES: usize = 3;
pub const DEFAULT_TTS_PROMPT: &str = "A new avatar video.";
pub const DEFAULT_AUDIO_PROMPT: &str = "A person speaking with synchronized lip movements.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("an image is required")]
    MissingImage,
    #[error("at least one audio file is required")]
    MissingAudio,
    #[error("at most {max} audio files are supported, got {count}")]
    TooManyAudioFiles { count: usize, max: usize },
    #[error("dialogue text is empty")]
    EmptyDialogue,
    #[error("dialogue line {line} references unknown speaker {speaker}")]
    UnknownSpeaker { line: usize, speaker: usize },
    #[error("speaker {speaker} has no voice selected")]
    MissingVoice { speaker: usize },
    #[error("at most {max} voiced speakers are supported, got {count}")]
    TooManySpeakers { count: usize, max: usize },
    #[error("file {name} is empty")]
    EmptyAsset { name: String },
    #[error("configuration could not be encoded: {0}")]
    Encoding(String),
}

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl Asset {
    /// The content type is guessed from the file extension.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        _ => return None,
    };
    Some(mime)
}

/// Input of the text-driven studio: the backend synthesizes speech from the
/// dialogue with the selected voices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextToVideoRequest {
    pub image: Option<Asset>,
    pub prompt: String,
    pub roster: SpeakerRoster,
    pub dialogue: Vec<DialogueLine>,
}

/// Input of the audio-driven studio: one uploaded track per speaker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioToVideoRequest {
    pub image: Option<Asset>,
    pub audio_files: Vec<Asset>,
    pub prompt: String,
}

impl AudioToVideoRequest {
    /// Appends tracks up to [`MAX_AUDIO_FILES`]; returns how many were dropped.
    pub fn add_audio_files(&mut self, files: impl IntoIterator<Item = Asset>) -> usize {
        let mut dropped = 0;
        for file in files {
            if self.audio_files.len() < MAX_AUDIO_FILES {
                self.audio_files.push(file);
            } else {
                dropped += 1;
            }
        }
        dropped
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    TextToVideo(TextToVideoRequest),
    AudioToVideo(AudioToVideoRequest),
}

impl GenerationRequest {
    pub fn mode(&self) -> GenerationMode {
        match self {
            GenerationRequest::TextToVideo(_) => GenerationMode::TextToVideo,
            GenerationRequest::AudioToVideo(_) => GenerationMode::AudioToVideo,
        }
    }

    /// Validates the request and encodes its configuration. Nothing here
    /// touches the network.
    pub fn into_submission(
        self,
        resolver: &dyn VoiceResolver,
    ) -> Result<Submission, ValidationError> {
        match self {
            GenerationRequest::TextToVideo(request) => {
                let image = require_image(request.image)?;
                let tts_audio = TtsAudio::build(&request.roster, &request.dialogue, resolver)?;
                let config = TtsConfig {
                    prompt: prompt_or(&request.prompt, DEFAULT_TTS_PROMPT),
                    tts_audio: &tts_audio,
                };
                let config_json = serde_json::to_string(&config)
                    .map_err(|err| ValidationError::Encoding(err.to_string()))?;
                Ok(Submission {
                    mode: GenerationMode::TextToVideo,
                    image,
                    audio_files: Vec::new(),
                    config_json,
                })
            }
            GenerationRequest::AudioToVideo(request) => {
                let image = require_image(request.image)?;
                match request.audio_files.len() {
                    0 => return Err(ValidationError::MissingAudio),
                    count if count > MAX_AUDIO_FILES => {
                        return Err(ValidationError::TooManyAudioFiles {
                            count,
                            max: MAX_AUDIO_FILES,
                        })
                    }
                    _ => {}
                }
                if let Some(empty) = request.audio_files.iter().find(|asset| asset.is_empty()) {
                    return Err(ValidationError::EmptyAsset {
                        name: empty.file_name().to_string(),
                    });
                }
                let config = AudioConfig {
                    prompt: prompt_or(&request.prompt, DEFAULT_AUDIO_PROMPT),
                };
                let config_json = serde_json::to_string(&config)
                    .map_err(|err| ValidationError::Encoding(err.to_string()))?;
                Ok(Submission {
                    mode: GenerationMode::AudioToVideo,
                    image,
                    audio_files: request.audio_files,
                    config_json,
                })
            }
        }
    }
}

fn require_image(image: Option<Asset>) -> Result<Asset, ValidationError> {
    let image = image.ok_or(ValidationError::MissingImage)?;
    if image.is_empty() {
        return Err(ValidationError::EmptyAsset {
            name: image.file_name().to_string(),
        });
    }
    Ok(image)
}

fn prompt_or<'a>(prompt: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

/// A validated multipart payload, ready to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    mode: GenerationMode,
    image: Asset,
    audio_files: Vec<Asset>,
    config_json: String,
}

impl Submission {
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn image(&self) -> &Asset {
        &self.image
    }

    pub fn audio_files(&self) -> &[Asset] {
        &self.audio_files
    }

    /// JSON text of the `config` form field.
    pub fn config_json(&self) -> &str {
        &self.config_json
    }

    pub fn total_bytes(&self) -> usize {
        self.image.len() + self.audio_files.iter().map(Asset::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Voice, WeightsDirVoiceResolver};

    fn image() -> Asset {
        Asset::new("face.PNG", &b"\x89PNG"[..])
    }

    fn audio(name: &str) -> Asset {
        Asset::new(name, &b"RIFF"[..])
    }

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(image().content_type(), Some("image/png"));
        assert_eq!(audio("a.wav").content_type(), Some("audio/wav"));
        assert_eq!(Asset::new("blob", &b"x"[..]).content_type(), None);
        assert_eq!(
            Asset::new("blob", &b"x"[..])
                .with_content_type("audio/x-custom")
                .content_type(),
            Some("audio/x-custom")
        );
    }

    #[test]
    fn audio_request_caps_tracks() {
        let mut request = AudioToVideoRequest::default();
        let dropped = request.add_audio_files((1..=5).map(|n| audio(&format!("{n}.wav"))));
        assert_eq!(dropped, 2);
        assert_eq!(request.audio_files.len(), MAX_AUDIO_FILES);
        assert_eq!(request.audio_files[2].file_name(), "3.wav");
        assert_eq!(request.add_audio_files([audio("6.wav")]), 1);
    }

    #[test]
    fn audio_submission_uses_default_prompt() {
        let request = GenerationRequest::AudioToVideo(AudioToVideoRequest {
            image: Some(image()),
            audio_files: vec![audio("a.wav")],
            prompt: "   ".to_string(),
        });
        let submission = request
            .into_submission(&WeightsDirVoiceResolver::default())
            .unwrap();
        assert_eq!(submission.mode(), GenerationMode::AudioToVideo);
        assert_eq!(
            submission.config_json(),
            r#"{"prompt":"A person speaking with synchronized lip movements."}"#
        );
        assert_eq!(submission.total_bytes(), 8);
    }

    #[test]
    fn text_submission_embeds_resolved_voices() {
        let mut roster = SpeakerRoster::with_count(1);
        roster.set_voice(1, Voice::CrispFemale);
        let request = GenerationRequest::TextToVideo(TextToVideoRequest {
            image: Some(image()),
            prompt: "A news anchor".to_string(),
            roster,
            dialogue: vec![DialogueLine::new(1, "Good evening.")],
        });
        let submission = request
            .into_submission(&WeightsDirVoiceResolver::new("/w"))
            .unwrap();
        let config: serde_json::Value = serde_json::from_str(submission.config_json()).unwrap();
        assert_eq!(config["prompt"], "A news anchor");
        assert_eq!(config["tts_audio"]["text"], "Good evening.");
        assert_eq!(
            config["tts_audio"]["human1_voice"],
            "/w/Kokoro-82M/voices/af_heart.pt"
        );
        assert!(submission.audio_files().is_empty());
    }

    #[test]
    fn missing_and_excess_assets_are_rejected() {
        let resolver = WeightsDirVoiceResolver::default();
        let no_image = GenerationRequest::AudioToVideo(AudioToVideoRequest {
            image: None,
            audio_files: vec![audio("a.wav")],
            prompt: String::new(),
        });
        assert_eq!(
            no_image.into_submission(&resolver),
            Err(ValidationError::MissingImage)
        );

        let no_audio = GenerationRequest::AudioToVideo(AudioToVideoRequest {
            image: Some(image()),
            ..AudioToVideoRequest::default()
        });
        assert_eq!(
            no_audio.into_submission(&resolver),
            Err(ValidationError::MissingAudio)
        );

        let too_many = GenerationRequest::AudioToVideo(AudioToVideoRequest {
            image: Some(image()),
            audio_files: (0..4).map(|n| audio(&format!("{n}.wav"))).collect(),
            prompt: String::new(),
        });
        assert_eq!(
            too_many.into_submission(&resolver),
            Err(ValidationError::TooManyAudioFiles { count: 4, max: 3 })
        );

        let empty_image = GenerationRequest::AudioToVideo(AudioToVideoRequest {
            image: Some(Asset::new("blank.png", Bytes::new())),
            audio_files: vec![audio("a.wav")],
            prompt: String::new(),
        });
        assert_eq!(
            empty_image.into_submission(&resolver),
            Err(ValidationError::EmptyAsset {
                name: "blank.png".to_string()
            })
        );
    }
}

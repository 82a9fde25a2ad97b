//! Typed generation configuration: speaker roster, dialogue lines, voices and
//! the JSON `config` part sent alongside the uploaded assets.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::ValidationError;

/// Upper bound of the roster editor.
pub const MAX_SPEAKERS: usize = 10;
/// The backend synthesizes at most this many distinct voices per job.
pub const MAX_VOICED_SPEAKERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Voice {
    CrispFemale,
    DeepMale,
    ChildPlay,
    Robotic,
}

impl Voice {
    pub const ALL: [Voice; 4] = [
        Voice::CrispFemale,
        Voice::DeepMale,
        Voice::ChildPlay,
        Voice::Robotic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Voice::CrispFemale => "Crisp Female",
            Voice::DeepMale => "Deep Male",
            Voice::ChildPlay => "Child Play",
            Voice::Robotic => "Robotic",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Voice::CrispFemale => "crisp-female",
            Voice::DeepMale => "deep-male",
            Voice::ChildPlay => "child-play",
            Voice::Robotic => "robotic",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown voice {0:?} (expected crisp-female, deep-male, child-play or robotic)")]
pub struct UnknownVoice(pub String);

impl FromStr for Voice {
    type Err = UnknownVoice;

    /// Accepts labels and slugs, ignoring case, spaces, `-` and `_`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        Voice::ALL
            .into_iter()
            .find(|voice| voice.slug().replace('-', "") == key)
            .ok_or_else(|| UnknownVoice(raw.to_string()))
    }
}

/// Maps a studio voice to whatever the backend expects in `humanN_voice`.
pub trait VoiceResolver: Send + Sync {
    fn resolve(&self, voice: Voice) -> String;
}

/// Resolves voices to Kokoro voice tensors below a model-weights directory,
/// the layout used by Kokoro-based backend deployments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightsDirVoiceResolver {
    weights_dir: String,
}

impl WeightsDirVoiceResolver {
    pub const DEFAULT_WEIGHTS_DIR: &'static str = "weights";

    pub fn new(weights_dir: impl Into<String>) -> Self {
        Self {
            weights_dir: weights_dir.into(),
        }
    }

    fn voice_file(voice: Voice) -> &'static str {
        match voice {
            Voice::CrispFemale => "af_heart",
            Voice::DeepMale => "am_adam",
            Voice::ChildPlay => "af_nicole",
            Voice::Robotic => "am_echo",
        }
    }
}

impl Default for WeightsDirVoiceResolver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WEIGHTS_DIR)
    }
}

impl VoiceResolver for WeightsDirVoiceResolver {
    fn resolve(&self, voice: Voice) -> String {
        format!(
            "{}/Kokoro-82M/voices/{}.pt",
            self.weights_dir.trim_end_matches('/'),
            Self::voice_file(voice)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Speaker {
    pub name: String,
    pub voice: Option<Voice>,
}

impl Speaker {
    fn numbered(number: usize) -> Self {
        Self {
            name: format!("Speaker {number}"),
            voice: None,
        }
    }
}

/// Speakers are addressed by 1-based number, matching how they are shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpeakerRoster {
    speakers: Vec<Speaker>,
}

impl SpeakerRoster {
    pub fn with_count(count: usize) -> Self {
        let mut roster = Self::default();
        roster.resize(count);
        roster
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    pub fn get(&self, number: usize) -> Option<&Speaker> {
        number.checked_sub(1).and_then(|idx| self.speakers.get(idx))
    }

    /// Grows or shrinks the roster, keeping names and voices of the speakers
    /// that remain. Returns the clamped count.
    pub fn resize(&mut self, count: usize) -> usize {
        let count = count.min(MAX_SPEAKERS);
        if count < self.speakers.len() {
            self.speakers.truncate(count);
        } else {
            let start = self.speakers.len() + 1;
            self.speakers.extend((start..=count).map(Speaker::numbered));
        }
        count
    }

    pub fn set_voice(&mut self, number: usize, voice: Voice) -> bool {
        match self.get_mut(number) {
            Some(speaker) => {
                speaker.voice = Some(voice);
                true
            }
            None => false,
        }
    }

    pub fn set_name(&mut self, number: usize, name: impl Into<String>) -> bool {
        match self.get_mut(number) {
            Some(speaker) => {
                speaker.name = name.into();
                true
            }
            None => false,
        }
    }

    fn get_mut(&mut self, number: usize) -> Option<&mut Speaker> {
        let idx = number.checked_sub(1)?;
        self.speakers.get_mut(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    /// 1-based roster number.
    pub speaker: usize,
    pub text: String,
}

impl DialogueLine {
    pub fn new(speaker: usize, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// The `tts_audio` object: the dialogue text plus one `humanN_voice` entry
/// per voiced speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtsAudio {
    pub text: String,
    #[serde(flatten)]
    pub voices: BTreeMap<String, String>,
}

impl TtsAudio {
    /// Builds the TTS section from the roster and dialogue.
    ///
    /// Referenced speakers are packed into backend slots `human1..human3` in
    /// roster order. With more than one slot every line is prefixed with its
    /// `(sN)` marker so the backend can split the text per voice.
    pub fn build(
        roster: &SpeakerRoster,
        dialogue: &[DialogueLine],
        resolver: &dyn VoiceResolver,
    ) -> Result<Self, ValidationError> {
        let mut spoken = Vec::new();
        for (idx, line) in dialogue.iter().enumerate() {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }
            let speaker = roster
                .get(line.speaker)
                .ok_or(ValidationError::UnknownSpeaker {
                    line: idx + 1,
                    speaker: line.speaker,
                })?;
            let voice = speaker.voice.ok_or(ValidationError::MissingVoice {
                speaker: line.speaker,
            })?;
            spoken.push((line.speaker, voice, text));
        }
        if spoken.is_empty() {
            return Err(ValidationError::EmptyDialogue);
        }

        let referenced: BTreeSet<usize> = spoken.iter().map(|(number, _, _)| *number).collect();
        if referenced.len() > MAX_VOICED_SPEAKERS {
            return Err(ValidationError::TooManySpeakers {
                count: referenced.len(),
                max: MAX_VOICED_SPEAKERS,
            });
        }
        let slot_of = |number: usize| {
            referenced
                .iter()
                .position(|candidate| *candidate == number)
                .map_or(1, |pos| pos + 1)
        };

        let mut voices = BTreeMap::new();
        for (number, voice, _) in &spoken {
            voices
                .entry(format!("human{}_voice", slot_of(*number)))
                .or_insert_with(|| resolver.resolve(*voice));
        }

        let multi = referenced.len() > 1;
        let text = spoken
            .iter()
            .map(|(number, _, text)| {
                if multi {
                    format!("(s{}) {}", slot_of(*number), text)
                } else {
                    (*text).to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self { text, voices })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TtsConfig<'a> {
    pub(crate) prompt: &'a str,
    pub(crate) tts_audio: &'a TtsAudio,
}

#[derive(Debug, Serialize)]
pub(crate) struct AudioConfig<'a> {
    pub(crate) prompt: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlugResolver;

    impl VoiceResolver for SlugResolver {
        fn resolve(&self, voice: Voice) -> String {
            voice.slug().to_string()
        }
    }

    fn roster_with(voices: &[Option<Voice>]) -> SpeakerRoster {
        let mut roster = SpeakerRoster::with_count(voices.len());
        for (idx, voice) in voices.iter().enumerate() {
            if let Some(voice) = voice {
                roster.set_voice(idx + 1, *voice);
            }
        }
        roster
    }

    #[test]
    fn voice_parses_labels_and_slugs() {
        assert_eq!("Deep Male".parse::<Voice>(), Ok(Voice::DeepMale));
        assert_eq!("crisp-female".parse::<Voice>(), Ok(Voice::CrispFemale));
        assert_eq!("CHILD_PLAY".parse::<Voice>(), Ok(Voice::ChildPlay));
        assert!("baritone".parse::<Voice>().is_err());
    }

    #[test]
    fn weights_resolver_builds_voice_paths() {
        let resolver = WeightsDirVoiceResolver::new("/models/weights/");
        assert_eq!(
            resolver.resolve(Voice::DeepMale),
            "/models/weights/Kokoro-82M/voices/am_adam.pt"
        );
    }

    #[test]
    fn roster_resize_keeps_existing_speakers_and_clamps() {
        let mut roster = SpeakerRoster::with_count(2);
        roster.set_name(1, "Host");
        roster.set_voice(1, Voice::Robotic);

        assert_eq!(roster.resize(4), 4);
        assert_eq!(roster.get(1).unwrap().name, "Host");
        assert_eq!(roster.get(1).unwrap().voice, Some(Voice::Robotic));
        assert_eq!(roster.get(4).unwrap().name, "Speaker 4");

        assert_eq!(roster.resize(50), MAX_SPEAKERS);
        assert_eq!(roster.resize(1), 1);
        assert_eq!(roster.get(1).unwrap().name, "Host");
        assert!(roster.get(2).is_none());
        assert!(roster.get(0).is_none());
        assert!(!roster.set_voice(3, Voice::DeepMale));
    }

    #[test]
    fn single_speaker_text_has_no_markers() {
        let roster = roster_with(&[Some(Voice::CrispFemale)]);
        let dialogue = [
            DialogueLine::new(1, " Hello there. "),
            DialogueLine::new(1, ""),
            DialogueLine::new(1, "Welcome!"),
        ];
        let tts = TtsAudio::build(&roster, &dialogue, &SlugResolver).unwrap();
        assert_eq!(tts.text, "Hello there. Welcome!");
        assert_eq!(tts.voices.len(), 1);
        assert_eq!(tts.voices["human1_voice"], "crisp-female");
    }

    #[test]
    fn speakers_are_packed_into_slots_with_markers() {
        let roster = roster_with(&[None, Some(Voice::DeepMale), Some(Voice::Robotic)]);
        let dialogue = [
            DialogueLine::new(3, "Beep."),
            DialogueLine::new(2, "Hi."),
            DialogueLine::new(3, "Boop."),
        ];
        let tts = TtsAudio::build(&roster, &dialogue, &SlugResolver).unwrap();
        assert_eq!(tts.text, "(s2) Beep. (s1) Hi. (s2) Boop.");
        assert_eq!(tts.voices["human1_voice"], "deep-male");
        assert_eq!(tts.voices["human2_voice"], "robotic");
    }

    #[test]
    fn tts_audio_serializes_voice_keys_flat() {
        let roster = roster_with(&[Some(Voice::DeepMale)]);
        let tts = TtsAudio::build(&roster, &[DialogueLine::new(1, "Hi")], &SlugResolver).unwrap();
        let json = serde_json::to_value(TtsConfig {
            prompt: "p",
            tts_audio: &tts,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "prompt": "p",
                "tts_audio": { "text": "Hi", "human1_voice": "deep-male" }
            })
        );
    }

    #[test]
    fn dialogue_validation_errors() {
        let roster = roster_with(&[Some(Voice::DeepMale), None]);
        assert_eq!(
            TtsAudio::build(&roster, &[DialogueLine::new(1, "  ")], &SlugResolver),
            Err(ValidationError::EmptyDialogue)
        );
        assert_eq!(
            TtsAudio::build(&roster, &[DialogueLine::new(5, "x")], &SlugResolver),
            Err(ValidationError::UnknownSpeaker {
                line: 1,
                speaker: 5
            })
        );
        assert_eq!(
            TtsAudio::build(&roster, &[DialogueLine::new(2, "x")], &SlugResolver),
            Err(ValidationError::MissingVoice { speaker: 2 })
        );

        let crowded = roster_with(&[Some(Voice::DeepMale); 4]);
        let dialogue: Vec<_> = (1..=4).map(|n| DialogueLine::new(n, "line")).collect();
        assert_eq!(
            TtsAudio::build(&crowded, &dialogue, &SlugResolver),
            Err(ValidationError::TooManySpeakers {
                count: 4,
                max: MAX_VOICED_SPEAKERS
            })
        );
    }
}

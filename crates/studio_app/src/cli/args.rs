use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use studio_core::{DialogueLine, Voice};

use super::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "avatar-studio")]
#[command(about = "Generate talking-avatar videos on a remote studio backend")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Backend base URL, e.g. https://my-tunnel.ngrok-free.app
    #[arg(long, env = "STUDIO_API_BASE", global = true)]
    pub api_base: Option<String>,

    /// Seconds between status polls
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Seconds before a status request counts as failed
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,

    /// Model weights directory on the backend host, used to name voice files
    #[arg(long, env = "STUDIO_WEIGHTS_DIR", global = true)]
    pub weights_dir: Option<String>,

    /// Directory holding the remembered session
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// RON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Where log lines go
    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    pub log: LogDestination,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Job(JobCommand),

    /// Forget the remembered job
    Reset,
}

/// Commands that talk to the backend.
#[derive(Debug, Subcommand)]
pub enum JobCommand {
    /// Generate a video from an image and a scripted dialogue
    Tts(TtsArgs),

    /// Generate a video from an image and recorded speech
    Audio(AudioArgs),

    /// Check a job once
    Status {
        /// Job id; defaults to the remembered job
        job_id: Option<String>,
    },

    /// Poll a job until it finishes, then save the video
    Watch {
        /// Job id; defaults to the remembered job
        job_id: Option<String>,

        /// Directory for the finished video
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save a finished video through the download endpoint
    Download {
        /// Job id; defaults to the remembered job
        job_id: Option<String>,

        /// Directory for the video
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct TtsArgs {
    /// Portrait image
    #[arg(long)]
    pub image: PathBuf,

    /// Scene prompt; a default is used when blank
    #[arg(long, default_value = "")]
    pub prompt: String,

    /// Roster size; defaults to the highest speaker used in --line
    #[arg(long)]
    pub speakers: Option<usize>,

    /// Voice of a speaker, as N=VOICE (crisp-female, deep-male, child-play, robotic)
    #[arg(long = "voice", value_parser = parse_voice)]
    pub voices: Vec<(usize, Voice)>,

    /// Display name of a speaker, as N=NAME
    #[arg(long = "name", value_parser = parse_name)]
    pub names: Vec<(usize, String)>,

    /// One dialogue line, as N:TEXT
    #[arg(long = "line", value_parser = parse_line, required = true)]
    pub lines: Vec<DialogueLine>,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Debug, Args)]
pub struct AudioArgs {
    /// Portrait image
    #[arg(long)]
    pub image: PathBuf,

    /// Speech track, one per speaker (at most 3 are used)
    #[arg(long = "audio", required = true)]
    pub audio: Vec<PathBuf>,

    /// Scene prompt; a default is used when blank
    #[arg(long, default_value = "")]
    pub prompt: String,

    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Debug, Args)]
pub struct WaitArgs {
    /// Return right after the job is created
    #[arg(long)]
    pub no_wait: bool,

    /// Directory for the finished video
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_speaker_number(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("speaker number must be 1 or more, got {raw:?}")),
        Ok(number) => Ok(number),
    }
}

fn parse_voice(raw: &str) -> Result<(usize, Voice), String> {
    let (number, voice) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected N=VOICE, got {raw:?}"))?;
    let voice = voice.parse::<Voice>().map_err(|err| err.to_string())?;
    Ok((parse_speaker_number(number)?, voice))
}

fn parse_name(raw: &str) -> Result<(usize, String), String> {
    let (number, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected N=NAME, got {raw:?}"))?;
    Ok((parse_speaker_number(number)?, name.trim().to_string()))
}

fn parse_line(raw: &str) -> Result<DialogueLine, String> {
    let (number, text) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected N:TEXT, got {raw:?}"))?;
    Ok(DialogueLine::new(parse_speaker_number(number)?, text.trim()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use studio_core::{DialogueLine, Voice};

    use super::{Cli, Command, JobCommand};

    #[test]
    fn tts_command_parses_voices_and_lines() {
        let cli = Cli::try_parse_from([
            "avatar-studio",
            "--api-base",
            "https://backend.example",
            "tts",
            "--image",
            "face.png",
            "--voice",
            "1=Crisp Female",
            "--voice",
            "2=deep_male",
            "--line",
            "1: Hello there.",
            "--line",
            "2:Hi!",
            "--no-wait",
        ])
        .unwrap();

        let Command::Job(JobCommand::Tts(args)) = cli.command else {
            panic!("expected tts command");
        };
        assert_eq!(args.voices, vec![(1, Voice::CrispFemale), (2, Voice::DeepMale)]);
        assert_eq!(
            args.lines,
            vec![DialogueLine::new(1, "Hello there."), DialogueLine::new(2, "Hi!")]
        );
        assert!(args.wait.no_wait);
        assert_eq!(cli.global.api_base.as_deref(), Some("https://backend.example"));
    }

    #[test]
    fn malformed_line_is_rejected() {
        assert!(Cli::try_parse_from([
            "avatar-studio",
            "tts",
            "--image",
            "face.png",
            "--line",
            "no speaker here",
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "avatar-studio",
            "tts",
            "--image",
            "face.png",
            "--line",
            "0:zero is not a speaker",
        ])
        .is_err());
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["avatar-studio", "status", "abc123", "--poll-interval", "2"])
            .unwrap();
        assert_eq!(cli.global.poll_interval, Some(2));
        assert!(matches!(
            cli.command,
            Command::Job(JobCommand::Status { job_id: Some(ref id) }) if id == "abc123"
        ));
    }

    #[test]
    fn reset_is_kept_apart_from_backend_commands() {
        let cli = Cli::try_parse_from(["avatar-studio", "reset"]).unwrap();
        assert!(matches!(cli.command, Command::Reset));

        let cli = Cli::try_parse_from(["avatar-studio", "watch"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Job(JobCommand::Watch { job_id: None, output: None })
        ));
    }
}

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use attune_app::runtime::{run_session, SessionOptions};
use attune_session::{SessionConfig, SessionMode};

#[derive(Parser, Debug)]
#[command(name = "attune", about = "Voice companion session client", version)]
struct Args {
    /// Base WebSocket URL of the session backend
    #[arg(long, default_value = "ws://127.0.0.1:8765/ws/session")]
    server_url: String,

    /// Explicit session identifier (default: randomly generated)
    #[arg(long)]
    session_id: Option<String>,

    /// Conversation domain
    #[arg(long, value_enum, default_value = "wellness")]
    mode: ModeArg,

    /// Synthesis voice id
    #[arg(long, default_value = "default")]
    voice: String,

    /// Primary speech recognition locale
    #[arg(long, default_value = "en-US")]
    language: String,

    /// Additional recognition locales
    #[arg(long = "alternative-language")]
    alternative_languages: Vec<String>,

    /// Let local speech interrupt assistant playback
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    allow_interruptions: bool,

    /// Disable server-side voice activity detection
    #[arg(long)]
    no_server_vad: bool,

    /// System prompt override for the conversation
    #[arg(long, default_value = "")]
    system_prompt: String,

    /// Input device name (default: platform default microphone)
    #[arg(long)]
    device: Option<String>,

    /// Output device name (default: platform default speakers)
    #[arg(long)]
    output_device: Option<String>,

    /// Log filter, e.g. "info" or "attune_audio=debug"
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Study,
    Wellness,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Study => SessionMode::Study,
            ModeArg::Wellness => SessionMode::Wellness,
        }
    }
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "attune.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(EnvFilter::new(filter))
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;
    tracing::info!("Starting attune session client");

    let config = SessionConfig {
        system_prompt: args.system_prompt.clone(),
        voice: args.voice.clone(),
        allow_interruptions: args.allow_interruptions,
        mode: args.mode.into(),
        vad_enabled: !args.no_server_vad,
        language: args.language.clone(),
        alternative_languages: args.alternative_languages.clone(),
    };

    let options = SessionOptions {
        server_url: args.server_url,
        session_id: args.session_id,
        input_device: args.device,
        output_device: args.output_device,
        config,
    };

    run_session(options).await
}

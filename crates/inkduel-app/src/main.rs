use clap::{Parser, ValueEnum};
use inkduel_app::{ReplayOptions, load_config, run};
use inkduel_core::session::RoomMode;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Single,
    Team,
}

impl From<Mode> for RoomMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Single => RoomMode::Single,
            Mode::Team => RoomMode::Team,
        }
    }
}

#[derive(Parser)]
#[command(name = "inkduel-replay", version, about = "Replay an InkDuel room transcript into SVG boards")]
struct Cli {
    /// JSON-lines file of server messages
    #[arg(long)]
    transcript: PathBuf,
    /// Local participant id, used to recognize own echoes
    #[arg(long, env = "INKDUEL_PARTICIPANT")]
    participant: Option<String>,
    #[arg(long, value_enum, default_value = "single")]
    mode: Mode,
    /// Container width the boards are laid out in, in pixels
    #[arg(long, default_value_t = 800.0)]
    width: f64,
    /// JSON session config; missing fields keep their defaults
    #[arg(long, env = "INKDUEL_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, default_value = "out")]
    out: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Replaying {}", cli.transcript.display());

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = ReplayOptions {
        transcript: cli.transcript,
        participant: cli.participant,
        mode: cli.mode.into(),
        width: cli.width,
        config,
        out_dir: cli.out,
    };

    match run(&options) {
        Ok(summary) => {
            println!(
                "replayed {} messages ({} skipped), sent {}, wrote {} files",
                summary.messages,
                summary.skipped,
                summary.outgoing.len(),
                summary.files.len()
            );
            for file in &summary.files {
                println!("  {}", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("replay failed: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Voice CNC Console
//!
//! Drives the full pipeline against a mock machine link: type what the
//! recognizer would have heard and see what the controller would receive.

use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use machine_link::{MockLink, SentCommand};
use voice_core::{
    Session, SessionOutcome, SessionSettings, SettingsStore, SpeechSink, VoiceError,
};

#[derive(Parser)]
#[command(name = "voice-cnc")]
#[command(about = "Voice command console for CNC control")]
struct Args {
    /// Interactive mode (read transcripts from stdin)
    #[arg(long)]
    interactive: bool,

    /// Process a single transcript and exit
    #[arg(long)]
    transcript: Option<String>,

    /// Settings file, created on the first settings change
    #[arg(long, default_value = "voice-cnc-settings.json")]
    settings: PathBuf,

    /// Skip the confirmation gate
    #[arg(long)]
    no_confirm: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let args = Args::parse();

    info!("🎤 Starting voice CNC console");

    let link = MockLink::new();
    let log = link.log_handle();

    let mut session =
        Session::new(link, Box::new(ConsoleSpeech)).with_settings(SessionSettings::default());
    session.attach_store(Box::new(FileStore {
        path: args.settings.clone(),
    }));
    if args.no_confirm {
        // The flag wins over whatever the store loaded.
        session.settings_mut().require_confirmation = false;
    }

    let mut console = Console {
        session,
        log,
        cursor: 0,
    };

    if let Some(transcript) = args.transcript {
        console.run_transcript(&transcript).await;
    } else if args.interactive {
        run_interactive(&mut console).await?;
    } else {
        run_demo(&mut console).await;
    }

    info!("✅ Voice CNC console finished");
    Ok(())
}

struct Console {
    session: Session<MockLink>,
    log: Arc<Mutex<Vec<SentCommand>>>,
    cursor: usize,
}

impl Console {
    async fn run_transcript(&mut self, transcript: &str) {
        println!("🎤 Heard: \"{transcript}\"");
        let outcome = self.session.handle_utterance(transcript).await;
        describe(&outcome);
        self.print_new_commands();
    }

    /// Print everything the link received since the last utterance.
    fn print_new_commands(&mut self) {
        if let Ok(log) = self.log.lock() {
            for cmd in &log[self.cursor..] {
                println!("🛠  Machine received: {cmd:?}");
            }
            self.cursor = log.len();
        }
    }
}

fn describe(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Executed { count } => println!("✅ Executed {count} command(s)"),
        SessionOutcome::AwaitingConfirmation { description } => {
            println!("❓ Awaiting confirmation: {description} (say 'confirm' or 'cancel')");
        }
        SessionOutcome::Canceled => println!("🚫 Canceled"),
        SessionOutcome::Reprompted => println!("❓ Say confirm or cancel"),
        SessionOutcome::Stopped => println!("🛑 Stopped"),
        SessionOutcome::Blocked { reason } => println!("⛔ Blocked: {reason}"),
        SessionOutcome::NotRecognized => println!("⚠️  Not recognized"),
        SessionOutcome::ChainRejected { index, clause } => {
            println!("⛔ Chain rejected at clause {}: \"{clause}\"", index + 1);
        }
        SessionOutcome::Failed { reason } => println!("❌ Send failed: {reason}"),
        SessionOutcome::Ignored => println!("💤 Ignored (wake word required)"),
        SessionOutcome::WakeArmed => println!("👂 Listening"),
    }
}

async fn run_interactive(console: &mut Console) -> Result<()> {
    println!("🎤 Interactive voice CNC console");
    println!("Type transcripts and press Enter ('quit' to exit):");
    println!("Examples:");
    println!("  - 'move left twenty five point five'");
    println!("  - 'set feed to two thousand'");
    println!("  - 'jog up then probe z'");
    println!("  - 'zero all'");
    println!("  - 'stop'");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("🎤 Transcript: ");
        stdout.flush()?;

        let mut input = String::new();
        stdin.read_line(&mut input)?;
        let transcript = input.trim();

        if transcript.eq_ignore_ascii_case("quit") || transcript.eq_ignore_ascii_case("exit") {
            break;
        }

        if !transcript.is_empty() {
            console.run_transcript(transcript).await;
            println!();
        }
    }

    Ok(())
}

async fn run_demo(console: &mut Console) {
    let transcripts = vec![
        "home",
        "confirm",
        "zero all",
        "confirm",
        "move right twenty five point five",
        "confirm",
        "set step to 0.1",
        "jog up then jog down",
        "confirm",
        "what is the position",
        "undo",
        "confirm",
        "stop",
    ];

    println!("🎤 Running demo with {} transcripts", transcripts.len());
    println!();

    for (i, transcript) in transcripts.iter().enumerate() {
        println!("{}/{}: {}", i + 1, transcripts.len(), transcript);
        console.run_transcript(transcript).await;
        println!();
    }

    println!("🎉 Demo completed");
}

/// Speaks to the console instead of a TTS engine.
struct ConsoleSpeech;

impl SpeechSink for ConsoleSpeech {
    fn say(&mut self, text: &str) {
        println!("🔊 {text}");
    }
}

/// JSON-file settings persistence.
struct FileStore {
    path: PathBuf,
}

impl SettingsStore for FileStore {
    fn load(&mut self) -> voice_core::Result<Option<SessionSettings>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VoiceError::Store(e.to_string())),
        }
    }

    fn save(&mut self, settings: &SessionSettings) -> voice_core::Result<()> {
        let raw = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, raw).map_err(|e| {
            warn!("could not write {}: {e}", self.path.display());
            VoiceError::Store(e.to_string())
        })
    }
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

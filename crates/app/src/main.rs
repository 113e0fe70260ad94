use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use scenedub_app::assembly::{AssemblerOptions, AssemblyRequest, DialogueAssembler};
use scenedub_app::engines::EngineRouter;

#[derive(Parser)]
#[command(name = "scenedub")]
#[command(about = "Assemble a two-speaker dialogue script into a single WAV file")]
struct Cli {
    /// Path to the JSON assembly request
    #[arg(required_unless_present = "check_engines")]
    request: Option<PathBuf>,

    /// Output WAV path
    #[arg(short, long, default_value = "dialogue.wav")]
    output: PathBuf,

    /// Root directory for per-run scratch directories
    #[arg(long, env = "SCENEDUB_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// eSpeak voice used for the fallback retry
    #[arg(long, env = "SCENEDUB_FALLBACK_VOICE", default_value = "en-us")]
    fallback_voice: String,

    /// Probe the engine binaries and exit
    #[arg(long)]
    check_engines: bool,
}

fn init_logging() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_level).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let router = EngineRouter::from_env(cancel.clone());

    if cli.check_engines {
        let (piper, espeak) = router.availability().await;
        println!("piper: {}", if piper { "available" } else { "missing" });
        println!("espeak-ng: {}", if espeak { "available" } else { "missing" });
        return Ok(());
    }

    let request_path = cli
        .request
        .context("a request file is required unless --check-engines is set")?;
    let payload = std::fs::read_to_string(&request_path)
        .with_context(|| format!("reading {}", request_path.display()))?;
    let request: AssemblyRequest = serde_json::from_str(&payload)
        .with_context(|| format!("parsing {}", request_path.display()))?;

    // Ctrl-C cancels the run; in-flight engine processes die with it.
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let assembler = DialogueAssembler::with_options(
        router,
        AssemblerOptions {
            scratch_root: cli.scratch_dir,
            fallback_voice: cli.fallback_voice,
        },
    );

    let wav = assembler.assemble_with_cancel(&request, &cancel).await?;
    std::fs::write(&cli.output, &wav)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    tracing::info!("wrote {} bytes to {}", wav.len(), cli.output.display());
    Ok(())
}

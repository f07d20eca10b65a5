use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listing_capture::device::{SyntheticDevices, SyntheticEncoderFactory};
use listing_capture::{
    create_router, spawn_session_reaper, AppState, AttachmentList, CaptureSession, Config,
    FacingMode, HttpApiClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "listing-capture")]
#[command(about = "Video capture and upload service for marketplace listings")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/listing-capture")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API
    Serve,
    /// Record a clip from the simulated camera and write it to disk
    Record {
        /// Duration to record in seconds
        #[arg(short, long, default_value = "3")]
        duration: u64,

        /// Camera to request first
        #[arg(short, long, value_enum, default_value = "environment")]
        facing: Facing,

        /// Output directory
        #[arg(short, long, default_value = "recordings")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Facing {
    User,
    Environment,
}

impl From<Facing> for FacingMode {
    fn from(facing: Facing) -> Self {
        match facing {
            Facing::User => FacingMode::User,
            Facing::Environment => FacingMode::Environment,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Listing Capture v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Record {
            duration,
            facing,
            output_dir,
        } => record(cfg, duration, facing.into(), output_dir).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let api = HttpApiClient::new(
        &cfg.backend.base_url,
        cfg.backend.access_token.clone(),
        cfg.backend.timeout(),
    )?;

    let state = AppState::new(
        Arc::new(SyntheticDevices::front_and_back()),
        Arc::new(SyntheticEncoderFactory::timed(cfg.capture.synthetic_chunk_bytes)),
        Arc::new(api),
        cfg.capture.options(),
        cfg.uploads.clone(),
    );

    if let Some(idle_timeout) = cfg.capture.idle_timeout() {
        info!("Idle capture sessions close after {:?}", idle_timeout);
        spawn_session_reaper(state.clone(), idle_timeout);
    }

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Backend API: {}", cfg.backend.base_url);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn record(
    cfg: Config,
    duration: u64,
    facing_mode: FacingMode,
    output_dir: PathBuf,
) -> Result<()> {
    let mut options = cfg.capture.options();
    options.facing_mode = facing_mode;

    let mut session = CaptureSession::open(
        Arc::new(SyntheticDevices::front_and_back()),
        Arc::new(SyntheticEncoderFactory::timed(cfg.capture.synthetic_chunk_bytes)),
        options,
    )
    .await?;

    info!("Recording for {} seconds", duration);
    session.start_recording().await?;
    tokio::time::sleep(Duration::from_secs(duration)).await;
    let status = session.stop_recording().await?;
    info!("Captured {} chunks ({} bytes)", status.chunks, status.bytes);

    let mut videos = AttachmentList::new();
    session.accept(&mut videos)?;

    std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;
    for video in videos.iter() {
        let path = output_dir.join(video.file_name());
        std::fs::write(&path, video.data())
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("Saved {} ({} bytes)", path.display(), video.size());
    }

    Ok(())
}

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use autoclip_core::config::ClipConfig;
use autoclip_core::engine::FfmpegEngine;
use autoclip_core::error::{AppError, ErrorResponse};
use autoclip_core::pipeline::{ClipPipeline, ClipResponse, SourceMedia};
use autoclip_core::sidecar;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "autoclip",
    version,
    about = "Cut a platform-sized clip out of a video at a random offset"
)]
struct Cli {
    /// Directory that receives edited_*.mp4 outputs
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,
    /// Explicit ffmpeg binary (ffprobe is looked up next to it)
    #[arg(long, global = true)]
    ffmpeg_path: Option<PathBuf>,
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    probe_timeout_secs: Option<u64>,
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    extract_timeout_secs: Option<u64>,
    /// Seconds skipped at the start of every video
    #[arg(long, global = true)]
    min_start_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one clip and print the result as JSON
    Process {
        /// Stored upload to read
        input: PathBuf,
        /// Target platform: youtube or instagram
        #[arg(long)]
        platform: String,
    },
    /// Print duration, container and video codec of a media file
    Probe { input: PathBuf },
    /// Answer JSON-lines requests on stdin until EOF
    Serve,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ClipConfig) {
        if let Some(dir) = &self.storage_dir {
            config.storage_dir = dir.clone();
        }
        if let Some(path) = &self.ffmpeg_path {
            config.ffmpeg_path = Some(path.clone());
        }
        if let Some(secs) = self.probe_timeout_secs {
            config.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.extract_timeout_secs {
            config.extraction_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.min_start_secs {
            config.min_start_secs = secs;
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Io(io::Error::other(e)))?;
    println!("{}", out);
    Ok(())
}

fn fail(response: ErrorResponse) -> ExitCode {
    match serde_json::to_string_pretty(&response) {
        Ok(out) => eprintln!("{}", out),
        Err(_) => eprintln!("{}", response.message),
    }
    ExitCode::from(response.kind.exit_code() as u8)
}

async fn run(cli: Cli) -> Result<(), ErrorResponse> {
    let mut config = ClipConfig::from_env().map_err(|e| ErrorResponse::from(&e))?;
    cli.apply_overrides(&mut config);
    log::debug!(target: "autoclip::cli", "config: {:?}", config);

    match cli.command {
        Commands::Process { input, platform } => {
            let media = SourceMedia::from_request(input, Some(&platform))
                .map_err(|e| ErrorResponse::from(&e))?;
            let with_platform =
                |e: AppError| ErrorResponse::from(&e).with_platform(media.platform().as_str());

            let pipeline = ClipPipeline::from_config(&config).map_err(with_platform)?;
            let result = pipeline.process(&media).await.map_err(with_platform)?;
            print_json(&ClipResponse::from(&result)).map_err(with_platform)
        }
        Commands::Probe { input } => {
            let engine = FfmpegEngine::discover(&config).map_err(|e| ErrorResponse::from(&e))?;
            let probe = engine
                .probe(&input)
                .await
                .map_err(|e| ErrorResponse::from(&e))?;
            print_json(&probe).map_err(|e| ErrorResponse::from(&e))
        }
        Commands::Serve => {
            let pipeline = ClipPipeline::from_config(&config).map_err(|e| ErrorResponse::from(&e))?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            sidecar::serve(stdin, Box::new(io::stdout()), Arc::new(pipeline))
                .await
                .map_err(|e| ErrorResponse::from(&AppError::Io(e)))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(response) => fail(response),
    }
}

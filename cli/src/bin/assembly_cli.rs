use clap::{Parser, Subcommand};
use cli::{AssemblyConfig, Preset};
use color_eyre::eyre::Result;
use image::Rgb;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};
use washer::{
    AssemblySession, FrameDirectorySink, FrameSource, LogSink, MultiSink, RetryPolicy,
    SessionOutcome, SessionReport, StopSignal, WasherError,
    source::{ImageSequenceSource, ScriptedSource, SyntheticWasher, render_washer_frame},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the washer sequence from a configuration file
    Run {
        /// Path to the TOML or JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Replay the images in this directory instead of opening a camera
        #[arg(short, long)]
        frames: Option<PathBuf>,
        /// Camera index, overriding the configuration file
        #[arg(long)]
        camera: Option<u32>,
        /// Write annotated frames and status.json here
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the station preset against synthetic frames
    Demo {
        /// Write annotated frames and status.json here
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Write a preset configuration file (.toml or .json)
    InitConfig {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "station")]
        preset: Preset,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            config,
            frames,
            camera,
            output_dir,
        } => {
            run(config, frames.as_deref(), *camera, output_dir.as_deref())?;
        }
        Commands::Demo { output_dir } => {
            demo(output_dir.as_deref())?;
        }
        Commands::InitConfig { output, preset } => {
            AssemblyConfig::preset(*preset).to_file(output)?;
            info!("Wrote {} preset to {}", preset, output.display());
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&AssemblyConfig::schema())?);
        }
    }

    Ok(())
}

fn run(
    config_path: &Path,
    frames: Option<&Path>,
    camera: Option<u32>,
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = AssemblyConfig::from_file(config_path)?;
    info!("Loaded {} stages from {}", config.stages.len(), config_path.display());

    let sequencer = config.build_sequencer()?;
    let source: Box<dyn FrameSource> = match frames {
        Some(dir) => Box::new(ImageSequenceSource::open(dir)?),
        None => open_camera(camera.unwrap_or(config.camera.index))?,
    };

    let session = AssemblySession::new(source, sequencer, sinks(output_dir)?)
        .with_policy(config.retry.clone());
    finish(session.stop_signal(), session)
}

fn demo(output_dir: Option<&Path>) -> Result<()> {
    let config = AssemblyConfig::preset(Preset::Station);
    let sequencer = config.build_sequencer()?;

    let washer = |color: Rgb<u8>| {
        render_washer_frame(320, 240, &[SyntheticWasher::new(160, 120, 40, color)])
    };
    let mut source = ScriptedSource::default();
    source.push_frame(render_washer_frame(320, 240, &[]));
    source.push_frame(washer(Rgb([40, 90, 230])));
    source.push_failures(2);
    source.push_frame(washer(Rgb([20, 130, 140])));
    source.push_frame(washer(Rgb([220, 30, 30])));

    let session = AssemblySession::new(source, sequencer, sinks(output_dir)?)
        .with_policy(RetryPolicy::immediate(config.retry.max_retries));
    finish(session.stop_signal(), session)
}

fn finish<S: FrameSource>(
    stop: StopSignal,
    mut session: AssemblySession<S, MultiSink>,
) -> Result<()> {
    ctrlc::set_handler(move || stop.raise())?;

    match session.run() {
        Ok(report) => {
            log_report(&report);
            if report.outcome == SessionOutcome::Completed {
                info!("✅ Washer sequence completed!");
            }
            Ok(())
        }
        Err(e @ WasherError::MaxRetriesExceeded { .. }) => {
            error!("Camera gave up: {}", e);
            log_report(&session.report(SessionOutcome::Stopped));
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn log_report(report: &SessionReport) {
    info!(
        "Session {}: {} frames, {} read failures, {} camera reopens",
        report.outcome, report.frames_processed, report.read_failures, report.reinitializations
    );
    for status in &report.status {
        info!("  {}", status.label());
    }
}

fn sinks(output_dir: Option<&Path>) -> Result<MultiSink> {
    let mut sinks = MultiSink::new().with(LogSink::default());
    if let Some(dir) = output_dir {
        sinks = sinks.with(FrameDirectorySink::create(dir)?);
        info!("Writing annotated frames to {}", dir.display());
    }
    Ok(sinks)
}

#[cfg(feature = "camera")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(washer::source::CameraSource::open(index)?))
}

#[cfg(not(feature = "camera"))]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Err(color_eyre::eyre::eyre!(
        "cannot open camera {}: built without the `camera` feature, pass --frames <dir> instead",
        index
    ))
}

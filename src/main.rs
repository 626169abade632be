// Runs the engine as a standalone process: blob frames arrive as JSON lines
// (one `FrameBlobs` object per line) and message lines leave on the serial
// device, or stdout when no device is given.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use striker_vision::config::{BALL_LABEL, PipelineConfig};
use striker_vision::core_modules::emitter::MessageEmitter;
use striker_vision::error::FrameError;
use striker_vision::pipeline::{FrameBlobs, GoalZone, VisionPipeline};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};

#[derive(Parser, Debug)]
#[command(name = "striker_vision", about = "Select, track and report ball and goal blobs")]
struct Args {
    /// TOML config file. Observed field defaults are used when omitted.
    #[arg(long, env = "STRIKER_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-lines blob frames. Reads stdin when omitted.
    #[arg(long, env = "STRIKER_INPUT")]
    input: Option<PathBuf>,

    /// Serial device or capture file for message lines. Writes stdout when omitted.
    #[arg(long, env = "STRIKER_OUTPUT")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    log::info!(
        "frame {}x{}, grammar {:?}, goals: {}",
        config.frame.width,
        config.frame.height,
        config.output.grammar,
        config.goals.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    let input: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening input {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let output: Box<dyn AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(
            tokio::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("opening output {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    let pipeline = VisionPipeline::new(config).context("building pipeline")?;
    run(pipeline, input, output).await
}

async fn run<R, W>(mut pipeline: VisionPipeline, input: R, output: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut emitter = MessageEmitter::new(output);
    let mut zones: HashMap<String, Option<GoalZone>> = pipeline
        .labels()
        .filter(|label| *label != BALL_LABEL)
        .map(|label| (label.to_string(), None))
        .collect();
    let mut skipped = 0u64;

    while let Some(line) = lines.next_line().await.context("reading blob frames")? {
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameBlobs = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                skipped += 1;
                log::warn!("skipping frame: {}", FrameError::from(e));
                continue;
            }
        };

        let report = pipeline.process_frame(frame);

        // The LEFT/CENTER/RIGHT outputs themselves are driven elsewhere; log changes.
        for (label, zone) in zones.iter_mut() {
            let current = report.detection(label).and_then(|d| d.zone);
            if current != *zone {
                match current {
                    Some(z) => log::info!("{label}: goal zone {z}"),
                    None => log::info!("{label}: goal zone cleared"),
                }
                *zone = current;
            }
        }

        emitter.emit_all(&report.messages).await;
    }

    log::info!(
        "input closed after {} frames: {} lines sent, {} write failures, {} frames skipped",
        pipeline.frame_count(),
        emitter.lines_written(),
        emitter.write_failures(),
        skipped
    );
    Ok(())
}

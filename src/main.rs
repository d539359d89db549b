use clap::{Parser, Subcommand};
use hautfit_lib::core::overlay_renderer::{draw_overlay, frame_to_image};
use hautfit_lib::models::capture::{DeviceSelector, RawFrame};
use hautfit_lib::models::overlay::Overlay;
use hautfit_lib::models::scan::ScanUpdate;
use hautfit_lib::platform::capture::{select_preferred_device, ImageSequenceSource, SyntheticSource, VideoSource};
use hautfit_lib::platform::pose::{LandmarkProvider, NullLandmarkProvider, ProviderOptions, ReplayLandmarkProvider};
use hautfit_lib::{HttpSessionBackend, ScanConfig, ScanSession, SessionContext, SessionReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Grey used for frames when no camera recording is given
const SYNTHETIC_GREY: [u8; 3] = [128, 128, 128];

#[derive(Parser)]
#[command(name = "hautfit", version, about = "Guided camera body scan")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one guided scan and report the result to the session backend
    Scan {
        #[arg(long)]
        event: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        /// Directory of camera recordings (one subdirectory of images per camera)
        #[arg(long)]
        frames: Option<PathBuf>,
        /// Recorded pose estimator output, one JSON entry per frame
        #[arg(long)]
        landmarks: Option<PathBuf>,
        /// Camera id; the preferred camera is used when omitted
        #[arg(long)]
        device: Option<String>,
        /// Write every rendered overlay as a PNG into this directory
        #[arg(long)]
        dump_overlay: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the cameras found in a recordings directory
    Devices {
        #[arg(long)]
        frames: PathBuf,
    },
    /// Show the configuration, optionally resetting it to defaults
    Config {
        #[arg(long)]
        reset: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hautfit_lib::init_logging();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Scan {
            event,
            gender,
            frames,
            landmarks,
            device,
            dump_overlay,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            run_scan(config, event, gender, frames, landmarks, device, dump_overlay).await?;
        }
        Commands::Devices { frames } => {
            let source = ImageSequenceSource::new(frames, 30);
            let devices = source.list_devices().await?;
            if devices.is_empty() {
                println!("No camera devices found");
                return Ok(());
            }
            let preferred = select_preferred_device(&devices)?.id.clone();
            for device in &devices {
                let marker = if device.id == preferred { "*" } else { " " };
                println!("{} {:<24} {}", marker, device.id, device.label);
            }
        }
        Commands::Config { reset, config } => {
            let config = match (reset, config) {
                (true, Some(path)) => {
                    let config = ScanConfig::default();
                    config.save_to(&path)?;
                    config
                }
                (true, None) => ScanConfig::reset()?,
                (false, path) => load_config(path.as_deref())?,
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => ScanConfig::load_from(path),
        None => ScanConfig::load(),
    }
}

async fn run_scan(
    config: ScanConfig,
    event: Option<String>,
    gender: Option<String>,
    frames: Option<PathBuf>,
    landmarks: Option<PathBuf>,
    device: Option<String>,
    dump_overlay: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = ProviderOptions {
        min_detection_confidence: config.min_detection_confidence,
    };
    let provider: Arc<dyn LandmarkProvider> = match landmarks {
        Some(path) => Arc::new(ReplayLandmarkProvider::load(&path, &options)?),
        None => {
            warn!("No landmark recording given, no body will be detected");
            Arc::new(NullLandmarkProvider)
        }
    };

    let source: Box<dyn VideoSource> = match frames {
        Some(dir) => Box::new(ImageSequenceSource::new(dir, config.target_fps)),
        None => Box::new(SyntheticSource::new(
            config.frame_width,
            config.frame_height,
            SYNTHETIC_GREY,
            config.target_fps,
        )),
    };

    if let Some(dir) = &dump_overlay {
        std::fs::create_dir_all(dir)?;
    }

    let reporter = SessionReporter::new(HttpSessionBackend::from_config(&config)?);
    let context = SessionContext::new(event, gender);
    let (tx, rx) = mpsc::channel(256);
    let session = ScanSession::new(config, context, provider, reporter)?.with_updates(tx);

    let handle = session.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling scan");
            let _ = handle.cancel().await;
        }
    });

    let printer = tokio::spawn(print_updates(rx, dump_overlay));

    let selector = device.map(DeviceSelector::Id).unwrap_or(DeviceSelector::Default);
    let outcome = session.run(source, selector).await?;
    printer.await?;

    println!("Session {}: {}", outcome.session_id, outcome.phase.to_string());
    if let Some(report) = &outcome.report {
        match &report.failure {
            Some(failure) => eprintln!("Session was not saved: {}", failure),
            None => println!("Session saved"),
        }
    }

    Ok(())
}

async fn print_updates(mut rx: mpsc::Receiver<ScanUpdate>, dump_overlay: Option<PathBuf>) {
    while let Some(update) = rx.recv().await {
        match update {
            ScanUpdate::Status(message) => println!("{}", message),
            ScanUpdate::PartScanned { name, index } => debug!("Part {} scanned: {}", index, name),
            ScanUpdate::Overlay {
                frame_index,
                frame,
                overlay,
            } => {
                if let Some(dir) = &dump_overlay {
                    let path = dir.join(format!("frame_{:06}.png", frame_index));
                    let saved = tokio::task::spawn_blocking(move || save_overlay(&frame, &overlay, &path)).await;
                    match saved {
                        Ok(Err(e)) => warn!("Failed to write overlay: {}", e),
                        Err(e) => warn!("Overlay writer failed: {}", e),
                        Ok(Ok(())) => {}
                    }
                }
            }
            ScanUpdate::Completed(result) => {
                println!("Skin tone: {}", result.skin_tone.to_string());
                println!("Body type: {}", result.body_type.to_string());
                println!("Height:    {} cm", result.height_label());
            }
            ScanUpdate::Cancelled => println!("Scan cancelled"),
        }
    }
}

fn save_overlay(frame: &RawFrame, overlay: &Overlay, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut image = frame_to_image(frame).ok_or("Frame buffer does not match its dimensions")?;
    draw_overlay(&mut image, overlay);
    image.save(path)?;
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use expirylens_cli::display;
use expirylens_cli::{Presenter, SubmitOutcome};
use expirylens_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_UPLOAD_BYTES};

#[derive(Parser)]
#[command(name = "expirylens", version, about = "Read expiry dates off product photos")]
struct Cli {
    /// Base URL of the detection/analysis service.
    #[arg(long, global = true, env = "EXPIRYLENS_SERVER", default_value = DEFAULT_BASE_URL)]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an image and print detections and the expiry analysis.
    Scan {
        image: PathBuf,
        /// Width in pixels the image is shown at; boxes are scaled to it.
        #[arg(long)]
        display_width: Option<f64>,
        /// Re-render boxes at these widths after the report.
        #[arg(long, value_delimiter = ',')]
        resize: Vec<f64>,
        #[arg(long, env = "EXPIRYLENS_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: u64,
    },
    /// Parse date tokens locally and evaluate them against now.
    Parse {
        #[arg(required = true)]
        texts: Vec<String>,
        /// Reference time (RFC 3339) instead of the local clock.
        #[arg(long)]
        now: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::info!("expirylens v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Scan {
            image,
            display_width,
            resize,
            max_upload_bytes,
        } => {
            let mut config = ClientConfig::new(&cli.server);
            config.max_upload_bytes = max_upload_bytes;
            scan(config, image, display_width, resize).await
        }
        Command::Parse { texts, now } => {
            let mut out = std::io::stdout().lock();
            match now {
                Some(ts) => {
                    let now = DateTime::parse_from_rfc3339(&ts)
                        .with_context(|| format!("invalid --now timestamp: {ts}"))?;
                    display::write_parsed(&mut out, &texts, &now)?;
                }
                None => display::write_parsed(&mut out, &texts, &Local::now())?,
            }
            Ok(())
        }
    }
}

async fn scan(
    config: ClientConfig,
    image: PathBuf,
    display_width: Option<f64>,
    resize: Vec<f64>,
) -> anyhow::Result<()> {
    let presenter = Presenter::new(config);
    presenter.resize(display_width);
    presenter
        .select_path(&image)
        .await
        .with_context(|| format!("selecting {}", image.display()))?;

    match presenter.submit().await? {
        SubmitOutcome::Applied(session) => {
            display::print_session(&session)?;
            for width in resize {
                if let Some(boxes) = presenter.resize(Some(width))
                    && !boxes.is_empty()
                {
                    println!("Resized to {width}px");
                    display::print_boxes(&boxes)?;
                }
            }
        }
        SubmitOutcome::Superseded { sequence } => {
            tracing::warn!(sequence, "submission superseded");
        }
    }
    Ok(())
}

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use greenleaf_core::{
    DiseaseRelay, HistoryConfig, HistoryService, ImageReference, RelayConfig, ScanId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "greenleaf")]
#[command(about = "Greenleaf plant disease diagnosis CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose the plant in a local image file
    Analyze {
        /// Path to a JPEG, PNG, WebP or other image file
        path: PathBuf,
        /// Save the result to this user's scan history
        #[arg(long)]
        user: Option<String>,
    },
    /// List a user's saved scans, newest first
    History {
        /// User id
        user: String,
    },
    /// Print one of a user's saved scans as JSON
    Show {
        /// Scan id (32 lowercase hex characters)
        id: String,
        /// Owner of the scan
        #[arg(long)]
        user: String,
    },
    /// Delete one of a user's saved scans
    Delete {
        /// Scan id (32 lowercase hex characters)
        id: String,
        /// Owner of the scan
        #[arg(long)]
        user: String,
    },
    /// Show totals for a user's scans
    Stats {
        /// User id
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let history = HistoryService::new(&HistoryConfig::from_env_value(
        std::env::var("GREENLEAF_DATA_DIR").ok(),
    ));

    match cli.command {
        Some(Commands::Analyze { path, user }) => {
            let relay_cfg = RelayConfig::from_env_values(
                std::env::var("LOVABLE_API_KEY").ok(),
                std::env::var("GREENLEAF_GATEWAY_URL").ok(),
                std::env::var("GREENLEAF_MODEL").ok(),
                std::env::var("GREENLEAF_UPSTREAM_TIMEOUT_SECS").ok(),
            )?;
            let relay = DiseaseRelay::new(Arc::new(relay_cfg))?;

            let image = image_from_file(&path)?;
            let record = relay.analyze(&image).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);

            if let Some(user) = user {
                let scan = history.save(&user, image.as_str(), record)?;
                println!("Saved scan with ID: {}", scan.id);
            }
        }
        Some(Commands::History { user }) => {
            let scans = history.list_for_user(&user)?;
            if scans.is_empty() {
                println!("No scans found.");
            } else {
                for scan in scans {
                    println!(
                        "ID: {}, Date: {}, Plant: {}, Disease: {}",
                        scan.id,
                        scan.created_at.format("%Y-%m-%d %H:%M"),
                        scan.diagnosis.plant_name,
                        scan.diagnosis.disease
                    );
                }
            }
        }
        Some(Commands::Show { id, user }) => {
            let scan = history.get(&user, &id.parse::<ScanId>()?)?;
            println!("{}", serde_json::to_string_pretty(&scan)?);
        }
        Some(Commands::Delete { id, user }) => {
            history.delete(&user, &id.parse::<ScanId>()?)?;
            println!("Deleted scan with ID: {}", id);
        }
        Some(Commands::Stats { user }) => {
            let stats = history.stats_for_user(&user)?;
            println!("Total scans: {}", stats.total);
            println!("Issues found: {}", stats.issues);
            println!("Healthy rate: {}%", stats.healthy_rate);
        }
        None => {
            println!("Use 'greenleaf --help' for commands");
        }
    }

    Ok(())
}

/// Read an image file into a data URI, detecting the media type from its magic bytes.
fn image_from_file(path: &Path) -> anyhow::Result<ImageReference> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let kind = match infer::get(&bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind,
        _ => bail!("{} is not a recognised image file", path.display()),
    };

    Ok(ImageReference::from_bytes(&bytes, kind.mime_type())?)
}

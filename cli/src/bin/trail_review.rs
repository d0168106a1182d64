use clap::{Parser, Subcommand};
use cli::{ReviewConfig, ReviewConsole};
use color_eyre::eyre::{Result, eyre};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};
use trail_review::{
    CatalogAdjuster, DiagnosticRefresh, FootprintMaskGenerator, FsStore, PngRenderer, ReviewSession,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review trails interactively
    Review {
        /// Path to the TOML or JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured review directory
        #[arg(long)]
        review_dir: Option<PathBuf>,
        /// Override whether only accepted trails are reviewed at start
        #[arg(long)]
        inspect_good_only: Option<bool>,
    },
    /// Demote accepted trails at known-bad angles in every catalog
    Adjust {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        review_dir: Option<PathBuf>,
    },
    /// Re-render every trail and image diagnostic from the saved products
    Diagnostics {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        review_dir: Option<PathBuf>,
        /// Replace diagnostics that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the JSON schema of the configuration file
    Schema,
    /// Write a configuration file with default settings
    Init {
        /// Review directory to put in the configuration
        #[arg(long)]
        review_dir: PathBuf,
        /// Where to write the TOML configuration
        #[arg(short, long, default_value = "trail-review.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Review {
            config,
            review_dir,
            inspect_good_only,
        } => {
            let mut config = load_config(config, review_dir.as_deref())?;
            if let Some(inspect_good_only) = inspect_good_only {
                config.inspect_good_only = *inspect_good_only;
            }
            review(&config)?;
        }
        Commands::Adjust { config, review_dir } => {
            adjust(&load_config(config, review_dir.as_deref())?)?;
        }
        Commands::Diagnostics {
            config,
            review_dir,
            overwrite,
        } => {
            diagnostics(&load_config(config, review_dir.as_deref())?, *overwrite)?;
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(ReviewConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Init { review_dir, output } => {
            if output.exists() {
                return Err(eyre!("{} already exists", output.display()));
            }
            ReviewConfig::new(review_dir).to_toml_file(output)?;
            info!("📝 Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn load_config(path: &Path, review_dir: Option<&Path>) -> Result<ReviewConfig> {
    let mut config = ReviewConfig::from_file(path)?;
    if let Some(review_dir) = review_dir {
        config.review_dir = review_dir.to_path_buf();
    }
    info!("Review directory: {}", config.review_dir.display());
    Ok(config)
}

fn review(config: &ReviewConfig) -> Result<()> {
    let layout = config.layout();
    let images = layout.discover_images()?;
    if images.is_empty() {
        warn!("No images found in {}", layout.image_dir.display());
        return Ok(());
    }
    info!("🔭 Found {} images", images.len());

    let store = FsStore::new(layout.clone());
    let mut session = ReviewSession::with_defaults(store, layout, images, config.session_options())?;
    session.start()?;

    let stdin = io::stdin();
    let mut console = ReviewConsole::new(stdin.lock(), io::stdout());
    console.run(&mut session)?;

    info!("✅ Review finished");
    Ok(())
}

fn adjust(config: &ReviewConfig) -> Result<()> {
    let layout = config.layout();
    let catalogs = layout.discover_catalogs()?;
    info!("🛰️ Checking {} catalogs for bad trail angles", catalogs.len());

    let store = FsStore::new(layout.clone());
    let generator = FootprintMaskGenerator;
    let adjuster = CatalogAdjuster::new(&store, &generator, &layout, &config.adjust, config.min_mask_width);
    let report = adjuster.run(&catalogs)?;

    info!(
        "✅ Adjustment completed: {} trails demoted in {} catalogs, log at {}",
        report.demoted,
        report.changed,
        adjuster.log_path().display()
    );
    if report.failed > 0 {
        warn!("{} catalogs could not be adjusted", report.failed);
    }
    Ok(())
}

fn diagnostics(config: &ReviewConfig, overwrite: bool) -> Result<()> {
    let layout = config.layout();
    let images = layout.discover_images()?;

    let store = FsStore::new(layout.clone());
    let renderer = PngRenderer::default();
    let report = DiagnosticRefresh::new(&store, &FootprintMaskGenerator, &renderer, &layout, config.min_mask_width)
        .overwrite(overwrite)
        .run(&images);

    if report.written + report.skipped == 0 && report.failed > 0 {
        return Err(eyre!("no diagnostics could be rendered"));
    }
    info!("✅ Diagnostics completed!");
    Ok(())
}

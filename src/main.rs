use anyhow::{Context, Result};
use clap::Parser;
use starforge::tracks::{self, TrackLibrary};
use starforge::{GeneratorSettings, Universe};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "starforge")]
#[command(about = "Deterministic procedural generator for populated stellar neighborhoods", long_about = None)]
struct Cli {
    /// Number of systems to generate (prompted when omitted)
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Root seed (prompted when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Asset base directory holding DataTables/
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Write the finished catalog as JSON to this path
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Probability that life emerges on a habitable terrestrial planet
    #[arg(long)]
    life_probability: Option<f64>,

    /// Disable the ASI filter branch
    #[arg(long)]
    no_asi_filter: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let count: usize = match cli.count {
        Some(count) => count,
        None => prompt("Enter the system count:")?,
    };
    let seed: u64 = match cli.seed {
        Some(seed) => seed,
        None => prompt("Enter the seed:")?,
    };

    let asset_base = cli.assets.unwrap_or_else(tracks::default_asset_base);
    let library = TrackLibrary::discover(&tracks::data_table_dir(&asset_base))
        .context("loading evolutionary tracks")?;

    let mut settings = GeneratorSettings::default();
    if let Some(p) = cli.life_probability {
        settings.life_occurrence_probability = p;
    }
    if cli.no_asi_filter {
        settings.enable_asi_filter = false;
    }

    let universe = Universe::new(seed, count, settings, Arc::new(library))
        .context("initializing the universe driver")?;
    universe.fill().context("filling the universe")?;

    let catalog = universe.into_catalog();
    info!(
        systems = catalog.systems.len(),
        skipped = catalog.skipped,
        "generation finished"
    );

    println!("Generated {} systems (seed {})", catalog.systems.len(), seed);
    if catalog.skipped > 0 {
        println!("Skipped {} systems after exhausting retries", catalog.skipped);
    }
    println!("Star counts by spectral class:");
    for (class, count) in &catalog.class_counts {
        println!("  {class}: {count}");
    }

    if let Some(path) = cli.dump {
        let file = std::fs::File::create(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &catalog).context("writing catalog JSON")?;
        println!("Catalog written to {}", path.display());
    }

    Ok(())
}

/// Reads one value from stdin, prompting the way the original shell did.
fn prompt<T>(message: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    println!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    line.trim()
        .parse()
        .with_context(|| format!("parsing {:?}", line.trim()))
}

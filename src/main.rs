use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use location_service::config::Config;
use location_service::gazetteer::{sqlite, GazetteerDataset, GazetteerFormat};
use location_service::location::service::RecordSets;
use location_service::location::{LocationQuery, LocationService, LocationSummary, NameStyle};
use location_service::observability::{init_logging, metrics};

#[derive(Parser)]
#[command(name = "location_service")]
#[command(about = "Resolve event locations against a gazetteer")]
#[command(version = "0.1.0")]
struct Cli {
    /// Gazetteer file (JSON dataset or SQLite lookup tables); overrides the config
    #[arg(long, global = true)]
    gazetteer: Option<PathBuf>,

    /// Name style written back onto records: canonical or page_title
    #[arg(long, global = true)]
    name_style: Option<NameStyle>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one city/region/country triple
    Resolve {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Show every candidate with its score
        #[arg(long)]
        explain: bool,
    },
    /// Look up a location by wiki path, e.g. "US/CA/Los Angeles"
    Lookup { path: String },
    /// Fix the locations of all event records in a JSON file
    Enhance {
        input: PathBuf,
        /// Write the fixed records here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print node counts of the gazetteer
    Stats,
    /// Convert a JSON gazetteer dataset into SQLite lookup tables
    Convert { input: PathBuf, output: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("logs");
    let cli = Cli::parse();

    if cli.metrics {
        metrics::init()?;
    }

    let outcome = run(&cli).await;
    if let Err(e) = &outcome {
        error!("Command failed: {:#}", e);
    }

    if let Some(rendered) = metrics::render() {
        eprintln!("{}", rendered);
    }
    outcome
}

async fn run(cli: &Cli) -> Result<()> {
    if let Commands::Convert { input, output } = &cli.command {
        let dataset = GazetteerDataset::from_json_file(input)
            .with_context(|| format!("reading {}", input.display()))?;
        sqlite::write_lookup_tables(output, &dataset)?;
        info!(output = %output.display(), "Wrote SQLite lookup tables");
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(path) = &cli.gazetteer {
        config.gazetteer.path = Some(path.clone());
        config.gazetteer.format = GazetteerFormat::Auto;
    }
    if let Some(style) = cli.name_style {
        config.fixer.name_style = style;
    }
    let service = LocationService::from_config(&config).context("loading gazetteer")?;

    match &cli.command {
        Commands::Resolve { city, region, country, explain } => {
            let query = LocationQuery::new(city.as_deref(), region.as_deref(), country.as_deref());
            if *explain {
                for ranked in service.resolver().explain(&query) {
                    println!("{:>3}  {}", ranked.score, ranked.location);
                }
            }
            match service.resolver().resolve_query(&query) {
                Some(location) => {
                    let summary = LocationSummary::from(&location);
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                None => println!("No matching location"),
            }
        }
        Commands::Lookup { path } => match service.lookup_by_path(path) {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => println!("No location at {}", path),
        },
        Commands::Enhance { input, output } => {
            let content = fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            let sets: RecordSets = serde_json::from_str(&content)?;
            let (sets, report) = service.enhance(sets).await?;

            let fixed = serde_json::to_string_pretty(&sets)?;
            match output {
                Some(path) => fs::write(path, fixed)?,
                None => println!("{}", fixed),
            }
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Stats => {
            let stats = service.store().stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        // Handled before the gazetteer is loaded
        Commands::Convert { .. } => {}
    }
    Ok(())
}

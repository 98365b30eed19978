use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use lounge_merge::app::extract_use_case::{fallback_airports, ExtractUseCase};
use lounge_merge::app::image_use_case::{apply_generic_images, write_attributions, ImageReport, ImageUseCase};
use lounge_merge::app::merge_use_case::{self, log_enrichment, MergeOutcome};
use lounge_merge::app::ports::{Airport, AirportLookup, ExtractScope, LoungeSourcePort};
use lounge_merge::app::upload_use_case::UploadUseCase;
use lounge_merge::config::{self, Config, DEFAULT_CONFIG_PATH};
use lounge_merge::domain::LoungeRecord;
use lounge_merge::infra::{
    csv_export, json_export, master_csv, AirportTable, GooglePlacesClient, OverpassClient, PexelsClient,
    SupabaseSink, WikidataClient,
};
use lounge_merge::logging;
use lounge_merge::pipeline::ingestion::{Limits, RateLimiter};
use lounge_merge::pipeline::processing::enrich::{DefaultEnricher, Enricher};
use lounge_merge::pipeline::processing::DatasetStats;

#[derive(Parser)]
#[command(name = "lounge_merge")]
#[command(about = "Merge, deduplicate and publish airport lounge data")]
#[command(version = "0.1.0")]
struct Cli {
    /// Pipeline configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Master CSV to read/write instead of the configured one
    #[arg(long, global = true)]
    master: Option<PathBuf>,

    /// Debug logging for this crate
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Dataset {
    /// OpenStreetMap via the Overpass API
    Osm,
    /// Wikidata SPARQL endpoint
    Wikidata,
    /// Google Places nearby search, one request per airport
    Google,
}

impl Dataset {
    fn file_name(self) -> &'static str {
        match self {
            Dataset::Osm => "lounges_osm.json",
            Dataset::Wikidata => "lounges_wikidata.json",
            Dataset::Google => "lounges_google.json",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Pull lounges from an open dataset or places API into a source file
    Extract {
        #[arg(value_enum)]
        dataset: Dataset,
        /// Airport table queried by per-airport datasets
        #[arg(long)]
        airports: Option<PathBuf>,
        /// Query at most this many airports
        #[arg(long)]
        limit: Option<usize>,
        /// Output file instead of `<output_dir>/lounges_<dataset>.json`
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Normalize and merge all configured sources into the master files
    Merge {
        /// Similarity above which records sharing a key are merged
        #[arg(long)]
        threshold: Option<f64>,
        /// Airport table used to fill coordinates and locations
        #[arg(long)]
        airports: Option<PathBuf>,
    },
    /// Re-deduplicate the existing master CSV
    Dedupe {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Fill missing location fields in the master CSV from the airport table
    Enrich {
        #[arg(long)]
        airports: Option<PathBuf>,
    },
    /// Write lounges.json and airports.json for the web front end
    ExportWeb {
        /// Upper-case country names
        #[arg(long)]
        uppercase_countries: bool,
    },
    /// Write the partitioned CSV export
    ExportCsv {
        #[arg(long)]
        uppercase_countries: bool,
    },
    /// Find photos for lounges without images, then apply generic images
    Images {
        /// Only rotate the configured generic images
        #[arg(long)]
        generic_only: bool,
    },
    /// Upsert airports and lounges into the document store
    Upload,
    /// Print dataset statistics for the master CSV
    Stats,
}

fn print_merge_summary(title: &str, outcome: &MergeOutcome) {
    println!("\n📊 {}:", title);
    println!("   Input rows: {}", outcome.stats.input);
    println!("   Dropped: {}", outcome.stats.dropped);
    println!("   Duplicates merged: {}", outcome.stats.duplicates_merged);
    println!("   Distinct collisions: {}", outcome.stats.distinct_collisions);
    println!("   Unique lounges: {}", outcome.stats.unique);
    if let Some(report) = &outcome.enrichment {
        println!(
            "   Enriched: {} (unknown airports: {}, no code: {})",
            report.enriched, report.missing, report.without_code
        );
    }
    print!("{}", DatasetStats::compute(&outcome.records));
}

fn load_airports(config: &Config, flag: Option<PathBuf>) -> Result<Option<Arc<dyn AirportLookup>>> {
    let Some(path) = flag.or_else(|| config.airports.path.clone()) else {
        return Ok(None);
    };
    let table: Arc<dyn AirportLookup> = Arc::new(
        AirportTable::load(&path)
            .with_context(|| format!("failed to load airport table {}", path.display()))?,
    );
    Ok(Some(table))
}

fn build_source(config: &Config, dataset: Dataset) -> Result<Arc<dyn LoungeSourcePort>> {
    let extract = &config.extract;
    let source: Arc<dyn LoungeSourcePort> = match dataset {
        Dataset::Osm => Arc::new(OverpassClient::new(
            extract.overpass_url.clone(),
            &extract.user_agent,
            extract.timeout_seconds,
        )?),
        Dataset::Wikidata => Arc::new(WikidataClient::new(
            extract.wikidata_url.clone(),
            &extract.user_agent,
            extract.timeout_seconds,
        )?),
        Dataset::Google => {
            let key = config::env_secret("GOOGLE_PLACES_API_KEY")
                .context("GOOGLE_PLACES_API_KEY must be set for places extraction")?;
            Arc::new(GooglePlacesClient::new(extract.places_url.clone(), key, extract.timeout_seconds)?)
        }
    };
    Ok(source)
}

/// Airports for per-airport datasets: the airport table when one is
/// configured, else a built-in list of hubs.
fn extract_targets(config: &Config, flag: Option<PathBuf>, limit: Option<usize>) -> Result<Vec<Airport>> {
    let mut airports = match flag.or_else(|| config.airports.path.clone()) {
        Some(path) => AirportTable::load(&path)
            .with_context(|| format!("failed to load airport table {}", path.display()))?
            .airports()
            .into_iter()
            .cloned()
            .collect(),
        None => {
            warn!("No airport table configured, querying the built-in hub list");
            fallback_airports()
        }
    };
    if let Some(limit) = limit.or(config.extract.airport_limit) {
        airports.truncate(limit);
    }
    Ok(airports)
}

fn read_master(config: &Config) -> Result<Vec<LoungeRecord>> {
    let path = &config.merge.master_csv;
    master_csv::read_master_csv(path).with_context(|| format!("failed to read master CSV {}", path.display()))
}

fn write_master(config: &Config, records: &[LoungeRecord]) -> Result<()> {
    let path = &config.merge.master_csv;
    master_csv::write_master_csv(path, records).with_context(|| format!("failed to write {}", path.display()))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    if let Some(master) = cli.master {
        config.merge.master_csv = master;
    }

    match cli.command {
        Commands::Extract {
            dataset,
            airports,
            limit,
            output,
        } => {
            let source = build_source(&config, dataset)?;
            println!("🌍 Extracting lounges from {}...", source.info().name);
            let targets = match source.scope() {
                ExtractScope::PerAirport => extract_targets(&config, airports, limit)?,
                ExtractScope::Worldwide => Vec::new(),
            };
            let limiter = RateLimiter::new(Limits {
                requests_per_min: Some(config.extract.requests_per_min),
                concurrency: Some(config.extract.workers),
            });
            let (report, lounges) = ExtractUseCase::new(Arc::clone(&source), limiter)
                .run(&targets)
                .await;

            let path = output.unwrap_or_else(|| config.extract.output_dir.join(dataset.file_name()));
            json_export::write_extracted_json(&path, source.info(), &lounges, report.requests)?;

            println!("\n📊 Extraction Results:");
            println!("   Requests: {} ({} failed)", report.requests, report.failed_requests);
            println!("   Duplicate ids dropped: {}", report.duplicates);
            println!("   Lounges: {}", report.lounges);
            println!("✅ Written to {}", path.display());
            if report.requests > 0 && report.failed_requests == report.requests {
                println!("⚠️  Every request failed, see logs");
            }
        }
        Commands::Merge { threshold, airports } => {
            println!("🔄 Merging lounge sources...");
            if let Some(threshold) = threshold {
                config.merge.similarity_threshold = threshold;
                config.validate()?;
            }
            let airports = load_airports(&config, airports)?;
            let outcome = merge_use_case::run_merge(&config, airports)?;
            print_merge_summary("Merge Results", &outcome);
            println!("\n✅ Master CSV: {}", config.merge.master_csv.display());
            println!("✅ Master JSON: {}", config.merge.master_json.display());
        }
        Commands::Dedupe { threshold } => {
            println!("🧹 Removing duplicates from master CSV...");
            if let Some(threshold) = threshold {
                config.merge.similarity_threshold = threshold;
                config.validate()?;
            }
            let outcome = merge_use_case::run_dedupe(&config)?;
            print_merge_summary("Dedupe Results", &outcome);
        }
        Commands::Enrich { airports } => {
            println!("📍 Enriching lounges from airport table...");
            let Some(airports) = load_airports(&config, airports)? else {
                anyhow::bail!("no airport table configured; set [airports] path or pass --airports");
            };
            let mut records = read_master(&config)?;
            let report = DefaultEnricher::new(airports).enrich_all(&mut records);
            log_enrichment(&report);
            write_master(&config, &records)?;
            println!("\n📊 Enrichment Results:");
            println!("   Enriched: {}", report.enriched);
            println!("   Unknown airports: {}", report.missing);
            println!("   Without airport code: {}", report.without_code);
        }
        Commands::ExportWeb { uppercase_countries } => {
            println!("🌐 Generating web data...");
            let uppercase = uppercase_countries || config.export.uppercase_countries;
            let records = read_master(&config)?;
            let dir = &config.export.web_data_dir;
            let lounges = json_export::write_web_lounges(&dir.join("lounges.json"), &records, uppercase)?;
            let airports = json_export::write_web_airports(&dir.join("airports.json"), &records, uppercase)?;
            println!("✅ {} lounges and {} airports written to {}", lounges, airports, dir.display());
        }
        Commands::ExportCsv { uppercase_countries } => {
            println!("📄 Exporting partitioned CSV files...");
            let uppercase = uppercase_countries || config.export.uppercase_countries;
            let records = read_master(&config)?;
            let summary = csv_export::export_partitioned(&config.export.csv_export_dir, &records, uppercase)?;
            println!("\n📊 Export Results:");
            println!("   Lounges: {}", summary.lounges);
            println!("   Regions: {}", summary.regions);
            println!("   Countries: {}", summary.countries);
            println!("   Cities (2+ lounges): {}", summary.cities);
            println!("   Airports: {}", summary.airports);
            println!("✅ Files in {}", config.export.csv_export_dir.display());
        }
        Commands::Images { generic_only } => {
            println!("🖼️  Adding lounge images...");
            let mut records = read_master(&config)?;
            let images = &config.images;

            let api_key = if generic_only {
                None
            } else {
                match config::env_secret("PEXELS_API_KEY") {
                    Ok(key) => Some(key),
                    Err(e) => {
                        warn!("Photo search disabled: PEXELS_API_KEY unavailable ({})", e);
                        None
                    }
                }
            };

            let report = match api_key {
                Some(key) => {
                    let client = PexelsClient::new(images.api_url.clone(), key, images.timeout_seconds)?;
                    let limiter = RateLimiter::new(Limits {
                        requests_per_min: Some(images.requests_per_min),
                        concurrency: Some(images.workers),
                    });
                    let use_case = ImageUseCase::new(Arc::new(client), limiter);
                    let (report, attributions) = use_case.run(&mut records, &images.generic_images).await;
                    write_attributions(&images.attributions_file, &attributions)?;
                    info!("Wrote {} photo attributions", attributions.len());
                    report
                }
                None => {
                    let applied = apply_generic_images(&mut records, &images.generic_images);
                    ImageReport {
                        generic_applied: applied,
                        ..Default::default()
                    }
                }
            };
            write_master(&config, &records)?;

            println!("\n📊 Image Results:");
            println!("   Searched: {}", report.candidates);
            println!("   With photos: {}", report.with_photos);
            println!("   Without photos: {}", report.without_photos);
            println!("   Generic images applied: {}", report.generic_applied);
        }
        Commands::Upload => {
            println!("☁️  Uploading to document store...");
            let records = read_master(&config)?;
            let sink = SupabaseSink::from_env(config.upload.timeout_seconds)
                .context("SUPABASE_URL and SUPABASE_KEY must be set")?;
            let use_case = UploadUseCase::new(Arc::new(sink), config.upload.batch_size);
            let report = use_case
                .run(&records, &config.upload.airports_table, &config.upload.lounges_table)
                .await;

            println!("\n📊 Upload Results:");
            println!(
                "   Airports: {}/{} rows ({} failed batches)",
                report.airports.rows_sent, report.airports.rows, report.airports.batches_failed
            );
            println!(
                "   Lounges: {}/{} rows ({} failed batches)",
                report.lounges.rows_sent, report.lounges.rows, report.lounges.batches_failed
            );
            if report.failed_batches() > 0 {
                println!("⚠️  {} batches failed, see logs", report.failed_batches());
            } else {
                println!("✅ Upload complete");
            }
        }
        Commands::Stats => {
            let records = read_master(&config)?;
            println!("📊 Dataset statistics for {}:", config.merge.master_csv.display());
            print!("{}", DatasetStats::compute(&records));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Run failed: {:#}", e);
        println!("❌ {:#}", e);
        return Err(e);
    }
    Ok(())
}

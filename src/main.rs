use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;

use farecheck::{
    activity_timeline, collect_export_files, compare_fares, ingest_batch, load_batch,
    merge_trips, redact, AnalysisConfig, Database, GeoApiResolver, TicketPrices,
};

#[derive(Parser)]
#[command(name = "farecheck", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a location-history export into the journey store.
    Ingest {
        /// Export .json file or a directory of them.
        #[arg(long)]
        input: PathBuf,
        /// SQLite database path.
        #[arg(long)]
        db: PathBuf,
        /// Geocoding service base URL.
        #[arg(long, default_value = GeoApiResolver::DEFAULT_URL)]
        geo_url: String,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Merge trips, compare ticket costs, and print the monthly activity mix.
    Report {
        /// SQLite database path.
        #[arg(long)]
        db: PathBuf,
        /// Price of one single-ride ticket, in Euros.
        #[arg(long, default_value_t = TicketPrices::default().single_ride)]
        single_price: f64,
        /// Price of a yearly pass, in Euros.
        #[arg(long, default_value_t = TicketPrices::default().yearly_pass)]
        yearly_price: f64,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Write redacted copies of export files, safe to share.
    Redact {
        /// Export .json file or a directory of them.
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Minimum guess confidence (%) to consider.
    #[arg(long)]
    threshold: Option<f64>,
    /// Ticket validity window in minutes.
    #[arg(long)]
    merge_gap: Option<f64>,
    /// Place name trips must start and end in to count.
    #[arg(long)]
    home_city: Option<String>,
}

impl AnalysisArgs {
    fn into_config(self) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(merge_gap) = self.merge_gap {
            config.merge_gap_minutes = merge_gap;
        }
        if let Some(home_city) = self.home_city {
            config.home_city = home_city;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest {
            input,
            db,
            geo_url,
            analysis,
        } => run_ingest(input, db, geo_url, analysis.into_config()).await,
        Command::Report {
            db,
            single_price,
            yearly_price,
            analysis,
        } => {
            let prices = TicketPrices {
                single_ride: single_price,
                yearly_pass: yearly_price,
            };
            run_report(db, prices, analysis.into_config()).await
        }
        Command::Redact { input } => run_redact(input),
    }
}

async fn run_ingest(
    input: PathBuf,
    db_path: PathBuf,
    geo_url: String,
    config: AnalysisConfig,
) -> Result<()> {
    let files = collect_export_files(&input)?;
    let db = Database::new(db_path)?;
    let resolver = GeoApiResolver::new(geo_url);

    let mut completed_this_run: u64 = 0;
    for file in &files {
        info!("Ingesting {}", file.display());
        let batch = load_batch(file)?;
        completed_this_run += ingest_batch(&db, &resolver, &config, &batch).await?;
    }

    let total_complete = db.count_complete().await?;
    println!(
        "{completed_this_run} new journey(s) added to {}.",
        db.path().display()
    );
    println!("The store now contains {total_complete} complete journeys.");
    Ok(())
}

async fn run_report(db_path: PathBuf, prices: TicketPrices, config: AnalysisConfig) -> Result<()> {
    let db = Database::new(db_path)?;
    let journeys = db.journeys_ordered_by_start().await?;
    let location_names = db.location_names().await?;
    let activity_types = db.activity_types().await?;

    let summary = merge_trips(&journeys, &location_names, &config)
        .context("the store contains no journeys; run `farecheck ingest` first")?;

    println!(
        "{} public transit trip(s) within {} detected between {} and {} ({} days).",
        summary.trip_count,
        config.home_city,
        summary.first_start.date(),
        summary.last_start.date(),
        summary.period_days
    );

    let comparison = compare_fares(&prices, summary.trip_count, summary.period_days);
    println!(
        "Single-ride total: {:.2} Euros; yearly pass prorated: {:.2} Euros.",
        comparison.single_total, comparison.yearly_prorated
    );
    println!("{}", comparison.summary());

    let buckets = activity_timeline(
        &journeys,
        &activity_types,
        &config,
        summary.first_start,
        summary.last_start,
    );
    for bucket in &buckets {
        println!("\n{} ({} days analyzed):", bucket.label, bucket.days);
        for (category, count) in &bucket.counts {
            println!(
                "  {category}: {count} ({:.2}/day)",
                bucket.per_day.get(category).copied().unwrap_or(0.0)
            );
        }
    }

    Ok(())
}

fn run_redact(input: PathBuf) -> Result<()> {
    let files = collect_export_files(&input)?;
    let mut written = 0;
    for file in &files {
        match redact::redact_file(file) {
            Ok(output) => {
                println!("Redacted file created: {}", output.display());
                written += 1;
            }
            Err(err) => {
                log::warn!("skipping {}: {err:#}", file.display());
            }
        }
    }
    println!("{written} file(s) redacted.");
    Ok(())
}

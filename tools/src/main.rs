//! earnings-runner: headless merge / enrichment / search runner.
//!
//! Usage:
//!   earnings-runner --data_path archives --output_db output/output.db --merge
//!   earnings-runner --output_db output/output.db --fill_names
//!   earnings-runner --output_db output/output.db --search abc --json

use anyhow::Result;
use earnings_core::{
    config::PipelineConfig,
    error::PipelineError,
    lookup::HelixDirectory,
    pipeline::{self, MergeOutcome},
    report::SearchReport,
};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit code when an enrichment pass was aborted by a directory failure.
const ENRICHMENT_ABORTED: u8 = 9;

struct Args {
    data_path: PathBuf,
    output_db: PathBuf,
    config: Option<String>,
    merge: bool,
    fill_names: bool,
    truncate: bool,
    search: Option<String>,
    json: bool,
}

fn usage() {
    let program = env::args().next().unwrap_or_else(|| "earnings-runner".into());
    println!(
        "Usage: {program} [--data_path path] [--output_db db] [--config file] \
         [--merge] [--truncate] [--fill_names] [--search name] [--json]"
    );
}

fn parse_args(args: &[String]) -> Args {
    let value = |flag: &str| {
        args.windows(2)
            .find(|w| w[0] == flag)
            .map(|w| w[1].clone())
    };
    let has = |flag: &str| args.iter().any(|a| a == flag);

    Args {
        data_path: value("--data_path").map(PathBuf::from).unwrap_or_else(|| "data".into()),
        output_db: value("--output_db")
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new("output").join("output.db")),
        config: value("--config"),
        merge: has("--merge"),
        fill_names: has("--fill_names"),
        truncate: has("--truncate"),
        search: value("--search"),
        json: has("--json"),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let raw: Vec<String> = env::args().collect();
    if raw.len() < 2 || raw.iter().any(|a| a == "--help") {
        usage();
        return ExitCode::from(1);
    }
    let args = parse_args(&raw);

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(code)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.merge.truncate |= args.truncate;

    if args.merge {
        println!("data_path: {}", args.data_path.display());
        println!("output_db: {}", args.output_db.display());
        if let Some(parent) = args.output_db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let outcome = pipeline::run_merge(
            &args.data_path,
            &args.output_db,
            &config.merge,
            &config.enrichment.sentinel_name,
        )
        .map_err(|e| {
            // Merge is one-shot: a rerun would stop at the partial database.
            if args.output_db.exists() {
                eprintln!(
                    "Partial database left at {}; rerun with --truncate to rebuild it.",
                    args.output_db.display()
                );
            }
            e
        })?;
        match outcome {
            MergeOutcome::AlreadyMerged => println!("Database already exists."),
            MergeOutcome::Merged(summary) => {
                println!("=== MERGE SUMMARY ===");
                println!("  files:            {}", summary.files);
                println!("  rows read:        {}", summary.rows_read);
                println!("  inserted:         {}", summary.inserted);
                println!("  updated:          {}", summary.updated);
                println!("  skipped (shape):  {}", summary.skipped_malformed);
                println!("  skipped (period): {}", summary.skipped_no_period);
                println!("  skipped (zero):   {}", summary.skipped_zero_gross);
            }
        }
    }

    if args.fill_names {
        config.directory = config.directory.clone().with_env_credentials();
        config.directory.ensure_credentials()?;
        let directory = HelixDirectory::new(&config.directory, config.enrichment.lookup_cap)
            .map_err(|e| anyhow::anyhow!("directory client: {e}"))?;

        let report = pipeline::run_enrichment(&args.output_db, &directory, &config.enrichment)?;
        println!("=== ENRICHMENT SUMMARY ===");
        println!("  status:           {:?}", report.status);
        println!("  steps:            {}", report.steps);
        println!("  resolved:         {}", report.resolved_creators);
        println!("  records updated:  {}", report.updated_records);
        println!("  still unresolved: {}", report.remaining_unresolved);
        if !report.succeeded() {
            eprintln!("Failed to fetch user names.");
            return Ok(ExitCode::from(ENRICHMENT_ABORTED));
        }
    }

    if let Some(query) = &args.search {
        let report = pipeline::search(&args.output_db, query)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_search(&report);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_search(report: &SearchReport) {
    if report.is_empty() {
        println!("No rows for {:?}.", report.query);
        return;
    }
    println!(
        "{:<20} {:>7} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "name", "period", "ad", "sub", "bits", "prime", "gross"
    );
    for row in &report.rows {
        println!(
            "{:<20} {:>4}-{:02} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            row.display_name,
            row.year,
            row.month,
            row.ad_share,
            row.sub_share,
            row.bit_share,
            row.prime_sub_share,
            row.total_gross
        );
    }
    let t = &report.totals;
    println!(
        "{:<20} {:>7} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
        "TOTAL", "", t.ad_share, t.sub_share, t.bit_share, t.prime_sub_share, t.total_gross
    );
}

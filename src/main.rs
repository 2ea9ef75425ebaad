//! Hotspot Service - dataset regeneration
//!
//! Runs one regeneration of the static hotspot dataset:
//! 1. Fetches earthquakes (USGS), disaster alerts (GDACS) and news (GDELT)
//! 2. Scores, decays and bins the events into a hotspot grid
//! 3. Ranks the top cells and attaches place names
//! 4. Writes GeoJSON layers, the ranked list, the weekly digest and metadata
//!
//! Usage:
//!   cargo run --release                              # hotspot.toml, configured output dir
//!   cargo run --release -- --config other.toml       # alternate configuration
//!   cargo run --release -- --out public/data         # override output directory
//!   cargo run --release -- --no-geocode              # skip reverse geocoding
//!
//! Environment:
//!   HOTSPOT_CONFIG - configuration path when --config is not given
//!   RUST_LOG       - log filter (default: info)

use chrono::Utc;
use dotenv::dotenv;
use hotspot_service::config::{config_path_from_env, load_config};
use hotspot_service::pipeline::Pipeline;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    geocode: bool,
}

fn usage(program: &str) -> String {
    format!("Usage: {} [--config PATH] [--out DIR] [--no-geocode]", program)
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args { config: None, out: None, geocode: true };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "--out" => {
                let Some(value) = args.get(i + 1) else {
                    return Err(format!("{} requires a path", args[i]));
                };
                if args[i] == "--config" {
                    parsed.config = Some(PathBuf::from(value));
                } else {
                    parsed.out = Some(PathBuf::from(value));
                }
                i += 2;
            }
            "--no-geocode" => {
                parsed.geocode = false;
                i += 1;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(parsed)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = args.config.unwrap_or_else(config_path_from_env);
    println!("📋 Loading configuration from {}", config_path.display());
    let mut config = load_config(&config_path)?;
    if let Some(out) = args.out {
        config.output.dir = out;
    }

    let pipeline = Pipeline::new(config)?;
    println!("🛰  Fetching feeds and building hotspots...");
    let report = pipeline.run_once(Utc::now(), args.geocode)?;

    println!("✓ {} events → {} cells, top {}", report.features, report.cells, report.top);
    if report.geocode_lookups > 0 {
        println!("✓ {} new place lookups", report.geocode_lookups);
    }
    for source in &report.failed_sources {
        println!("⚠️  {} returned no data this run", source);
    }
    println!(
        "✓ Wrote {} files to {}",
        report.written.len(),
        pipeline.config().output.dir.display()
    );
    Ok(())
}

fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🗺  Hotspot Service");
    println!("==================\n");

    let args: Vec<String> = env::args().collect();
    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", usage(args.first().map(String::as_str).unwrap_or("hotspot_service")));
            std::process::exit(1);
        }
    };

    if let Err(e) = run(parsed) {
        eprintln!("\n❌ Regeneration failed: {}\n", e);
        std::process::exit(1);
    }
}

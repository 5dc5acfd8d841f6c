use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use rust_photodetector::features::OrbBackend;
use rust_photodetector::io::{load_config, load_manifest};
use rust_photodetector::matching::BfMatcherBackend;
use rust_photodetector::{Decision, DetectorConfig, GeoPoint, PhotoDetector};

/// Identify photos against a library of reference images.
#[derive(Parser, Debug)]
#[command(name = "photodetector", version)]
struct Cli {
    /// CSV manifest of reference images: path, group[, latitude, longitude]
    #[arg(long)]
    manifest: PathBuf,

    /// JSON detector configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Query latitude in degrees (requires --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Query longitude in degrees (requires --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Print the vote tally for every query
    #[arg(long)]
    verbose: bool,

    /// Query images
    #[arg(required = true)]
    queries: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DetectorConfig::default(),
    };
    let location = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        _ => None,
    };

    let entries = load_manifest(&cli.manifest)?;
    println!("Loaded {} reference entries from {}", entries.len(), cli.manifest.display());

    let detector = PhotoDetector::new(OrbBackend::new(), BfMatcherBackend, config);
    let results = detector.add_all(&entries);
    for (entry, result) in entries.iter().zip(&results) {
        match result {
            Ok(handle) if cli.verbose => {
                if let Some(info) = detector.reference(*handle) {
                    println!("  {} {}: {} features", info.handle, info.source_path.display(), info.n_features);
                }
            }
            Ok(_) => {}
            Err(e) => eprintln!("Skipping {}: {}", entry.path.display(), e),
        }
    }
    if detector.is_empty() {
        bail!("no reference image could be indexed");
    }
    println!("Indexed {} reference images", detector.len());

    for query in &cli.queries {
        let outcome = match detector.identify(query, location) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("{}: error: {}", query.display(), e);
                continue;
            }
        };

        match &outcome.decision {
            Decision::Match(m) => println!(
                "{}: group {} ({}, {} votes)",
                query.display(),
                m.group,
                m.reference.source_path.display(),
                m.votes
            ),
            Decision::NoMatch(reason) => println!("{}: no match ({})", query.display(), reason),
        }

        if cli.verbose {
            if let Some(diag) = &outcome.diagnostics {
                println!(
                    "  {} correspondences, {} kept (threshold {:?}), {:.1} ms",
                    diag.n_correspondences, diag.n_filtered, diag.filter_threshold, diag.timing.total_ms
                );
                for entry in &diag.tally {
                    println!("  {} group {}: {} votes", entry.handle, entry.group, entry.votes);
                }
            }
        }
    }

    Ok(())
}

// cargo run --bin next-pass -- --station 49.8728,8.6512,144 --catalog-number 25544
// cargo run --bin next-pass -- --station 49.8728,8.6512 --tle-file data/stations.txt --step 10s

use clap::Parser;
use sattypes::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tracker_lib::{
    lookup::TleLookup,
    pass_predictor::{PassPredictor, PassSearchParams},
    propagator::Sgp4Orbit,
    source::SourceFetcher,
    visibility::look_angles,
};

/// Print the current look angles and the next pass of one or more objects
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Ground station as 'lat,lon[,alt]' in degrees and meters
    #[arg(short = 's', long)]
    station: GroundStation,

    /// Catalog file with one or more TLE records
    #[arg(
        short = 'f',
        long,
        conflicts_with = "catalog_number",
        required_unless_present = "catalog_number"
    )]
    tle_file: Option<PathBuf>,

    /// Look up a single object's elements online by catalog number
    #[arg(short = 'n', long)]
    catalog_number: Option<String>,

    /// How far ahead to search, e.g. '2days'
    #[arg(long, value_parser = humantime::parse_duration, default_value = "24h")]
    horizon: Duration,

    /// Search step, e.g. '10s'
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    step: Duration,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let opts = Opts::parse();

    let records = match (&opts.tle_file, &opts.catalog_number) {
        (Some(path), _) => tleproto::parse(&std::fs::read_to_string(path)?),
        (None, Some(number)) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let lookup = TleLookup::celestrak(SourceFetcher::new())?;
            vec![rt.block_on(lookup.by_catalog_number(number))?]
        }
        (None, None) => Vec::new(),
    };
    if records.is_empty() {
        return Err("No usable TLE records".into());
    }

    let predictor = PassPredictor::new(PassSearchParams {
        horizon: opts.horizon,
        step: opts.step,
    });
    let horizon = humantime::format_duration(predictor.params().horizon);
    let now = Utc::now();

    for record in records.iter() {
        println!("{}", record.name);
        let orbit = match Sgp4Orbit::from_record(record) {
            Ok(o) => o,
            Err(e) => {
                println!("  unusable elements: {e}");
                continue;
            }
        };

        if let Some(look) = look_angles(&orbit, &opts.station, now) {
            println!(
                "  now: az {:.1}° el {:.1}° range {:.0} km{}",
                look.azimuth_deg,
                look.elevation_deg,
                look.range_km,
                if look.visible { " (visible)" } else { "" }
            );
        }

        match predictor.search(&orbit, &opts.station, now) {
            PassSearch::Complete(pass) => println!(
                "  next pass: {} ({}), {:.0} s",
                pass.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
                pass.local_start_label.as_deref().unwrap_or("local time unknown"),
                pass.duration_seconds
            ),
            PassSearch::Incomplete { start_time } => println!(
                "  rises at {} but doesn't set within {}",
                start_time.format("%Y-%m-%d %H:%M:%S UTC"),
                horizon
            ),
            PassSearch::NotFound => println!("  no pass within {horizon}"),
        }
    }

    Ok(())
}

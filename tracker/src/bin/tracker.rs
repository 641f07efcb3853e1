use clap::Parser;
use sattypes::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tracker_lib::{
    catalog::{CatalogEvent, CatalogTracker},
    collections::load_collections,
    config::Config,
    pass_monitor::PassMonitor,
    pass_predictor::PassPredictor,
    propagator::OrbitalPropagator,
    source::{CatalogSource, SourceFetcher},
    visibility::LineOfSight,
};

#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Tracker configuration toml file.
    ///
    /// Built-in defaults are used when not provided.
    #[arg(long)]
    config: Option<PathBuf>,

    /// The active catalog, a URL or a file path. Overrides the config file.
    #[arg(long)]
    source: Option<CatalogSource>,

    /// Ground station as 'lat,lon[,alt]' in degrees and meters. Overrides the config file.
    #[arg(long)]
    station: Option<GroundStation>,

    /// Catalog number of an object to follow with look angles and pass predictions.
    ///
    /// Requires a ground station.
    #[arg(long)]
    select: Option<String>,
}

/// How often the summary of tracked objects is logged
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let opts = Opts::parse();

    let intr = interruptor::Interruptor::new();
    let intr_clone = intr.clone();
    ctrlc::set_handler(move || {
        if intr_clone.is_set() {
            let exit_code = if cfg!(target_family = "unix") {
                // 128 (fatal error signal "n") + 2 (control-c is fatal error signal 2)
                130
            } else {
                // Windows code 3221225786
                // -1073741510 == C000013A
                -1073741510
            };
            std::process::exit(exit_code);
        } else {
            intr_clone.set();
        }
    })?;

    let cfg = match opts.config.as_ref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(track(opts, cfg, intr))
}

async fn track(
    opts: Opts,
    cfg: Config,
    intr: interruptor::Interruptor,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = opts.source.clone().unwrap_or_else(|| cfg.source());
    let station = opts.station.or_else(|| cfg.ground_station());
    let line_of_sight = cfg.line_of_sight();
    info!(%source, ?station, "Starting tracker");
    if opts.select.is_some() && station.is_none() {
        warn!("No ground station configured, ignoring the selected object");
    }

    let fetcher = SourceFetcher::new();
    if let Some(index) = cfg.collections_index.as_ref() {
        match load_collections(&fetcher, index).await {
            Ok(collections) => {
                for c in collections {
                    info!(name = %c.name, file = %c.file, count = c.count, "Collection");
                }
            }
            Err(e) => warn!(%index, err = %e, "Collection index unavailable"),
        }
    }

    let (tracker, mut channels) =
        CatalogTracker::new(fetcher, source, cfg.duplicate_policy());
    let sampler = tracker.sampler();
    let (monitor, mut passes) = PassMonitor::new(
        PassPredictor::new(cfg.pass_search_params()),
        cfg.pass_recompute_interval(),
    );

    let tracker_task = tokio::spawn(tracker.run(cfg.catalog_poll_interval()));
    let sampler_task = tokio::spawn(sampler.run(cfg.position_interval()));
    let monitor_task = tokio::spawn(monitor.run());

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    let mut shutdown_check = tokio::time::interval(Duration::from_millis(100));

    while !intr.is_set() {
        tokio::select! {
            Some(event) = channels.events.recv() => match event {
                CatalogEvent::Updated(diff) if !diff.is_empty() => {
                    info!(
                        total = diff.total,
                        "{} added, {} removed",
                        diff.added.len(),
                        diff.removed.len()
                    );
                }
                CatalogEvent::Updated(_) => (),
                CatalogEvent::FetchFailed { source, error } => {
                    warn!(%source, %error, "Catalog unavailable, keeping the last known objects");
                }
            },
            Ok(()) = channels.objects.changed() => {
                let objects = channels.objects.borrow_and_update().clone();
                if let (Some(objects), Some(id), Some(station)) =
                    (objects, opts.select.as_deref(), station)
                {
                    match objects.iter().find(|o| o.id.as_str() == id) {
                        Some(object) => passes.select(object.tle.clone(), station),
                        None => passes.clear(),
                    };
                }
            }
            Ok(()) = passes.output.changed() => {
                if let Some(track) = passes.output.borrow_and_update().clone() {
                    log_ground_track(&track);
                }
            }
            _ = status.tick() => log_status(&channels, station.as_ref(), &line_of_sight),
            _ = shutdown_check.tick() => (),
        }
    }

    info!("Shutting down");
    tracker_task.abort();
    sampler_task.abort();
    monitor_task.abort();
    Ok(())
}

fn log_ground_track(track: &GroundTrack) {
    let look = &track.look_angles;
    info!(
        azimuth = %format!("{:.1}", look.azimuth_deg),
        elevation = %format!("{:.1}", look.elevation_deg),
        range_km = %format!("{:.0}", look.range_km),
        visible = look.visible,
        "Look angles"
    );
    match &track.next_pass {
        PassSearch::Complete(pass) => info!(
            start = %pass.start_time,
            local = pass.local_start_label.as_deref().unwrap_or("-"),
            duration_s = pass.duration_seconds,
            "Next pass"
        ),
        PassSearch::Incomplete { start_time } => {
            info!(%start_time, "Next pass rises but doesn't set within the search horizon")
        }
        PassSearch::NotFound => info!("No pass within the search horizon"),
    }
}

fn log_status(
    channels: &tracker_lib::catalog::TrackerChannels,
    station: Option<&GroundStation>,
    line_of_sight: &LineOfSight,
) {
    let Some(objects) = channels.objects.borrow().clone() else {
        info!("Waiting for the first catalog");
        return;
    };
    let renderable = objects.iter().filter(|o| o.is_renderable()).count();

    let in_view = match (station, channels.catalog.borrow().clone()) {
        (Some(station), Some(catalog)) => {
            let now = Utc::now();
            catalog
                .iter()
                .filter_map(|entry| entry.orbit.as_ref()?.propagate(now).ok())
                .filter(|state| line_of_sight.is_visible(state, station))
                .count()
        }
        _ => 0,
    };

    info!(
        tracked = objects.len(),
        renderable,
        in_view,
        source = %channels.source.current(),
        "Status"
    );
}

mod interruptor {
    use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
    use std::sync::Arc;

    #[derive(Clone, Debug)]
    #[repr(transparent)]
    pub struct Interruptor(Arc<AtomicBool>);

    impl Interruptor {
        pub fn new() -> Self {
            Interruptor(Arc::new(AtomicBool::new(false)))
        }

        pub fn set(&self) {
            self.0.store(true, SeqCst);
        }

        pub fn is_set(&self) -> bool {
            self.0.load(SeqCst)
        }
    }

    impl Default for Interruptor {
        fn default() -> Self {
            Self::new()
        }
    }
}

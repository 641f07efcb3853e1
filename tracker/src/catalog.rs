//! The live catalog: periodic refetch of the active source, id-set diffing and wholesale
//! snapshot publication.
//!
//! Snapshots go out over `watch` channels, so readers always see either the previous complete
//! catalog or the new one. Nothing is mutated in place after publication.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sattypes::prelude::*;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::propagator::Sgp4Orbit;
use crate::sampler::PositionSampler;
use crate::source::{CatalogSource, Fetch, FetchError};
use crate::visibility::orbital_state;

/// One object of a parsed catalog, with its propagator initialized once per refresh.
#[derive(Debug)]
pub struct CatalogEntry {
    pub id: SatelliteId,
    pub record: TleRecord,
    /// `None` when the elements can't initialize SGP4; the object is tracked without a position
    pub orbit: Option<Sgp4Orbit>,
}

impl CatalogEntry {
    pub fn new(id: SatelliteId, record: TleRecord) -> Self {
        let orbit = match Sgp4Orbit::from_record(&record) {
            Ok(orbit) => Some(orbit),
            Err(e) => {
                debug!(%id, name = %record.name, err = %e, "Elements rejected by propagator");
                None
            }
        };
        Self { id, record, orbit }
    }

    pub fn track(&self, time: DateTime<Utc>) -> TrackedObject {
        TrackedObject {
            id: self.id.clone(),
            name: self.record.name.clone(),
            position: self
                .orbit
                .as_ref()
                .and_then(|orbit| orbital_state(orbit, time))
                .map(|state| state.position),
            tle: self.record.clone(),
        }
    }
}

pub fn track_all(catalog: &[CatalogEntry], time: DateTime<Utc>) -> Vec<TrackedObject> {
    catalog.iter().map(|entry| entry.track(time)).collect()
}

pub type Catalog = Arc<Vec<CatalogEntry>>;
pub type TrackedObjects = Arc<Vec<TrackedObject>>;

/// What to do with records that share an id within one catalog.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    FirstWins,
    /// The later record replaces the earlier one, at the earlier one's position
    LastWins,
    /// Later duplicates are tracked under `<id>#<n>`, n counting from 2
    KeepAll,
}

/// Assign ids to parsed records and resolve duplicates.
pub fn build_catalog(records: Vec<TleRecord>, policy: DuplicatePolicy) -> Vec<CatalogEntry> {
    let mut entries: Vec<CatalogEntry> = Vec::with_capacity(records.len());
    let mut seen: HashMap<SatelliteId, (usize, usize)> = HashMap::new();

    for record in records {
        let id = tleproto::satellite_id(&record);
        let Some((index, count)) = seen.get_mut(&id) else {
            seen.insert(id.clone(), (entries.len(), 1));
            entries.push(CatalogEntry::new(id, record));
            continue;
        };

        *count += 1;
        match policy {
            DuplicatePolicy::FirstWins => {
                warn!(%id, name = %record.name, "Dropping duplicate catalog entry");
            }
            DuplicatePolicy::LastWins => {
                warn!(%id, name = %entries[*index].record.name, "Replacing duplicate catalog entry");
                entries[*index] = CatalogEntry::new(id, record);
            }
            DuplicatePolicy::KeepAll => {
                let synthetic = SatelliteId::from(format!("{id}#{count}"));
                debug!(%id, %synthetic, "Keeping duplicate catalog entry");
                entries.push(CatalogEntry::new(synthetic, record));
            }
        }
    }

    entries
}

/// Set difference between two consecutive catalog id snapshots.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CatalogDiff {
    pub added: BTreeSet<SatelliteId>,
    pub removed: BTreeSet<SatelliteId>,
    /// Size of the new snapshot
    pub total: usize,
}

impl CatalogDiff {
    pub fn compute(old: &BTreeSet<SatelliteId>, new: &BTreeSet<SatelliteId>) -> Self {
        Self {
            added: new.difference(old).cloned().collect(),
            removed: old.difference(new).cloned().collect(),
            total: new.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum CatalogEvent {
    /// Changed source text was parsed and published, emitted even when the diff is empty
    Updated(CatalogDiff),
    /// The previous catalog was kept
    FetchFailed { source: CatalogSource, error: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Catalog text contained no usable records ({skipped} lines skipped)")]
    NoRecords { skipped: usize },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    /// Source text was byte-identical to the last successful parse
    Unchanged,
    Updated(CatalogDiff),
}

/// Selects which source the tracker polls. The tracker reads it afresh on every tick.
#[derive(Clone, Debug)]
pub struct SourceHandle(Arc<watch::Sender<CatalogSource>>);

impl SourceHandle {
    pub fn new(source: CatalogSource) -> Self {
        let (tx, _) = watch::channel(source);
        Self(Arc::new(tx))
    }

    pub fn set_source(&self, source: CatalogSource) {
        info!(%source, "Switching catalog source");
        self.0.send_replace(source);
    }

    pub fn current(&self) -> CatalogSource {
        self.0.borrow().clone()
    }
}

/// The consumer side of a [`CatalogTracker`].
#[derive(Debug)]
pub struct TrackerChannels {
    pub source: SourceHandle,
    /// `None` until the first successful load
    pub catalog: watch::Receiver<Option<Catalog>>,
    /// Refreshed by both the tracker and the position sampler
    pub objects: watch::Receiver<Option<TrackedObjects>>,
    pub events: mpsc::UnboundedReceiver<CatalogEvent>,
}

pub struct CatalogTracker<F> {
    fetcher: F,
    policy: DuplicatePolicy,
    source: SourceHandle,
    catalog: watch::Sender<Option<Catalog>>,
    objects: Arc<watch::Sender<Option<TrackedObjects>>>,
    events: mpsc::UnboundedSender<CatalogEvent>,
    last_raw: Option<String>,
    tracked_ids: BTreeSet<SatelliteId>,
}

impl<F: Fetch> CatalogTracker<F> {
    pub fn new(
        fetcher: F,
        source: CatalogSource,
        policy: DuplicatePolicy,
    ) -> (Self, TrackerChannels) {
        let source = SourceHandle::new(source);
        let (catalog_tx, catalog_rx) = watch::channel(None);
        let (objects_tx, objects_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let tracker = Self {
            fetcher,
            policy,
            source: source.clone(),
            catalog: catalog_tx,
            objects: Arc::new(objects_tx),
            events: events_tx,
            last_raw: None,
            tracked_ids: BTreeSet::new(),
        };
        let channels = TrackerChannels {
            source,
            catalog: catalog_rx,
            objects: objects_rx,
            events: events_rx,
        };
        (tracker, channels)
    }

    /// A sampler that re-propagates this tracker's latest catalog into the same objects channel.
    pub fn sampler(&self) -> PositionSampler {
        PositionSampler::new(self.catalog.subscribe(), self.objects.clone())
    }

    pub fn set_source(&self, source: CatalogSource) {
        self.source.set_source(source);
    }

    pub fn tracked_ids(&self) -> &BTreeSet<SatelliteId> {
        &self.tracked_ids
    }

    pub async fn tick(&mut self) -> Result<TickOutcome, TrackerError> {
        self.tick_at(Utc::now()).await
    }

    /// One polling cycle, propagating freshly published objects to `now`.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, TrackerError> {
        let source = self.source.current();
        let raw = match self.fetcher.fetch(&source).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(%source, err = %e, "Catalog fetch failed, keeping previous catalog");
                return Err(self.fail(source, e.into()));
            }
        };

        if self.last_raw.as_deref() == Some(raw.as_str()) {
            return Ok(TickOutcome::Unchanged);
        }

        let parsed = tleproto::parse_catalog(&raw);
        if parsed.accepted_count() == 0 && !raw.trim().is_empty() {
            let err = TrackerError::NoRecords {
                skipped: parsed.skipped_count(),
            };
            warn!(%source, err = %err, "Catalog unusable, keeping previous catalog");
            return Err(self.fail(source, err));
        }

        let entries = build_catalog(parsed.into_records(), self.policy);
        let ids: BTreeSet<SatelliteId> = entries.iter().map(|e| e.id.clone()).collect();
        let diff = CatalogDiff::compute(&self.tracked_ids, &ids);

        let catalog: Catalog = Arc::new(entries);
        let objects: TrackedObjects = Arc::new(track_all(&catalog, now));
        self.catalog.send_replace(Some(catalog));
        self.objects.send_replace(Some(objects));
        self.tracked_ids = ids;
        self.last_raw = Some(raw);

        if diff.is_empty() {
            debug!(%source, total = diff.total, "Catalog refreshed, no membership change");
        } else {
            info!(
                %source,
                added = diff.added.len(),
                removed = diff.removed.len(),
                total = diff.total,
                "Catalog updated"
            );
        }
        self.emit(CatalogEvent::Updated(diff.clone()));
        Ok(TickOutcome::Updated(diff))
    }

    fn fail(&self, source: CatalogSource, err: TrackerError) -> TrackerError {
        self.emit(CatalogEvent::FetchFailed {
            source,
            error: err.to_string(),
        });
        err
    }

    fn emit(&self, event: CatalogEvent) {
        // Nobody listening for events is fine
        let _ = self.events.send(event);
    }

    fn has_subscribers(&self) -> bool {
        !(self.catalog.is_closed() && self.objects.is_closed() && self.events.is_closed())
    }

    /// Poll every `period` until every consumer is gone. The first tick runs immediately.
    pub async fn run(mut self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !self.has_subscribers() {
                debug!("Catalog tracker has no subscribers left, stopping");
                break;
            }
            // Failures were already logged and reported as events
            let _ = self.tick().await;
        }
    }
}

//! Fast re-propagation of the latest published catalog.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::catalog::{track_all, Catalog, TrackedObjects};

/// Recomputes positions of every catalog object at the current instant, independent of
/// whether the catalog itself changed.
pub struct PositionSampler {
    catalog: watch::Receiver<Option<Catalog>>,
    objects: Arc<watch::Sender<Option<TrackedObjects>>>,
}

impl PositionSampler {
    pub fn new(
        catalog: watch::Receiver<Option<Catalog>>,
        objects: Arc<watch::Sender<Option<TrackedObjects>>>,
    ) -> Self {
        Self { catalog, objects }
    }

    /// Positions at `time`, or `None` when no catalog has been loaded yet.
    pub fn sample_at(&self, time: DateTime<Utc>) -> Option<TrackedObjects> {
        let catalog = self.catalog.borrow().clone()?;
        Some(Arc::new(track_all(&catalog, time)))
    }

    /// Publishes a fresh sample; returns whether anything was published.
    pub fn tick_at(&self, time: DateTime<Utc>) -> bool {
        match self.sample_at(time) {
            Some(objects) => {
                trace!(count = objects.len(), "Sampled positions");
                self.objects.send_replace(Some(objects));
                true
            }
            None => false,
        }
    }

    pub fn tick(&self) -> bool {
        self.tick_at(Utc::now())
    }

    /// Sample every `period` until the objects channel has no readers.
    pub async fn run(self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        // Late samples are worthless, never burst to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if self.objects.is_closed() {
                debug!("Position sampler has no readers left, stopping");
                break;
            }
            self.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{build_catalog, DuplicatePolicy};
    use chrono::TimeZone;
    use sattypes::prelude::*;

    fn catalog(records: Vec<TleRecord>) -> Catalog {
        Arc::new(build_catalog(records, DuplicatePolicy::FirstWins))
    }

    fn iss() -> TleRecord {
        TleRecord::new(
            "ISS (ZARYA)",
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        )
    }

    #[test]
    fn nothing_before_first_load() {
        let (_catalog_tx, catalog_rx) = watch::channel(None);
        let (objects_tx, objects_rx) = watch::channel(None);
        let sampler = PositionSampler::new(catalog_rx, Arc::new(objects_tx));

        assert!(sampler.sample_at(Utc::now()).is_none());
        assert!(!sampler.tick());
        assert!(objects_rx.borrow().is_none());
    }

    #[test]
    fn one_failure_does_not_abort_the_batch() {
        let records = vec![
            iss(),
            TleRecord::new("BROKEN", "1 99999U broken", "2 99999 broken"),
        ];
        let (_catalog_tx, catalog_rx) = watch::channel(Some(catalog(records)));
        let (objects_tx, objects_rx) = watch::channel(None);
        let sampler = PositionSampler::new(catalog_rx, Arc::new(objects_tx));

        let epoch = Utc.with_ymd_and_hms(2008, 9, 20, 12, 25, 40).unwrap();
        assert!(sampler.tick_at(epoch));

        let objects = objects_rx.borrow().clone().unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id.as_str(), "25544");
        assert!(objects[0].position.is_some());
        assert_eq!(objects[1].id.as_str(), "99999");
        assert!(objects[1].position.is_none());
    }

    #[test]
    fn positions_follow_the_clock() {
        let (_catalog_tx, catalog_rx) = watch::channel(Some(catalog(vec![iss()])));
        let (objects_tx, _objects_rx) = watch::channel(None);
        let sampler = PositionSampler::new(catalog_rx, Arc::new(objects_tx));

        let t = Utc.with_ymd_and_hms(2008, 9, 20, 12, 25, 40).unwrap();
        let a = sampler.sample_at(t).unwrap();
        let b = sampler.sample_at(t + chrono::Duration::seconds(60)).unwrap();
        assert_ne!(a[0].position, b[0].position);
        assert_eq!(a[0].tle, b[0].tle);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_without_readers() {
        let (_catalog_tx, catalog_rx) = watch::channel(Some(catalog(vec![iss()])));
        let (objects_tx, mut objects_rx) = watch::channel(None);
        let sampler = PositionSampler::new(catalog_rx, Arc::new(objects_tx));
        let task = tokio::spawn(sampler.run(Duration::from_millis(100)));

        objects_rx.changed().await.unwrap();
        assert!(objects_rx.borrow_and_update().is_some());
        drop(objects_rx);

        tokio::time::advance(Duration::from_millis(250)).await;
        task.await.unwrap();
    }
}

use crate::core::aggregator;
use crate::domain::model::{CollectionPath, DateWindow, DayTally, NominationRecord};
use crate::domain::ports::{NominationStore, SnapshotEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Connecting,
    Live,
    /// The board shows zero or stale counts; registration still works.
    Degraded(String),
}

/// What the board displays: the latest snapshot and its per-day counts.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTally {
    pub window: DateWindow,
    pub records: Arc<Vec<NominationRecord>>,
    pub days: Vec<DayTally>,
    pub status: FeedStatus,
    pub snapshots_seen: u64,
}

impl LiveTally {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            records: Arc::new(Vec::new()),
            days: aggregator::tally(&[], &window),
            status: FeedStatus::Connecting,
            snapshots_seen: 0,
        }
    }

    /// Each snapshot replaces the record set wholesale; errors keep the last good counts.
    pub fn apply(self, event: SnapshotEvent) -> Self {
        match event {
            Ok(records) => Self {
                days: aggregator::tally(&records, &self.window),
                records: Arc::new(records),
                status: FeedStatus::Live,
                snapshots_seen: self.snapshots_seen + 1,
                ..self
            },
            Err(e) => {
                tracing::warn!("⚠️ Live registration feed error: {}", e);
                Self {
                    status: FeedStatus::Degraded(e.to_string()),
                    ..self
                }
            }
        }
    }

    pub fn total(&self) -> u32 {
        self.days.iter().map(|d| d.morning + d.evening).sum()
    }
}

/// Standing subscription that keeps a `LiveTally` current.
///
/// Dropping the view releases the subscription.
pub struct LiveView {
    state: watch::Receiver<LiveTally>,
    feed: JoinHandle<()>,
}

impl LiveView {
    pub fn mount<S>(store: Arc<S>, collection: CollectionPath, window: DateWindow) -> Self
    where
        S: NominationStore + 'static,
    {
        let (tx, rx) = watch::channel(LiveTally::new(window));

        let feed = tokio::spawn(async move {
            tracing::debug!("Subscribing to {}", collection);
            let mut subscription = match store.subscribe(&collection).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    let next = tx.borrow().clone().apply(Err(e));
                    let _ = tx.send(next);
                    return;
                }
            };

            while let Some(event) = subscription.next().await {
                let next = tx.borrow().clone().apply(event);
                if tx.send(next).is_err() {
                    break;
                }
            }
            tracing::debug!("Live feed for {} ended", collection);
        });

        Self { state: rx, feed }
    }

    pub fn current(&self) -> LiveTally {
        self.state.borrow().clone()
    }

    /// Waits for the next update. `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<LiveTally> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    pub fn teardown(self) {}
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.feed.abort();
    }
}

use crate::domain::model::{CollectionPath, Nomination, NominationRecord, Session};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One push from a subscription: the full current record set, or the error
/// that prevented reading it.
pub type SnapshotEvent = Result<Vec<NominationRecord>>;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate_anonymously(&self) -> Result<Session>;
}

#[async_trait]
pub trait NominationStore: Send + Sync {
    /// Appends one nomination. The store assigns the id and write timestamp.
    async fn append(
        &self,
        collection: &CollectionPath,
        nomination: &Nomination,
    ) -> Result<NominationRecord>;

    /// Opens a standing subscription that pushes the full snapshot on every change,
    /// starting with the current contents.
    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription>;
}

/// Receiving end of a store subscription.
///
/// Dropping it stops the background feed.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<SnapshotEvent>,
    feed: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<SnapshotEvent>, feed: JoinHandle<()>) -> Self {
        Self {
            events,
            feed: Some(feed),
        }
    }

    /// Waits for the next snapshot. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
            tracing::debug!("Subscription released");
        }
        self.events.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

use crate::domain::model::{CollectionPath, Nomination, NominationRecord, Session};
use crate::domain::ports::{AuthProvider, NominationStore, Subscription};
use crate::utils::error::{BoardError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

type Snapshot = Arc<Vec<NominationRecord>>;

/// In-process store and anonymous auth.
///
/// Every append pushes the full collection to all subscribers of that path.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<CollectionPath, watch::Sender<Snapshot>>>,
    next_id: AtomicU64,
    next_session: AtomicU64,
    fail_writes: AtomicBool,
    fail_auth: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_auth(&self, fail: bool) {
        self.fail_auth.store(fail, Ordering::SeqCst);
    }

    /// Stores a record as-is, skipping any validation. Stands in for writes
    /// made by other (possibly misbehaving) clients.
    pub fn insert_raw(&self, collection: &CollectionPath, record: NominationRecord) {
        self.channel(collection)
            .send_modify(|records| Arc::make_mut(records).push(record));
    }

    pub fn records(&self, collection: &CollectionPath) -> Vec<NominationRecord> {
        let channel = self.channel(collection);
        let snapshot = Vec::clone(&channel.borrow());
        snapshot
    }

    fn channel(&self, collection: &CollectionPath) -> watch::Sender<Snapshot> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections
            .entry(collection.clone())
            .or_insert_with(|| watch::channel(Arc::new(Vec::new())).0)
            .clone()
    }
}

#[async_trait]
impl AuthProvider for MemoryStore {
    async fn authenticate_anonymously(&self) -> Result<Session> {
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(BoardError::auth("auth provider unreachable"));
        }
        let n = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session {
            submitter_id: format!("anon-{}", n),
        })
    }
}

#[async_trait]
impl NominationStore for MemoryStore {
    async fn append(
        &self,
        collection: &CollectionPath,
        nomination: &Nomination,
    ) -> Result<NominationRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BoardError::store("write rejected"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = NominationRecord::from_nomination(nomination, format!("mem-{}", id), Utc::now());
        self.insert_raw(collection, record.clone());
        Ok(record)
    }

    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription> {
        let mut changes = self.channel(collection).subscribe();
        let (tx, rx) = mpsc::unbounded_channel();

        let feed = tokio::spawn(async move {
            loop {
                let snapshot = Vec::clone(&changes.borrow_and_update());
                if tx.send(Ok(snapshot)).is_err() {
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, feed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::live_view::{FeedStatus, LiveView};
    use crate::domain::model::{DateWindow, FlatNumber, PhoneNumber, Slot};
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn nomination(name: &str) -> Nomination {
        Nomination {
            submitter_id: "anon-1".to_string(),
            full_name: name.to_string(),
            flat: "A-101".parse::<FlatNumber>().unwrap(),
            phone_number: "9876543210".parse::<PhoneNumber>().unwrap(),
            date: NaiveDate::from_ymd_opt(2025, 8, 28).unwrap(),
            slot: Slot::Morning,
            brings_own_offering_set: false,
        }
    }

    #[tokio::test]
    async fn test_sessions_are_fresh_per_authentication() {
        let store = MemoryStore::new();
        let a = assert_ok!(store.authenticate_anonymously().await);
        let b = assert_ok!(store.authenticate_anonymously().await);
        assert_ne!(a.submitter_id, b.submitter_id);

        store.set_fail_auth(true);
        assert_err!(store.authenticate_anonymously().await);
    }

    #[tokio::test]
    async fn test_subscription_pushes_initial_and_each_append() {
        let store = MemoryStore::new();
        let path = CollectionPath::for_deployment("mem");
        store.append(&path, &nomination("first")).await.unwrap();

        let mut sub = store.subscribe(&path).await.unwrap();
        let initial = sub.next().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        store.append(&path, &nomination("second")).await.unwrap();
        let updated = sub.next().await.unwrap().unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[1].full_name.as_deref(), Some("second"));
        assert_eq!(updated[1].wing.as_deref(), Some("A"));
        assert_eq!(updated[1].unit_number.as_deref(), Some("101"));
        assert!(updated[1].submitted_at.is_some());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryStore::new();
        let ours = CollectionPath::for_deployment("ours");
        let theirs = CollectionPath::for_deployment("theirs");
        store.append(&theirs, &nomination("x")).await.unwrap();
        assert!(store.records(&ours).is_empty());
        assert_eq!(store.records(&theirs).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_collection_untouched() {
        let store = MemoryStore::new();
        let path = CollectionPath::for_deployment("mem");
        store.set_fail_writes(true);
        assert_err!(store.append(&path, &nomination("x")).await);
        assert!(store.records(&path).is_empty());
    }

    #[tokio::test]
    async fn test_live_view_teardown_releases_subscription() {
        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::for_deployment("mem");
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 6).unwrap(),
        );

        let mut view = LiveView::mount(Arc::clone(&store), path.clone(), window);
        let first = tokio::time::timeout(Duration::from_secs(5), view.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.status, FeedStatus::Live);
        assert_eq!(store.channel(&path).receiver_count(), 1);

        view.teardown();

        // abort 之後要讓排程器跑幾輪，訂閱才會真正被丟棄
        let mut remaining = store.channel(&path).receiver_count();
        for _ in 0..100 {
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            remaining = store.channel(&path).receiver_count();
        }
        assert_eq!(remaining, 0);

        // 後續寫入不再有人接收
        assert_ok!(store.append(&path, &nomination("after")).await);
        assert_eq!(store.channel(&path).receiver_count(), 0);
    }
}

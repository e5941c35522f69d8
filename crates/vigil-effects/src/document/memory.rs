//! In-memory document store handler
//!
//! Backs the CLI demo and the testkit. Subscriptions are delivered through
//! bounded channels; a subscriber that falls behind loses intermediate
//! updates but always sees later ones.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use vigil_core::effects::{
    Document, DocumentChange, DocumentFilter, DocumentStoreEffects, DocumentSubscription,
    PhysicalTimeEffects, SERVER_TIMESTAMP,
};
use vigil_core::{CancelSignal, Result, SubscriptionHandle, VigilError};

use crate::time::RealTimeHandler;

const SUBSCRIPTION_BUFFER: usize = 32;

type Collections = HashMap<String, BTreeMap<String, Document>>;

struct Subscriber {
    sender: mpsc::Sender<DocumentChange>,
    signal: CancelSignal,
}

#[derive(Default)]
struct Subscribers {
    by_document: HashMap<(String, String), Vec<Subscriber>>,
}

impl Subscribers {
    fn publish(&mut self, collection: &str, id: &str, change: &DocumentChange) {
        let key = (collection.to_string(), id.to_string());
        let Some(subscribers) = self.by_document.get_mut(&key) else {
            return;
        };
        subscribers.retain(|subscriber| {
            if subscriber.signal.is_cancelled() {
                return false;
            }
            match subscriber.sender.try_send(change.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(collection, id, "document subscriber lagging, update dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        if subscribers.is_empty() {
            self.by_document.remove(&key);
        }
    }

    fn active_count(&self) -> usize {
        self.by_document
            .values()
            .flatten()
            .filter(|s| !s.signal.is_cancelled())
            .count()
    }
}

/// In-memory document store with real-time subscriptions
#[derive(Clone)]
pub struct MemoryDocumentHandler {
    collections: Arc<RwLock<Collections>>,
    subscribers: Arc<RwLock<Subscribers>>,
    clock: Arc<dyn PhysicalTimeEffects>,
}

impl MemoryDocumentHandler {
    /// Create an empty store stamping server timestamps from the OS clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(RealTimeHandler::new()))
    }

    /// Create an empty store stamping server timestamps from `clock`
    pub fn with_clock(clock: Arc<dyn PhysicalTimeEffects>) -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            subscribers: Arc::new(RwLock::new(Subscribers::default())),
            clock,
        }
    }

    /// Number of documents currently in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Number of subscriptions that have not been cancelled
    pub async fn active_subscriptions(&self) -> usize {
        self.subscribers.read().await.active_count()
    }

    async fn stamp(&self, document: &mut Document) -> Result<()> {
        let needs_stamp = document
            .values()
            .any(|v| v.as_str() == Some(SERVER_TIMESTAMP));
        if !needs_stamp {
            return Ok(());
        }
        let now = self
            .clock
            .physical_time()
            .await
            .map_err(|e| VigilError::internal(format!("time error: {e}")))?;
        for value in document.values_mut() {
            if value.as_str() == Some(SERVER_TIMESTAMP) {
                *value = Value::from(now.ts_ms);
            }
        }
        Ok(())
    }

    async fn write(&self, collection: &str, id: &str, document: Document) {
        let change = DocumentChange::Upserted(document.clone());
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        self.subscribers
            .write()
            .await
            .publish(collection, id, &change);
    }

    /// Read-modify-write under one guard. `create` decides whether a missing
    /// document starts empty or is an error.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        create: bool,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if !create && !docs.contains_key(id) {
            return Err(VigilError::not_found(format!("{collection}/{id}")));
        }
        let document = docs.entry(id.to_string()).or_default();
        document.extend(fields);
        let change = DocumentChange::Upserted(document.clone());
        self.subscribers
            .write()
            .await
            .publish(collection, id, &change);
        Ok(())
    }
}

impl Default for MemoryDocumentHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDocumentHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocumentHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStoreEffects for MemoryDocumentHandler {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, mut document: Document) -> Result<()> {
        self.stamp(&mut document).await?;
        self.write(collection, id, document).await;
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, mut patch: Document) -> Result<()> {
        self.stamp(&mut patch).await?;
        self.patch(collection, id, patch, true).await
    }

    async fn update(&self, collection: &str, id: &str, mut patch: Document) -> Result<()> {
        self.stamp(&mut patch).await?;
        self.patch(collection, id, patch, false).await
    }

    async fn add(&self, collection: &str, mut document: Document) -> Result<String> {
        self.stamp(&mut document).await?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.write(collection, &id, document).await;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            self.subscribers
                .write()
                .await
                .publish(collection, id, &DocumentChange::Removed);
        }
        Ok(removed)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<(String, Document)>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| filter.matches(doc))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(&self, collection: &str, id: &str) -> Result<DocumentSubscription> {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let (handle, signal) = SubscriptionHandle::new();

        // Locks are always taken collections first, then subscribers. Holding
        // both keeps the snapshot and registration in step with writers.
        let collections = self.collections.read().await;
        let mut subscribers = self.subscribers.write().await;
        if let Some(current) = collections.get(collection).and_then(|docs| docs.get(id)) {
            // Fresh channel with spare capacity; cannot fail.
            let _ = sender.try_send(DocumentChange::Upserted(current.clone()));
        }
        subscribers
            .by_document
            .entry((collection.to_string(), id.to_string()))
            .or_default()
            .push(Subscriber { sender, signal });

        Ok(DocumentSubscription::new(receiver, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SimulatedTimeHandler;
    use serde_json::json;
    use vigil_core::effects::server_timestamp;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    fn store() -> MemoryDocumentHandler {
        MemoryDocumentHandler::with_clock(Arc::new(SimulatedTimeHandler::new(5_000)))
    }

    #[tokio::test(start_paused = true)]
    async fn add_stamps_server_timestamp() {
        let store = store();
        let id = store
            .add("sosAlerts", doc(json!({ "createdAt": server_timestamp() })))
            .await
            .unwrap();
        let stored = store.get("sosAlerts", &id).await.unwrap().unwrap();
        assert_eq!(stored["createdAt"], json!(5_000));
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let store = store();
        let err = store
            .update("liveLocations", "missing", doc(json!({ "latitude": 1.0 })))
            .await
            .unwrap_err();
        assert!(matches!(err, VigilError::NotFound { .. }));

        store
            .set("liveLocations", "s1", doc(json!({ "latitude": 0.0, "userId": "u" })))
            .await
            .unwrap();
        store
            .update("liveLocations", "s1", doc(json!({ "latitude": 1.0 })))
            .await
            .unwrap();
        let stored = store.get("liveLocations", "s1").await.unwrap().unwrap();
        assert_eq!(stored["latitude"], json!(1.0));
        assert_eq!(stored["userId"], json!("u"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn update_never_revives_a_deleted_document() {
        let store = store();
        for round in 0..500 {
            let id = format!("s{round}");
            store
                .set("liveLocations", &id, doc(json!({ "latitude": 0.0 })))
                .await
                .unwrap();

            let updater = {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    store
                        .update("liveLocations", &id, doc(json!({ "latitude": 1.0 })))
                        .await
                })
            };
            let deleter = {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move { store.delete("liveLocations", &id).await })
            };

            let updated = updater.await.unwrap();
            assert!(deleter.await.unwrap().unwrap());
            if let Err(err) = updated {
                assert!(matches!(err, VigilError::NotFound { .. }));
            }
            assert!(store.get("liveLocations", &id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn merge_creates_missing_document() {
        let store = store();
        store
            .merge("users", "u1", doc(json!({ "lastSOS": 1 })))
            .await
            .unwrap();
        let stored = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(stored["lastSOS"], json!(1));
    }

    #[tokio::test]
    async fn delete_reports_whether_document_existed() {
        let store = store();
        store.set("c", "d", Document::new()).await.unwrap();
        assert!(store.delete("c", "d").await.unwrap());
        assert!(!store.delete("c", "d").await.unwrap());
    }

    #[tokio::test]
    async fn subscription_sees_snapshot_updates_and_removal() {
        let store = store();
        store
            .set("liveLocations", "s1", doc(json!({ "latitude": 0.0 })))
            .await
            .unwrap();
        let mut sub = store.subscribe("liveLocations", "s1").await.unwrap();

        assert!(matches!(sub.next().await, Some(DocumentChange::Upserted(_))));
        store
            .merge("liveLocations", "s1", doc(json!({ "latitude": 2.0 })))
            .await
            .unwrap();
        match sub.next().await {
            Some(DocumentChange::Upserted(d)) => assert_eq!(d["latitude"], json!(2.0)),
            other => panic!("unexpected change: {other:?}"),
        }
        store.delete("liveLocations", "s1").await.unwrap();
        assert_eq!(sub.next().await, Some(DocumentChange::Removed));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_prunes() {
        let store = store();
        let sub = store.subscribe("c", "d").await.unwrap();
        assert_eq!(store.active_subscriptions().await, 1);
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert_eq!(store.active_subscriptions().await, 0);
        store.set("c", "d", Document::new()).await.unwrap();
    }

    #[tokio::test]
    async fn query_filters_by_array_membership() {
        let store = store();
        store
            .set("chats", "t1", doc(json!({ "participants": ["a", "b"] })))
            .await
            .unwrap();
        store
            .set("chats", "t2", doc(json!({ "participants": ["b", "c"] })))
            .await
            .unwrap();
        let threads = store
            .query("chats", &DocumentFilter::array_contains("participants", "a"))
            .await
            .unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].0, "t1");
    }
}

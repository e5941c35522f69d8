//! Durable document store effect trait
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `vigil-effects::MemoryDocumentHandler`, hosted backends
//! - **Usage**: SOS audit records, live-location records, profiles, chat threads
//!
//! Documents are untyped JSON objects at this boundary. Domain crates convert
//! them into typed records at ingress and fill defaults for missing fields
//! there, never deeper inside the flow.

use crate::subscription::{CancelSignal, SubscriptionHandle};
use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

/// A stored document: a JSON object keyed by field name
pub type Document = Map<String, Value>;

/// Sentinel replaced by the store with its own clock (ms since epoch) when a
/// document is written.
pub const SERVER_TIMESTAMP: &str = "__vigil_server_timestamp__";

/// Field value asking the store to stamp its write time
pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP.to_string())
}

/// Predicate for [`DocumentStoreEffects::query`]
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFilter {
    /// Every document in the collection
    All,
    /// `field` equals `value`
    Equals {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// `field` is an array containing `value`
    ArrayContains {
        /// Field name
        field: String,
        /// Element to look for
        value: Value,
    },
}

impl DocumentFilter {
    /// Filter on array membership
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Filter on field equality
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Equals { field, value } => document.get(field) == Some(value),
            Self::ArrayContains { field, value } => document
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// A change pushed to a document subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentChange {
    /// The document now has this content
    Upserted(Document),
    /// The document was deleted
    Removed,
}

/// A running real-time subscription to one document
#[derive(Debug)]
pub struct DocumentSubscription {
    updates: mpsc::Receiver<DocumentChange>,
    handle: SubscriptionHandle,
    signal: CancelSignal,
}

impl DocumentSubscription {
    /// Wrap a change channel and the handle that stops the producer
    pub fn new(updates: mpsc::Receiver<DocumentChange>, handle: SubscriptionHandle) -> Self {
        let signal = handle.signal();
        Self {
            updates,
            handle,
            signal,
        }
    }

    /// Next change, or `None` after unsubscribe
    pub async fn next(&mut self) -> Option<DocumentChange> {
        tokio::select! {
            biased;
            _ = self.signal.cancelled() => None,
            change = self.updates.recv() => change,
        }
    }

    /// Stop receiving changes. Safe to call repeatedly.
    pub fn unsubscribe(&self) -> bool {
        self.handle.cancel()
    }

    /// Whether the subscription has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

/// Collection/id addressed document storage with real-time subscriptions
#[async_trait]
pub trait DocumentStoreEffects: Send + Sync {
    /// Read a document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create or replace a document
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()>;

    /// Merge fields into a document, creating it if missing
    async fn merge(&self, collection: &str, id: &str, patch: Document) -> Result<()>;

    /// Merge fields into an existing document; `NotFound` if it is missing
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<()>;

    /// Create a document with a store-assigned id
    async fn add(&self, collection: &str, document: Document) -> Result<String>;

    /// Delete a document; `Ok(false)` if it did not exist
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;

    /// Documents in a collection matching `filter`, as `(id, document)`
    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<(String, Document)>>;

    /// Subscribe to changes of one document. The current content (if any) is
    /// delivered first.
    async fn subscribe(&self, collection: &str, id: &str) -> Result<DocumentSubscription>;
}

#[async_trait]
impl<T: DocumentStoreEffects + ?Sized> DocumentStoreEffects for std::sync::Arc<T> {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        (**self).get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        (**self).set(collection, id, document).await
    }

    async fn merge(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        (**self).merge(collection, id, patch).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<()> {
        (**self).update(collection, id, patch).await
    }

    async fn add(&self, collection: &str, document: Document) -> Result<String> {
        (**self).add(collection, document).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        (**self).delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<(String, Document)>> {
        (**self).query(collection, filter).await
    }

    async fn subscribe(&self, collection: &str, id: &str) -> Result<DocumentSubscription> {
        (**self).subscribe(collection, id).await
    }
}

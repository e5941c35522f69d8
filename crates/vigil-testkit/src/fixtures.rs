//! Store fixtures: profiles and chat threads in the shapes the app writes

use serde_json::{json, Value};
use vigil_core::effects::{Document, DocumentStoreEffects};

/// A close-friend entry as stored on a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendFixture {
    /// Contact id
    pub id: String,
    /// Display name
    pub name: String,
    /// Phone number, if any
    pub phone: Option<String>,
}

impl FriendFixture {
    /// Friend with a phone number
    pub fn with_phone(id: &str, name: &str, phone: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
        }
    }

    /// Friend without a phone number
    pub fn without_phone(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            phone: None,
        }
    }

    fn to_value(&self) -> Value {
        match &self.phone {
            Some(phone) => json!({ "id": self.id, "name": self.name, "phone": phone }),
            None => json!({ "id": self.id, "name": self.name }),
        }
    }
}

/// Convert a JSON object literal into a store document
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture documents must be objects, got {other}"),
    }
}

/// Write `users/{user_id}` with the given close friends
pub async fn seed_profile<S>(store: &S, user_id: &str, friends: &[FriendFixture])
where
    S: DocumentStoreEffects + ?Sized,
{
    let friends: Vec<Value> = friends.iter().map(FriendFixture::to_value).collect();
    store
        .set(
            "users",
            user_id,
            document(json!({ "displayName": user_id, "closeFriends": friends })),
        )
        .await
        .unwrap();
}

/// Write `chats/{thread_id}` with `participants`
pub async fn seed_thread<S>(store: &S, thread_id: &str, participants: &[&str])
where
    S: DocumentStoreEffects + ?Sized,
{
    store
        .set(
            "chats",
            thread_id,
            document(json!({ "participants": participants, "lastMessage": "" })),
        )
        .await
        .unwrap();
}

/// Messages stored in thread `thread_id`
pub async fn thread_messages<S>(store: &S, thread_id: &str) -> Vec<Document>
where
    S: DocumentStoreEffects + ?Sized,
{
    store
        .query(
            &format!("chats/{thread_id}/messages"),
            &vigil_core::effects::DocumentFilter::All,
        )
        .await
        .unwrap()
        .into_iter()
        .map(|(_, doc)| doc)
        .collect()
}

//! Persisted record shapes
//!
//! Typed views of the documents this flow reads and writes. Conversion from
//! untyped store documents happens here, once, with missing fields defaulted
//! (a profile without `closeFriends` has no close friends) and malformed
//! entries skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigil_core::effects::{server_timestamp, Document};
use vigil_core::{Coordinate, LiveSessionId, Result, ThreadId, UserId, VigilError};

use crate::trigger::TriggerSource;

/// Append-only audit trail of triggered alerts
pub const SOS_ALERTS: &str = "sosAlerts";
/// One record per active live-location session
pub const LIVE_LOCATIONS: &str = "liveLocations";
/// User profile documents, keyed by user id
pub const USERS: &str = "users";
/// Conversation threads
pub const CHATS: &str = "chats";

/// Collection holding the messages of one thread
pub fn chat_messages_collection(thread_id: &ThreadId) -> String {
    format!("{CHATS}/{thread_id}/messages")
}

/// Serialize a record into a store document
pub fn to_document<T: Serialize>(record: &T) -> Result<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(VigilError::serialization(format!(
            "record serialized to non-object: {other}"
        ))),
    }
}

/// One triggered alert as written to `sosAlerts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosAlertRecord {
    /// Owner of the alert
    pub user_id: UserId,
    /// Latitude at trigger time
    pub latitude: f64,
    /// Longitude at trigger time
    pub longitude: f64,
    /// The composed message exactly as sent
    pub message: String,
    /// Street-level image links at headings 0/120/240
    pub street_view_images: Vec<String>,
    /// Live-share link, absent when no session could be opened
    pub live_location_link: Option<String>,
    /// Battery percentage 0–100
    pub battery_level: u8,
    /// What started the trigger
    pub trigger: TriggerSource,
}

impl SosAlertRecord {
    /// Coordinate the alert was raised at
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Document to append, with a store-assigned `createdAt`
    pub fn to_document(&self) -> Result<Document> {
        let mut document = to_document(self)?;
        document.insert("createdAt".to_string(), server_timestamp());
        Ok(document)
    }

    /// Parse a stored alert
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(document.clone()))?)
    }
}

/// A live-location session as stored in `liveLocations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveLocationRecord {
    /// Session id, also the document id
    pub session_id: LiveSessionId,
    /// Sharing user
    pub user_id: UserId,
    /// Latest latitude
    pub latitude: f64,
    /// Latest longitude
    pub longitude: f64,
    /// Creation time, ms since epoch
    pub created_at: u64,
    /// Fixed expiry, ms since epoch; never extended
    pub expires_at: u64,
    /// Time of the last coordinate write, ms since epoch
    pub updated_at: u64,
}

impl LiveLocationRecord {
    /// Latest coordinate
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Full document for the initial write
    pub fn to_document(&self) -> Result<Document> {
        to_document(self)
    }

    /// Parse a stored session
    pub fn from_document(document: &Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(document.clone()))?)
    }

    /// Patch moving the session to `coordinate` at `updated_at`
    pub fn position_patch(coordinate: Coordinate, updated_at: u64) -> Document {
        let mut patch = Document::new();
        patch.insert("latitude".to_string(), Value::from(coordinate.latitude));
        patch.insert("longitude".to_string(), Value::from(coordinate.longitude));
        patch.insert("updatedAt".to_string(), Value::from(updated_at));
        patch
    }
}

/// A close friend from the user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFriendContact {
    /// Contact identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Phone number; contacts without one are not SMS targets
    pub phone: Option<String>,
}

impl CloseFriendContact {
    /// Create a contact
    pub fn new(id: impl Into<String>, name: impl Into<String>, phone: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: phone.map(str::to_string),
        }
    }

    /// Trimmed phone number, if present and non-blank
    pub fn sms_number(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }

    fn from_value(index: usize, value: &Value) -> Option<Self> {
        let entry = value.as_object()?;
        let text = |key: &str| -> Option<String> {
            match entry.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };
        Some(Self {
            id: text("id").unwrap_or_else(|| format!("contact-{index}")),
            name: text("name").unwrap_or_default(),
            phone: text("phone").or_else(|| text("phoneNumber")),
        })
    }
}

/// The parts of a user profile this flow reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Configured close friends, possibly empty
    pub close_friends: Vec<CloseFriendContact>,
    /// Last completed trigger, ms since epoch
    pub last_sos: Option<u64>,
}

impl UserProfile {
    /// Parse a profile document, defaulting anything missing or malformed
    pub fn from_document(document: &Document) -> Self {
        let close_friends = document
            .get("closeFriends")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .enumerate()
                    .filter_map(|(index, value)| CloseFriendContact::from_value(index, value))
                    .collect()
            })
            .unwrap_or_default();
        let last_sos = document.get("lastSOS").and_then(Value::as_u64);
        Self {
            close_friends,
            last_sos,
        }
    }

    /// Patch recording a completed trigger
    pub fn last_sos_patch() -> Document {
        let mut patch = Document::new();
        patch.insert("lastSOS".to_string(), server_timestamp());
        patch
    }
}

/// A conversation thread the user participates in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatThread {
    /// Thread id
    pub id: ThreadId,
    /// Participant user ids
    pub participants: Vec<String>,
}

impl ChatThread {
    /// Parse a thread document
    pub fn from_document(id: &str, document: &Document) -> Self {
        let participants = document
            .get("participants")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id: ThreadId::new(id),
            participants,
        }
    }

    /// Whether anyone besides `user` would read a message posted here
    pub fn reaches_someone_besides(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| p != user.as_str())
    }

    /// Message document appended to the thread
    pub fn message_document(sender: &UserId, text: &str) -> Document {
        let mut message = Document::new();
        message.insert("text".to_string(), Value::from(text));
        message.insert("senderId".to_string(), Value::from(sender.as_str()));
        message.insert("kind".to_string(), Value::from("sos"));
        message.insert("createdAt".to_string(), server_timestamp());
        message
    }

    /// Summary patch reflecting the message just appended
    pub fn summary_patch(sender: &UserId, text: &str) -> Document {
        let mut patch = Document::new();
        patch.insert("lastMessage".to_string(), Value::from(text));
        patch.insert("lastSenderId".to_string(), Value::from(sender.as_str()));
        patch.insert("lastMessageAt".to_string(), server_timestamp());
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn missing_close_friends_defaults_to_empty() {
        let profile = UserProfile::from_document(&doc(json!({ "name": "Asha" })));
        assert!(profile.close_friends.is_empty());
        assert_eq!(profile.last_sos, None);
    }

    #[test]
    fn malformed_close_friend_entries_are_skipped() {
        let profile = UserProfile::from_document(&doc(json!({
            "closeFriends": [
                { "id": "c1", "name": "Ravi", "phone": "+919900000001" },
                "not an object",
                { "name": "Meera", "phoneNumber": 9900000002u64 },
                { "id": "c3", "name": "No Phone" }
            ]
        })));
        assert_eq!(profile.close_friends.len(), 3);
        assert_eq!(profile.close_friends[0].sms_number(), Some("+919900000001"));
        assert_eq!(profile.close_friends[1].id, "contact-2");
        assert_eq!(profile.close_friends[1].sms_number(), Some("9900000002"));
        assert_eq!(profile.close_friends[2].sms_number(), None);
    }

    #[test]
    fn blank_phone_is_not_an_sms_number() {
        let contact = CloseFriendContact::new("c", "Blank", Some("   "));
        assert_eq!(contact.sms_number(), None);
    }

    #[test]
    fn alert_document_uses_camel_case_and_server_time() {
        let record = SosAlertRecord {
            user_id: UserId::new("u1"),
            latitude: 12.9,
            longitude: 77.6,
            message: "help".to_string(),
            street_view_images: vec!["a".into(), "b".into(), "c".into()],
            live_location_link: None,
            battery_level: 100,
            trigger: TriggerSource::Manual,
        };
        let document = record.to_document().unwrap();
        assert_eq!(document["userId"], json!("u1"));
        assert_eq!(document["batteryLevel"], json!(100));
        assert_eq!(document["liveLocationLink"], Value::Null);
        assert_eq!(document["createdAt"], server_timestamp());
        assert_eq!(SosAlertRecord::from_document(&document).unwrap(), record);
    }

    #[test]
    fn thread_participants_ignore_non_strings() {
        let thread =
            ChatThread::from_document("t1", &doc(json!({ "participants": ["a", 3, "b"] })));
        assert_eq!(thread.participants, vec!["a".to_string(), "b".to_string()]);
        assert!(thread.reaches_someone_besides(&UserId::new("a")));

        let alone = ChatThread::from_document("t2", &doc(json!({ "participants": ["a", "a"] })));
        assert!(!alone.reaches_someone_besides(&UserId::new("a")));
    }
}

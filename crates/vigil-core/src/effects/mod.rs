//! Collaborator interfaces
//!
//! Pure trait definitions for every side effect the SOS flow performs. This
//! module defines **what** can be done; `vigil-effects` and
//! `vigil-testkit` define **how**.
//!
//! ## Infrastructure effects
//! - **Time**, **Random**: clocks, sleeping, identifiers
//! - **Permission**, **Location**: runtime prompts and position providers
//! - **Battery**, **Haptic**: device facts and feedback
//! - **Sms**: batched device SMS
//! - **Document**: durable collection/id store with real-time subscriptions
//! - **Notice**: user-visible alerts
//!
//! ## Composite effects
//! Supertraits bundling the above per component (no handlers needed).

pub mod battery;
pub mod document;
pub mod haptic;
pub mod location;
pub mod notice;
pub mod random;
pub mod sms;
pub mod supertraits;
pub mod time;

pub use battery::BatteryEffects;
pub use document::{
    server_timestamp, Document, DocumentChange, DocumentFilter, DocumentStoreEffects,
    DocumentSubscription, SERVER_TIMESTAMP,
};
pub use haptic::HapticEffects;
pub use location::{LocationEffects, LocationError, PermissionEffects, PositionWatch};
pub use notice::{NoticeEffects, NoticeLevel, UserNotice};
pub use random::RandomEffects;
pub use sms::{SmsEffects, SmsError, SmsSendStatus};
pub use supertraits::{FanOutEffects, LiveLocationEffects, SosEffects};
pub use time::{PhysicalTimeEffects, TimeError};

//! Vigil SOS - emergency coordination flow
//!
//! Countdown, multi-channel alert fan-out and live-location sharing, written
//! against the collaborator traits in `vigil-core`:
//!
//! - [`trigger`]: the [`SosCoordinator`] state machine (idle, counting down,
//!   dispatching)
//! - [`live_location`]: time-bounded live-location sessions and their
//!   cleanup; [`viewer`] follows one from the other side
//! - [`dispatch`]: composes the alert and fans it out over SMS and chat
//! - [`shake`]: turns accelerometer samples into auto-activate signals
//!
//! Every effect goes through a trait, so the whole flow runs under
//! `vigil-testkit::MockEffects` with a paused tokio clock.

pub mod config;
pub mod contacts;
pub mod countdown;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod live_location;
pub mod message;
pub mod records;
pub mod shake;
pub mod trigger;
pub mod viewer;

pub use config::{DefaultContact, LocationWatchConfig, MessageConfig, ShakeConfig, SosConfig};
pub use contacts::{resolve_recipients, RecipientSource, Recipients};
pub use countdown::{CountdownTick, CountdownTimer};
pub use dispatch::{ChannelOutcome, DispatchResult, NotificationDispatcher};
pub use error::{SosError, SosResult};
pub use live_location::{LiveLocationManager, LiveSession};
pub use message::{battery_percent, compose_alert_message, ComposedAlert};
pub use records::{CloseFriendContact, LiveLocationRecord, SosAlertRecord, UserProfile};
pub use shake::{AccelerometerSample, ShakeDetector};
pub use trigger::{
    SosContext, SosCoordinator, SosOutcome, SosPhase, SosReport, StartDecision, TriggerSource,
};
pub use viewer::{LiveLocationUpdate, LiveLocationViewer};

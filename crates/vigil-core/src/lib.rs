//! Vigil Core - interface layer
//!
//! Shared vocabulary for the Vigil SOS flow:
//!
//! - [`effects`]: collaborator traits (time, location, battery, SMS, haptics,
//!   document store, notices) and their composites
//! - [`subscription`]: idempotent cancellation handles for push subscriptions
//! - [`config`]: the TOML + environment loading convention
//! - identifiers, coordinates and the unified [`VigilError`]
//!
//! This crate has no handlers; see `vigil-effects` for host implementations.

pub mod config;
pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod subscription;
pub mod time;
pub mod types;

pub use errors::{Result, VigilError};
pub use identifiers::{LiveSessionId, ThreadId, UserId};
pub use subscription::{CancelSignal, SubscriptionHandle};
pub use time::PhysicalTime;
pub use types::{Coordinate, PermissionStatus, WatchOptions};

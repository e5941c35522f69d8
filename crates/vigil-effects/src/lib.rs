//! Vigil Effects - host handlers
//!
//! Standard implementations of the collaborator traits from `vigil-core`:
//!
//! - [`time`]: OS clock and a tokio-driven simulated clock
//! - [`document`]: in-memory document store with real-time subscriptions
//! - [`location`]: simulated position provider and permission prompt
//! - [`device`]: battery, haptics, SMS and notices that report via `tracing`
//! - [`host`]: [`HostEffects`], one value implementing every trait

pub mod device;
pub mod document;
pub mod host;
pub mod location;
pub mod random;
pub mod time;

pub use device::{LoggingHapticHandler, LoggingSmsHandler, StaticBatteryHandler, TracingNoticeHandler};
pub use document::MemoryDocumentHandler;
pub use host::HostEffects;
pub use location::SimulatedLocationHandler;
pub use random::RealRandomHandler;
pub use time::{RealTimeHandler, SimulatedTimeHandler};

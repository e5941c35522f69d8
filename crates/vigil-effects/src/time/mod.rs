//! Time effect handlers
//!
//! Standard implementations of `PhysicalTimeEffects` defined in `vigil-core`.

pub mod real;
pub mod simulated;

pub use real::RealTimeHandler;
pub use simulated::SimulatedTimeHandler;

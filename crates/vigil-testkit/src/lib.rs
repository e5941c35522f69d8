//! Vigil Testing Infrastructure
//!
//! Deterministic effects and store fixtures shared by the workspace's tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! vigil-testkit = { path = "../vigil-testkit" }
//! ```
//!
//! ```rust,no_run
//! use vigil_testkit::*;
//!
//! # async fn demo() {
//! let effects = MockEffects::deterministic();
//! seed_thread(&effects, "t1", &["alice", "bob"]).await;
//! # }
//! ```

pub mod fixtures;
pub mod mock_effects;

pub use fixtures::*;
pub use mock_effects::{MockEffects, SmsBatch, DEFAULT_POSITION};

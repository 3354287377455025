//! # Pracht Alpha - polling bridge for the Pracht Alpha EV wallbox
//!
//! Talks to the wallbox over its local HTTP API, polls telemetry on a fixed
//! interval and exposes the result as typed entities, with commands for the
//! current limits, the side locks and the status LED.
//!
//! ## Architecture
//!
//! - `wallbox`: HTTP client, auth-key session and typed records
//! - `coordinator`: fixed-interval polling and snapshot publishing
//! - `setup`: first connection, credential validation, re-authentication
//! - `entities`: sensors, binary sensors, numbers, switches and the LED select
//! - `web`: REST and SSE surface (feature `web`)
//! - `config`: YAML configuration with validation
//! - `logging`: structured logging and tracing

pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod logging;
pub mod setup;
pub mod wallbox;
#[cfg(feature = "web")]
pub mod web;

#[cfg(all(test, feature = "web"))]
mod web_tests;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorData, CoordinatorStatus, UpdateFailure};
pub use error::{PrachtError, Result};
pub use setup::{Bridge, SetupFailure};
pub use wallbox::{AllData, LockStatus, Side, WallboxApi, WallboxClient};

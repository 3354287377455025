//! Pracht Alpha wallbox HTTP API
//!
//! `types` holds the parsed records, `client` the transport and the auth-key
//! session, `api` the endpoint trait and its implementation.

pub mod api;
pub mod client;
pub mod types;

pub use api::WallboxApi;
pub use client::{AUTH_HEADER, DEFAULT_REQUEST_TIMEOUT, ResponseBody, WallboxClient};
pub use types::{AllData, LockStatus, Side};

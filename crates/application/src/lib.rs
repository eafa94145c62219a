//! Application layer for Stratum.
//!
//! Translates external payloads into repository calls through a unit of
//! work. One generic [`Service`] covers any entity type and repository
//! flavor; payloads plug in through the [`payload`] traits.

pub mod payload;
pub mod service;

pub use payload::{CreatePayload, UpdatePayload};
pub use service::Service;

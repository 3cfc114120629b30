//! Schwab backend: modern and legacy API generations behind one login.
//!
//! The fallback axis resubmits through the legacy endpoint with identical
//! parameters; known business rejections terminate the attempt without a
//! retry.

mod api_types;
mod client;

pub use client::{SchwabArtifact, SchwabClient, SchwabConfig, SchwabSession};

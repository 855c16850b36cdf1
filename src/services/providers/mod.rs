//! Landmark detection provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction for landmark detection,
//! allowing easy swapping between backends (Google Cloud Vision, mock).

pub mod google_vision;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for detector operations.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detector not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// A latitude/longitude pair attached to a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One detected landmark, in the order the backend returned them.
///
/// `locations` only holds points that carried full coordinates; entries the
/// backend returned without them are dropped at the wire boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkDetection {
    /// Human-readable landmark name (e.g. "Eiffel Tower").
    pub name: String,

    /// Candidate coordinates for the landmark. May be empty.
    pub locations: Vec<GeoPoint>,
}

/// Trait for landmark detection backends (e.g. Google Cloud Vision).
#[async_trait]
pub trait LandmarkDetector: Send + Sync {
    /// Detect landmarks in the given image bytes.
    ///
    /// An empty vec means the backend answered but found nothing.
    async fn detect(&self, image: &[u8]) -> Result<Vec<LandmarkDetection>, DetectorError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), DetectorError>;
}

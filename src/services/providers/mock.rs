//! Mock detector implementation for testing.

use super::{DetectorError, LandmarkDetection, LandmarkDetector};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mock landmark detector with a canned answer.
///
/// Useful in tests and for running the service without Google credentials.
pub struct MockDetector {
    response: MockResponse,
    detect_count: AtomicU64,
}

enum MockResponse {
    Detections(Vec<LandmarkDetection>),
    ApiError(String),
}

impl MockDetector {
    /// Always answers with the given detections.
    pub fn with_detections(detections: Vec<LandmarkDetection>) -> Self {
        Self {
            response: MockResponse::Detections(detections),
            detect_count: AtomicU64::new(0),
        }
    }

    /// Always answers with an empty detection list.
    pub fn empty() -> Self {
        Self::with_detections(Vec::new())
    }

    /// Always fails with an API error.
    pub fn failing(message: &str) -> Self {
        Self {
            response: MockResponse::ApiError(message.to_string()),
            detect_count: AtomicU64::new(0),
        }
    }

    pub fn detect_count(&self) -> u64 {
        self.detect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LandmarkDetector for MockDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<LandmarkDetection>, DetectorError> {
        self.detect_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            image_bytes = image.len(),
            "[MOCK] image would be sent for landmark detection"
        );

        match &self.response {
            MockResponse::Detections(detections) => Ok(detections.clone()),
            MockResponse::ApiError(message) => Err(DetectorError::ApiError(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), DetectorError> {
        Ok(())
    }
}

//! Google Cloud Vision landmark detection provider.
//!
//! Implements landmark detection via the Vision REST API's `images:annotate`
//! batch endpoint, sending a single LANDMARK_DETECTION feature request with
//! the image bytes base64-encoded inline.

use super::{DetectorError, GeoPoint, LandmarkDetection, LandmarkDetector};
use crate::services::google_auth::TokenSource;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Annotations requested per image. Only the first is used downstream.
const MAX_RESULTS: u32 = 10;

/// How Vision API calls authenticate.
#[derive(Clone)]
pub enum VisionAuth {
    /// API key appended as a `key` query parameter.
    ApiKey(Secret<String>),

    /// Service-account credentials exchanged for Bearer tokens.
    ServiceAccount(Arc<TokenSource>),
}

/// Vision provider configuration.
#[derive(Clone)]
pub struct GoogleVisionConfig {
    /// Base URL, e.g. `https://vision.googleapis.com/v1`.
    pub api_url: String,
    pub auth: VisionAuth,
}

/// Landmark detector backed by Google Cloud Vision.
pub struct GoogleVisionDetector {
    config: GoogleVisionConfig,
    client: Client,
}

impl GoogleVisionDetector {
    pub fn new(config: GoogleVisionConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Build the annotate URL for the configured auth mode.
    fn annotate_url(&self) -> String {
        match &self.config.auth {
            VisionAuth::ApiKey(key) => format!(
                "{}/images:annotate?key={}",
                self.config.api_url,
                key.expose_secret()
            ),
            VisionAuth::ServiceAccount(_) => format!("{}/images:annotate", self.config.api_url),
        }
    }
}

#[async_trait]
impl LandmarkDetector for GoogleVisionDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<LandmarkDetection>, DetectorError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateRequestItem {
                image: ImageContent {
                    content: BASE64.encode(image),
                },
                features: vec![Feature {
                    r#type: "LANDMARK_DETECTION".to_string(),
                    max_results: MAX_RESULTS,
                }],
            }],
        };

        let url = self.annotate_url();

        tracing::debug!(image_bytes = image.len(), "Sending request to Vision API");

        let mut builder = self.client.post(&url).json(&request);
        if let VisionAuth::ServiceAccount(source) = &self.config.auth {
            let token = source
                .token()
                .await
                .map_err(|e| DetectorError::Auth(e.to_string()))?;
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DetectorError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(DetectorError::RateLimited);
            }

            return Err(DetectorError::ApiError(format!(
                "Vision API error {}: {}",
                status, error_text
            )));
        }

        let api_response: AnnotateResponse = response.json().await.map_err(|e| {
            DetectorError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        // One request in, one response out. An empty batch means the API
        // answered with something other than the annotate shape.
        let annotate = api_response
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| DetectorError::InvalidResponse("empty responses array".to_string()))?;

        // Per-image errors come back inside the batch entry, not as HTTP
        // status codes.
        if let Some(error) = annotate.error {
            return Err(DetectorError::ApiError(format!(
                "Vision API error {}: {}",
                error.code, error.message
            )));
        }

        let detections = to_detections(annotate.landmark_annotations);

        tracing::debug!(count = detections.len(), "Vision API returned annotations");

        Ok(detections)
    }

    async fn health_check(&self) -> Result<(), DetectorError> {
        match &self.config.auth {
            VisionAuth::ApiKey(key) => {
                if key.expose_secret().is_empty() {
                    return Err(DetectorError::NotConfigured(
                        "Vision API key not configured".to_string(),
                    ));
                }
                Ok(())
            }
            // Fetching a token exercises both the key material and the
            // token endpoint.
            VisionAuth::ServiceAccount(source) => source
                .token()
                .await
                .map(|_| ())
                .map_err(|e| DetectorError::Auth(e.to_string())),
        }
    }
}

/// Convert wire annotations to domain detections, preserving order.
///
/// Location entries without a `latLng` are dropped here so callers only
/// ever see usable coordinate pairs.
fn to_detections(annotations: Vec<LandmarkAnnotation>) -> Vec<LandmarkDetection> {
    annotations
        .into_iter()
        .map(|a| LandmarkDetection {
            name: a.description,
            locations: a
                .locations
                .into_iter()
                .filter_map(|loc| loc.lat_lng)
                .map(|ll| GeoPoint {
                    latitude: ll.latitude,
                    longitude: ll.longitude,
                })
                .collect(),
        })
        .collect()
}

// ============================================================================
// Vision API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateRequestItem>,
}

#[derive(Debug, Serialize)]
struct AnnotateRequestItem {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    /// Base64-encoded image bytes.
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    r#type: String,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateItemResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateItemResponse {
    #[serde(default)]
    landmark_annotations: Vec<LandmarkAnnotation>,
    #[serde(default)]
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LandmarkAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    locations: Vec<LocationInfo>,
    #[serde(default)]
    #[allow(dead_code)]
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationInfo {
    #[serde(default)]
    lat_lng: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_config(api_url: &str) -> GoogleVisionConfig {
        GoogleVisionConfig {
            api_url: api_url.to_string(),
            auth: VisionAuth::ApiKey(Secret::new("test_key".to_string())),
        }
    }

    #[test]
    fn test_annotate_url_with_api_key() {
        let detector = GoogleVisionDetector::new(key_config("https://vision.googleapis.com/v1"));
        assert_eq!(
            detector.annotate_url(),
            "https://vision.googleapis.com/v1/images:annotate?key=test_key"
        );
    }

    #[test]
    fn test_annotation_parsing_drops_missing_coordinates() {
        let body = r#"{
            "responses": [{
                "landmarkAnnotations": [{
                    "description": "Eiffel Tower",
                    "score": 0.91,
                    "locations": [
                        {"latLng": {"latitude": 48.858461, "longitude": 2.294351}},
                        {},
                        {"latLng": {"latitude": 48.8583, "longitude": 2.2945}}
                    ]
                }]
            }]
        }"#;

        let parsed: AnnotateResponse = serde_json::from_str(body).unwrap();
        let detections =
            to_detections(parsed.responses.into_iter().next().unwrap().landmark_annotations);

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].name, "Eiffel Tower");
        assert_eq!(detections[0].locations.len(), 2);
        assert_eq!(detections[0].locations[0].latitude, 48.858461);
        assert_eq!(detections[0].locations[1].longitude, 2.2945);
    }

    #[test]
    fn test_empty_annotations_parse_to_empty_detections() {
        let parsed: AnnotateResponse = serde_json::from_str(r#"{"responses": [{}]}"#).unwrap();
        let detections =
            to_detections(parsed.responses.into_iter().next().unwrap().landmark_annotations);
        assert!(detections.is_empty());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AnnotateRequest {
            requests: vec![AnnotateRequestItem {
                image: ImageContent {
                    content: BASE64.encode(b"bytes"),
                },
                features: vec![Feature {
                    r#type: "LANDMARK_DETECTION".to_string(),
                    max_results: MAX_RESULTS,
                }],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requests"][0]["features"][0]["type"], "LANDMARK_DETECTION");
        assert_eq!(json["requests"][0]["features"][0]["maxResults"], 10);
        assert_eq!(json["requests"][0]["image"]["content"], "Ynl0ZXM=");
    }
}

use crate::services::providers::{GeoPoint, LandmarkDetection};
use crate::services::wikipedia::PageSummary;
use serde::Serialize;

/// Success body for the analyze endpoint.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub landmark: String,
    pub locations: Vec<Location>,
    pub wikipedia: WikipediaInfo,
}

#[derive(Debug, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct WikipediaInfo {
    pub summary: String,
    pub page: String,
}

impl AnalysisResponse {
    pub fn new(detection: LandmarkDetection, summary: PageSummary) -> Self {
        Self {
            landmark: detection.name,
            locations: detection.locations.into_iter().map(Location::from).collect(),
            wikipedia: summary.into(),
        }
    }
}

impl From<GeoPoint> for Location {
    fn from(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

impl From<PageSummary> for WikipediaInfo {
    fn from(summary: PageSummary) -> Self {
        Self {
            summary: summary.summary,
            page: summary.page,
        }
    }
}

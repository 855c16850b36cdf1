use landmark_service::config::{
    CacheBackend, CacheConfig, Config, GoogleCredentials, ServerConfig, SummaryConfig, VisionConfig,
};
use landmark_service::services::providers::LandmarkDetector;
use landmark_service::startup::Application;
use secrecy::Secret;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

/// Configuration pointing the Wikipedia client at a mock server, with the
/// summary cache disabled. Cache tests swap in their own cache section.
pub fn test_config(wikipedia_url: &str) -> Config {
    Config {
        server: ServerConfig { port: 0 },
        vision: VisionConfig {
            api_url: "http://127.0.0.1:1/v1".to_string(),
            credentials: GoogleCredentials::ApiKey(Secret::new("test-api-key".to_string())),
        },
        wikipedia: SummaryConfig {
            api_url: wikipedia_url.to_string(),
            timeout_secs: 2,
        },
        cache: CacheConfig {
            backend: CacheBackend::Off,
            dir: String::new(),
            ttl_secs: 3600,
        },
    }
}

impl TestApp {
    /// Spawn the application on a random port with an injected detector.
    pub async fn spawn(detector: Arc<dyn LandmarkDetector>, wikipedia_url: &str) -> Self {
        Self::spawn_with_config(detector, test_config(wikipedia_url)).await
    }

    pub async fn spawn_with_config(detector: Arc<dyn LandmarkDetector>, config: Config) -> Self {
        let app = Application::build_with_detector(config, detector)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}

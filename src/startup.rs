use crate::config::{CacheBackend, CacheConfig, Config, GoogleCredentials, VisionConfig};
use crate::error::AppError;
use crate::handlers;
use crate::middleware::{metrics_middleware, request_id_middleware};
use crate::services::providers::google_vision::{
    GoogleVisionConfig, GoogleVisionDetector, VisionAuth,
};
use crate::services::providers::LandmarkDetector;
use crate::services::{
    FileSummaryCache, InMemorySummaryCache, NoopSummaryCache, ServiceAccountKey, SummaryCache,
    TokenSource, WikipediaClient, WikipediaConfig,
};
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn LandmarkDetector>,
    pub wikipedia: Arc<WikipediaClient>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let detector = build_detector(&config.vision)?;
        Self::build_with_detector(config, detector).await
    }

    /// Builds the application around an already constructed detector.
    /// Tests use this to inject a mock.
    pub async fn build_with_detector(
        config: Config,
        detector: Arc<dyn LandmarkDetector>,
    ) -> Result<Self, AppError> {
        let cache = build_cache(&config.cache).await?;
        let wikipedia = Arc::new(WikipediaClient::new(
            WikipediaConfig {
                api_url: config.wikipedia.api_url.clone(),
                timeout: Duration::from_secs(config.wikipedia.timeout_secs),
            },
            cache,
        ));

        let state = AppState {
            detector,
            wikipedia,
        };

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/analyze", post(handlers::analyze_image))
            // Photo uploads routinely exceed axum's 2MB default body limit.
            .layer(DefaultBodyLimit::disable())
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .layer(CorsLayer::permissive())
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

/// Constructs the Vision detector from configuration. Service-account
/// key material is parsed here so bad credentials fail at boot rather
/// than on the first request.
pub fn build_detector(config: &VisionConfig) -> Result<Arc<dyn LandmarkDetector>, AppError> {
    let auth = match &config.credentials {
        GoogleCredentials::ApiKey(key) => {
            tracing::info!("Vision API authentication: API key");
            VisionAuth::ApiKey(key.clone())
        }
        GoogleCredentials::CredentialsFile(path) => {
            tracing::info!(path = %path, "Vision API authentication: service account");
            let key = ServiceAccountKey::from_file(path).map_err(AppError::ConfigError)?;
            let source = TokenSource::new(key).map_err(AppError::ConfigError)?;
            VisionAuth::ServiceAccount(Arc::new(source))
        }
    };

    Ok(Arc::new(GoogleVisionDetector::new(GoogleVisionConfig {
        api_url: config.api_url.clone(),
        auth,
    })))
}

async fn build_cache(config: &CacheConfig) -> Result<Arc<dyn SummaryCache>, AppError> {
    let cache: Arc<dyn SummaryCache> = match config.backend {
        CacheBackend::File => {
            tracing::info!(
                dir = %config.dir,
                ttl_secs = config.ttl_secs,
                "Using file-backed summary cache"
            );
            Arc::new(
                FileSummaryCache::new(&config.dir, config.ttl_secs)
                    .await
                    .map_err(AppError::ConfigError)?,
            )
        }
        CacheBackend::Memory => {
            tracing::info!(ttl_secs = config.ttl_secs, "Using in-memory summary cache");
            Arc::new(InMemorySummaryCache::new(config.ttl_secs))
        }
        CacheBackend::Off => {
            tracing::info!("Summary cache disabled");
            Arc::new(NoopSummaryCache)
        }
    };

    Ok(cache)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

use crate::error::AppError;
use config::{Config as Cfg, File};
use secrecy::Secret;
use serde::Deserialize;
use std::env;

const DEFAULT_WIKIPEDIA_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub vision: VisionConfig,
    pub wikipedia: SummaryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5001
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Base URL of the Vision API, without the `images:annotate` suffix.
    pub api_url: String,
    pub credentials: GoogleCredentials,
}

/// How the service authenticates against the Vision API. Exactly one of
/// these is resolved at startup; the service refuses to boot without
/// credentials rather than failing on the first request.
#[derive(Debug, Clone)]
pub enum GoogleCredentials {
    ApiKey(Secret<String>),
    CredentialsFile(String),
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Base URL of the Wikipedia page summary endpoint. The encoded
    /// landmark name is appended as the final path segment.
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub dir: String,
    pub ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    File,
    Memory,
    Off,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let server = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(Config {
            server,
            vision: VisionConfig {
                api_url: get_env(
                    "VISION_API_URL",
                    Some("https://vision.googleapis.com/v1"),
                    is_prod,
                )?,
                credentials: resolve_google_credentials()?,
            },
            wikipedia: SummaryConfig {
                api_url: get_env(
                    "WIKIPEDIA_API_URL",
                    Some("https://en.wikipedia.org/api/rest_v1/page/summary"),
                    is_prod,
                )?,
                timeout_secs: get_env(
                    "WIKIPEDIA_TIMEOUT_SECS",
                    Some(&DEFAULT_WIKIPEDIA_TIMEOUT_SECS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_WIKIPEDIA_TIMEOUT_SECS),
            },
            cache: CacheConfig {
                backend: get_env("SUMMARY_CACHE_BACKEND", Some("file"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                dir: get_env("SUMMARY_CACHE_DIR", Some("summary-cache"), is_prod)?,
                ttl_secs: get_env(
                    "SUMMARY_CACHE_TTL_SECS",
                    Some(&DEFAULT_CACHE_TTL_SECS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            },
        })
    }
}

impl std::str::FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(CacheBackend::File),
            "memory" => Ok(CacheBackend::Memory),
            "off" => Ok(CacheBackend::Off),
            _ => Err(format!("Invalid cache backend: {}", s)),
        }
    }
}

/// Picks the credential source for the Vision API. An API key takes
/// precedence when both are set.
fn resolve_google_credentials() -> Result<GoogleCredentials, AppError> {
    resolve_credentials_from(
        env::var("GOOGLE_API_KEY").ok(),
        env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
    )
}

fn resolve_credentials_from(
    api_key: Option<String>,
    credentials_file: Option<String>,
) -> Result<GoogleCredentials, AppError> {
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        return Ok(GoogleCredentials::ApiKey(Secret::new(key)));
    }
    if let Some(path) = credentials_file.filter(|p| !p.is_empty()) {
        return Ok(GoogleCredentials::CredentialsFile(path));
    }
    Err(AppError::ConfigError(anyhow::anyhow!(
        "Google credentials not configured: set GOOGLE_API_KEY or GOOGLE_APPLICATION_CREDENTIALS"
    )))
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn cache_backend_parses_known_values() {
        assert_eq!("file".parse::<CacheBackend>().unwrap(), CacheBackend::File);
        assert_eq!(
            "MEMORY".parse::<CacheBackend>().unwrap(),
            CacheBackend::Memory
        );
        assert_eq!("off".parse::<CacheBackend>().unwrap(), CacheBackend::Off);
    }

    #[test]
    fn cache_backend_rejects_unknown_values() {
        let err = "redis".parse::<CacheBackend>().unwrap_err();
        assert!(err.contains("Invalid cache backend"));
    }

    #[test]
    fn api_key_takes_precedence_over_credentials_file() {
        let creds = resolve_credentials_from(
            Some("test-key".to_string()),
            Some("/tmp/sa.json".to_string()),
        )
        .unwrap();

        match creds {
            GoogleCredentials::ApiKey(key) => assert_eq!(key.expose_secret(), "test-key"),
            other => panic!("Expected ApiKey, got {:?}", other),
        }
    }

    #[test]
    fn credentials_file_used_when_no_api_key() {
        let creds = resolve_credentials_from(None, Some("/tmp/sa.json".to_string())).unwrap();

        match creds {
            GoogleCredentials::CredentialsFile(path) => assert_eq!(path, "/tmp/sa.json"),
            other => panic!("Expected CredentialsFile, got {:?}", other),
        }
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let result = resolve_credentials_from(Some(String::new()), None);
        assert!(result.is_err());

        let result = resolve_credentials_from(None, None);
        assert!(result.is_err());
    }
}

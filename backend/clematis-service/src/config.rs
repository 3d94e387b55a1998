/// Configuration management for clematis-service
///
/// Everything is read from environment variables; `main` loads a `.env`
/// file first when one is present.
use serde::{Deserialize, Serialize};

use crate::services::snowflake::MAX_MACHINE_ID;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    /// Public URLs rendered into responses
    pub urls: UrlConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub snowflake: SnowflakeConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Upper bound for any single storage call made while serving a request
    pub query_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Base URL of this service, used for local upload URLs
    pub base_url: String,
    /// Prefix of the public share link of a post
    pub post_share_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    Local,
    S3,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    /// Root directory of the local driver
    pub uploads_dir: String,
    pub s3: S3StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2)
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Public URL prefix objects are served from
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub video_fetch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowflakeConfig {
    pub machine_id: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("CLEMATIS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("CLEMATIS_PORT", 8080)?,
            },
            cors: {
                let allowed_origins =
                    std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/clematis".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                query_timeout_ms: parse_env_or_default("DATABASE_QUERY_TIMEOUT_MS", 5_000)?,
            },
            urls: UrlConfig {
                post_share_url: std::env::var("POST_SHARE_URL")
                    .unwrap_or_else(|_| "https://vine.co/v/".to_string()),
                base_url,
            },
            storage: {
                let driver = match std::env::var("STORAGE_DRIVER")
                    .unwrap_or_else(|_| "local".to_string())
                    .to_ascii_lowercase()
                    .as_str()
                {
                    "local" => StorageDriver::Local,
                    "s3" => StorageDriver::S3,
                    other => return Err(format!("Unknown STORAGE_DRIVER '{}'", other)),
                };

                let bucket = std::env::var("S3_BUCKET").unwrap_or_default();
                if driver == StorageDriver::S3 && production && bucket.trim().is_empty() {
                    return Err("S3_BUCKET must be set when STORAGE_DRIVER=s3 in production".to_string());
                }

                let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
                let s3_base_url = std::env::var("S3_BASE_URL")
                    .unwrap_or_else(|_| format!("https://{}.s3.{}.amazonaws.com", bucket, region))
                    .trim_end_matches('/')
                    .to_string();

                StorageConfig {
                    driver,
                    uploads_dir: std::env::var("UPLOADS_DIR")
                        .unwrap_or_else(|_| "./uploads".to_string()),
                    s3: S3StorageConfig {
                        bucket,
                        region,
                        endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
                        force_path_style: parse_env_or_default("S3_FORCE_PATH_STYLE", false)?,
                        base_url: s3_base_url,
                    },
                }
            },
            media: MediaConfig {
                ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
                video_fetch_timeout_ms: parse_env_or_default("VIDEO_FETCH_TIMEOUT_MS", 10_000)?,
            },
            snowflake: {
                let machine_id: u64 = parse_env_or_default("SNOWFLAKE_MACHINE_ID", 1)?;
                if machine_id > MAX_MACHINE_ID {
                    return Err(format!(
                        "SNOWFLAKE_MACHINE_ID must be between 0 and {}",
                        MAX_MACHINE_ID
                    ));
                }
                SnowflakeConfig { machine_id }
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

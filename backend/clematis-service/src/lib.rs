/// Clematis Service Library
///
/// Backend for a short-looping-video social app: timelines, search, tags,
/// posting, likes, accounts and media uploads over PostgreSQL.
///
/// # Modules
///
/// - `handlers`: HTTP routes and request/response mapping
/// - `services`: feed assembly, visibility, entity extraction, sessions, publishing
/// - `db`: PostgreSQL repositories
/// - `models`: rows, public projections and the response envelope
/// - `storage`: local and S3 blob storage
/// - `media`: video fetching, content sniffing and thumbnail extraction
/// - `middleware`: the session guard
/// - `error`: error types and their client rendering
/// - `config`: configuration management
/// - `metrics`: Prometheus collectors
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};

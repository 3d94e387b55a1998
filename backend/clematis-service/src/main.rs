use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context};
use clematis_service::db::{PgFeedRepository, PgSessionStore, PgSocialGraph};
use clematis_service::handlers::{self, upload::UploadState};
use clematis_service::media::MediaProcessor;
use clematis_service::services::{AccountService, FeedAssembler, PostService, SnowflakeGenerator};
use clematis_service::storage::Storage;
use clematis_service::{metrics, Config};
use db_pool::{create_pool as create_pg_pool, DbConfig as DbPoolConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Clematis Service
///
/// # Routes
///
/// - `/users`, `/users/authenticate`, `/users/me` - accounts and sessions
/// - `/timelines/*` - home, popular, promoted and profile feeds
/// - `/search/*`, `/tags/*` - search and tag discovery
/// - `/posts/*` - publishing and likes
/// - `/upload/*`, `/uploads/*` - media uploads
/// - `/health`, `/health/live`, `/metrics` - operations
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting clematis-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_cfg = DbPoolConfig {
        service_name: "clematis-service".to_string(),
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        statement_timeout_ms: config.database.query_timeout_ms,
        ..DbPoolConfig::default()
    };
    db_cfg.log_config();
    let db_pool = create_pg_pool(db_cfg)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Database migration failed")?;
    tracing::info!("Database migrations applied");

    let deadline = Duration::from_millis(config.database.query_timeout_ms);
    let graph = Arc::new(PgSocialGraph::new(db_pool.clone()));
    let sessions = Arc::new(PgSessionStore::new(db_pool.clone()));
    let assembler = web::Data::new(FeedAssembler::new(
        Arc::new(PgFeedRepository::new(db_pool.clone())),
        config.urls.post_share_url.clone(),
        deadline,
    ));

    let storage = Storage::from_config(&config.storage, &config.urls.base_url).await;
    tracing::info!(driver = ?config.storage.driver, "Blob storage ready");

    let media = Arc::new(
        MediaProcessor::new(&config.media).map_err(|e| anyhow!("Media setup failed: {}", e))?,
    );
    let ids = Arc::new(
        SnowflakeGenerator::new(config.snowflake.machine_id)
            .map_err(|e| anyhow!("Snowflake setup failed: {}", e))?,
    );

    let posts = web::Data::new(PostService::new(
        db_pool.clone(),
        media,
        storage.blob_store(),
        ids,
        graph.clone(),
    ));
    let accounts = web::Data::new(AccountService::new(db_pool.clone(), graph));
    let uploads = web::Data::new(UploadState {
        blobs: storage.blob_store(),
        base_url: config.urls.base_url.clone(),
    });
    let local_uploads = storage.local();
    let pool_data = web::Data::new(db_pool.clone());

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let sessions = sessions.clone();
        let local_uploads = local_uploads.clone();

        App::new()
            .app_data(pool_data.clone())
            .app_data(assembler.clone())
            .app_data(posts.clone())
            .app_data(accounts.clone())
            .app_data(uploads.clone())
            .wrap(cors(&allowed_origins))
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(|cfg| handlers::configure(cfg, sessions, local_uploads))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    let server_handle = server.handle();
    let server_task = actix_rt::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    server_handle.stop(true).await;

    server_task
        .await
        .context("HTTP server task failed")?
        .context("HTTP server exited with an error")?;

    db_pool.close().await;
    tracing::info!("clematis-service stopped");
    Ok(())
}

/// HTTP handlers for clematis-service
///
/// Every route except account creation, login, health and local file serving
/// sits behind [`SessionAuthMiddleware`].
pub mod posts;
pub mod search;
pub mod tags;
pub mod timelines;
pub mod upload;
pub mod users;

use actix_web::{error, web, HttpRequest, HttpResponse};
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::SessionAuthMiddleware;
use crate::services::session::SessionStore;
use crate::storage::LocalBlobStore;

/// Register every route of the service.
///
/// `uploads` is the local blob store when that driver is active; its files
/// are then served back under `/uploads`.
pub fn configure(
    cfg: &mut web::ServiceConfig,
    sessions: Arc<dyn SessionStore>,
    uploads: Option<Arc<LocalBlobStore>>,
) {
    let auth = SessionAuthMiddleware::new(sessions);

    cfg.app_data(json_config())
        .app_data(form_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/health/live", web::get().to(liveness))
        .service(web::resource("/users").route(web::post().to(users::register)))
        .service(web::resource("/users/authenticate").route(web::post().to(users::authenticate)))
        .service(
            web::resource("/users/me")
                .wrap(auth.clone())
                .route(web::get().to(users::me)),
        )
        .service(
            web::scope("/posts")
                .wrap(auth.clone())
                .configure(posts::configure),
        )
        .service(
            web::scope("/timelines")
                .wrap(auth.clone())
                .configure(timelines::configure),
        )
        .service(
            web::scope("/search")
                .wrap(auth.clone())
                .configure(search::configure),
        )
        .service(
            web::scope("/tags")
                .wrap(auth.clone())
                .configure(tags::configure),
        )
        .service(
            web::scope("/upload")
                .wrap(auth)
                .configure(upload::configure),
        );

    if let Some(store) = uploads {
        cfg.service(
            web::resource("/uploads/{key:.*}")
                .app_data(web::Data::from(store))
                .route(web::get().to(upload::serve_upload)),
        );
    }
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("clematis")
}

/// Readiness: the database must answer.
pub async fn health(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "clematis-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "clematis-service"
            }))
        }
    }
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

/// Malformed bodies, query strings and path segments render the standard
/// `InvalidInput` envelope instead of actix's plain-text errors.
fn invalid_input(detail: String) -> error::Error {
    AppError::InvalidInput(detail).into()
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| invalid_input(err.to_string()))
}

fn form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, _req: &HttpRequest| invalid_input(err.to_string()))
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| invalid_input(err.to_string()))
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req: &HttpRequest| invalid_input(err.to_string()))
}

use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::db::tag_repo;
use crate::error::Result;
use crate::models::{ListResponse, TagRecord};
use crate::services::pagination::PageQuery;
use crate::services::session::AuthenticatedRequest;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/search/{query}", web::get().to(search_tags))
        .route("/trending", web::get().to(trending_tags));
}

pub async fn search_tags(
    _auth: AuthenticatedRequest,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let cursor = query.cursor();
    let rows = tag_repo::search_tags(&pool, &path, cursor.limit(), cursor.offset()).await?;
    let records: Vec<TagRecord> = rows.into_iter().map(TagRecord::from).collect();
    Ok(HttpResponse::Ok().json(ListResponse::page(records, cursor)))
}

pub async fn trending_tags(
    _auth: AuthenticatedRequest,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse> {
    let cursor = query.cursor();
    let rows = tag_repo::trending_tags(&pool, cursor.limit(), cursor.offset()).await?;
    let records: Vec<TagRecord> = rows.into_iter().map(TagRecord::from).collect();
    Ok(HttpResponse::Ok().json(ListResponse::page(records, cursor)))
}

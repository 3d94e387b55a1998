use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::models::UserId;
use crate::services::feed::{FeedAssembler, FeedScope};
use crate::services::pagination::PageQuery;
use crate::services::session::AuthenticatedRequest;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/graph", web::get().to(graph))
        .route("/popular", web::get().to(popular))
        .route("/promoted", web::get().to(promoted))
        .route("/users/{user_id}", web::get().to(user_timeline));
}

async fn render(
    assembler: &FeedAssembler,
    auth: &AuthenticatedRequest,
    scope: FeedScope,
    query: &PageQuery,
) -> Result<HttpResponse> {
    let page = assembler.assemble(auth.viewer, &scope, query.cursor()).await?;
    Ok(HttpResponse::Ok().json(page.into_response()))
}

/// Home timeline: posts by followed authors
pub async fn graph(
    auth: AuthenticatedRequest,
    query: web::Query<PageQuery>,
    assembler: web::Data<FeedAssembler>,
) -> Result<HttpResponse> {
    render(&assembler, &auth, FeedScope::Home, &query).await
}

pub async fn popular(
    auth: AuthenticatedRequest,
    query: web::Query<PageQuery>,
    assembler: web::Data<FeedAssembler>,
) -> Result<HttpResponse> {
    render(&assembler, &auth, FeedScope::Popular, &query).await
}

pub async fn promoted(
    auth: AuthenticatedRequest,
    query: web::Query<PageQuery>,
    assembler: web::Data<FeedAssembler>,
) -> Result<HttpResponse> {
    render(&assembler, &auth, FeedScope::Promoted, &query).await
}

pub async fn user_timeline(
    auth: AuthenticatedRequest,
    path: web::Path<UserId>,
    query: web::Query<PageQuery>,
    assembler: web::Data<FeedAssembler>,
) -> Result<HttpResponse> {
    let scope = FeedScope::Profile {
        target: path.into_inner(),
    };
    render(&assembler, &auth, scope, &query).await
}

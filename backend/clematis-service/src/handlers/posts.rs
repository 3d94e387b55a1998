use actix_web::{web, Either, HttpResponse};

use crate::error::Result;
use crate::models::{ApiResponse, ListResponse, PostId};
use crate::services::pagination::PageQuery;
use crate::services::posts::{CreatePostRequest, PostService};
use crate::services::session::AuthenticatedRequest;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create_post))
        .route("/{post_id}/likes", web::get().to(get_likes))
        .route("/{post_id}/likes", web::post().to(like_post))
        .route("/{post_id}/likes", web::delete().to(unlike_post));
}

/// Accepts JSON or form-encoded bodies.
pub async fn create_post(
    auth: AuthenticatedRequest,
    body: Either<web::Json<CreatePostRequest>, web::Form<CreatePostRequest>>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse> {
    let request = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    posts.create_post(auth.viewer, request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success()))
}

pub async fn get_likes(
    auth: AuthenticatedRequest,
    path: web::Path<PostId>,
    query: web::Query<PageQuery>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse> {
    let cursor = query.cursor();
    let records = posts.likers(auth.viewer, path.into_inner(), cursor).await?;
    Ok(HttpResponse::Ok().json(ListResponse::page(records, cursor)))
}

pub async fn like_post(
    auth: AuthenticatedRequest,
    path: web::Path<PostId>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse> {
    posts.like(auth.viewer, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success()))
}

pub async fn unlike_post(
    auth: AuthenticatedRequest,
    path: web::Path<PostId>,
    posts: web::Data<PostService>,
) -> Result<HttpResponse> {
    posts.unlike(auth.viewer, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success()))
}

use actix_web::{web, Either, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::Result;
use crate::middleware::{header_value, CLIENT_HEADER};
use crate::models::{ApiResponse, UserId};
use crate::services::accounts::{AccountService, LoginRequest, RegisterRequest};
use crate::services::session::AuthenticatedRequest;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedUser {
    user_id: UserId,
    username: String,
}

/// `POST /users`
pub async fn register(
    body: Either<web::Json<RegisterRequest>, web::Form<RegisterRequest>>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse> {
    let request = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let user = accounts.register(request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(CreatedUser {
        user_id: user.id,
        username: user.username,
    })))
}

/// `POST /users/authenticate`; the issued session is bound to the caller's client header.
pub async fn authenticate(
    req: HttpRequest,
    body: Either<web::Json<LoginRequest>, web::Form<LoginRequest>>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse> {
    let request = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let client = header_value(&req, CLIENT_HEADER);
    let login = accounts.login(request, client).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(login)))
}

/// `GET /users/me`
pub async fn me(auth: AuthenticatedRequest, accounts: web::Data<AccountService>) -> Result<HttpResponse> {
    let profile = accounts.profile(auth.viewer).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

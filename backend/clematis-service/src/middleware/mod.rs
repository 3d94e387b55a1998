/// HTTP middleware for clematis-service
///
/// `SessionAuthMiddleware` is the single authentication guard: wrap a scope
/// with it and every handler inside receives an [`AuthenticatedRequest`] or
/// never runs.
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::AppError;
use crate::services::session::{authenticate, AuthenticatedRequest, SessionStore};

pub const SESSION_HEADER: &str = "vine-session-id";
pub const CLIENT_HEADER: &str = "x-vine-client";

/// Value of a header, or empty when absent or not valid UTF-8.
pub fn header_value<'a>(req: &'a HttpRequest, name: &str) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
}

#[derive(Clone)]
pub struct SessionAuthMiddleware {
    store: Arc<dyn SessionStore>,
}

impl SessionAuthMiddleware {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddlewareService {
            service: Rc::new(service),
            store: self.store.clone(),
        }))
    }
}

pub struct SessionAuthMiddlewareService<S> {
    service: Rc<S>,
    store: Arc<dyn SessionStore>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();

        Box::pin(async move {
            let token = header_value(req.request(), SESSION_HEADER).to_string();
            let client = header_value(req.request(), CLIENT_HEADER).to_string();

            let auth = authenticate(store.as_ref(), &client, &token).await?;
            req.extensions_mut().insert(auth);

            service.call(req).await
        })
    }
}

impl FromRequest for AuthenticatedRequest {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedRequest>()
                .cloned()
                .ok_or_else(|| AppError::Unauthenticated.into()),
        )
    }
}

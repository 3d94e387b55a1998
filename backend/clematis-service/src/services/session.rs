//! Session token validation.
//!
//! Tokens are opaque. A session may be bound to one client identifier; once
//! bound, the same token presented by any other client is rejected.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::metrics::auth::SESSION_REJECTIONS;
use crate::models::{Session, UserId};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn lookup(&self, token: &str) -> Result<Option<Session>, sqlx::Error>;
}

/// Proof that the request carried a valid session for `viewer`.
///
/// Only [`authenticate`] constructs this, so a handler taking it as an
/// argument cannot run for an unauthenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub viewer: UserId,
    pub session: Session,
}

fn reject(reason: &'static str) -> AppError {
    SESSION_REJECTIONS.with_label_values(&[reason]).inc();
    debug!(reason, "session rejected");
    AppError::Unauthenticated
}

/// Validate `token` presented by `client`.
///
/// Fails closed: a missing header, unknown token, or a token bound to a
/// different client are all `Unauthenticated`. A session whose stored client
/// is empty accepts any client.
pub async fn authenticate(
    store: &dyn SessionStore,
    client: &str,
    token: &str,
) -> Result<AuthenticatedRequest, AppError> {
    if token.is_empty() || client.is_empty() {
        return Err(reject("missing_headers"));
    }

    let session = match store.lookup(token).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(reject("unknown_token")),
        Err(err) => {
            SESSION_REJECTIONS.with_label_values(&["store_error"]).inc();
            warn!(error = %err, "session lookup failed");
            return Err(err.into());
        }
    };

    if !session.client_id.is_empty() && session.client_id != client {
        return Err(reject("client_mismatch"));
    }

    Ok(AuthenticatedRequest {
        viewer: session.user_id,
        session,
    })
}

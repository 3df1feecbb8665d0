//! Authentication extractors.
//!
//! The session token travels in the `sessionid` cookie; an
//! `Authorization: Bearer` header is accepted as well.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;

use yatube_core::domain::User;
use yatube_core::ports::AuthError;

use crate::middleware::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

/// The logged-in user. Extracting it from an anonymous request fails with
/// a redirect to the login page.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn user_id(&self) -> i32 {
        self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }
}

fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Resolve the session to a stored user. `Ok(None)` for anonymous requests
/// and for tokens that no longer match a user or their current password.
async fn load_user(state: &AppState, token: Option<String>) -> Result<Option<User>, AppError> {
    let Some(token) = token else {
        return Ok(None);
    };

    let claims = match state.tokens.validate_session(&token) {
        Ok(claims) => claims,
        Err(AuthError::TokenExpired) => {
            tracing::debug!("Session expired");
            return Ok(None);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected session token");
            return Ok(None);
        }
    };

    let user = state.users.find_by_id(claims.user_id).await?;
    Ok(user.filter(|user| {
        let current = claims.matches_password(&user.password_hash);
        if !current {
            tracing::debug!(user_id = user.id, "Session predates a password change");
        }
        current
    }))
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>().cloned().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AppError::Internal("Server configuration error".to_string())
    })
}

/// Path and query of the request, for the login `next` parameter.
fn full_path(req: &HttpRequest) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.path().to_string())
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = session_token(req);
        let next = full_path(req);

        Box::pin(async move {
            let state = state?;
            match load_user(&state, token).await? {
                Some(user) => Ok(Identity { user }),
                None => Err(AppError::LoginRequired { next }),
            }
        })
    }
}

/// Optional identity extractor - anonymous requests yield `None`.
pub struct OptionalIdentity(pub Option<User>);

impl FromRequest for OptionalIdentity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = session_token(req);

        Box::pin(async move {
            let state = state?;
            Ok(OptionalIdentity(load_user(&state, token).await?))
        })
    }
}

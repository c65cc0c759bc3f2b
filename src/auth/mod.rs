//! Session-token authentication.
//!
//! Protected routes expect `Authorization: Bearer <session id>.<secret>`.
//! The middleware resolves the token to a [`CurrentUser`] and stores it in the
//! request extensions.

mod password;
mod token;

pub use password::{hash_password, validate_password, verify_password};
pub use token::{format_token, generate_secret, parse_token, secret_matches};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::db::Repository;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::User;
use crate::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: String,
}

/// A newly created session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedSession {
    pub fn expires_at_string(&self) -> String {
        self.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Create a session for a user and return its bearer token.
pub async fn issue_session(
    repo: &Repository,
    user_id: &str,
    now: DateTime<Utc>,
    ttl_hours: i64,
) -> Result<IssuedSession, AppError> {
    let expires_at = session_expiry(now, ttl_hours)?;
    let issued = generate_secret();
    let session_id = repo
        .create_session(user_id, &issued.secret_hash, expires_at)
        .await?;

    Ok(IssuedSession {
        token: format_token(&session_id, &issued.secret),
        expires_at,
    })
}

fn session_expiry(now: DateTime<Utc>, ttl_hours: i64) -> Result<DateTime<Utc>, AppError> {
    TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            tracing::error!("Session lifetime of {} hours is out of range", ttl_hours);
            AppError::Internal(format!(
                "Session lifetime of {} hours is out of range",
                ttl_hours
            ))
        })
}

/// Resolve a bearer token to the user it belongs to.
pub async fn authenticate(
    repo: &Repository,
    token: &str,
    now: DateTime<Utc>,
) -> Result<CurrentUser, AppError> {
    let (session_id, secret) =
        parse_token(token).ok_or_else(|| AppError::Unauthorized("Malformed token".to_string()))?;

    let session = repo
        .get_session(session_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or revoked token".to_string()))?;

    if !secret_matches(secret, &session.secret_hash) {
        return Err(AppError::Unauthorized("Invalid or revoked token".to_string()));
    }

    if session.is_expired(now) {
        repo.delete_session(&session.id).await?;
        return Err(AppError::Unauthorized("Session expired".to_string()));
    }

    let user = repo
        .get_user(&session.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(CurrentUser {
        user,
        session_id: session.id,
    })
}

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Authentication layer for protected routes.
pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        return unauthorized_response(&state, "Missing bearer token").await;
    };

    match authenticate(&state.repo, &token, state.clock.now()).await {
        Ok(current) => {
            tracing::debug!("Authenticated user {}", current.user.id);
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        Err(AppError::Unauthorized(message)) => unauthorized_response(&state, &message).await,
        Err(err) => AppErrorWithRevision::from(err).into_response(),
    }
}

/// Create an unauthorized response.
async fn unauthorized_response(state: &AppState, message: &str) -> Response {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    AppErrorWithRevision {
        error: AppError::Unauthorized(message.to_string()),
        revision_id,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_issued_session_expiry_format() {
        let session = IssuedSession {
            token: "a.b".to_string(),
            expires_at: DateTime::parse_from_rfc3339("2024-01-10T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        assert_eq!(session.expires_at_string(), "2024-01-10T12:00:00Z");
    }

    #[test]
    fn test_session_expiry_bounds() {
        let now = DateTime::parse_from_rfc3339("2024-01-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let expires_at = session_expiry(now, 24).unwrap();
        assert_eq!(expires_at, now + TimeDelta::hours(24));

        assert!(matches!(
            session_expiry(now, 1_000_000_000_000),
            Err(AppError::Internal(_))
        ));
        assert!(matches!(
            session_expiry(now, 3_000_000_000),
            Err(AppError::Internal(_))
        ));
    }
}

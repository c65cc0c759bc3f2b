//! Account and session endpoints.

use axum::{extract::State, Extension};

use super::{error, success, ApiJson, ApiResult};
use crate::auth::{self, CurrentUser};
use crate::errors::AppError;
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, TokenValidation,
    UpdateProfileRequest, User,
};
use crate::AppState;

const MAX_NAME_LENGTH: usize = 100;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_identity(name: &str, email: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    super::check_length("Name", Some(name), MAX_NAME_LENGTH)?;

    // Loose shape check only: non-empty local part and a dotted domain.
    let email = email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    Ok(())
}

async fn open_session(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let session = auth::issue_session(
        &state.repo,
        &user.id,
        state.clock.now(),
        state.config.session_ttl_hours,
    )
    .await?;

    Ok(AuthResponse {
        expires_at: session.expires_at_string(),
        token: session.token,
        user,
    })
}

/// POST /api/auth/register - Create an account and sign in.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_identity(&request.name, &request.email)
        .and_then(|_| auth::validate_password(&request.password))
    {
        return error(e, revision_id);
    }

    let result = async {
        let hash = auth::hash_password(&request.password)?;
        let user = state
            .repo
            .create_user(request.name.trim(), &normalize_email(&request.email), &hash)
            .await?;
        open_session(&state, user).await
    }
    .await;

    match result {
        Ok(response) => success(response, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let (user, hash) = state
            .repo
            .find_credentials(&normalize_email(&request.email))
            .await?
            .ok_or_else(invalid)?;

        if !auth::verify_password(&request.password, &hash)? {
            tracing::info!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        open_session(&state, user).await
    }
    .await;

    match result {
        Ok(response) => success(response, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/auth/logout - Revoke the current session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_session(&current.session_id).await {
        Ok(()) => success((), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/auth/validate - Check that the presented token is valid.
pub async fn validate_token(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
) -> ApiResult<TokenValidation> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    success(TokenValidation { valid: true }, revision_id)
}

/// GET /api/auth/me - The authenticated user.
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    success(current.user, revision_id)
}

/// PUT /api/auth/profile - Change name and email.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_identity(&request.name, &request.email) {
        return error(e, revision_id);
    }

    match state
        .repo
        .update_profile(
            &current.user.id,
            request.name.trim(),
            &normalize_email(&request.email),
        )
        .await
    {
        Ok(user) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/auth/password - Change password. Other sessions are revoked.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = async {
        let stored = state
            .repo
            .get_password_hash(&current.user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !auth::verify_password(&request.current_password, &stored)? {
            return Err(AppError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }
        auth::validate_password(&request.new_password)?;

        let hash = auth::hash_password(&request.new_password)?;
        state
            .repo
            .update_password_hash(&current.user.id, &hash)
            .await?;

        let revoked = state
            .repo
            .delete_other_sessions(&current.user.id, &current.session_id)
            .await?;
        tracing::info!(
            "Password changed for user {}, revoked {} other sessions",
            current.user.id,
            revoked
        );
        Ok::<(), AppError>(())
    }
    .await;

    match result {
        Ok(()) => success((), revision_id),
        Err(e) => error(e, revision_id),
    }
}

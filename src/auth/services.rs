use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::{AuthResponse, CredentialsRequest, PublicUser, UpdateMeRequest};
use super::jwt::JwtKeys;
use super::password::{check_credentials, hash_password, verify_password};
use super::repo::{User, USERNAME_UNIQUE};
use crate::error::{is_unique_violation, AppError, AppResult, FieldErrors};
use crate::state::AppState;
use crate::storage::{ext_from_mime, profile_picture_key, PRESIGN_TTL_SECS};

fn username_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e, USERNAME_UNIQUE) {
        AppError::Conflict("Username already taken".into())
    } else {
        e.into()
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

pub async fn public_user(st: &AppState, user: User) -> PublicUser {
    let profile_picture_url = match &user.profile_picture {
        Some(key) => match st.storage.presign_get(key, PRESIGN_TTL_SECS).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "presign profile picture failed");
                None
            }
        },
        None => None,
    };
    PublicUser {
        id: user.id,
        username: user.username,
        profile_picture_url,
        created_at: user.created_at,
    }
}

async fn issue_tokens(st: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from(&st.config.jwt);
    let access_token = keys.sign_access(user.id).context("sign access token")?;
    let refresh_token = keys.sign_refresh(user.id).context("sign refresh token")?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: public_user(st, user).await,
    })
}

pub async fn register(st: &AppState, req: CredentialsRequest) -> AppResult<AuthResponse> {
    let username = req.username.trim();
    check_credentials(Some(username), Some(&req.password)).into_result()?;

    let hash = hash_password(&req.password)?;
    let user = User::create(&st.db, username, &hash)
        .await
        .map_err(username_conflict)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    issue_tokens(st, user).await
}

pub async fn login(st: &AppState, req: CredentialsRequest) -> AppResult<AuthResponse> {
    let username = req.username.trim();
    let Some(user) = User::find_by_username(&st.db, username).await? else {
        warn!(%username, "login unknown username");
        return Err(invalid_credentials());
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(st, user).await
}

pub async fn refresh(st: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from(&st.config.jwt);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    if st.revoked.is_revoked(claims.jti).await? {
        warn!(user_id = %claims.sub, jti = %claims.jti, "revoked refresh token used");
        return Err(AppError::Unauthorized("Token has been revoked".into()));
    }

    let user = User::find_by_id(&st.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    issue_tokens(st, user).await
}

/// Revoke a refresh token so it can no longer be exchanged.
pub async fn logout(st: &AppState, refresh_token: &str) -> AppResult<()> {
    let keys = JwtKeys::from(&st.config.jwt);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "logout rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp as i64)
        .context("refresh token expiry")?;
    st.revoked
        .revoke(claims.jti, claims.sub, expires_at)
        .await
        .context("revoke refresh token")?;

    info!(user_id = %claims.sub, jti = %claims.jti, "refresh token revoked");
    Ok(())
}

pub async fn me(st: &AppState, user_id: Uuid) -> AppResult<PublicUser> {
    let user = User::find_by_id(&st.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(public_user(st, user).await)
}

pub async fn update_me(st: &AppState, user_id: Uuid, req: UpdateMeRequest) -> AppResult<PublicUser> {
    let username = req.username.as_deref().map(str::trim);
    check_credentials(username, req.password.as_deref()).into_result()?;

    let hash = req.password.as_deref().map(hash_password).transpose()?;
    let user = User::update_credentials(&st.db, user_id, username, hash.as_deref())
        .await
        .map_err(username_conflict)?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    info!(%user_id, username_changed = username.is_some(), password_changed = hash.is_some(), "user updated");
    Ok(public_user(st, user).await)
}

/// Delete the account. Rows cascade in the database; the stored picture is
/// removed afterwards on a best-effort basis.
pub async fn delete_me(st: &AppState, user_id: Uuid) -> AppResult<()> {
    let picture = User::delete(&st.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Some(key) = picture {
        if let Err(e) = st.storage.delete_object(&key).await {
            error!(error = %e, %key, "orphaned profile picture");
        }
    }
    info!(%user_id, "user deleted");
    Ok(())
}

/// Upload a new profile picture and return a presigned link to it.
pub async fn set_picture(
    st: &AppState,
    user_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> AppResult<String> {
    let Some(ext) = ext_from_mime(content_type) else {
        return Err(FieldErrors::single("file", "Upload a JPEG, PNG or WebP image.").into());
    };
    if body.is_empty() {
        return Err(FieldErrors::single("file", "The submitted file is empty.").into());
    }

    let key = profile_picture_key(user_id, ext);
    st.storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;

    let previous = match User::replace_profile_picture(&st.db, user_id, &key).await {
        Ok(Some(previous)) => previous,
        Ok(None) => {
            st.storage.delete_object(&key).await.ok();
            return Err(AppError::Unauthorized("User not found".into()));
        }
        Err(e) => {
            st.storage.delete_object(&key).await.ok();
            return Err(e.into());
        }
    };
    if let Some(old) = previous {
        if let Err(e) = st.storage.delete_object(&old).await {
            warn!(error = %e, key = %old, "old profile picture not removed");
        }
    }

    info!(%user_id, %key, "profile picture updated");
    let url = st
        .storage
        .presign_get(&key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {key}"))?;
    Ok(url)
}

/// Presigned link to the caller's picture.
pub async fn picture_url(st: &AppState, user_id: Uuid) -> AppResult<String> {
    let key = User::find_by_id(&st.db, user_id)
        .await?
        .and_then(|u| u.profile_picture)
        .ok_or_else(|| AppError::NotFound("Profile picture not found".into()))?;
    let url = st
        .storage
        .presign_get(&key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {key}"))?;
    Ok(url)
}

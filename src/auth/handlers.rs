use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{
    AuthResponse, CredentialsRequest, MessageResponse, PictureResponse, PublicUser, RefreshRequest,
    UpdateMeRequest,
};
use super::jwt::AuthUser;
use super::services;
use crate::{
    error::{AppResult, FieldErrors},
    state::AppState,
};

const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me).delete(delete_me))
        .route(
            "/me/picture",
            put(upload_picture)
                .get(get_picture)
                .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES)),
        )
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let res = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::login(&state, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::logout(&state, &payload.refresh_token).await?;
    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(services::me(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateMeRequest>,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(services::update_me(&state, user_id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<StatusCode> {
    services::delete_me(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /me/picture (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<Json<PictureResponse>> {
    while let Some(field) = mp.next_field().await.map_err(|e| {
        warn!(error = %e, "bad multipart body");
        FieldErrors::single("file", "Malformed multipart body.")
    })? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| {
            warn!(error = %e, "picture upload interrupted");
            FieldErrors::single("file", "Could not read the uploaded file.")
        })?;
        let url = services::set_picture(&state, user_id, data, &content_type).await?;
        return Ok(Json(PictureResponse { url }));
    }
    Err(FieldErrors::single("file", "No file was submitted.").into())
}

/// 302 to a presigned link of the caller's picture.
#[instrument(skip(state))]
pub async fn get_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Redirect> {
    let url = services::picture_url(&state, user_id).await?;
    Ok(Redirect::temporary(&url))
}

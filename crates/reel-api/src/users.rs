use axum::{
    Extension, Json,
    extract::State,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use reel_catalog::{MovieDetails, canonical_movie_id};
use reel_db::models::UserRow;
use reel_types::api::{
    ChangePasswordRequest, Claims, FavoriteMovieRequest, FavoriteMoviesResponse, MessageResponse,
    UpdateGenresRequest, UpdateProfileRequest,
};
use reel_types::models::UserProfile;

use crate::auth::{MIN_PASSWORD_LEN, hash_password, looks_like_email, normalize_email, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn me(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> ApiResult<Json<UserProfile>> {
    Ok(Json(load_profile(&state, claims.sub).await?))
}

/// Partial profile update. Fields outside name, email and favorite genres
/// are rejected rather than ignored.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> ApiResult<Json<UserProfile>> {
    let req: UpdateProfileRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("invalid profile update: {}", e)))?;

    let name = req.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(ApiError::bad_request("name cannot be empty"));
    }
    let email = req.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        if !looks_like_email(email) {
            return Err(ApiError::bad_request("invalid email address"));
        }
    }

    let id = claims.sub.to_string();
    let genres = req.favorite_genres;
    let updated = state
        .db(move |db| {
            db.update_user_profile(&id, name.as_deref(), email.as_deref(), genres.as_deref())
        })
        .await?;
    if !updated {
        return Err(ApiError::NotFound("user not found".into()));
    }

    Ok(Json(load_profile(&state, claims.sub).await?))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::bad_request("current and new password are required"));
    }
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "new password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = load_row(&state, claims.sub).await?;
    if !verify_password(&req.current_password, &user.password)? {
        return Err(ApiError::bad_request("current password is incorrect"));
    }

    let hash = hash_password(&req.new_password)?;
    state.db(move |db| db.update_password(&user.id, &hash)).await?;
    info!("User {} changed their password", claims.sub);

    Ok(Json(MessageResponse {
        message: "password updated".into(),
    }))
}

pub async fn update_genres(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateGenresRequest>,
) -> ApiResult<Json<UserProfile>> {
    let id = claims.sub.to_string();
    let genres = req.favorite_genres;
    let updated = state
        .db(move |db| db.update_user_profile(&id, None, None, Some(&genres)))
        .await?;
    if !updated {
        return Err(ApiError::NotFound("user not found".into()));
    }
    Ok(Json(load_profile(&state, claims.sub).await?))
}

/// Favorite movies resolved through the catalog. Ids the catalog no longer
/// knows are left out.
pub async fn favorite_movies(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<MovieDetails>>> {
    let user = load_row(&state, claims.sub).await?;
    Ok(Json(state.catalog.movies(&user.favorite_movies).await))
}

pub async fn add_favorite_movie(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FavoriteMovieRequest>,
) -> ApiResult<Json<FavoriteMoviesResponse>> {
    let movie_id = req
        .api_movie_id
        .ok_or_else(|| ApiError::bad_request("apiMovieId is required"))
        .and_then(|id| catalog_id(&id))?;

    let id = claims.sub.to_string();
    let favorite_movies = state
        .db(move |db| db.add_favorite_movie(&id, &movie_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    Ok(Json(FavoriteMoviesResponse {
        message: "movie added to favorites".into(),
        favorite_movies,
    }))
}

pub async fn remove_favorite_movie(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(movie_id): ApiPath<String>,
) -> ApiResult<Json<FavoriteMoviesResponse>> {
    let movie_id = catalog_id(&movie_id)?;

    let id = claims.sub.to_string();
    let favorite_movies = state
        .db(move |db| db.remove_favorite_movie(&id, &movie_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    Ok(Json(FavoriteMoviesResponse {
        message: "movie removed from favorites".into(),
        favorite_movies,
    }))
}

/// Canonical catalog id, or a validation error.
pub(crate) fn catalog_id(raw: &str) -> ApiResult<String> {
    canonical_movie_id(raw).ok_or_else(|| ApiError::bad_request(format!("{:?} is not a valid movie id", raw.trim())))
}

async fn load_row(state: &AppState, user_id: Uuid) -> ApiResult<UserRow> {
    let id = user_id.to_string();
    state
        .db(move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

async fn load_profile(state: &AppState, user_id: Uuid) -> ApiResult<UserProfile> {
    profile_from_row(load_row(state, user_id).await?)
}

/// Public view of a stored user. The password hash is dropped here.
pub(crate) fn profile_from_row(row: UserRow) -> ApiResult<UserProfile> {
    Ok(UserProfile {
        id: Uuid::parse_str(&row.id).map_err(ApiError::internal)?,
        name: row.name,
        email: row.email,
        photo: row.photo,
        favorite_genres: row.favorite_genres,
        favorite_movies: row.favorite_movies,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn parse_timestamp(ts: &str) -> ApiResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(ApiError::internal)
}

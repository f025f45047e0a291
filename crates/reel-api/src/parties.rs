use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use reel_catalog::MovieSummary;
use reel_types::api::{
    AddMovieRequest, Claims, CreatePartyRequest, JoinPartyRequest, LeavePartyResponse,
    MatchStatusResponse, ToggleLikeResponse,
};
use reel_types::models::PartyView;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

pub(crate) fn default_page() -> u32 {
    1
}

pub async fn create_party(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreatePartyRequest>,
) -> ApiResult<impl IntoResponse> {
    let party = state
        .parties
        .create(
            claims.sub,
            &req.title,
            req.host_genres,
            req.initial_movie_api_id.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn list_parties(State(state): State<AppState>) -> ApiResult<Json<Vec<PartyView>>> {
    Ok(Json(state.parties.list().await?))
}

pub async fn get_party(
    State(state): State<AppState>,
    ApiPath(party_id): ApiPath<Uuid>,
) -> ApiResult<Json<PartyView>> {
    Ok(Json(state.parties.get(party_id).await?))
}

pub async fn get_party_by_code(
    State(state): State<AppState>,
    ApiPath(short_code): ApiPath<String>,
) -> ApiResult<Json<PartyView>> {
    Ok(Json(state.parties.get_by_code(&short_code).await?))
}

/// The body is optional; without `userGenres` the caller's favorite genres apply.
pub async fn join_party(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(short_code): ApiPath<String>,
    body: Option<ApiJson<JoinPartyRequest>>,
) -> ApiResult<Json<PartyView>> {
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    let party = state
        .parties
        .join(&short_code, claims.sub, req.user_genres)
        .await?;
    Ok(Json(party))
}

pub async fn leave_party(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(party_id): ApiPath<Uuid>,
) -> ApiResult<Json<LeavePartyResponse>> {
    let res = state.parties.leave(party_id, claims.sub, &claims.name).await?;
    let message = if res.party_deleted {
        "you left the party and it was closed"
    } else {
        "you left the party"
    };
    Ok(Json(LeavePartyResponse {
        message: message.into(),
        party_deleted: res.party_deleted,
    }))
}

pub async fn add_movie(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(party_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddMovieRequest>,
) -> ApiResult<impl IntoResponse> {
    let party = state.parties.add_movie(party_id, claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((party_id, movie_id)): ApiPath<(Uuid, String)>,
) -> ApiResult<Json<ToggleLikeResponse>> {
    let res = state
        .parties
        .toggle_like(party_id, &movie_id, claims.sub)
        .await?;
    Ok(Json(ToggleLikeResponse {
        party: res.party,
        is_match: res.is_match,
        liked: res.liked,
    }))
}

pub async fn match_status(
    State(state): State<AppState>,
    ApiPath((party_id, movie_id)): ApiPath<(Uuid, String)>,
) -> ApiResult<Json<MatchStatusResponse>> {
    Ok(Json(state.parties.match_status(party_id, &movie_id).await?))
}

pub async fn suggestions(
    State(state): State<AppState>,
    ApiPath(party_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<MovieSummary>>> {
    Ok(Json(state.parties.suggestions(party_id, query.page).await?))
}

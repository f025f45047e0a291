use axum::{
    Json,
    extract::State,
};
use serde::Deserialize;

use reel_catalog::{DiscoverQuery, MovieDetails, MovieList, MovieSummary};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::parties::{PageQuery, default_page};
use crate::state::AppState;
use crate::users::catalog_id;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

async fn curated(state: &AppState, list: MovieList, page: u32) -> ApiResult<Json<Vec<MovieSummary>>> {
    Ok(Json(state.catalog.list(list, page).await?))
}

pub async fn popular(State(state): State<AppState>, ApiQuery(q): ApiQuery<PageQuery>) -> ApiResult<Json<Vec<MovieSummary>>> {
    curated(&state, MovieList::Popular, q.page).await
}

pub async fn trending(State(state): State<AppState>, ApiQuery(q): ApiQuery<PageQuery>) -> ApiResult<Json<Vec<MovieSummary>>> {
    curated(&state, MovieList::Trending, q.page).await
}

pub async fn now_playing(State(state): State<AppState>, ApiQuery(q): ApiQuery<PageQuery>) -> ApiResult<Json<Vec<MovieSummary>>> {
    curated(&state, MovieList::NowPlaying, q.page).await
}

pub async fn top_rated(State(state): State<AppState>, ApiQuery(q): ApiQuery<PageQuery>) -> ApiResult<Json<Vec<MovieSummary>>> {
    curated(&state, MovieList::TopRated, q.page).await
}

pub async fn search(State(state): State<AppState>, ApiQuery(q): ApiQuery<SearchQuery>) -> ApiResult<Json<Vec<MovieSummary>>> {
    let query = q.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("search query is required"));
    }
    Ok(Json(state.catalog.search(query, q.page).await?))
}

pub async fn details(State(state): State<AppState>, ApiPath(movie_id): ApiPath<String>) -> ApiResult<Json<MovieDetails>> {
    let movie_id = catalog_id(&movie_id)?;
    Ok(Json(state.catalog.movie(&movie_id).await?))
}

/// Discover by genre name (any case) or numeric genre id.
pub async fn by_genre(
    State(state): State<AppState>,
    ApiPath(genre): ApiPath<String>,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<MovieSummary>>> {
    let genre_id = state
        .catalog
        .genre_id(&genre)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("unknown genre {}", genre.trim())))?;

    let movies = state
        .catalog
        .discover(&DiscoverQuery {
            genre_ids: vec![genre_id],
            page: q.page,
            min_votes: None,
        })
        .await?;
    Ok(Json(movies))
}

//! TMDB catalog provider
//!
//! Uses the v3 REST API with the key passed as a query parameter. Responses
//! are normalised into `MovieSummary` / `MovieDetails` with image paths
//! expanded to absolute URLs.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    Catalog, DiscoverQuery,
    error::{CatalogError, CatalogResult},
    genres::GenreCache,
    models::{CastMember, MovieDetails, MovieList, MovieSummary, canonical_movie_id, format_duration},
};

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/";
const MAX_CAST: usize = 10;

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
    pub genre_cache_ttl: Duration,
}

pub struct TmdbCatalog {
    http_client: HttpClient,
    config: TmdbConfig,
    genres: GenreCache,
}

impl TmdbCatalog {
    pub fn new(config: TmdbConfig) -> Self {
        let genres = GenreCache::new(config.genre_cache_ttl);
        Self {
            http_client: HttpClient::new(),
            config,
            genres,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> CatalogResult<T> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!(endpoint, "Catalog request");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("language", self.config.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(endpoint.to_string()));
        }
        if !status.is_success() {
            let reason = response
                .json::<TmdbErrorBody>()
                .await
                .ok()
                .and_then(|b| b.status_message)
                .unwrap_or_else(|| status.to_string());
            warn!(endpoint, %status, reason = %reason, "Catalog request rejected");
            return Err(CatalogError::Unavailable(reason));
        }

        Ok(response.json::<T>().await?)
    }

    async fn load_genres(&self) -> CatalogResult<Vec<(u32, String)>> {
        let list: TmdbGenreList = self.get("/genre/movie/list", &[]).await?;
        Ok(list.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    async fn page(&self, endpoint: &str, params: &[(&str, String)]) -> CatalogResult<Vec<MovieSummary>> {
        let page: TmdbPage = self.get(endpoint, params).await?;
        Ok(page.results.iter().map(summary).collect())
    }
}

#[async_trait]
impl Catalog for TmdbCatalog {
    async fn movie(&self, movie_id: &str) -> CatalogResult<MovieDetails> {
        let id = canonical_movie_id(movie_id).ok_or_else(|| CatalogError::InvalidId(movie_id.to_string()))?;
        let endpoint = format!("/movie/{}", id);
        let movie: TmdbMovie = self
            .get(&endpoint, &[("append_to_response", "credits,videos".to_string())])
            .await
            .map_err(|e| match e {
                CatalogError::NotFound(_) => CatalogError::NotFound(id.clone()),
                other => other,
            })?;
        Ok(details(movie))
    }

    async fn list(&self, list: MovieList, page: u32) -> CatalogResult<Vec<MovieSummary>> {
        self.page(list.endpoint(), &[("page", page.max(1).to_string())]).await
    }

    async fn search(&self, query: &str, page: u32) -> CatalogResult<Vec<MovieSummary>> {
        self.page(
            "/search/movie",
            &[("query", query.to_string()), ("page", page.max(1).to_string())],
        )
        .await
    }

    async fn discover(&self, query: &DiscoverQuery) -> CatalogResult<Vec<MovieSummary>> {
        let genres = query
            .genre_ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut params = vec![
            ("with_genres", genres),
            ("sort_by", "popularity.desc".to_string()),
            ("page", query.page.max(1).to_string()),
        ];
        if let Some(min_votes) = query.min_votes {
            params.push(("vote_count.gte", min_votes.to_string()));
        }

        self.page("/discover/movie", &params).await
    }

    async fn genre_id(&self, name_or_id: &str) -> CatalogResult<Option<u32>> {
        self.genres.resolve(name_or_id, || self.load_genres()).await
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

// -- Raw TMDB payloads --

#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u64>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    runtime: Option<u32>,
    credits: Option<TmdbCredits>,
    videos: Option<TmdbVideos>,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCast>,
    #[serde(default)]
    crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
struct TmdbCast {
    name: String,
    character: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrew {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideos {
    #[serde(default)]
    results: Vec<TmdbVideo>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideo {
    key: String,
    site: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

// -- Normalisation --

fn image_url(size: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}{}{}", IMAGE_BASE_URL, size, p))
}

fn summary(movie: &TmdbMovie) -> MovieSummary {
    let release_date = movie.release_date.clone().filter(|d| !d.is_empty());
    MovieSummary {
        api_movie_id: movie.id.to_string(),
        title: movie.title.clone().unwrap_or_default(),
        overview: movie.overview.clone(),
        poster_path: image_url("w500", movie.poster_path.as_deref()),
        backdrop_path: image_url("original", movie.backdrop_path.as_deref()),
        year: release_date.as_ref().and_then(|d| d.get(..4)).map(str::to_string),
        release_date,
        rating: movie.vote_average,
        vote_count: movie.vote_count,
    }
}

fn details(movie: TmdbMovie) -> MovieDetails {
    let summary = summary(&movie);
    let (cast, director) = match &movie.credits {
        Some(credits) => (
            credits
                .cast
                .iter()
                .take(MAX_CAST)
                .map(|c| CastMember {
                    name: c.name.clone(),
                    character: c.character.clone(),
                    photo: image_url("w185", c.profile_path.as_deref()),
                })
                .collect(),
            credits
                .crew
                .iter()
                .find(|c| c.job.as_deref() == Some("Director"))
                .map(|c| c.name.clone()),
        ),
        None => (vec![], None),
    };
    let trailer_key = movie.videos.as_ref().and_then(|v| {
        v.results
            .iter()
            .find(|v| v.site.as_deref() == Some("YouTube") && v.kind.as_deref() == Some("Trailer"))
            .map(|v| v.key.clone())
    });

    MovieDetails {
        summary,
        runtime: movie.runtime,
        duration: format_duration(movie.runtime),
        genres: movie.genres.into_iter().map(|g| g.name).collect(),
        cast,
        director,
        trailer_key,
    }
}

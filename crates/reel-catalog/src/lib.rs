//! External movie catalog: lookups by id, curated lists, search and
//! genre discovery. `TmdbCatalog` talks to TMDB; everything else in the
//! workspace only sees the `Catalog` trait.

pub mod error;
pub mod genres;
pub mod models;
pub mod tmdb;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

use async_trait::async_trait;

pub use error::{CatalogError, CatalogResult};
pub use models::{CastMember, MovieDetails, MovieList, MovieSummary, canonical_movie_id};
pub use tmdb::{TmdbCatalog, TmdbConfig};

/// Parameters for genre-driven discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoverQuery {
    pub genre_ids: Vec<u32>,
    pub page: u32,
    /// Skip titles with fewer votes than this.
    pub min_votes: Option<u32>,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Full details for one movie. Unknown ids are `CatalogError::NotFound`,
    /// ids that are not catalog ids at all are `CatalogError::InvalidId`.
    async fn movie(&self, movie_id: &str) -> CatalogResult<MovieDetails>;

    async fn list(&self, list: MovieList, page: u32) -> CatalogResult<Vec<MovieSummary>>;

    async fn search(&self, query: &str, page: u32) -> CatalogResult<Vec<MovieSummary>>;

    async fn discover(&self, query: &DiscoverQuery) -> CatalogResult<Vec<MovieSummary>>;

    /// Resolve a genre name (case-insensitive) or numeric id string to the
    /// catalog's genre id.
    async fn genre_id(&self, name_or_id: &str) -> CatalogResult<Option<u32>>;

    /// Resolve several movies concurrently, dropping the ones that fail.
    async fn movies(&self, movie_ids: &[String]) -> Vec<MovieDetails> {
        let lookups = movie_ids.iter().map(|id| self.movie(id));
        futures_util::future::join_all(lookups)
            .await
            .into_iter()
            .filter_map(|res| match res {
                Ok(movie) => Some(movie),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unresolvable movie");
                    None
                }
            })
            .collect()
    }

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

//! In-memory catalog for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    Catalog, DiscoverQuery,
    error::{CatalogError, CatalogResult},
    models::{MovieDetails, MovieList, MovieSummary, canonical_movie_id, format_duration},
};

/// A fixed catalog. `unavailable()` builds one whose every call fails as if
/// the upstream were down.
#[derive(Default)]
pub struct StaticCatalog {
    movies: BTreeMap<String, MovieDetails>,
    genres: HashMap<String, u32>,
    unavailable: bool,
    lookups: AtomicUsize,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_movie(self, id: &str, title: &str) -> Self {
        self.with_genre_movie(id, title, &[])
    }

    pub fn with_genre_movie(mut self, id: &str, title: &str, genres: &[&str]) -> Self {
        let movie = MovieDetails {
            summary: MovieSummary {
                api_movie_id: id.to_string(),
                title: title.to_string(),
                overview: None,
                poster_path: Some(format!("https://image.tmdb.org/t/p/w500/{}.jpg", id)),
                backdrop_path: None,
                release_date: None,
                year: None,
                rating: None,
                vote_count: None,
            },
            runtime: None,
            duration: format_duration(None),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            cast: vec![],
            director: None,
            trailer_key: None,
        };
        self.movies.insert(id.to_string(), movie);
        self
    }

    pub fn with_genre(mut self, id: u32, name: &str) -> Self {
        self.genres.insert(name.to_lowercase(), id);
        self.genres.insert(id.to_string(), id);
        self
    }

    /// Number of single-movie lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> CatalogResult<()> {
        if self.unavailable {
            return Err(CatalogError::Unavailable("static catalog offline".into()));
        }
        Ok(())
    }

    fn genre_name(&self, id: u32) -> Option<&str> {
        self.genres
            .iter()
            .find(|(key, value)| **value == id && key.parse::<u32>().is_err())
            .map(|(key, _)| key.as_str())
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn movie(&self, movie_id: &str) -> CatalogResult<MovieDetails> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let id = canonical_movie_id(movie_id).ok_or_else(|| CatalogError::InvalidId(movie_id.to_string()))?;
        self.check()?;
        self.movies
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    async fn list(&self, _list: MovieList, _page: u32) -> CatalogResult<Vec<MovieSummary>> {
        self.check()?;
        Ok(self.movies.values().map(|m| m.summary.clone()).collect())
    }

    async fn search(&self, query: &str, _page: u32) -> CatalogResult<Vec<MovieSummary>> {
        self.check()?;
        let query = query.to_lowercase();
        Ok(self
            .movies
            .values()
            .filter(|m| m.summary.title.to_lowercase().contains(&query))
            .map(|m| m.summary.clone())
            .collect())
    }

    async fn discover(&self, query: &DiscoverQuery) -> CatalogResult<Vec<MovieSummary>> {
        self.check()?;
        let wanted: Vec<&str> = query
            .genre_ids
            .iter()
            .filter_map(|id| self.genre_name(*id))
            .collect();
        Ok(self
            .movies
            .values()
            .filter(|m| {
                m.genres
                    .iter()
                    .any(|g| wanted.contains(&g.to_lowercase().as_str()))
            })
            .map(|m| m.summary.clone())
            .collect())
    }

    async fn genre_id(&self, name_or_id: &str) -> CatalogResult<Option<u32>> {
        self.check()?;
        Ok(self.genres.get(&name_or_id.trim().to_lowercase()).copied())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discovers_by_genre_name() {
        let catalog = StaticCatalog::new()
            .with_genre(18, "Drama")
            .with_genre(28, "Action")
            .with_genre_movie("1", "Quiet Film", &["Drama"])
            .with_genre_movie("2", "Loud Film", &["Action"]);

        let found = catalog
            .discover(&DiscoverQuery {
                genre_ids: vec![18],
                page: 1,
                min_votes: None,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Quiet Film");
    }

    #[tokio::test]
    async fn batch_lookup_drops_unknown_ids() {
        let catalog = StaticCatalog::new().with_movie("1", "One");
        let found = catalog.movies(&["1".into(), "404".into()]).await;
        assert_eq!(found.len(), 1);
        assert_eq!(catalog.lookups(), 2);
    }
}

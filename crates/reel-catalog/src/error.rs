use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("movie {0} not found in catalog")]
    NotFound(String),

    #[error("{0:?} is not a catalog movie id")]
    InvalidId(String),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl CatalogError {
    /// True when the catalog answered but does not know the id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

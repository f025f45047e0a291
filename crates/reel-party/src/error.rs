use reel_catalog::CatalogError;
use reel_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PartyError {
    #[error("party not found")]
    PartyNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("you are not a member of this party")]
    NotAMember,

    #[error("movie {0} is already in this party")]
    DuplicateMovie(String),

    /// The catalog either does not know the id or could not be reached.
    #[error("could not resolve movie {movie_id}: {source}")]
    MovieLookupFailed {
        movie_id: String,
        #[source]
        source: CatalogError,
    },

    /// A like referenced a movie the party roster does not contain.
    #[error("movie {0} is not in this party")]
    MovieNotTracked(String),

    #[error("no free short code after {0} attempts")]
    CodeGenerationExhausted(usize),

    #[error("short code {0} was taken concurrently, retry the creation")]
    DuplicateShortCode(String),

    #[error("{0}")]
    Validation(String),

    #[error("party {0} kept changing, try again")]
    Conflict(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("storage error: {0}")]
    Storage(DbError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PartyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn lookup(movie_id: &str, source: CatalogError) -> Self {
        Self::MovieLookupFailed {
            movie_id: movie_id.to_string(),
            source,
        }
    }
}

impl From<DbError> for PartyError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DuplicateShortCode(code) => Self::DuplicateShortCode(code),
            other => Self::Storage(other),
        }
    }
}

pub type PartyResult<T> = Result<T, PartyError>;

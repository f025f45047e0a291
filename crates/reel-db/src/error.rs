use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed stored value: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("short code {0} is already in use")]
    DuplicateShortCode(String),

    #[error("email {0} is already registered")]
    DuplicateEmail(String),

    /// The row changed (or vanished) since it was read.
    #[error("party {0} was modified concurrently")]
    StaleVersion(String),

    #[error("database lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, DbError>;

/// True when `err` is a UNIQUE violation on `column` (e.g. `parties.short_code`).
pub(crate) fn is_unique_violation(err: &rusqlite::Error, column: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains(column)
        }
        _ => false,
    }
}

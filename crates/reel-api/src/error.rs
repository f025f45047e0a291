use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use reel_catalog::CatalogError;
use reel_db::DbError;
use reel_party::PartyError;

/// Request-level failures. Every variant maps to a status and a stable
/// `code` so clients can tell failures apart without parsing messages.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Body that is not JSON or does not fit the request type.
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error("invalid path: {}", .0.body_text())]
    Path(#[from] PathRejection),

    #[error("invalid query: {}", .0.body_text())]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Party(#[from] PartyError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) | Self::Body(_) | Self::Path(_) | Self::Query(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Party(e) => classify_party(e),
            Self::Catalog(e) => classify_catalog(e),
            Self::Storage(DbError::DuplicateEmail(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Storage(_) | Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

fn classify_party(err: &PartyError) -> (StatusCode, &'static str) {
    match err {
        PartyError::PartyNotFound => (StatusCode::NOT_FOUND, "PARTY_NOT_FOUND"),
        PartyError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
        PartyError::NotAMember => (StatusCode::FORBIDDEN, "NOT_A_MEMBER"),
        PartyError::DuplicateMovie(_) => (StatusCode::CONFLICT, "DUPLICATE_MOVIE"),
        PartyError::MovieLookupFailed {
            source: CatalogError::InvalidId(_),
            ..
        } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        PartyError::MovieLookupFailed { source, .. } if source.is_not_found() => {
            (StatusCode::NOT_FOUND, "MOVIE_LOOKUP_FAILED")
        }
        PartyError::MovieLookupFailed { .. } => (StatusCode::BAD_GATEWAY, "MOVIE_LOOKUP_FAILED"),
        PartyError::MovieNotTracked(_) => (StatusCode::NOT_FOUND, "MOVIE_NOT_TRACKED"),
        PartyError::CodeGenerationExhausted(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "CODE_GENERATION_EXHAUSTED")
        }
        PartyError::DuplicateShortCode(_) => (StatusCode::SERVICE_UNAVAILABLE, "DUPLICATE_SHORT_CODE"),
        PartyError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        PartyError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        PartyError::Catalog(e) => classify_catalog(e),
        PartyError::Storage(_) | PartyError::Task(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
    }
}

fn classify_catalog(err: &CatalogError) -> (StatusCode, &'static str) {
    match err {
        CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        CatalogError::InvalidId(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        CatalogError::Unavailable(_) | CatalogError::Http(_) => {
            (StatusCode::BAD_GATEWAY, "CATALOG_UNAVAILABLE")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        // Internal details stay in the log
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "Request failed");
            match status {
                StatusCode::BAD_GATEWAY => "movie catalog is unavailable".to_string(),
                _ => "internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn party_errors_map_to_distinct_statuses() {
        assert_eq!(status(PartyError::PartyNotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(status(PartyError::NotAMember.into()), StatusCode::FORBIDDEN);
        assert_eq!(status(PartyError::DuplicateMovie("550".into()).into()), StatusCode::CONFLICT);
        assert_eq!(
            status(PartyError::CodeGenerationExhausted(10).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(PartyError::validation("title is required").into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn lookup_failures_split_on_cause() {
        let unknown = PartyError::MovieLookupFailed {
            movie_id: "404".into(),
            source: CatalogError::NotFound("404".into()),
        };
        let down = PartyError::MovieLookupFailed {
            movie_id: "550".into(),
            source: CatalogError::Unavailable("timeout".into()),
        };
        assert_eq!(status(unknown.into()), StatusCode::NOT_FOUND);
        assert_eq!(status(down.into()), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn malformed_catalog_ids_are_client_errors() {
        let err = ApiError::from(CatalogError::InvalidId("../x".into()));
        assert_eq!(status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let err = ApiError::from(DbError::DuplicateEmail("a@b.c".into()));
        assert_eq!(status(err), StatusCode::CONFLICT);
    }
}

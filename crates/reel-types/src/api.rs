use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{PartyView, UserProfile};

// -- JWT Claims --

/// Bearer token claims, shared by the REST middleware and the gateway upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

/// Catalog ids arrive as strings from some clients and as numbers from others.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleId {
    Text(String),
    Number(u64),
}

fn flexible_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<FlexibleId>::deserialize(deserializer)?;
    Ok(id
        .map(|id| match id {
            FlexibleId::Text(s) => s.trim().to_string(),
            FlexibleId::Number(n) => n.to_string(),
        })
        .filter(|s| !s.is_empty()))
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub favorite_genres: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub favorite_genres: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGenresRequest {
    pub favorite_genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteMovieRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub api_movie_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteMoviesResponse {
    pub message: String,
    pub favorite_movies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Parties --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartyRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub host_genres: Vec<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub initial_movie_api_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPartyRequest {
    /// `None` falls back to the user's favorite genres.
    #[serde(default)]
    pub user_genres: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieRequest {
    #[serde(default, alias = "apiMovieId", deserialize_with = "flexible_id")]
    pub movie_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeavePartyResponse {
    pub message: String,
    pub party_deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeResponse {
    pub party: PartyView,
    pub is_match: bool,
    /// Whether the caller's like is present after the toggle.
    pub liked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatusResponse {
    pub is_match: bool,
    pub members_who_liked: Vec<Uuid>,
    pub total_members: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_movie_ids_are_accepted() {
        let req: CreatePartyRequest = serde_json::from_str(
            r#"{"title":"Friday","hostGenres":["Drama"],"initialMovieApiId":603}"#,
        )
        .unwrap();
        assert_eq!(req.initial_movie_api_id.as_deref(), Some("603"));
        assert_eq!(req.host_genres, vec!["Drama"]);
    }

    #[test]
    fn add_movie_accepts_either_id_field() {
        let a: AddMovieRequest =
            serde_json::from_str(r#"{"apiMovieId":"550","title":"Fight Club"}"#).unwrap();
        let b: AddMovieRequest =
            serde_json::from_str(r#"{"movieId":550,"title":"Fight Club"}"#).unwrap();
        assert_eq!(a.movie_id.as_deref(), Some("550"));
        assert_eq!(b.movie_id.as_deref(), Some("550"));
    }

    #[test]
    fn blank_ids_become_none() {
        let req: AddMovieRequest = serde_json::from_str(r#"{"apiMovieId":"  "}"#).unwrap();
        assert!(req.movie_id.is_none());
        assert!(req.title.is_none());
    }

    #[test]
    fn join_without_genres_defers_to_profile() {
        let req: JoinPartyRequest = serde_json::from_str("{}").unwrap();
        assert!(req.user_genres.is_none());
    }

    #[test]
    fn profile_update_rejects_unknown_fields() {
        let res = serde_json::from_str::<UpdateProfileRequest>(r#"{"password":"x"}"#);
        assert!(res.is_err());
    }
}

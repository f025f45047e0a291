use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A participant of a party and the genres they picked when joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    pub user_id: Uuid,
    #[serde(default)]
    pub selected_genres: Vec<String>,
}

/// A movie under consideration by a party. `movie_id` is the catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMovie {
    #[serde(alias = "apiMovieId")]
    pub movie_id: String,
    pub title: String,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieLike {
    pub movie_id: String,
    pub user_id: Uuid,
}

/// Public identity fields used when populating hosts and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
}

/// A user's own profile. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
    pub favorite_genres: Vec<String>,
    pub favorite_movies: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: Uuid,
    /// `None` when the account no longer exists.
    pub user: Option<UserSummary>,
    pub selected_genres: Vec<String>,
}

/// A party with host and member identities resolved, as returned by the
/// REST surface and carried in realtime events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyView {
    pub id: Uuid,
    pub short_code: String,
    pub title: String,
    pub host_id: Uuid,
    pub host: Option<UserSummary>,
    pub host_genres: Vec<String>,
    pub members: Vec<MemberView>,
    pub movies: Vec<PartyMovie>,
    pub likes: Vec<MovieLike>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

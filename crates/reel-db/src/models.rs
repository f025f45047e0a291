//! Database row types. These map directly to SQLite rows and stay
//! independent of the API models in reel-types.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub photo: Option<String>,
    pub favorite_genres: Vec<String>,
    pub favorite_movies: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored party document. `doc` is opaque JSON owned by the party core;
/// `version` increments on every successful write.
pub struct PartyRow {
    pub id: String,
    pub short_code: String,
    pub host_id: String,
    pub version: i64,
    pub doc: String,
    pub created_at: String,
    pub updated_at: String,
}

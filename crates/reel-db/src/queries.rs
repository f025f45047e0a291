use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{DbError, Result, is_unique_violation};
use crate::models::{PartyRow, UserRow};
use crate::Database;

const USER_COLUMNS: &str =
    "id, name, email, password, photo, favorite_genres, favorite_movies, created_at, updated_at";

const PARTY_COLUMNS: &str = "id, short_code, host_id, version, doc, created_at, updated_at";

/// Fixed-width timestamps so that lexical order is chronological order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password_hash: &str,
        favorite_genres: &[String],
    ) -> Result<()> {
        let genres = serde_json::to_string(favorite_genres)?;
        self.with_conn(|conn| {
            let ts = now();
            conn.execute(
                "INSERT INTO users (id, name, email, password, favorite_genres, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, name, email, password_hash, genres, ts],
            )
            .map_err(|e| {
                if is_unique_violation(&e, "users.email") {
                    DbError::DuplicateEmail(email.to_string())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Batch-fetch users for populating party views. Unknown ids are skipped.
    pub fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {} FROM users WHERE id IN ({})",
                USER_COLUMNS,
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let raw = stmt
                .query_map(params.as_slice(), RawUser::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            raw.into_iter().map(RawUser::decode).collect()
        })
    }

    /// Apply the provided profile fields. Returns false when the user is unknown.
    pub fn update_user_profile(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
        favorite_genres: Option<&[String]>,
    ) -> Result<bool> {
        let genres = favorite_genres.map(serde_json::to_string).transpose()?;
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET
                        name = COALESCE(?2, name),
                        email = COALESCE(?3, email),
                        favorite_genres = COALESCE(?4, favorite_genres),
                        updated_at = ?5
                     WHERE id = ?1",
                    rusqlite::params![id, name, email, genres, now()],
                )
                .map_err(|e| {
                    if is_unique_violation(&e, "users.email") {
                        DbError::DuplicateEmail(email.unwrap_or_default().to_string())
                    } else {
                        e.into()
                    }
                })?;
            Ok(changed > 0)
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, password_hash, now()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Append a movie to the favorites unless it is already there. The list
    /// is edited in place by one statement, so concurrent edits all land.
    /// Returns the resulting list, or None for an unknown user.
    pub fn add_favorite_movie(&self, id: &str, movie_id: &str) -> Result<Option<Vec<String>>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    favorite_movies = json_insert(favorite_movies, '$[#]', ?2),
                    updated_at = ?3
                 WHERE id = ?1
                   AND NOT EXISTS (SELECT 1 FROM json_each(users.favorite_movies) WHERE value = ?2)",
                rusqlite::params![id, movie_id, now()],
            )?;
            Ok(query_user(conn, "id", id)?.map(|u| u.favorite_movies))
        })
    }

    /// Drop a movie from the favorites, keeping the order of the rest.
    pub fn remove_favorite_movie(&self, id: &str, movie_id: &str) -> Result<Option<Vec<String>>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    favorite_movies = (
                        SELECT json_group_array(value) FROM (
                            SELECT value FROM json_each(users.favorite_movies)
                            WHERE value != ?2 ORDER BY key
                        )
                    ),
                    updated_at = ?3
                 WHERE id = ?1
                   AND EXISTS (SELECT 1 FROM json_each(users.favorite_movies) WHERE value = ?2)",
                rusqlite::params![id, movie_id, now()],
            )?;
            Ok(query_user(conn, "id", id)?.map(|u| u.favorite_movies))
        })
    }

    // -- Parties --

    /// Insert a new party document at version 1. A taken short code surfaces
    /// as `DuplicateShortCode`, which is how the unique index settles races
    /// between concurrent creations.
    pub fn insert_party(&self, id: &str, short_code: &str, host_id: &str, doc: &str) -> Result<()> {
        self.with_conn(|conn| {
            let ts = now();
            conn.execute(
                "INSERT INTO parties (id, short_code, host_id, version, doc, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
                rusqlite::params![id, short_code, host_id, doc, ts],
            )
            .map_err(|e| {
                if is_unique_violation(&e, "parties.short_code") {
                    DbError::DuplicateShortCode(short_code.to_string())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    pub fn short_code_exists(&self, short_code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM parties WHERE short_code = ?1",
                    [short_code],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_party(&self, id: &str) -> Result<Option<PartyRow>> {
        self.with_conn(|conn| query_party(conn, "id", id))
    }

    pub fn get_party_by_code(&self, short_code: &str) -> Result<Option<PartyRow>> {
        self.with_conn(|conn| query_party(conn, "short_code", short_code))
    }

    /// All parties, newest first.
    pub fn list_parties(&self) -> Result<Vec<PartyRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM parties ORDER BY created_at DESC, rowid DESC",
                PARTY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], party_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Conditional write: only succeeds while the stored version still equals
    /// `expected_version`. Returns the new version.
    pub fn update_party(&self, id: &str, expected_version: i64, doc: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE parties SET doc = ?3, version = version + 1, updated_at = ?4
                 WHERE id = ?1 AND version = ?2",
                rusqlite::params![id, expected_version, doc, now()],
            )?;
            if changed == 0 {
                return Err(DbError::StaleVersion(id.to_string()));
            }
            Ok(expected_version + 1)
        })
    }

    /// Conditional delete, same version rule as `update_party`.
    pub fn delete_party(&self, id: &str, expected_version: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM parties WHERE id = ?1 AND version = ?2",
                rusqlite::params![id, expected_version],
            )?;
            if changed == 0 {
                return Err(DbError::StaleVersion(id.to_string()));
            }
            Ok(())
        })
    }
}

/// User row before its JSON list columns are decoded.
struct RawUser {
    id: String,
    name: String,
    email: String,
    password: String,
    photo: Option<String>,
    favorite_genres: String,
    favorite_movies: String,
    created_at: String,
    updated_at: String,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            photo: row.get(4)?,
            favorite_genres: row.get(5)?,
            favorite_movies: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<UserRow> {
        Ok(UserRow {
            id: self.id,
            name: self.name,
            email: self.email,
            password: self.password,
            photo: self.photo,
            favorite_genres: serde_json::from_str(&self.favorite_genres)?,
            favorite_movies: serde_json::from_str(&self.favorite_movies)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let raw = conn.query_row(&sql, [value], RawUser::from_row).optional()?;
    raw.map(RawUser::decode).transpose()
}

fn party_from_row(row: &Row<'_>) -> rusqlite::Result<PartyRow> {
    Ok(PartyRow {
        id: row.get(0)?,
        short_code: row.get(1)?,
        host_id: row.get(2)?,
        version: row.get(3)?,
        doc: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn query_party(conn: &Connection, column: &str, value: &str) -> Result<Option<PartyRow>> {
    let sql = format!("SELECT {} FROM parties WHERE {} = ?1", PARTY_COLUMNS, column);
    Ok(conn.query_row(&sql, [value], party_from_row).optional()?)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    #[test]
    fn users_roundtrip_with_genre_lists() {
        let db = db();
        let uid = id();
        db.create_user(&uid, "Ana", "ana@example.com", "hash", &["Drama".into()])
            .unwrap();

        let user = db.get_user_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(user.id, uid);
        assert_eq!(user.favorite_genres, vec!["Drama"]);
        assert!(user.favorite_movies.is_empty());
        assert!(db.get_user_by_id(&id()).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_classified() {
        let db = db();
        db.create_user(&id(), "Ana", "ana@example.com", "h", &[]).unwrap();
        let err = db
            .create_user(&id(), "Other", "ana@example.com", "h", &[])
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateEmail(_)));
    }

    #[test]
    fn partial_profile_update_keeps_other_fields() {
        let db = db();
        let uid = id();
        db.create_user(&uid, "Ana", "ana@example.com", "h", &["Drama".into()])
            .unwrap();

        assert!(db.update_user_profile(&uid, Some("Ana Maria"), None, None).unwrap());
        let user = db.get_user_by_id(&uid).unwrap().unwrap();
        assert_eq!(user.name, "Ana Maria");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.favorite_genres, vec!["Drama"]);

        assert!(!db.update_user_profile(&id(), Some("x"), None, None).unwrap());
    }

    #[test]
    fn favorite_movies_edit_in_place() {
        let db = db();
        let uid = id();
        db.create_user(&uid, "Ana", "ana@example.com", "h", &[]).unwrap();

        db.add_favorite_movie(&uid, "550").unwrap();
        db.add_favorite_movie(&uid, "603").unwrap();
        db.add_favorite_movie(&uid, "13").unwrap();
        let movies = db.add_favorite_movie(&uid, "550").unwrap().unwrap();
        assert_eq!(movies, vec!["550", "603", "13"]);

        let movies = db.remove_favorite_movie(&uid, "603").unwrap().unwrap();
        assert_eq!(movies, vec!["550", "13"]);
        let movies = db.remove_favorite_movie(&uid, "999").unwrap().unwrap();
        assert_eq!(movies, vec!["550", "13"]);
        db.remove_favorite_movie(&uid, "550").unwrap();
        let movies = db.remove_favorite_movie(&uid, "13").unwrap().unwrap();
        assert!(movies.is_empty());

        assert!(db.add_favorite_movie(&id(), "550").unwrap().is_none());
    }

    #[test]
    fn concurrent_favorite_adds_are_all_kept() {
        let db = std::sync::Arc::new(db());
        let uid = id();
        db.create_user(&uid, "Ana", "ana@example.com", "h", &[]).unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|n| {
                let (db, uid) = (db.clone(), uid.clone());
                std::thread::spawn(move || db.add_favorite_movie(&uid, &n.to_string()).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let user = db.get_user_by_id(&uid).unwrap().unwrap();
        assert_eq!(user.favorite_movies.len(), 8);
    }

    #[test]
    fn batch_user_lookup_skips_unknown_ids() {
        let db = db();
        let a = id();
        db.create_user(&a, "Ana", "ana@example.com", "h", &[]).unwrap();
        let rows = db.get_users_by_ids(&[a.clone(), id()]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, a);
    }

    #[test]
    fn short_code_uniqueness_is_enforced() {
        let db = db();
        db.insert_party(&id(), "ABC234", &id(), "{}").unwrap();
        assert!(db.short_code_exists("ABC234").unwrap());
        assert!(!db.short_code_exists("XYZ789").unwrap());

        let err = db.insert_party(&id(), "ABC234", &id(), "{}").unwrap_err();
        assert!(matches!(err, DbError::DuplicateShortCode(code) if code == "ABC234"));
    }

    #[test]
    fn stale_writes_are_rejected() {
        let db = db();
        let pid = id();
        db.insert_party(&pid, "ABC234", &id(), r#"{"n":1}"#).unwrap();

        assert_eq!(db.update_party(&pid, 1, r#"{"n":2}"#).unwrap(), 2);
        let err = db.update_party(&pid, 1, r#"{"n":3}"#).unwrap_err();
        assert!(matches!(err, DbError::StaleVersion(_)));

        let row = db.get_party(&pid).unwrap().unwrap();
        assert_eq!(row.version, 2);
        assert_eq!(row.doc, r#"{"n":2}"#);
    }

    #[test]
    fn delete_is_version_checked() {
        let db = db();
        let pid = id();
        db.insert_party(&pid, "ABC234", &id(), "{}").unwrap();

        assert!(db.delete_party(&pid, 7).is_err());
        db.delete_party(&pid, 1).unwrap();
        assert!(db.get_party(&pid).unwrap().is_none());
        assert!(db.get_party_by_code("ABC234").unwrap().is_none());
    }

    #[test]
    fn parties_list_newest_first() {
        let db = db();
        let first = id();
        let second = id();
        db.insert_party(&first, "AAAAAA", &id(), "{}").unwrap();
        db.insert_party(&second, "BBBBBB", &id(), "{}").unwrap();

        let rows = db.list_parties().unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    }
}

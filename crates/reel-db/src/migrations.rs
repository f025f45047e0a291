use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            photo           TEXT,
            favorite_genres TEXT NOT NULL DEFAULT '[]',
            favorite_movies TEXT NOT NULL DEFAULT '[]',
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS parties (
            id          TEXT PRIMARY KEY,
            short_code  TEXT NOT NULL UNIQUE,
            host_id     TEXT NOT NULL,
            version     INTEGER NOT NULL DEFAULT 1,
            doc         TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_parties_host
            ON parties(host_id);

        CREATE INDEX IF NOT EXISTS idx_parties_created
            ON parties(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS photos (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL REFERENCES users(id),
            title        TEXT NOT NULL,
            src          TEXT NOT NULL,
            public_id    TEXT NOT NULL,
            date         TEXT NOT NULL,
            uploaded_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_photos_owner
            ON photos(owner_id, uploaded_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

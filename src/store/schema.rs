use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            text TEXT NOT NULL,
            ord INTEGER,
            done INTEGER,
            notify_time TEXT,
            UNIQUE (collection, doc_id)
        );

        CREATE INDEX IF NOT EXISTS documents_collection_ord
            ON documents(collection, ord);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}

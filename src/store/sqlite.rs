use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::config::DbConfig;
use rusqlite::{params, Connection};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::{schema, FieldUpdate, Item, ItemId, ItemStore, Namespace, StoreError, StoreOp};
use crate::config::StoreOptions;

/// Document collection kept in a local SQLite file. Each call opens its own
/// connection.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    options: Arc<StoreOptions>,
}

impl SqliteStore {
    fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&*self.db_path)?;
        conn.busy_timeout(Duration::from_millis(self.options.busy_timeout_ms))?;
        Ok(conn)
    }

    fn with_connection<F, T>(&self, op: StoreOp, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .connect()
            .map_err(|err| StoreError::unavailable(op, err))?;
        f(&conn).map_err(|err| StoreError::unavailable(op, err))
    }
}

impl ItemStore for SqliteStore {
    fn list_items(&self, ns: &Namespace) -> Result<Vec<Item>, StoreError> {
        self.with_connection(StoreOp::List, |conn| {
            let mut stmt = conn.prepare(
                "SELECT doc_id, text, COALESCE(ord, 0), COALESCE(done, 0), notify_time
                 FROM documents
                 WHERE collection = ?1
                 ORDER BY COALESCE(ord, 0) ASC, seq ASC",
            )?;
            let items = stmt
                .query_map([ns.path()], |row| {
                    let notify_time: Option<String> = row.get(4)?;
                    Ok(Item {
                        id: ItemId::new(row.get::<_, String>(0)?),
                        text: row.get(1)?,
                        order: row.get(2)?,
                        done: row.get::<_, i64>(3)? != 0,
                        notify_time: notify_time.as_deref().and_then(parse_notify_time),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    fn create_item(&self, ns: &Namespace, text: &str, order: i64) -> Result<ItemId, StoreError> {
        let id = ItemId::generate();
        self.with_connection(StoreOp::Create, |conn| {
            conn.execute(
                "INSERT INTO documents (collection, doc_id, text, ord, done)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![ns.path(), id.as_str(), text, order],
            )
        })?;
        Ok(id)
    }

    fn update_fields(
        &self,
        ns: &Namespace,
        id: &ItemId,
        update: &FieldUpdate,
    ) -> Result<(), StoreError> {
        let notify_time = match update.notify_time {
            Some(Some(at)) => Some(
                at.format(&Rfc3339)
                    .map_err(|err| StoreError::unavailable(StoreOp::Update, err))?,
            ),
            _ => None,
        };
        let changed = self.with_connection(StoreOp::Update, |conn| {
            conn.execute(
                "UPDATE documents
                 SET text = COALESCE(?3, text),
                     ord = COALESCE(?4, ord),
                     done = COALESCE(?5, done),
                     notify_time = CASE WHEN ?6 THEN ?7 ELSE notify_time END
                 WHERE collection = ?1 AND doc_id = ?2",
                params![
                    ns.path(),
                    id.as_str(),
                    update.text,
                    update.order,
                    update.done,
                    update.notify_time.is_some(),
                    notify_time
                ],
            )
        })?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                path: ns.path().to_string(),
                id: id.clone(),
            });
        }
        Ok(())
    }

    fn delete_item(&self, ns: &Namespace, id: &ItemId) -> Result<(), StoreError> {
        self.with_connection(StoreOp::Delete, |conn| {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![ns.path(), id.as_str()],
            )
        })?;
        Ok(())
    }
}

fn parse_notify_time(raw: &str) -> Option<OffsetDateTime> {
    match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(at) => Some(at),
        Err(err) => {
            tracing::warn!(%err, raw, "ignoring unparsable notifyTime");
            None
        }
    }
}

pub fn init(database_path: &Path, options: &StoreOptions) -> Result<SqliteStore> {
    if let Some(parent) = database_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(database_path)
        .with_context(|| format!("opening database {}", database_path.display()))?;
    prepare_connection(&conn, options)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %database_path.display(), "document store ready");
    Ok(SqliteStore {
        db_path: Arc::new(database_path.to_path_buf()),
        options: Arc::new(options.clone()),
    })
}

fn prepare_connection(conn: &Connection, options: &StoreOptions) -> Result<()> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)
        .context("enabling foreign keys")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        options.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OwnerId;
    use assert_matches::assert_matches;
    use tempfile::TempDir;
    use time::macros::datetime;

    fn temp_store(root: &TempDir) -> Result<SqliteStore> {
        init(&root.path().join("data").join("todos.db"), &StoreOptions::default())
    }

    #[test]
    fn create_list_update_delete_round_trip() -> Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp)?;
        let ns = Namespace::for_owner(&OwnerId::new("owner"));

        let milk = store.create_item(&ns, "milk", 2)?;
        let eggs = store.create_item(&ns, "eggs", 1)?;
        let items = store.list_items(&ns)?;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, eggs);
        assert_eq!(items[1].id, milk);
        assert!(!items[0].done);

        store.update_fields(&ns, &milk, &FieldUpdate::done(true))?;
        let at = datetime!(2026-10-18 21:30 +07:00);
        store.update_fields(&ns, &milk, &FieldUpdate::notify_at(at))?;
        let milk_item = store
            .list_items(&ns)?
            .into_iter()
            .find(|item| item.id == milk)
            .expect("milk present");
        assert!(milk_item.done);
        assert_eq!(milk_item.order, 2);
        assert_eq!(milk_item.notify_time, Some(at));

        store.update_fields(&ns, &milk, &FieldUpdate::clear_notify())?;
        store.delete_item(&ns, &eggs)?;
        let items = store.list_items(&ns)?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].notify_time, None);
        assert!(items[0].done);
        Ok(())
    }

    #[test]
    fn equal_ranks_list_in_insertion_order() -> Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp)?;
        let ns = Namespace::for_owner(&OwnerId::new("owner"));
        store.create_item(&ns, "b", 1)?;
        store.create_item(&ns, "a", 1)?;
        let texts: Vec<String> = store.list_items(&ns)?.into_iter().map(|i| i.text).collect();
        assert_eq!(texts, vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn update_of_missing_document_reports_not_found() -> Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp)?;
        let ns = Namespace::for_owner(&OwnerId::new("owner"));
        assert_matches!(
            store.update_fields(&ns, &ItemId::from("ghost"), &FieldUpdate::order(1)),
            Err(StoreError::NotFound { .. })
        );
        store.delete_item(&ns, &ItemId::from("ghost"))?;
        Ok(())
    }

    #[test]
    fn unreachable_database_is_unavailable() -> Result<()> {
        let temp = TempDir::new()?;
        let store = temp_store(&temp)?;
        let broken = SqliteStore {
            db_path: Arc::new(temp.path().join("missing-dir").join("nested").join("x.db")),
            options: store.options.clone(),
        };
        let ns = Namespace::for_owner(&OwnerId::new("owner"));
        assert_matches!(
            broken.list_items(&ns),
            Err(StoreError::Unavailable { op: StoreOp::List, .. })
        );
        Ok(())
    }
}

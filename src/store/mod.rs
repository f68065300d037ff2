use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::identity::OwnerId;

pub mod batch;
pub mod memory;
mod schema;
mod sqlite;

pub use batch::{apply_sequential, BatchOutcome, FailedWrite, RankWrite};
pub use memory::MemoryStore;
pub use sqlite::{init, SqliteStore};

/// Opaque document identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Collection scope for one owner: `users/{owner}/todos`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    path: String,
}

impl Namespace {
    pub fn for_owner(owner: &OwnerId) -> Self {
        Self {
            path: format!("users/{}/todos", owner.as_str()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub text: String,
    pub order: i64,
    #[serde(default)]
    pub done: bool,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notify_time: Option<OffsetDateTime>,
}

/// Partial document update. `None` leaves a field untouched; `notify_time`
/// uses `Some(None)` to clear the stored reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    pub text: Option<String>,
    pub order: Option<i64>,
    pub done: Option<bool>,
    pub notify_time: Option<Option<OffsetDateTime>>,
}

impl FieldUpdate {
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn done(done: bool) -> Self {
        Self {
            done: Some(done),
            ..Self::default()
        }
    }

    pub fn notify_at(at: OffsetDateTime) -> Self {
        Self {
            notify_time: Some(Some(at)),
            ..Self::default()
        }
    }

    pub fn clear_notify() -> Self {
        Self {
            notify_time: Some(None),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.order.is_none() && self.done.is_none() && self.notify_time.is_none()
    }

    pub fn apply_to(&self, item: &mut Item) {
        if let Some(text) = &self.text {
            item.text = text.clone();
        }
        if let Some(order) = self.order {
            item.order = order;
        }
        if let Some(done) = self.done {
            item.done = done;
        }
        if let Some(notify_time) = self.notify_time {
            item.notify_time = notify_time;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StoreOp {
    List,
    Create,
    Update,
    Delete,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable during {op}: {reason}")]
    Unavailable { op: StoreOp, reason: String },

    #[error("document {id} not found in {path}")]
    NotFound { path: String, id: ItemId },
}

impl StoreError {
    pub fn unavailable(op: StoreOp, reason: impl fmt::Display) -> Self {
        StoreError::Unavailable {
            op,
            reason: reason.to_string(),
        }
    }
}

/// Contract over the persistent document collection. Every call is an
/// independent round-trip; nothing is batched or transactional.
pub trait ItemStore {
    /// Items in ascending `order`; equal ranks keep the order the backend
    /// holds them in.
    fn list_items(&self, ns: &Namespace) -> Result<Vec<Item>, StoreError>;

    /// Creates a document with `done = false` and returns its id.
    fn create_item(&self, ns: &Namespace, text: &str, order: i64) -> Result<ItemId, StoreError>;

    fn update_fields(
        &self,
        ns: &Namespace,
        id: &ItemId,
        update: &FieldUpdate,
    ) -> Result<(), StoreError>;

    /// Deleting an id that does not exist is not an error.
    fn delete_item(&self, ns: &Namespace, id: &ItemId) -> Result<(), StoreError>;
}

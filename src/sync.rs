//! Keeps a rendered list consistent with the store.
//!
//! The store is the only source of truth. Every mutation goes to the store
//! first and is followed by a full reload that replaces whatever the view
//! showed before; display indices are always derived from ascending rank.

use std::time::{Duration, Instant};

use thiserror::Error;
use time::OffsetDateTime;

use crate::order;
use crate::reminder::{self, Reminder, ReminderError};
use crate::reorder::{GestureError, InputKind, Phase, Placement, PressTarget, ReorderSession, SlotBox};
use crate::store::{apply_sequential, FieldUpdate, Item, ItemId, ItemStore, Namespace, StoreError};

/// One rendered row; `index` is the 1-based display position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub id: ItemId,
    pub text: String,
    pub done: bool,
    pub index: usize,
    pub notify_time: Option<OffsetDateTime>,
}

/// The UI list widget.
pub trait ListView {
    /// Replaces everything shown with `rows`.
    fn render(&mut self, rows: &[DisplayRow]);
}

/// A view that just keeps the last rendered rows.
#[derive(Debug, Clone, Default)]
pub struct RowBuffer {
    rows: Vec<DisplayRow>,
    renders: usize,
}

impl RowBuffer {
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub fn render_count(&self) -> usize {
        self.renders
    }
}

impl ListView for RowBuffer {
    fn render(&mut self, rows: &[DisplayRow]) {
        self.rows = rows.to_vec();
        self.renders += 1;
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("reorder stopped after {applied} of {total} rank writes at item {failed_id}: {source}")]
    PartialReorder {
        applied: usize,
        total: usize,
        failed_id: ItemId,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Gesture(#[from] GestureError),

    #[error(transparent)]
    Reminder(#[from] ReminderError),

    #[error("item {0} is not in the current list")]
    UnknownItem(ItemId),

    #[error("no item at position {0}")]
    NoSuchIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    pub total: usize,
    pub applied: usize,
}

pub struct ListSynchronizer<S, V> {
    store: S,
    ns: Namespace,
    view: V,
    items: Vec<Item>,
    session: ReorderSession,
}

impl<S: ItemStore, V: ListView> ListSynchronizer<S, V> {
    pub fn new(store: S, ns: Namespace, view: V, long_press: Duration) -> Self {
        Self {
            store,
            ns,
            view,
            items: Vec::new(),
            session: ReorderSession::new(long_press),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn session(&self) -> &ReorderSession {
        &self.session
    }

    /// Items as of the last reload, in display order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn visible_order(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Resolves a 1-based display index.
    pub fn row_by_index(&self, index: usize) -> Result<&Item, SyncError> {
        index
            .checked_sub(1)
            .and_then(|idx| self.items.get(idx))
            .ok_or(SyncError::NoSuchIndex(index))
    }

    /// Fetches everything and re-renders from scratch. On failure the view
    /// keeps what it showed before.
    pub fn reload(&mut self) -> Result<(), SyncError> {
        let items = order::display_sequence(self.store.list_items(&self.ns)?);
        if order::has_duplicate_ranks(&items) {
            tracing::warn!(namespace = %self.ns, "duplicate ranks in collection");
        }
        let rows: Vec<DisplayRow> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| DisplayRow {
                id: item.id.clone(),
                text: item.text.clone(),
                done: item.done,
                index: idx + 1,
                notify_time: item.notify_time,
            })
            .collect();
        self.view.render(&rows);
        self.items = items;
        Ok(())
    }

    /// Appends an item after the current highest rank. Blank text is
    /// ignored without touching the store.
    pub fn create(&mut self, text: &str) -> Result<Option<ItemId>, SyncError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring blank item text");
            return Ok(None);
        }
        self.ensure_no_gesture()?;
        let existing = self.store.list_items(&self.ns)?;
        let order = order::next_order_for_insert(&existing);
        let id = self.store.create_item(&self.ns, text, order)?;
        tracing::info!(%id, order, "item created");
        self.reload()?;
        Ok(Some(id))
    }

    pub fn set_done(&mut self, id: &ItemId, done: bool) -> Result<(), SyncError> {
        self.ensure_no_gesture()?;
        self.store
            .update_fields(&self.ns, id, &FieldUpdate::done(done))?;
        tracing::info!(%id, done, "item done state changed");
        self.reload()
    }

    /// Flips `done` and returns the new value.
    pub fn toggle_done(&mut self, id: &ItemId) -> Result<bool, SyncError> {
        let done = !self
            .item(id)
            .ok_or_else(|| SyncError::UnknownItem(id.clone()))?
            .done;
        self.set_done(id, done)?;
        Ok(done)
    }

    /// Removes the item. The rank gap it leaves stays until the next reorder
    /// commit.
    pub fn delete(&mut self, id: &ItemId) -> Result<(), SyncError> {
        self.ensure_no_gesture()?;
        self.store.delete_item(&self.ns, id)?;
        tracing::info!(%id, "item deleted");
        self.reload()
    }

    /// Persists `ordered_ids` as ranks `1..=N`, one write at a time, then
    /// reloads whether or not every write landed. Nothing is rolled back.
    pub fn commit_reorder(&mut self, ordered_ids: &[ItemId]) -> Result<CommitReport, SyncError> {
        let writes = order::renumber(ordered_ids);
        let outcome = apply_sequential(&self.store, &self.ns, &writes);
        let reloaded = self.reload();
        match outcome.failed {
            None => {
                reloaded?;
                tracing::info!(namespace = %self.ns, writes = outcome.total, "reorder committed");
                Ok(CommitReport {
                    total: outcome.total,
                    applied: outcome.applied,
                })
            }
            Some(failed) => {
                if let Err(err) = reloaded {
                    tracing::warn!(%err, "reload after partial reorder failed");
                }
                tracing::warn!(
                    applied = outcome.applied,
                    total = outcome.total,
                    id = %failed.id,
                    "reorder commit interrupted"
                );
                Err(SyncError::PartialReorder {
                    applied: outcome.applied,
                    total: outcome.total,
                    failed_id: failed.id,
                    source: failed.error,
                })
            }
        }
    }

    /// Moves the row at display index `from` to display index `to` (both
    /// 1-based) through the same commit path a drag uses.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<CommitReport, SyncError> {
        self.ensure_no_gesture()?;
        let current = self.visible_order();
        let ordered = order::move_to(
            &current,
            from.checked_sub(1).ok_or(SyncError::NoSuchIndex(from))?,
            to.checked_sub(1).ok_or(SyncError::NoSuchIndex(to))?,
        )
        .ok_or(SyncError::NoSuchIndex(from.max(to)))?;
        self.commit_reorder(&ordered)
    }

    /// Mutations are refused while a press or drag is live, since the drag
    /// commits the id set it captured when it started.
    fn ensure_no_gesture(&self) -> Result<(), SyncError> {
        match self.session.phase() {
            Phase::Committing => Err(GestureError::CommitInProgress.into()),
            _ if self.session.is_busy() => Err(GestureError::GestureActive.into()),
            _ => Ok(()),
        }
    }

    pub fn press(
        &mut self,
        id: ItemId,
        target: PressTarget,
        kind: InputKind,
        at: Instant,
    ) -> Result<Phase, SyncError> {
        Ok(self.session.press(id, target, kind, at)?)
    }

    pub fn tick(&mut self, now: Instant) -> Phase {
        self.session.tick(now)
    }

    pub fn cancel_press(&mut self) -> bool {
        self.session.cancel()
    }

    /// Feeds a pointer sample. An armed gesture becomes a drag on its first
    /// movement.
    pub fn drag_to(&mut self, pointer_y: f32, slots: &[SlotBox]) -> Result<Option<Placement>, SyncError> {
        if self.session.phase() == Phase::Armed {
            let order = self.visible_order();
            self.session.start_drag(&order)?;
        }
        Ok(self.session.pointer_move(pointer_y, slots).cloned())
    }

    /// Ends the gesture and, for a released drag, commits the new order. The
    /// session is back in `Idle` when this returns.
    pub fn release(&mut self, at: Instant) -> Result<Option<CommitReport>, SyncError> {
        let Some(plan) = self.session.release(at) else {
            return Ok(None);
        };
        let result = self.commit_reorder(&plan.ordered_ids);
        self.session.settle();
        result.map(Some)
    }

    /// Stores the next occurrence of the `HH:MM` in `input` as the item's
    /// `notifyTime`. Unreadable input fails before any store call.
    pub fn set_reminder(
        &mut self,
        id: &ItemId,
        input: &str,
        now: OffsetDateTime,
    ) -> Result<Reminder, SyncError> {
        let at = reminder::parse_time_of_day(input)?;
        self.ensure_no_gesture()?;
        let text = self
            .item(id)
            .ok_or_else(|| SyncError::UnknownItem(id.clone()))?
            .text
            .clone();
        let fire_at = reminder::next_occurrence(now, at);
        self.store
            .update_fields(&self.ns, id, &FieldUpdate::notify_at(fire_at))?;
        tracing::info!(%id, %fire_at, "reminder time stored");
        self.reload()?;
        Ok(Reminder {
            item_id: id.clone(),
            text,
            fire_at,
        })
    }

    pub fn clear_reminder(&mut self, id: &ItemId) -> Result<(), SyncError> {
        self.ensure_no_gesture()?;
        self.store
            .update_fields(&self.ns, id, &FieldUpdate::clear_notify())?;
        tracing::info!(%id, "reminder cleared");
        self.reload()
    }

    /// Stored reminders still in the future, for re-arming after start-up.
    pub fn upcoming_reminders(&self, now: OffsetDateTime) -> Vec<Reminder> {
        self.items
            .iter()
            .filter_map(|item| {
                let fire_at = item.notify_time.filter(|at| *at > now)?;
                Some(Reminder {
                    item_id: item.id.clone(),
                    text: item.text.clone(),
                    fire_at,
                })
            })
            .collect()
    }
}

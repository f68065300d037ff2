//! Drag-to-reorder gesture handling.
//!
//! A [`ReorderSession`] owns the state of the single gesture a list allows
//! at a time: `Idle -> Armed -> Dragging -> Committing -> Idle`. Touch-style
//! presses wait in `Idle` until the long-press threshold has elapsed, so a
//! press released early never leaves `Idle` and never touches the store.
//! The session only computes orders; writing them is the synchronizer's job.

use std::time::{Duration, Instant};

use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::store::ItemId;

mod placement;

pub use placement::{initial_placement, placement_for, splice, Placement, SlotBox};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Mouse-style input: arms on press.
    Pointer,
    /// Touch-style input: arms after the long-press threshold.
    Touch,
}

/// What the press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTarget {
    /// The row's draggable surface.
    Surface,
    /// An interactive control inside the row (checkbox, button).
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Idle,
    Armed,
    Dragging,
    Committing,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    #[error("another reorder gesture is already in progress")]
    GestureActive,

    #[error("a reorder commit is still settling")]
    CommitInProgress,

    #[error("item {0} is not in the visible list")]
    UnknownItem(ItemId),
}

/// The order to persist once a drag is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    pub dragged: ItemId,
    pub ordered_ids: Vec<ItemId>,
}

#[derive(Debug)]
struct PendingPress {
    id: ItemId,
    pressed_at: Instant,
}

#[derive(Debug)]
struct Drag {
    id: ItemId,
    order: Vec<ItemId>,
    placement: Placement,
}

#[derive(Debug)]
enum State {
    Idle { pending: Option<PendingPress> },
    Armed { id: ItemId, kind: InputKind },
    Dragging(Drag),
    Committing(CommitPlan),
}

#[derive(Debug)]
pub struct ReorderSession {
    long_press: Duration,
    state: State,
}

impl ReorderSession {
    pub fn new(long_press: Duration) -> Self {
        Self {
            long_press,
            state: State::Idle { pending: None },
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle { .. } => Phase::Idle,
            State::Armed { .. } => Phase::Armed,
            State::Dragging(_) => Phase::Dragging,
            State::Committing(_) => Phase::Committing,
        }
    }

    pub fn long_press(&self) -> Duration {
        self.long_press
    }

    /// True while a press is held, armed, dragging or committing.
    pub fn is_busy(&self) -> bool {
        !matches!(self.state, State::Idle { pending: None })
    }

    /// Item held by a touch press that has not armed yet.
    pub fn pending_press(&self) -> Option<&ItemId> {
        match &self.state {
            State::Idle {
                pending: Some(pending),
            } => Some(&pending.id),
            _ => None,
        }
    }

    /// Item currently armed, detached or committing.
    pub fn active_item(&self) -> Option<&ItemId> {
        match &self.state {
            State::Idle { .. } => None,
            State::Armed { id, .. } => Some(id),
            State::Dragging(drag) => Some(&drag.id),
            State::Committing(plan) => Some(&plan.dragged),
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        match &self.state {
            State::Dragging(drag) => Some(&drag.placement),
            _ => None,
        }
    }

    /// Visible order with the placeholder applied, while dragging.
    pub fn preview_order(&self) -> Option<Vec<ItemId>> {
        match &self.state {
            State::Dragging(drag) => Some(splice(&drag.order, &drag.id, &drag.placement)),
            _ => None,
        }
    }

    /// Starts a gesture on `id`. Presses on controls are ignored.
    pub fn press(
        &mut self,
        id: ItemId,
        target: PressTarget,
        kind: InputKind,
        at: Instant,
    ) -> Result<Phase, GestureError> {
        match &self.state {
            State::Committing(_) => return Err(GestureError::CommitInProgress),
            State::Armed { .. } | State::Dragging(_) => return Err(GestureError::GestureActive),
            State::Idle { pending: Some(_) } => return Err(GestureError::GestureActive),
            State::Idle { pending: None } => {}
        }
        if target == PressTarget::Control {
            return Ok(Phase::Idle);
        }
        match kind {
            InputKind::Pointer => {
                tracing::debug!(%id, "gesture armed");
                self.state = State::Armed { id, kind };
            }
            InputKind::Touch => {
                tracing::debug!(%id, threshold_ms = self.long_press.as_millis() as u64, "long press started");
                self.state = State::Idle {
                    pending: Some(PendingPress { id, pressed_at: at }),
                };
            }
        }
        Ok(self.phase())
    }

    /// Promotes a held touch press to `Armed` once the threshold has elapsed.
    pub fn tick(&mut self, now: Instant) -> Phase {
        if let State::Idle {
            pending: Some(pending),
        } = &self.state
        {
            if now.saturating_duration_since(pending.pressed_at) >= self.long_press {
                let id = pending.id.clone();
                tracing::debug!(%id, "long press armed");
                self.state = State::Armed {
                    id,
                    kind: InputKind::Touch,
                };
            }
        }
        self.phase()
    }

    /// Abandons a held or armed press (pointer left, scroll detected).
    /// Returns false when there was nothing cancellable; drags and commits
    /// cannot be cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            State::Idle { pending: Some(_) } | State::Armed { .. } => {
                tracing::debug!("gesture cancelled");
                self.state = State::Idle { pending: None };
                true
            }
            _ => false,
        }
    }

    /// Confirms the drag of the armed item against the current visible
    /// order. Returns whether a drag began.
    pub fn start_drag(&mut self, visible_order: &[ItemId]) -> Result<bool, GestureError> {
        let State::Armed { id, kind } = &self.state else {
            return Ok(false);
        };
        if !visible_order.contains(id) {
            let id = id.clone();
            self.state = State::Idle { pending: None };
            return Err(GestureError::UnknownItem(id));
        }
        let id = id.clone();
        tracing::debug!(%id, ?kind, "drag started");
        let placement = initial_placement(visible_order, &id);
        self.state = State::Dragging(Drag {
            id,
            order: visible_order.to_vec(),
            placement,
        });
        Ok(true)
    }

    /// Moves the placeholder for a pointer sample at `pointer_y`.
    pub fn pointer_move(&mut self, pointer_y: f32, slots: &[SlotBox]) -> Option<&Placement> {
        let State::Dragging(drag) = &mut self.state else {
            return None;
        };
        drag.placement = placement_for(pointer_y, slots, &drag.id);
        Some(&drag.placement)
    }

    /// Ends the gesture. A released drag moves to `Committing` and yields the
    /// order to persist; anything else returns to `Idle` with no effect.
    pub fn release(&mut self, at: Instant) -> Option<CommitPlan> {
        let previous = std::mem::replace(&mut self.state, State::Idle { pending: None });
        match previous {
            State::Idle {
                pending: Some(pending),
            } => {
                let held = at.saturating_duration_since(pending.pressed_at);
                if held < self.long_press {
                    tracing::debug!(id = %pending.id, held_ms = held.as_millis() as u64, "press released before arming");
                } else {
                    tracing::debug!(id = %pending.id, "armed press released without dragging");
                }
                None
            }
            State::Idle { pending: None } => None,
            State::Armed { id, .. } => {
                tracing::debug!(%id, "armed press released without dragging");
                None
            }
            State::Dragging(drag) => {
                let ordered_ids = splice(&drag.order, &drag.id, &drag.placement);
                let plan = CommitPlan {
                    dragged: drag.id,
                    ordered_ids,
                };
                tracing::debug!(id = %plan.dragged, "drag released, committing");
                self.state = State::Committing(plan.clone());
                Some(plan)
            }
            State::Committing(plan) => {
                self.state = State::Committing(plan);
                None
            }
        }
    }

    /// Returns to `Idle` after the commit's writes and reload have finished,
    /// whatever their outcome.
    pub fn settle(&mut self) {
        if let State::Committing(plan) = &self.state {
            tracing::debug!(id = %plan.dragged, "commit settled");
            self.state = State::Idle { pending: None };
        }
    }
}

use crate::store::ItemId;

/// Vertical extent of one rendered row, in whatever unit the UI measures
/// pointer positions with.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotBox {
    pub id: ItemId,
    pub top: f32,
    pub height: f32,
}

impl SlotBox {
    pub fn new(id: ItemId, top: f32, height: f32) -> Self {
        Self { id, top, height }
    }

    fn midpoint(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Where the placeholder sits while dragging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Before(ItemId),
    End,
}

/// Picks the sibling whose midpoint is below the pointer by the smallest
/// distance; the dragged row never counts. No such sibling means the end of
/// the list.
pub fn placement_for(pointer_y: f32, slots: &[SlotBox], dragged: &ItemId) -> Placement {
    let mut closest: Option<(f32, &ItemId)> = None;
    for slot in slots.iter().filter(|slot| &slot.id != dragged) {
        let offset = pointer_y - slot.midpoint();
        if offset < 0.0 && closest.map_or(true, |(best, _)| offset > best) {
            closest = Some((offset, &slot.id));
        }
    }
    match closest {
        Some((_, id)) => Placement::Before(id.clone()),
        None => Placement::End,
    }
}

/// Placeholder position at drag start: the slot the dragged row vacated.
pub fn initial_placement(order: &[ItemId], dragged: &ItemId) -> Placement {
    order
        .iter()
        .position(|id| id == dragged)
        .and_then(|idx| order.get(idx + 1))
        .map(|next| Placement::Before(next.clone()))
        .unwrap_or(Placement::End)
}

/// Removes `dragged` from `order` and reinserts it at `placement`. A
/// placement naming an id that is no longer present falls back to the end.
pub fn splice(order: &[ItemId], dragged: &ItemId, placement: &Placement) -> Vec<ItemId> {
    let mut spliced: Vec<ItemId> = order.iter().filter(|id| *id != dragged).cloned().collect();
    let at = match placement {
        Placement::Before(anchor) => spliced
            .iter()
            .position(|id| id == anchor)
            .unwrap_or(spliced.len()),
        Placement::End => spliced.len(),
    };
    spliced.insert(at, dragged.clone());
    spliced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[&str]) -> Vec<SlotBox> {
        ids.iter()
            .enumerate()
            .map(|(idx, id)| SlotBox::new(ItemId::from(*id), idx as f32 * 10.0, 10.0))
            .collect()
    }

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().map(|id| ItemId::from(*id)).collect()
    }

    #[test]
    fn pointer_above_first_midpoint_targets_first_row() {
        let slots = rows(&["a", "b", "c"]);
        assert_eq!(
            placement_for(2.0, &slots, &ItemId::from("c")),
            Placement::Before(ItemId::from("a"))
        );
    }

    #[test]
    fn nearest_midpoint_below_pointer_wins() {
        let slots = rows(&["a", "b", "c"]);
        // midpoints at 5, 15, 25
        assert_eq!(
            placement_for(12.0, &slots, &ItemId::from("a")),
            Placement::Before(ItemId::from("b"))
        );
        assert_eq!(
            placement_for(16.0, &slots, &ItemId::from("a")),
            Placement::Before(ItemId::from("c"))
        );
    }

    #[test]
    fn dragged_row_is_never_a_candidate() {
        let slots = rows(&["a", "b", "c"]);
        assert_eq!(
            placement_for(12.0, &slots, &ItemId::from("b")),
            Placement::Before(ItemId::from("c"))
        );
    }

    #[test]
    fn pointer_below_everything_targets_end() {
        let slots = rows(&["a", "b", "c"]);
        assert_eq!(placement_for(40.0, &slots, &ItemId::from("a")), Placement::End);
        assert_eq!(placement_for(0.0, &[], &ItemId::from("a")), Placement::End);
    }

    #[test]
    fn initial_placement_is_the_vacated_slot() {
        let order = ids(&["a", "b", "c"]);
        assert_eq!(
            initial_placement(&order, &ItemId::from("a")),
            Placement::Before(ItemId::from("b"))
        );
        assert_eq!(initial_placement(&order, &ItemId::from("c")), Placement::End);
        assert_eq!(
            splice(&order, &ItemId::from("a"), &initial_placement(&order, &ItemId::from("a"))),
            order
        );
    }

    #[test]
    fn splice_moves_dragged_before_anchor() {
        let order = ids(&["a", "b", "c"]);
        assert_eq!(
            splice(&order, &ItemId::from("c"), &Placement::Before(ItemId::from("a"))),
            ids(&["c", "a", "b"])
        );
        assert_eq!(
            splice(&order, &ItemId::from("a"), &Placement::End),
            ids(&["b", "c", "a"])
        );
        assert_eq!(
            splice(&order, &ItemId::from("a"), &Placement::Before(ItemId::from("gone"))),
            ids(&["b", "c", "a"])
        );
    }
}

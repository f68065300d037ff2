//! Rank arithmetic for an owner's collection.
//!
//! Every item carries an integer `order`; ascending `order` is the display
//! order. Inserts append after the current maximum, and reorder commits
//! re-issue a contiguous `1..=N` sequence. Ranks may have gaps in between
//! (deletes never close them) and, after an interrupted commit, duplicates;
//! duplicates are resolved by keeping the order the store returned.

use std::collections::BTreeSet;

use crate::store::{Item, ItemId, RankWrite};

/// Rank for a newly created item: one past the largest existing rank, or 1
/// for an empty collection.
pub fn next_order_for_insert(items: &[Item]) -> i64 {
    items.iter().map(|item| item.order).max().unwrap_or(0).max(0) + 1
}

/// Assigns `1..=N` by position.
pub fn renumber(ordered_ids: &[ItemId]) -> Vec<RankWrite> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| RankWrite {
            id: id.clone(),
            order: idx as i64 + 1,
        })
        .collect()
}

/// Stable sort by rank; ties keep their incoming order.
pub fn display_sequence(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| item.order);
    items
}

pub fn has_duplicate_ranks(items: &[Item]) -> bool {
    let mut seen = BTreeSet::new();
    items.iter().any(|item| !seen.insert(item.order))
}

/// Ranks in `1..=max` that no item holds.
pub fn rank_gaps(items: &[Item]) -> Vec<i64> {
    let held: BTreeSet<i64> = items.iter().map(|item| item.order).collect();
    let max = held.iter().next_back().copied().unwrap_or(0);
    (1..=max).filter(|rank| !held.contains(rank)).collect()
}

/// The sequence after moving the entry at `from` so it lands at `to`
/// (both zero-based). `None` when either position is out of range.
pub fn move_to(ordered_ids: &[ItemId], from: usize, to: usize) -> Option<Vec<ItemId>> {
    if from >= ordered_ids.len() || to >= ordered_ids.len() {
        return None;
    }
    let mut ids = ordered_ids.to_vec();
    let moved = ids.remove(from);
    ids.insert(to, moved);
    Some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, order: i64) -> Item {
        Item {
            id: ItemId::from(id),
            text: id.to_uppercase(),
            order,
            done: false,
            notify_time: None,
        }
    }

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().map(|id| ItemId::from(*id)).collect()
    }

    #[test]
    fn next_order_appends_after_maximum() {
        assert_eq!(next_order_for_insert(&[]), 1);
        assert_eq!(next_order_for_insert(&[item("a", 1), item("b", 7), item("c", 3)]), 8);
    }

    #[test]
    fn renumber_assigns_contiguous_ranks_by_position() {
        let writes = renumber(&ids(&["c", "a", "b"]));
        let pairs: Vec<(&str, i64)> = writes.iter().map(|w| (w.id.as_str(), w.order)).collect();
        assert_eq!(pairs, vec![("c", 1), ("a", 2), ("b", 3)]);
    }

    #[test]
    fn renumber_is_idempotent() {
        let first = renumber(&ids(&["d", "b", "a", "c"]));
        let mut reordered: Vec<&RankWrite> = first.iter().collect();
        reordered.sort_by_key(|write| write.order);
        let replay: Vec<ItemId> = reordered.into_iter().map(|write| write.id.clone()).collect();
        assert_eq!(renumber(&replay), first);
    }

    #[test]
    fn duplicate_ranks_keep_store_order_and_renumber_heals_them() {
        let items = vec![item("x", 1), item("y", 2), item("z", 2), item("w", 3)];
        assert!(has_duplicate_ranks(&items));
        let sequence = display_sequence(items);
        let order: Vec<ItemId> = sequence.iter().map(|i| i.id.clone()).collect();
        assert_eq!(order, ids(&["x", "y", "z", "w"]));

        let healed: Vec<Item> = renumber(&order)
            .into_iter()
            .map(|write| item(write.id.as_str(), write.order))
            .collect();
        assert!(!has_duplicate_ranks(&healed));
        assert!(rank_gaps(&healed).is_empty());
    }

    #[test]
    fn gaps_are_reported_after_delete() {
        let items = vec![item("a", 1), item("c", 3), item("d", 4)];
        assert_eq!(rank_gaps(&items), vec![2]);
    }

    #[test]
    fn move_to_shifts_neighbours() {
        let moved = move_to(&ids(&["a", "b", "c"]), 2, 0).expect("in range");
        assert_eq!(moved, ids(&["c", "a", "b"]));
        let moved = move_to(&ids(&["a", "b", "c"]), 0, 2).expect("in range");
        assert_eq!(moved, ids(&["b", "c", "a"]));
        assert!(move_to(&ids(&["a"]), 0, 1).is_none());
    }
}

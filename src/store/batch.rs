use super::{FieldUpdate, ItemId, ItemStore, Namespace, StoreError};

/// One rank assignment produced by renumbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankWrite {
    pub id: ItemId,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    /// Zero-based position of the failing write in the batch.
    pub index: usize,
    pub id: ItemId,
    pub error: StoreError,
}

/// Result of a non-atomic batch: the first `applied` writes are durable, the
/// rest were never issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub applied: usize,
    pub failed: Option<FailedWrite>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && self.applied == self.total
    }
}

/// Issues each write in turn, waiting for one to finish before the next, and
/// stops at the first failure. Applied writes are never rolled back.
pub fn apply_sequential<S>(store: &S, ns: &Namespace, writes: &[RankWrite]) -> BatchOutcome
where
    S: ItemStore + ?Sized,
{
    let total = writes.len();
    for (index, write) in writes.iter().enumerate() {
        if let Err(error) = store.update_fields(ns, &write.id, &FieldUpdate::order(write.order)) {
            tracing::warn!(
                namespace = %ns,
                id = %write.id,
                index,
                total,
                %error,
                "rank write failed; remaining writes skipped"
            );
            return BatchOutcome {
                total,
                applied: index,
                failed: Some(FailedWrite {
                    index,
                    id: write.id.clone(),
                    error,
                }),
            };
        }
    }
    BatchOutcome {
        total,
        applied: total,
        failed: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OwnerId;
    use crate::store::{MemoryStore, StoreOp};

    fn seeded(texts: &[&str]) -> anyhow::Result<(MemoryStore, Namespace, Vec<ItemId>)> {
        let store = MemoryStore::new();
        let ns = Namespace::for_owner(&OwnerId::new("batch"));
        let mut ids = Vec::new();
        for (idx, text) in texts.iter().enumerate() {
            ids.push(store.create_item(&ns, text, idx as i64 + 1)?);
        }
        Ok((store, ns, ids))
    }

    #[test]
    fn stops_at_first_failure_without_rollback() -> anyhow::Result<()> {
        let (store, ns, ids) = seeded(&["a", "b", "c", "d"])?;
        let writes: Vec<RankWrite> = ids
            .iter()
            .rev()
            .enumerate()
            .map(|(idx, id)| RankWrite {
                id: id.clone(),
                order: idx as i64 + 10,
            })
            .collect();
        store.fail_nth(StoreOp::Update, 3);

        let outcome = apply_sequential(&store, &ns, &writes);
        assert_eq!(outcome.applied, 2);
        assert!(!outcome.is_complete());
        let failed = outcome.failed.expect("failure reported");
        assert_eq!(failed.index, 2);
        assert_eq!(failed.id, ids[1]);

        assert_eq!(store.count_calls(StoreOp::Update), 3);
        let orders: Vec<(String, i64)> = store
            .list_items(&ns)?
            .into_iter()
            .map(|item| (item.text, item.order))
            .collect();
        assert_eq!(
            orders,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("d".to_string(), 10),
                ("c".to_string(), 11),
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_batch_is_complete() {
        let store = MemoryStore::new();
        let ns = Namespace::for_owner(&OwnerId::new("batch"));
        let outcome = apply_sequential(&store, &ns, &[]);
        assert!(outcome.is_complete());
        assert_eq!(store.total_calls(), 0);
    }
}

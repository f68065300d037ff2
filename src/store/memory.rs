use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{FieldUpdate, Item, ItemId, ItemStore, Namespace, StoreError, StoreOp};

/// In-process document collection. Clones share the same documents, so a
/// test can hand one clone to the code under test and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<String, IndexMap<ItemId, Item>>,
    calls: Vec<StoreOp>,
    faults: Vec<Fault>,
    offline: bool,
}

#[derive(Debug)]
struct Fault {
    op: StoreOp,
    remaining: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` call of `op` issued from now on fail once with
    /// `StoreError::Unavailable`.
    pub fn fail_nth(&self, op: StoreOp, nth: usize) {
        let mut inner = self.inner.lock();
        inner.faults.push(Fault {
            op,
            remaining: nth.max(1),
        });
    }

    /// While offline every call fails.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    pub fn total_calls(&self) -> usize {
        self.inner.lock().calls.len()
    }

    pub fn count_calls(&self, op: StoreOp) -> usize {
        self.inner.lock().calls.iter().filter(|call| **call == op).count()
    }

    pub fn call_log(&self) -> Vec<StoreOp> {
        self.inner.lock().calls.clone()
    }

    /// Raw insert bypassing fault injection and the call log, for seeding
    /// states the public contract cannot produce (duplicate ranks).
    pub fn insert_raw(&self, ns: &Namespace, item: Item) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(ns.path().to_string())
            .or_default()
            .insert(item.id.clone(), item);
    }
}

impl Inner {
    fn record(&mut self, op: StoreOp) -> Result<(), StoreError> {
        self.calls.push(op);
        if self.offline {
            return Err(StoreError::unavailable(op, "store offline"));
        }
        let mut tripped = false;
        for fault in self.faults.iter_mut().filter(|fault| fault.op == op) {
            fault.remaining -= 1;
            tripped |= fault.remaining == 0;
        }
        self.faults.retain(|fault| fault.remaining > 0);
        if tripped {
            return Err(StoreError::unavailable(op, "injected fault"));
        }
        Ok(())
    }
}

impl ItemStore for MemoryStore {
    fn list_items(&self, ns: &Namespace) -> Result<Vec<Item>, StoreError> {
        let mut inner = self.inner.lock();
        inner.record(StoreOp::List)?;
        let mut items: Vec<Item> = inner
            .collections
            .get(ns.path())
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        items.sort_by_key(|item| item.order);
        Ok(items)
    }

    fn create_item(&self, ns: &Namespace, text: &str, order: i64) -> Result<ItemId, StoreError> {
        let mut inner = self.inner.lock();
        inner.record(StoreOp::Create)?;
        let id = ItemId::generate();
        let item = Item {
            id: id.clone(),
            text: text.to_string(),
            order,
            done: false,
            notify_time: None,
        };
        inner
            .collections
            .entry(ns.path().to_string())
            .or_default()
            .insert(id.clone(), item);
        Ok(id)
    }

    fn update_fields(
        &self,
        ns: &Namespace,
        id: &ItemId,
        update: &FieldUpdate,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.record(StoreOp::Update)?;
        let item = inner
            .collections
            .get_mut(ns.path())
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                path: ns.path().to_string(),
                id: id.clone(),
            })?;
        update.apply_to(item);
        Ok(())
    }

    fn delete_item(&self, ns: &Namespace, id: &ItemId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.record(StoreOp::Delete)?;
        if let Some(docs) = inner.collections.get_mut(ns.path()) {
            docs.shift_remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::OwnerId;
    use assert_matches::assert_matches;

    #[test]
    fn namespaces_do_not_see_each_other() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let alice = Namespace::for_owner(&OwnerId::new("alice"));
        let bob = Namespace::for_owner(&OwnerId::new("bob"));
        store.create_item(&alice, "alice's", 1)?;
        assert!(store.list_items(&bob)?.is_empty());
        assert_eq!(store.list_items(&alice)?.len(), 1);
        Ok(())
    }

    #[test]
    fn equal_ranks_keep_insertion_order() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let ns = Namespace::for_owner(&OwnerId::new("ties"));
        store.create_item(&ns, "late", 5)?;
        store.create_item(&ns, "first-two", 2)?;
        store.create_item(&ns, "second-two", 2)?;
        let texts: Vec<String> = store.list_items(&ns)?.into_iter().map(|i| i.text).collect();
        assert_eq!(texts, vec!["first-two", "second-two", "late"]);
        Ok(())
    }

    #[test]
    fn injected_fault_fires_once_on_the_nth_call() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let ns = Namespace::for_owner(&OwnerId::new("faults"));
        store.fail_nth(StoreOp::List, 2);
        store.list_items(&ns)?;
        assert_matches!(
            store.list_items(&ns),
            Err(StoreError::Unavailable { op: StoreOp::List, .. })
        );
        store.list_items(&ns)?;
        assert_eq!(store.count_calls(StoreOp::List), 3);
        Ok(())
    }

    #[test]
    fn updating_a_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let ns = Namespace::for_owner(&OwnerId::new("missing"));
        assert_matches!(
            store.update_fields(&ns, &ItemId::from("nope"), &FieldUpdate::done(true)),
            Err(StoreError::NotFound { .. })
        );
    }

    #[test]
    fn offline_store_rejects_everything() {
        let store = MemoryStore::new();
        let ns = Namespace::for_owner(&OwnerId::new("offline"));
        store.set_offline(true);
        assert_matches!(
            store.create_item(&ns, "x", 1),
            Err(StoreError::Unavailable { op: StoreOp::Create, .. })
        );
        assert_matches!(store.delete_item(&ns, &ItemId::from("x")), Err(_));
    }
}

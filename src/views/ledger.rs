use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::domain::{ContentKind, ItemId};

/// What kind of item a view was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewTarget {
    Content(ContentKind),
    Story,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub target: ViewTarget,
    pub id: ItemId,
}

impl ViewKey {
    pub fn content(kind: ContentKind, id: ItemId) -> Self {
        Self {
            target: ViewTarget::Content(kind),
            id,
        }
    }

    pub fn story(id: ItemId) -> Self {
        Self {
            target: ViewTarget::Story,
            id,
        }
    }
}

/// Session-scoped set of items already viewed. Never persisted.
#[derive(Debug, Default)]
pub struct ViewLedger {
    seen: Mutex<HashSet<ViewKey>>,
}

impl ViewLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the set consistent, so a poisoned lock
    // is still safe to use.
    fn seen(&self) -> MutexGuard<'_, HashSet<ViewKey>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks `key` as viewed. Returns true only the first time a key is seen
    /// in this session; the caller performs the view side effect only then.
    pub fn mark(&self, key: ViewKey) -> bool {
        self.seen().insert(key)
    }

    pub fn contains(&self, key: &ViewKey) -> bool {
        self.seen().contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen().is_empty()
    }

    pub fn clear(&self) {
        self.seen().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let ledger = ViewLedger::new();
        let key = ViewKey::story("s1".into());

        assert!(ledger.mark(key.clone()));
        assert!(!ledger.mark(key.clone()));
        assert!(ledger.contains(&key));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_targets_do_not_collide() {
        let ledger = ViewLedger::new();
        assert!(ledger.mark(ViewKey::content(ContentKind::Post, "x".into())));
        assert!(ledger.mark(ViewKey::content(ContentKind::Reel, "x".into())));
        assert!(ledger.mark(ViewKey::story("x".into())));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_clear() {
        let ledger = ViewLedger::new();
        let key = ViewKey::story("s1".into());
        ledger.mark(key.clone());
        ledger.clear();

        assert!(ledger.is_empty());
        assert!(ledger.mark(key));
    }
}

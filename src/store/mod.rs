//! Optimistic engagement state for posts and reels.
//!
//! [`ContentItemStore`] is the only owner of mutable engagement state. A
//! toggle is applied locally the moment it is called; the returned future
//! issues the network call and then commits or rolls back that one
//! mutation record.

mod mutation;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::app::Result;
use crate::domain::{ContentItem, ContentKind, Engagement, ItemId};
use crate::source::{BookmarkApi, LikeApi, ViewApi};
use crate::views::{ViewKey, ViewLedger};

pub use mutation::{Action, Delta, Field, MutationId, MutationOutcome, MutationRecord, Resolution};

use mutation::Entry;

/// A mutation applied locally whose network call has not been issued yet.
struct Staged {
    item_id: ItemId,
    kind: ContentKind,
    record: MutationRecord,
}

/// Owns a staged mutation until it settles. An unsettled mutation is rolled
/// back on drop so an abandoned toggle can't block the ones behind it.
struct PendingGuard<'a> {
    store: &'a ContentItemStore,
    staged: Staged,
    settled: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let staged = &self.staged;
        debug!(
            "Abandoned {} on {}, rolling back",
            staged.record.applied.field.action(staged.record.applied.target),
            staged.item_id
        );
        if let Some(entry) = self.store.entries().get_mut(&staged.item_id) {
            entry.rollback(staged.record.id);
        }
    }
}

pub struct ContentItemStore {
    entries: Mutex<HashMap<ItemId, Entry>>,
    next_mutation: AtomicU64,
    likes: Arc<dyn LikeApi + Send + Sync>,
    bookmarks: Arc<dyn BookmarkApi + Send + Sync>,
    views: Arc<dyn ViewApi + Send + Sync>,
    ledger: Arc<ViewLedger>,
}

impl ContentItemStore {
    pub fn new(
        likes: Arc<dyn LikeApi + Send + Sync>,
        bookmarks: Arc<dyn BookmarkApi + Send + Sync>,
        views: Arc<dyn ViewApi + Send + Sync>,
        ledger: Arc<ViewLedger>,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_mutation: AtomicU64::new(1),
            likes,
            bookmarks,
            views,
            ledger,
        }
    }

    // The lock is never held across an await and every critical section
    // leaves entries consistent, so a poisoned lock is still usable.
    fn entries(&self) -> MutexGuard<'_, HashMap<ItemId, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert fetched items, or reconcile them with server state if already
    /// held. Pending mutations stay applied on top of the fresh state.
    pub fn hydrate<I>(&self, items: I)
    where
        I: IntoIterator<Item = ContentItem>,
    {
        let mut entries = self.entries();
        for item in items {
            match entries.get_mut(&item.id) {
                Some(entry) => entry.reconcile(item),
                None => {
                    entries.insert(item.id.clone(), Entry::new(item));
                }
            }
        }
    }

    /// Current visible state of an item.
    pub fn get(&self, id: &ItemId) -> Option<ContentItem> {
        self.entries().get(id).map(Entry::snapshot)
    }

    pub fn engagement(&self, id: &ItemId) -> Option<Engagement> {
        self.entries().get(id).map(|entry| entry.visible)
    }

    pub fn pending_mutations(&self, id: &ItemId) -> usize {
        self.entries().get(id).map_or(0, |entry| entry.pending.len())
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Evict everything outside `visible`. Items with a mutation in flight
    /// are kept until it settles.
    pub fn retain(&self, visible: &HashSet<ItemId>) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|id, entry| visible.contains(id) || !entry.pending.is_empty());
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("Evicted {} items from the store", evicted);
        }
        evicted
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn toggle_like<'a>(
        &'a self,
        id: &ItemId,
    ) -> impl Future<Output = MutationOutcome> + Send + 'a {
        self.toggle(id, Field::Like)
    }

    pub fn toggle_bookmark<'a>(
        &'a self,
        id: &ItemId,
    ) -> impl Future<Output = MutationOutcome> + Send + 'a {
        self.toggle(id, Field::Bookmark)
    }

    /// Applies the toggle now, against the current (possibly optimistic)
    /// state. Awaiting the returned future issues the network call and
    /// settles this mutation only. Dropping the future before it settles
    /// rolls the mutation back.
    fn toggle<'a>(
        &'a self,
        id: &ItemId,
        field: Field,
    ) -> impl Future<Output = MutationOutcome> + Send + 'a {
        let guard = self.stage(id, field).map(|staged| PendingGuard {
            store: self,
            staged,
            settled: false,
        });

        async move {
            let mut guard = match guard {
                Ok(guard) => guard,
                Err(outcome) => return outcome,
            };
            let result = self.dispatch(&guard.staged).await;
            guard.settled = true;
            self.settle(&guard.staged, result)
        }
    }

    fn stage(&self, id: &ItemId, field: Field) -> std::result::Result<Staged, MutationOutcome> {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(id) else {
            // Target is unknown until we can read the flag; report the "on" action
            return Err(MutationOutcome::not_found(id, field.action(true)));
        };

        let mutation_id = self.next_mutation.fetch_add(1, Ordering::Relaxed);
        let record = entry.stage(mutation_id, field);
        debug!(
            "Applied optimistic {} to {} {}",
            field.action(record.applied.target),
            entry.base.kind,
            id
        );

        Ok(Staged {
            item_id: id.clone(),
            kind: entry.base.kind,
            record,
        })
    }

    async fn dispatch(&self, staged: &Staged) -> Result<()> {
        let (kind, id) = (staged.kind, &staged.item_id);
        match staged.record.applied.field.action(staged.record.applied.target) {
            Action::Like => self.likes.like(kind, id).await,
            Action::Unlike => self.likes.unlike(kind, id).await,
            Action::Save => self.bookmarks.save(kind, id).await,
            Action::Unsave => self.bookmarks.unsave(kind, id).await,
            Action::View => self.views.record_view(kind, id).await,
        }
    }

    fn settle(&self, staged: &Staged, result: Result<()>) -> MutationOutcome {
        let action = staged
            .record
            .applied
            .field
            .action(staged.record.applied.target);
        let mut entries = self.entries();
        let entry = entries.get_mut(&staged.item_id);

        let (resolution, error) = match result {
            Ok(()) => {
                if let Some(entry) = entry {
                    entry.commit(staged.record.id);
                }
                (Resolution::Confirmed, None)
            }
            Err(e) => {
                warn!(
                    "Failed to {} {} {}, rolling back: {}",
                    action, staged.kind, staged.item_id, e
                );
                if let Some(entry) = entry {
                    entry.rollback(staged.record.id);
                }
                (Resolution::RolledBack, Some(e))
            }
        };

        MutationOutcome {
            engagement: entries.get(&staged.item_id).map(|entry| entry.visible),
            previous: Some(staged.record.previous),
            item_id: staged.item_id.clone(),
            kind: Some(staged.kind),
            action,
            resolution,
            error,
        }
    }

    /// Records a view at most once per session. The counter bump is
    /// optimistic and stays even if the call fails.
    pub fn record_view<'a>(
        &'a self,
        id: &ItemId,
    ) -> impl Future<Output = MutationOutcome> + Send + 'a {
        let staged = self.stage_view(id);

        async move {
            let (item_id, kind, previous) = match staged {
                Ok(staged) => staged,
                Err(outcome) => return outcome,
            };

            let (resolution, error) = match self.views.record_view(kind, &item_id).await {
                Ok(()) => (Resolution::Confirmed, None),
                Err(e) => {
                    warn!("Failed to record view for {} {}: {}", kind, item_id, e);
                    (Resolution::Kept, Some(e))
                }
            };

            MutationOutcome {
                engagement: self.engagement(&item_id),
                previous: Some(previous),
                item_id,
                kind: Some(kind),
                action: Action::View,
                resolution,
                error,
            }
        }
    }

    fn stage_view(
        &self,
        id: &ItemId,
    ) -> std::result::Result<(ItemId, ContentKind, Engagement), MutationOutcome> {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(id) else {
            return Err(MutationOutcome::not_found(id, Action::View));
        };

        let kind = entry.base.kind;
        if !self.ledger.mark(ViewKey::content(kind, id.clone())) {
            return Err(MutationOutcome {
                item_id: id.clone(),
                kind: Some(kind),
                action: Action::View,
                resolution: Resolution::AlreadyViewed,
                engagement: Some(entry.visible),
                previous: None,
                error: None,
            });
        }

        let previous = entry.visible;
        entry.bump_views();
        Ok((id.clone(), kind, previous))
    }

    /// Record views for every item that just became visible.
    pub async fn record_views(&self, ids: &[ItemId]) -> Vec<MutationOutcome> {
        join_all(ids.iter().map(|id| self.record_view(id))).await
    }
}

use std::fmt;

use crate::app::EddyError;
use crate::domain::{ContentItem, ContentKind, Engagement, ItemId};

pub type MutationId = u64;

/// Engagement field a toggle operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Like,
    Bookmark,
}

impl Field {
    fn flag(self, e: &Engagement) -> bool {
        match self {
            Field::Like => e.is_liked,
            Field::Bookmark => e.is_bookmarked,
        }
    }

    fn set_flag(self, e: &mut Engagement, value: bool) {
        match self {
            Field::Like => e.is_liked = value,
            Field::Bookmark => e.is_bookmarked = value,
        }
    }

    /// The counter that moves with the flag, if any.
    fn counter(self, e: &mut Engagement) -> Option<&mut u64> {
        match self {
            Field::Like => Some(&mut e.like_count),
            Field::Bookmark => None,
        }
    }

    pub(crate) fn action(self, target: bool) -> Action {
        match (self, target) {
            (Field::Like, true) => Action::Like,
            (Field::Like, false) => Action::Unlike,
            (Field::Bookmark, true) => Action::Save,
            (Field::Bookmark, false) => Action::Unsave,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Like,
    Unlike,
    Save,
    Unsave,
    View,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Like => "like",
            Action::Unlike => "unlike",
            Action::Save => "save",
            Action::Unsave => "unsave",
            Action::View => "view",
        };
        f.write_str(s)
    }
}

/// The change one toggle made: drive `field` to `target`, moving the
/// counter by `count_delta` when the flag actually flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub field: Field,
    pub target: bool,
    pub count_delta: i64,
}

impl Delta {
    /// Delta that flips `field` relative to `current`.
    pub fn toggle(field: Field, current: &Engagement) -> Self {
        let target = !field.flag(current);
        let count_delta = match field {
            Field::Like if target => 1,
            Field::Like => -1,
            Field::Bookmark => 0,
        };
        Self {
            field,
            target,
            count_delta,
        }
    }

    /// Drives the flag to `target` and moves its counter by `count_delta`.
    /// A flag already at `target` is left alone together with its counter,
    /// so replaying a delta over a state that no longer matches its origin
    /// can't break the flag/counter pairing.
    pub fn apply(&self, e: &mut Engagement) {
        if self.field.flag(e) == self.target {
            return;
        }
        self.field.set_flag(e, self.target);
        if let Some(counter) = self.field.counter(e) {
            *counter = counter.saturating_add_signed(self.count_delta);
        }
    }
}

/// A pending optimistic mutation, captured before its network call.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub id: MutationId,
    pub previous: Engagement,
    pub applied: Delta,
    confirmed: bool,
}

impl MutationRecord {
    pub fn new(id: MutationId, previous: Engagement, applied: Delta) -> Self {
        Self {
            id,
            previous,
            applied,
            confirmed: false,
        }
    }
}

/// Per-item state: last known server state plus pending mutations in
/// call order. The visible state is always `base` with `pending` replayed.
#[derive(Debug)]
pub(crate) struct Entry {
    pub base: ContentItem,
    pub visible: Engagement,
    pub pending: Vec<MutationRecord>,
}

impl Entry {
    pub fn new(item: ContentItem) -> Self {
        Self {
            visible: item.engagement,
            base: item,
            pending: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ContentItem {
        let mut item = self.base.clone();
        item.engagement = self.visible;
        item
    }

    /// Replaces the server state, keeping in-flight mutations on top.
    pub fn reconcile(&mut self, fresh: ContentItem) {
        self.base = fresh;
        self.rebuild();
    }

    pub fn stage(&mut self, id: MutationId, field: Field) -> MutationRecord {
        let previous = self.visible;
        let delta = Delta::toggle(field, &previous);
        let record = MutationRecord::new(id, previous, delta);
        delta.apply(&mut self.visible);
        self.pending.push(record.clone());
        record
    }

    /// Marks a mutation as accepted by the server. Confirmed mutations at the
    /// head of the queue are folded into `base`; a confirmed mutation behind
    /// a still-pending one waits so call order is preserved.
    pub fn commit(&mut self, id: MutationId) {
        if let Some(record) = self.pending.iter_mut().find(|r| r.id == id) {
            record.confirmed = true;
        }
        while self.pending.first().is_some_and(|r| r.confirmed) {
            let record = self.pending.remove(0);
            record.applied.apply(&mut self.base.engagement);
        }
        self.rebuild();
    }

    /// Drops a failed mutation and rebuilds the visible state from the
    /// remaining ones. Returns false if the mutation was not pending.
    pub fn rollback(&mut self, id: MutationId) -> bool {
        let Some(pos) = self.pending.iter().position(|r| r.id == id) else {
            return false;
        };
        self.pending.remove(pos);
        while self.pending.first().is_some_and(|r| r.confirmed) {
            let record = self.pending.remove(0);
            record.applied.apply(&mut self.base.engagement);
        }
        self.rebuild();
        true
    }

    /// Best-effort counter bump, never rolled back.
    pub fn bump_views(&mut self) {
        self.base.engagement.view_count = self.base.engagement.view_count.saturating_add(1);
        self.visible.view_count = self.visible.view_count.saturating_add(1);
    }

    fn rebuild(&mut self) {
        let mut engagement = self.base.engagement;
        for record in &self.pending {
            record.applied.apply(&mut engagement);
        }
        self.visible = engagement;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The server accepted the change
    Confirmed,
    /// The server rejected the change and it was reverted locally
    RolledBack,
    /// The call failed but the local change stands (best-effort telemetry)
    Kept,
    /// Nothing to do: the item was already viewed this session
    AlreadyViewed,
    /// The item is not in the store
    NotFound,
}

/// What happened to one mutation. Never an `Err`: failures are reported
/// here for the UI to show, not propagated.
#[derive(Debug)]
pub struct MutationOutcome {
    pub item_id: ItemId,
    pub kind: Option<ContentKind>,
    pub action: Action,
    pub resolution: Resolution,
    /// Visible engagement once the mutation settled, if the item is still held
    pub engagement: Option<Engagement>,
    /// Visible engagement right before the mutation was applied
    pub previous: Option<Engagement>,
    pub error: Option<EddyError>,
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn not_found(item_id: &ItemId, action: Action) -> Self {
        Self {
            item_id: item_id.clone(),
            kind: None,
            action,
            resolution: Resolution::NotFound,
            engagement: None,
            previous: None,
            error: Some(EddyError::ItemNotFound(item_id.to_string())),
        }
    }
}

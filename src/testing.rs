//! Scripted collaborator fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::oneshot;

use crate::app::{EddyError, Result};
use crate::domain::{ContentItem, ContentKind, ItemId, OwnerRef, Story};
use crate::source::{
    BookmarkApi, LikeApi, PostBatch, PostSource, ReelSource, StorySource, StoryViewApi, ViewApi,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchFeed(u32),
    FetchSuggested,
    FetchPopular(u32),
    Like(ItemId),
    Unlike(ItemId),
    Save(ItemId),
    Unsave(ItemId),
    View(ItemId),
    ViewStory(ItemId),
}

/// In-memory backend. Every call is recorded; outcomes are scripted.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    /// Queued feed pages, popped one per call. `None` fails the call.
    feed_pages: Mutex<VecDeque<Option<PostBatch>>>,
    /// Held by the next feed call until the sender fires.
    feed_gate: Mutex<Option<oneshot::Receiver<()>>>,
    stories: Mutex<Option<Vec<Story>>>,
    reels: Mutex<Option<Vec<ContentItem>>>,
    /// Queued like/unlike outcomes; an empty queue succeeds.
    like_results: Mutex<VecDeque<bool>>,
    bookmark_results: Mutex<VecDeque<bool>>,
    fail_views: AtomicBool,
    fail_story_views: AtomicBool,
}

fn failure(what: &str) -> EddyError {
    EddyError::Api {
        status: 500,
        message: format!("{} failed", what),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            stories: Mutex::new(Some(Vec::new())),
            reels: Mutex::new(Some(Vec::new())),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn push_feed_page(&self, items: Vec<ContentItem>, has_more: bool) {
        self.feed_pages
            .lock()
            .unwrap()
            .push_back(Some(PostBatch { items, has_more }));
    }

    pub fn push_feed_failure(&self) {
        self.feed_pages.lock().unwrap().push_back(None);
    }

    /// Holds the next feed call until the returned sender fires (or drops).
    pub fn hold_next_feed(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.feed_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn set_stories(&self, stories: Option<Vec<Story>>) {
        *self.stories.lock().unwrap() = stories;
    }

    pub fn set_reels(&self, reels: Option<Vec<ContentItem>>) {
        *self.reels.lock().unwrap() = reels;
    }

    pub fn push_like_results(&self, results: &[bool]) {
        self.like_results.lock().unwrap().extend(results);
    }

    pub fn push_bookmark_results(&self, results: &[bool]) {
        self.bookmark_results.lock().unwrap().extend(results);
    }

    pub fn fail_views(&self, fail: bool) {
        self.fail_views.store(fail, Ordering::SeqCst);
    }

    pub fn fail_story_views(&self, fail: bool) {
        self.fail_story_views.store(fail, Ordering::SeqCst);
    }

    fn scripted(queue: &Mutex<VecDeque<bool>>, what: &str) -> Result<()> {
        match queue.lock().unwrap().pop_front() {
            Some(false) => Err(failure(what)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PostSource for FakeBackend {
    async fn fetch_feed(&self, page: u32, _page_size: usize) -> Result<PostBatch> {
        self.record(Call::FetchFeed(page));
        let scripted = self.feed_pages.lock().unwrap().pop_front();
        let gate = self.feed_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match scripted {
            Some(Some(batch)) => Ok(batch),
            Some(None) => Err(failure("feed")),
            None => Ok(PostBatch::default()),
        }
    }
}

#[async_trait]
impl StorySource for FakeBackend {
    async fn fetch_suggested(&self) -> Result<Vec<Story>> {
        self.record(Call::FetchSuggested);
        self.stories
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| failure("stories"))
    }
}

#[async_trait]
impl ReelSource for FakeBackend {
    async fn fetch_popular(&self, page: u32, _page_size: usize) -> Result<Vec<ContentItem>> {
        self.record(Call::FetchPopular(page));
        self.reels
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| failure("reels"))
    }
}

#[async_trait]
impl LikeApi for FakeBackend {
    async fn like(&self, _kind: ContentKind, id: &ItemId) -> Result<()> {
        self.record(Call::Like(id.clone()));
        Self::scripted(&self.like_results, "like")
    }

    async fn unlike(&self, _kind: ContentKind, id: &ItemId) -> Result<()> {
        self.record(Call::Unlike(id.clone()));
        Self::scripted(&self.like_results, "unlike")
    }
}

#[async_trait]
impl BookmarkApi for FakeBackend {
    async fn save(&self, _kind: ContentKind, id: &ItemId) -> Result<()> {
        self.record(Call::Save(id.clone()));
        Self::scripted(&self.bookmark_results, "save")
    }

    async fn unsave(&self, _kind: ContentKind, id: &ItemId) -> Result<()> {
        self.record(Call::Unsave(id.clone()));
        Self::scripted(&self.bookmark_results, "unsave")
    }
}

#[async_trait]
impl ViewApi for FakeBackend {
    async fn record_view(&self, _kind: ContentKind, id: &ItemId) -> Result<()> {
        self.record(Call::View(id.clone()));
        if self.fail_views.load(Ordering::SeqCst) {
            return Err(failure("view"));
        }
        Ok(())
    }
}

#[async_trait]
impl StoryViewApi for FakeBackend {
    async fn view_story(&self, id: &ItemId) -> Result<()> {
        self.record(Call::ViewStory(id.clone()));
        if self.fail_story_views.load(Ordering::SeqCst) {
            return Err(failure("story view"));
        }
        Ok(())
    }
}

pub fn owner(user_id: &str) -> OwnerRef {
    OwnerRef {
        user_id: user_id.to_string(),
        username: None,
    }
}

pub fn post(id: &str) -> ContentItem {
    let mut item = ContentItem::new(id, ContentKind::Post, owner("author"));
    item.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    item
}

pub fn reel(id: &str, likes: u64, views: u64, comments: u64) -> ContentItem {
    let mut item = ContentItem::new(id, ContentKind::Reel, owner("author"));
    item.engagement.like_count = likes;
    item.engagement.view_count = views;
    item.engagement.comment_count = comments;
    item
}

pub fn story(id: &str) -> Story {
    Story::new(id, owner("author"))
}

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::{EddyError, Result};
use crate::domain::{ContentItem, Cursor, FeedPage, ItemId, Story};
use crate::feed::ranking::rank_reels;
use crate::source::{PostBatch, PostSource, ReelSource, StorySource};
use crate::store::ContentItemStore;
use crate::views::{ViewKey, ViewLedger};

/// Result of a composition or page load that may have been overtaken by a
/// newer refresh while it was in flight.
#[derive(Debug)]
pub enum FeedUpdate<T> {
    Applied(T),
    /// A refresh started after this request did; its result was dropped
    Discarded,
}

impl<T> FeedUpdate<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            FeedUpdate::Applied(value) => Some(value),
            FeedUpdate::Discarded => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposedFeed {
    /// First page of posts, in source order
    pub page: FeedPage,
    /// Popular reels ranked by popularity score
    pub reels: Vec<ItemId>,
    /// Suggested stories in source order
    pub stories: Vec<Story>,
    /// Sources that failed and were treated as empty
    pub failed_sources: Vec<&'static str>,
}

#[derive(Debug)]
struct FeedState {
    /// Generation of the composition currently installed
    generation: u64,
    page_size: usize,
    posts: Vec<ItemId>,
    reels: Vec<ItemId>,
    stories: Vec<Story>,
    seen: HashSet<ItemId>,
    cursor: Cursor,
    has_more: bool,
}

pub struct FeedComposer {
    posts: Arc<dyn PostSource + Send + Sync>,
    stories: Arc<dyn StorySource + Send + Sync>,
    reels: Arc<dyn ReelSource + Send + Sync>,
    store: Arc<ContentItemStore>,
    ledger: Arc<ViewLedger>,
    /// Generation of the most recently started composition
    started: AtomicU64,
    state: Mutex<FeedState>,
}

fn degrade<T: Default>(
    name: &'static str,
    result: Result<T>,
    failed: &mut Vec<&'static str>,
    errors: &mut Vec<String>,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to fetch {}, treating as empty: {}", name, e);
            failed.push(name);
            errors.push(format!("{}: {}", name, e));
            T::default()
        }
    }
}

/// Drops items whose id is already in `seen`, recording the rest.
fn dedup_items(items: Vec<ContentItem>, seen: &mut HashSet<ItemId>) -> Vec<ContentItem> {
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.id.clone());
            if !fresh {
                debug!("Dropping duplicate item {}", item.id);
            }
            fresh
        })
        .collect()
}

impl FeedComposer {
    pub fn new(
        posts: Arc<dyn PostSource + Send + Sync>,
        stories: Arc<dyn StorySource + Send + Sync>,
        reels: Arc<dyn ReelSource + Send + Sync>,
        store: Arc<ContentItemStore>,
        ledger: Arc<ViewLedger>,
        page_size: usize,
    ) -> Self {
        Self {
            posts,
            stories,
            reels,
            store,
            ledger,
            started: AtomicU64::new(0),
            state: Mutex::new(FeedState {
                generation: 0,
                page_size,
                posts: Vec::new(),
                reels: Vec::new(),
                stories: Vec::new(),
                seen: HashSet::new(),
                cursor: Cursor::first(),
                has_more: false,
            }),
        }
    }

    // Only plain data sits behind this lock, so a poisoned guard is usable.
    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch page one of posts, suggested stories and popular reels
    /// concurrently and install the result as the current feed.
    ///
    /// A failing source degrades to empty. Only when all three fail is an
    /// [`EddyError::ContentUnavailable`] returned.
    pub async fn compose_initial_feed(&self, page_size: usize) -> Result<FeedUpdate<ComposedFeed>> {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Starting feed composition #{}", generation);

        let (posts, stories, reels) = tokio::join!(
            self.posts.fetch_feed(1, page_size),
            self.stories.fetch_suggested(),
            self.reels.fetch_popular(1, page_size),
        );

        if self.started.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale feed composition #{}", generation);
            return Ok(FeedUpdate::Discarded);
        }

        let mut failed = Vec::new();
        let mut errors = Vec::new();
        let posts: PostBatch = degrade("posts", posts, &mut failed, &mut errors);
        let stories: Vec<Story> = degrade("stories", stories, &mut failed, &mut errors);
        let mut reels: Vec<ContentItem> = degrade("reels", reels, &mut failed, &mut errors);

        if failed.len() == 3 {
            let mut state = self.state();
            // Settle this generation without touching the lists, so the
            // previous feed stays paginable
            if self.started.load(Ordering::SeqCst) == generation {
                state.generation = generation;
            }
            return Err(EddyError::ContentUnavailable(errors));
        }

        let mut seen = HashSet::new();
        let post_items = dedup_items(posts.items, &mut seen);
        let post_ids: Vec<ItemId> = post_items.iter().map(|item| item.id.clone()).collect();

        // Reels live on their own tab and don't count against post pagination
        let mut reel_seen = HashSet::new();
        reels = dedup_items(reels, &mut reel_seen);
        rank_reels(&mut reels);
        let reel_ids: Vec<ItemId> = reels.iter().map(|item| item.id.clone()).collect();

        let stories = self.prepare_stories(stories);

        let mut state = self.state();
        // A newer composition may have started while the lists were built
        if self.started.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale feed composition #{}", generation);
            return Ok(FeedUpdate::Discarded);
        }

        let visible: HashSet<ItemId> = post_ids.iter().chain(reel_ids.iter()).cloned().collect();
        self.store.hydrate(post_items.into_iter().chain(reels));
        self.store.retain(&visible);

        let page = FeedPage {
            items: post_ids.clone(),
            cursor: Cursor::after(1),
            has_more: posts.has_more,
        };

        *state = FeedState {
            generation,
            page_size,
            posts: post_ids,
            reels: reel_ids.clone(),
            stories: stories.clone(),
            seen,
            cursor: page.cursor,
            has_more: page.has_more,
        };

        info!(
            "Composed feed: {} posts, {} reels, {} stories ({} sources failed)",
            state.posts.len(),
            state.reels.len(),
            state.stories.len(),
            failed.len()
        );

        Ok(FeedUpdate::Applied(ComposedFeed {
            page,
            reels: reel_ids,
            stories,
            failed_sources: failed,
        }))
    }

    /// Recompose from page one with the current page size, replacing every
    /// list. Results of refreshes started earlier are discarded when they
    /// resolve.
    pub async fn refresh(&self) -> Result<FeedUpdate<ComposedFeed>> {
        let page_size = self.state().page_size;
        self.compose_initial_feed(page_size).await
    }

    /// Fetch the next page of posts and append the ids not yet seen in this
    /// session. Returns an empty page without a network call once the source
    /// reports no more pages.
    pub async fn load_more(&self) -> Result<FeedUpdate<FeedPage>> {
        let (generation, cursor, page_size) = {
            let state = self.state();
            if state.generation != self.started.load(Ordering::SeqCst) {
                debug!("Refresh in flight, not loading more");
                return Ok(FeedUpdate::Discarded);
            }
            if !state.has_more {
                return Ok(FeedUpdate::Applied(FeedPage::empty(state.cursor)));
            }
            (state.generation, state.cursor, state.page_size)
        };

        let batch = self
            .posts
            .fetch_feed(cursor.page(), page_size)
            .await
            .map_err(|e| {
                warn!("Failed to load page {} of posts: {}", cursor.page(), e);
                EddyError::SourceFetch {
                    source_name: "posts",
                    message: e.to_string(),
                }
            })?;

        let mut state = self.state();
        if state.generation != generation || self.started.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale page {}", cursor.page());
            return Ok(FeedUpdate::Discarded);
        }

        let items = dedup_items(batch.items, &mut state.seen);
        let ids: Vec<ItemId> = items.iter().map(|item| item.id.clone()).collect();
        self.store.hydrate(items);

        state.posts.extend(ids.iter().cloned());
        state.cursor = Cursor::after(cursor.page());
        state.has_more = batch.has_more;

        debug!("Loaded {} posts from page {}", ids.len(), cursor.page());

        Ok(FeedUpdate::Applied(FeedPage {
            items: ids,
            cursor: state.cursor,
            has_more: state.has_more,
        }))
    }

    fn prepare_stories(&self, stories: Vec<Story>) -> Vec<Story> {
        let now = Utc::now();
        let mut seen = HashSet::new();

        stories
            .into_iter()
            .filter(|story| {
                if story.is_expired(now) {
                    debug!("Dropping expired story {}", story.id);
                    return false;
                }
                seen.insert(story.id.clone())
            })
            .map(|mut story| {
                story.seen = story.is_viewed || self.ledger.contains(&ViewKey::story(story.id.clone()));
                story
            })
            .collect()
    }

    pub fn posts(&self) -> Vec<ItemId> {
        self.state().posts.clone()
    }

    pub fn reels(&self) -> Vec<ItemId> {
        self.state().reels.clone()
    }

    pub fn stories(&self) -> Vec<Story> {
        self.state().stories.clone()
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more
    }

    pub fn cursor(&self) -> Cursor {
        self.state().cursor
    }

    pub fn store(&self) -> &Arc<ContentItemStore> {
        &self.store
    }
}

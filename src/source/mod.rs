pub mod http;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{ContentItem, ContentKind, ItemId, Story};

pub use http::HttpBackend;

/// One page of the post feed as returned by the backend.
#[derive(Debug, Clone, Default)]
pub struct PostBatch {
    pub items: Vec<ContentItem>,
    pub has_more: bool,
}

#[async_trait]
pub trait PostSource {
    async fn fetch_feed(&self, page: u32, page_size: usize) -> Result<PostBatch>;
}

#[async_trait]
pub trait StorySource {
    async fn fetch_suggested(&self) -> Result<Vec<Story>>;
}

#[async_trait]
pub trait ReelSource {
    async fn fetch_popular(&self, page: u32, page_size: usize) -> Result<Vec<ContentItem>>;
}

#[async_trait]
pub trait LikeApi {
    async fn like(&self, kind: ContentKind, id: &ItemId) -> Result<()>;
    async fn unlike(&self, kind: ContentKind, id: &ItemId) -> Result<()>;
}

#[async_trait]
pub trait BookmarkApi {
    async fn save(&self, kind: ContentKind, id: &ItemId) -> Result<()>;
    async fn unsave(&self, kind: ContentKind, id: &ItemId) -> Result<()>;
}

/// Best-effort view telemetry for posts and reels.
#[async_trait]
pub trait ViewApi {
    async fn record_view(&self, kind: ContentKind, id: &ItemId) -> Result<()>;
}

/// Best-effort view telemetry for stories.
#[async_trait]
pub trait StoryViewApi {
    async fn view_story(&self, id: &ItemId) -> Result<()>;
}

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::app::{EddyError, Result, SessionContext};
use crate::config::BackendConfig;
use crate::domain::{ContentItem, ContentKind, ItemId, Story};
use crate::source::{
    BookmarkApi, LikeApi, PostBatch, PostSource, ReelSource, StorySource, StoryViewApi, ViewApi,
};

/// reqwest-backed implementation of every backend collaborator.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedResponse {
    #[serde(alias = "items")]
    posts: Vec<ContentItem>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct StoriesResponse {
    stories: Vec<Story>,
}

#[derive(Debug, Deserialize)]
struct ReelsResponse {
    reels: Vec<ContentItem>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, session: &SessionContext) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .build()?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            auth_token: session.auth_token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EddyError::Config(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn paged_endpoint(&self, segments: &[&str], page: u32, page_size: usize) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &page_size.to_string());
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url) -> Result<Response> {
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EddyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(Method::GET, url).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn toggle(&self, on: bool, kind: ContentKind, id: &ItemId, action: &str) -> Result<()> {
        let method = if on { Method::POST } else { Method::DELETE };
        let url = self.endpoint(&[kind.path_segment(), id.as_str(), action])?;
        self.send(method, url).await?;
        Ok(())
    }
}

#[async_trait]
impl PostSource for HttpBackend {
    async fn fetch_feed(&self, page: u32, page_size: usize) -> Result<PostBatch> {
        let url = self.paged_endpoint(&["posts", "feed"], page, page_size)?;
        let response: FeedResponse = self.get_json(url).await?;

        let items = response
            .posts
            .into_iter()
            .map(|mut item| {
                item.kind = ContentKind::Post;
                item
            })
            .collect();

        Ok(PostBatch {
            items,
            has_more: response.has_more,
        })
    }
}

#[async_trait]
impl StorySource for HttpBackend {
    async fn fetch_suggested(&self) -> Result<Vec<Story>> {
        let url = self.endpoint(&["stories", "suggested"])?;
        let response: StoriesResponse = self.get_json(url).await?;
        Ok(response.stories)
    }
}

#[async_trait]
impl ReelSource for HttpBackend {
    async fn fetch_popular(&self, page: u32, page_size: usize) -> Result<Vec<ContentItem>> {
        let url = self.paged_endpoint(&["reels", "popular"], page, page_size)?;
        let response: ReelsResponse = self.get_json(url).await?;

        Ok(response
            .reels
            .into_iter()
            .map(|mut item| {
                item.kind = ContentKind::Reel;
                item
            })
            .collect())
    }
}

#[async_trait]
impl LikeApi for HttpBackend {
    async fn like(&self, kind: ContentKind, id: &ItemId) -> Result<()> {
        self.toggle(true, kind, id, "like").await
    }

    async fn unlike(&self, kind: ContentKind, id: &ItemId) -> Result<()> {
        self.toggle(false, kind, id, "like").await
    }
}

#[async_trait]
impl BookmarkApi for HttpBackend {
    async fn save(&self, kind: ContentKind, id: &ItemId) -> Result<()> {
        self.toggle(true, kind, id, "save").await
    }

    async fn unsave(&self, kind: ContentKind, id: &ItemId) -> Result<()> {
        self.toggle(false, kind, id, "save").await
    }
}

#[async_trait]
impl ViewApi for HttpBackend {
    async fn record_view(&self, kind: ContentKind, id: &ItemId) -> Result<()> {
        let url = self.endpoint(&[kind.path_segment(), id.as_str(), "view"])?;
        self.send(Method::POST, url).await?;
        Ok(())
    }
}

#[async_trait]
impl StoryViewApi for HttpBackend {
    async fn view_story(&self, id: &ItemId) -> Result<()> {
        let url = self.endpoint(&["stories", id.as_str(), "view"])?;
        self.send(Method::POST, url).await?;
        Ok(())
    }
}

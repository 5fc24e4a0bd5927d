use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::error::Result;
use crate::app::session::SessionContext;
use crate::config::Config;
use crate::feed::FeedComposer;
use crate::playback::StoryPlaybackEngine;
use crate::source::{
    BookmarkApi, HttpBackend, LikeApi, PostSource, ReelSource, StorySource, StoryViewApi, ViewApi,
};
use crate::store::ContentItemStore;
use crate::views::{spawn_view_worker, ViewLedger, ViewRecorder};

/// Everything the backend must provide.
pub trait Backend:
    PostSource
    + StorySource
    + ReelSource
    + LikeApi
    + BookmarkApi
    + ViewApi
    + StoryViewApi
    + Send
    + Sync
    + 'static
{
}

impl<T> Backend for T where
    T: PostSource
        + StorySource
        + ReelSource
        + LikeApi
        + BookmarkApi
        + ViewApi
        + StoryViewApi
        + Send
        + Sync
        + 'static
{
}

pub struct AppContext {
    pub config: Config,
    pub session: SessionContext,
    pub ledger: Arc<ViewLedger>,
    pub store: Arc<ContentItemStore>,
    pub composer: FeedComposer,
    pub recorder: ViewRecorder,
    view_worker: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Wire the engine against the HTTP backend. Must be called inside a
    /// tokio runtime.
    pub fn new(config: Config, session: SessionContext) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(&config.backend, &session)?);
        Ok(Self::with_backend(config, session, backend))
    }

    pub fn with_backend<B: Backend>(config: Config, session: SessionContext, backend: Arc<B>) -> Self {
        let ledger = Arc::new(ViewLedger::new());
        let store = Arc::new(ContentItemStore::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            ledger.clone(),
        ));
        let composer = FeedComposer::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            store.clone(),
            ledger.clone(),
            config.feed.page_size,
        );
        let (recorder, view_worker) = spawn_view_worker(
            ledger.clone(),
            backend,
            config.playback.view_queue_capacity,
        );

        Self {
            config,
            session,
            ledger,
            store,
            composer,
            recorder,
            view_worker: Some(view_worker),
        }
    }

    /// Apply session flags before the first composition. After a fresh
    /// login nothing viewed or cached for a previous user may carry over.
    pub fn start_session(&self) {
        info!(
            "Starting session for {}{}",
            self.session.display_user(),
            if self.session.is_authenticated() { "" } else { " (no token)" }
        );
        if self.session.fresh_login {
            info!("Fresh login, clearing session state");
            self.ledger.clear();
            self.store.clear();
        }
    }

    pub fn story_engine(&self) -> StoryPlaybackEngine {
        StoryPlaybackEngine::new(self.recorder.clone(), self.config.playback.story_duration_ms)
    }

    /// Flush queued story views and stop the view worker.
    pub async fn shutdown(mut self) {
        self.recorder.shutdown().await;
        if let Some(handle) = self.view_worker.take() {
            if let Err(e) = handle.await {
                error!("View worker failed: {}", e);
            }
        }
        info!(
            "Session for {} ended after {}s",
            self.session.display_user(),
            self.session.elapsed(Utc::now()).num_seconds()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemId;
    use crate::testing::{post, story, Call, FakeBackend};
    use crate::views::ViewKey;

    #[tokio::test]
    async fn test_fresh_login_clears_session_state() {
        let backend = Arc::new(FakeBackend::new());
        let session = SessionContext::authenticated("u1", "token").with_fresh_login(true);
        let ctx = AppContext::with_backend(Config::default(), session, backend);

        ctx.store.hydrate([post("p1")]);
        ctx.ledger.mark(ViewKey::story(ItemId::from("s1")));
        ctx.start_session();

        assert!(ctx.store.is_empty());
        assert!(ctx.ledger.is_empty());
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_session_state_kept_without_fresh_login() {
        let backend = Arc::new(FakeBackend::new());
        let ctx = AppContext::with_backend(Config::default(), SessionContext::anonymous(), backend);

        ctx.store.hydrate([post("p1")]);
        ctx.start_session();

        assert_eq!(ctx.store.len(), 1);
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_flushes_story_views() {
        let backend = Arc::new(FakeBackend::new());
        let ctx = AppContext::with_backend(
            Config::default(),
            SessionContext::anonymous(),
            backend.clone(),
        );

        let mut engine = ctx.story_engine();
        engine.open(vec![story("s1"), story("s2")], 0);
        engine.advance();
        drop(engine);
        ctx.shutdown().await;

        assert_eq!(
            backend.calls(),
            vec![Call::ViewStory("s1".into()), Call::ViewStory("s2".into())]
        );
    }
}

use tracing::debug;

use crate::domain::Story;
use crate::views::ViewRecorder;

pub const DEFAULT_STORY_DURATION_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No session has been opened yet
    Idle,
    Playing,
    Paused,
    /// The viewer closed; the session is gone
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Advanced past the last story
    Completed,
    /// Went back from the first story
    RetreatedPastStart,
    UserClosed,
    /// Opened with no stories to show
    Empty,
}

/// What a transition did, for the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Progressed(f64),
    Entered { index: usize },
    Closed(CloseReason),
    /// The transition is not valid in the current state
    Ignored,
}

/// Timed, interruptible playback over one collection of stories.
///
/// Time only moves through [`tick`](Self::tick); whatever schedules ticks
/// (a timer, a frame callback, a test) owns the clock.
pub struct StoryPlaybackEngine {
    stories: Vec<Story>,
    current_index: usize,
    progress: f64,
    state: PlaybackState,
    close_reason: Option<CloseReason>,
    session: u64,
    story_duration_ms: u64,
    recorder: ViewRecorder,
}

impl StoryPlaybackEngine {
    pub fn new(recorder: ViewRecorder, story_duration_ms: u64) -> Self {
        Self {
            stories: Vec::new(),
            current_index: 0,
            progress: 0.0,
            state: PlaybackState::Idle,
            close_reason: None,
            session: 0,
            story_duration_ms: story_duration_ms.max(1),
            recorder,
        }
    }

    /// Start a new session at `start_index` (clamped to the last story).
    /// Any previous session is discarded.
    pub fn open(&mut self, stories: Vec<Story>, start_index: usize) -> PlaybackEvent {
        self.session += 1;
        self.stories = stories;
        self.progress = 0.0;
        self.close_reason = None;

        if self.stories.is_empty() {
            return self.finish(CloseReason::Empty);
        }

        self.state = PlaybackState::Playing;
        self.enter(start_index.min(self.stories.len() - 1))
    }

    pub fn tick(&mut self, delta_ms: u64) -> PlaybackEvent {
        if self.state != PlaybackState::Playing {
            return PlaybackEvent::Ignored;
        }

        self.progress = (self.progress + delta_ms as f64 / self.story_duration_ms as f64).min(1.0);
        if self.progress >= 1.0 {
            return self.advance();
        }
        PlaybackEvent::Progressed(self.progress)
    }

    /// Move to the next story, or close after the last one. Navigating
    /// keeps the session paused if it was.
    pub fn advance(&mut self) -> PlaybackEvent {
        if !self.is_active() {
            return PlaybackEvent::Ignored;
        }
        if self.current_index + 1 >= self.stories.len() {
            return self.finish(CloseReason::Completed);
        }
        self.enter(self.current_index + 1)
    }

    /// Move to the previous story, or close when already on the first.
    pub fn retreat(&mut self) -> PlaybackEvent {
        if !self.is_active() {
            return PlaybackEvent::Ignored;
        }
        if self.current_index == 0 {
            return self.finish(CloseReason::RetreatedPastStart);
        }
        self.enter(self.current_index - 1)
    }

    pub fn jump_to(&mut self, index: usize) -> PlaybackEvent {
        if !self.is_active() || index >= self.stories.len() {
            return PlaybackEvent::Ignored;
        }
        self.enter(index)
    }

    pub fn pause(&mut self) -> PlaybackEvent {
        if self.state != PlaybackState::Playing {
            return PlaybackEvent::Ignored;
        }
        self.state = PlaybackState::Paused;
        PlaybackEvent::Progressed(self.progress)
    }

    pub fn resume(&mut self) -> PlaybackEvent {
        if self.state != PlaybackState::Paused {
            return PlaybackEvent::Ignored;
        }
        self.state = PlaybackState::Playing;
        PlaybackEvent::Progressed(self.progress)
    }

    pub fn close(&mut self) -> PlaybackEvent {
        if !self.is_active() {
            return PlaybackEvent::Ignored;
        }
        self.finish(CloseReason::UserClosed)
    }

    fn enter(&mut self, index: usize) -> PlaybackEvent {
        self.current_index = index;
        self.progress = 0.0;

        let total = self.stories.len();
        let story = &mut self.stories[index];
        story.seen = true;
        // Fire-and-forget; failures are logged by the view worker
        self.recorder.record_once(&story.id);

        debug!("Showing story {} ({}/{})", story.id, index + 1, total);
        PlaybackEvent::Entered { index }
    }

    fn finish(&mut self, reason: CloseReason) -> PlaybackEvent {
        debug!("Story session closed: {:?}", reason);
        self.state = PlaybackState::Finished;
        self.close_reason = Some(reason);
        self.stories.clear();
        self.current_index = 0;
        self.progress = 0.0;
        PlaybackEvent::Closed(reason)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_story(&self) -> Option<&Story> {
        if self.is_active() {
            self.stories.get(self.current_index)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Increments every time a session is opened.
    pub fn session(&self) -> u64 {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::ItemId;
    use crate::testing::{story, Call, FakeBackend};
    use crate::views::{ViewLedger, ViewWorker};

    fn engine() -> (StoryPlaybackEngine, ViewWorker, Arc<FakeBackend>) {
        let backend = Arc::new(FakeBackend::new());
        let (recorder, worker) = ViewRecorder::new(Arc::new(ViewLedger::new()), backend.clone(), 64);
        (StoryPlaybackEngine::new(recorder, 1000), worker, backend)
    }

    fn stories(n: usize) -> Vec<Story> {
        (0..n).map(|i| story(&format!("s{}", i))).collect()
    }

    async fn viewed(engine: StoryPlaybackEngine, worker: ViewWorker, backend: &FakeBackend) -> Vec<Call> {
        drop(engine);
        worker.run().await;
        backend.calls()
    }

    #[test]
    fn test_open_starts_playing() {
        let (mut engine, _worker, _) = engine();
        assert_eq!(engine.state(), PlaybackState::Idle);

        assert_eq!(engine.open(stories(3), 1), PlaybackEvent::Entered { index: 1 });
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.current_index(), 1);
        assert_eq!(engine.progress(), 0.0);
        assert!(engine.current_story().unwrap().seen);
    }

    #[test]
    fn test_open_empty_never_plays() {
        let (mut engine, _worker, _) = engine();
        assert_eq!(engine.open(Vec::new(), 0), PlaybackEvent::Closed(CloseReason::Empty));
        assert_eq!(engine.state(), PlaybackState::Finished);
        assert_eq!(engine.tick(500), PlaybackEvent::Ignored);
    }

    #[test]
    fn test_open_clamps_start_index() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(2), 9);
        assert_eq!(engine.current_index(), 1);
    }

    #[test]
    fn test_tick_advances_progress() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(2), 0);

        assert_eq!(engine.tick(250), PlaybackEvent::Progressed(0.25));
        assert_eq!(engine.tick(250), PlaybackEvent::Progressed(0.5));
        assert_eq!(engine.tick(500), PlaybackEvent::Entered { index: 1 });
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn test_default_story_duration() {
        let (recorder, _worker) = ViewRecorder::new(
            Arc::new(ViewLedger::new()),
            Arc::new(FakeBackend::new()),
            4,
        );
        let mut engine = StoryPlaybackEngine::new(recorder, DEFAULT_STORY_DURATION_MS);
        engine.open(stories(2), 0);

        assert_eq!(engine.tick(4999), PlaybackEvent::Progressed(0.9998));
        assert_eq!(engine.tick(1), PlaybackEvent::Entered { index: 1 });
    }

    #[test]
    fn test_tick_past_last_story_finishes() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(1), 0);

        assert_eq!(engine.tick(1500), PlaybackEvent::Closed(CloseReason::Completed));
        assert_eq!(engine.state(), PlaybackState::Finished);
        assert!(engine.current_story().is_none());
    }

    #[test]
    fn test_advance_at_last_index_closes() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(2), 1);
        assert_eq!(engine.advance(), PlaybackEvent::Closed(CloseReason::Completed));
        assert_eq!(engine.close_reason(), Some(CloseReason::Completed));
    }

    #[test]
    fn test_retreat_at_first_index_closes() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(2), 0);
        assert_eq!(
            engine.retreat(),
            PlaybackEvent::Closed(CloseReason::RetreatedPastStart)
        );
        assert_eq!(engine.state(), PlaybackState::Finished);
    }

    #[test]
    fn test_retreat_resets_progress() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(3), 2);
        engine.tick(400);

        assert_eq!(engine.retreat(), PlaybackEvent::Entered { index: 1 });
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn test_pause_freezes_progress() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(2), 0);
        engine.tick(300);

        engine.pause();
        assert_eq!(engine.state(), PlaybackState::Paused);
        for _ in 0..10 {
            assert_eq!(engine.tick(1000), PlaybackEvent::Ignored);
        }
        assert_eq!(engine.progress(), 0.3);
        assert_eq!(engine.current_index(), 0);

        engine.resume();
        assert_eq!(engine.tick(100), PlaybackEvent::Progressed(0.4));
    }

    #[test]
    fn test_pause_resume_only_in_valid_states() {
        let (mut engine, _worker, _) = engine();
        assert_eq!(engine.pause(), PlaybackEvent::Ignored);
        engine.open(stories(1), 0);
        assert_eq!(engine.resume(), PlaybackEvent::Ignored);
        engine.pause();
        assert_eq!(engine.pause(), PlaybackEvent::Ignored);
    }

    #[test]
    fn test_navigation_while_paused_stays_paused() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(3), 0);
        engine.tick(300);
        engine.pause();

        assert_eq!(engine.advance(), PlaybackEvent::Entered { index: 1 });
        assert_eq!(engine.state(), PlaybackState::Paused);
        assert_eq!(engine.progress(), 0.0);
        assert_eq!(engine.tick(500), PlaybackEvent::Ignored);

        assert_eq!(engine.jump_to(2), PlaybackEvent::Entered { index: 2 });
        assert_eq!(engine.retreat(), PlaybackEvent::Entered { index: 1 });
        assert_eq!(engine.state(), PlaybackState::Paused);

        engine.resume();
        assert_eq!(engine.tick(500), PlaybackEvent::Progressed(0.5));
    }

    #[test]
    fn test_close_and_reopen() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(2), 0);
        let first = engine.session();

        assert_eq!(engine.close(), PlaybackEvent::Closed(CloseReason::UserClosed));
        assert_eq!(engine.close(), PlaybackEvent::Ignored);
        assert_eq!(engine.advance(), PlaybackEvent::Ignored);

        engine.open(stories(1), 0);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert!(engine.session() > first);
        assert_eq!(engine.close_reason(), None);
    }

    #[test]
    fn test_jump_to() {
        let (mut engine, _worker, _) = engine();
        engine.open(stories(4), 0);
        assert_eq!(engine.jump_to(3), PlaybackEvent::Entered { index: 3 });
        assert_eq!(engine.jump_to(4), PlaybackEvent::Ignored);
        assert_eq!(engine.current_index(), 3);
    }

    #[tokio::test]
    async fn test_each_story_viewed_once() {
        let (mut engine, worker, backend) = engine();
        engine.open(stories(2), 0);
        engine.advance();
        engine.retreat();
        engine.pause();
        engine.resume();
        engine.advance();

        let calls = viewed(engine, worker, &backend).await;
        assert_eq!(
            calls,
            vec![
                Call::ViewStory(ItemId::from("s0")),
                Call::ViewStory(ItemId::from("s1")),
            ]
        );
    }

    #[tokio::test]
    async fn test_view_failure_does_not_stall_playback() {
        let (mut engine, worker, backend) = engine();
        backend.fail_story_views(true);

        engine.open(stories(3), 0);
        assert_eq!(engine.tick(1000), PlaybackEvent::Entered { index: 1 });
        assert_eq!(engine.tick(1000), PlaybackEvent::Entered { index: 2 });
        assert_eq!(engine.tick(1000), PlaybackEvent::Closed(CloseReason::Completed));

        let calls = viewed(engine, worker, &backend).await;
        assert_eq!(calls.len(), 3);
    }
}

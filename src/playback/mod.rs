//! Story playback.
//!
//! - [`StoryPlaybackEngine`]: `Idle → Playing ⇄ Paused → Finished` state machine
//! - [`TickDriver`]: interval-based tick source bound to one session

mod driver;
mod engine;

pub use driver::{SharedEngine, TickDriver};
pub use engine::{
    CloseReason, PlaybackEvent, PlaybackState, StoryPlaybackEngine, DEFAULT_STORY_DURATION_MS,
};

//! Feed composition from independent content sources.
//!
//! - [`FeedComposer`]: concurrent fetch of posts, stories and reels with
//!   per-source degradation, pagination and last-writer-wins refresh
//! - [`ranking`]: deterministic popularity ranking for reels

mod composer;
pub mod ranking;

pub use composer::{ComposedFeed, FeedComposer, FeedUpdate};
pub use ranking::{popularity_score, rank_reels};

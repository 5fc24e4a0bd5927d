//! # Eddy
//!
//! Client-side engagement and feed-sync engine for a short-form social feed.
//!
//! ## Architecture
//!
//! ```text
//! Sources → FeedComposer → ContentItemStore → UI
//!                 ↓                ↑
//!            ViewLedger ←── StoryPlaybackEngine
//! ```
//!
//! - [`source`]: Backend traits and the reqwest-based HTTP implementation
//! - [`feed`]: Concurrent composition of posts, stories and reels
//! - [`store`]: Optimistic likes, bookmarks and views with rollback
//! - [`playback`]: Timed story viewer state machine
//! - [`views`]: Once-per-session view ledger
//!
//! ## Quick Start
//!
//! ```bash
//! # Compose the home feed and load two more pages
//! eddy feed --more 2
//!
//! # Like a post
//! eddy --token $TOKEN like post p42
//!
//! # Play suggested stories
//! eddy stories
//! ```

/// Application context, session and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the backend,
/// view ledger, item store, feed composer and story view worker.
pub mod app;

/// Command-line interface using clap.
///
/// - `feed [--page-size N] [--more N]` - Compose and print the feed
/// - `like <kind> <id>` - Toggle a like
/// - `bookmark <kind> <id>` - Toggle a bookmark
/// - `view <kind> <id>` - Record a view
/// - `stories [--start N]` - Play suggested stories
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/eddy/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ContentItem`](domain::ContentItem): Post or reel with engagement
/// - [`Story`](domain::Story): Ephemeral media with an expiry
/// - [`FeedPage`](domain::FeedPage): One page of post ids plus a cursor
pub mod domain;

/// Feed composition and reel ranking.
pub mod feed;

/// Story playback.
///
/// - [`StoryPlaybackEngine`](playback::StoryPlaybackEngine): The state machine
/// - [`TickDriver`](playback::TickDriver): Drives ticks from a tokio interval
pub mod playback;

/// Content sources and engagement endpoints.
///
/// - [`PostSource`](source::PostSource), [`StorySource`](source::StorySource),
///   [`ReelSource`](source::ReelSource): Async read traits
/// - [`HttpBackend`](source::HttpBackend): reqwest-based implementation
pub mod source;

/// Per-item engagement state with optimistic mutations.
pub mod store;

/// View deduplication and background story view reporting.
pub mod views;

#[cfg(test)]
mod testing;

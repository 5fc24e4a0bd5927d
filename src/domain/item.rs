use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-issued identifier of a post, reel or story.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Post,
    Reel,
}

impl ContentKind {
    /// Path segment used by the backend for this kind of content.
    pub fn path_segment(self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Reel => "reels",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Post => f.write_str("post"),
            ContentKind::Reel => f.write_str("reel"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "post" | "posts" => Ok(ContentKind::Post),
            "reel" | "reels" => Ok(ContentKind::Reel),
            other => Err(format!("Unknown content kind: {}. Use 'post' or 'reel'", other)),
        }
    }
}

/// Lookup-only reference to the author of a piece of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl OwnerRef {
    /// Username if known, otherwise the user id.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.user_id)
    }
}

/// User-relative engagement state of a single item.
///
/// `is_liked`/`like_count` are only ever changed together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ItemId,
    #[serde(default)]
    pub kind: ContentKind,
    pub owner: OwnerRef,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(flatten)]
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(id: impl Into<ItemId>, kind: ContentKind, owner: OwnerRef) -> Self {
        Self {
            id: id.into(),
            kind,
            owner,
            caption: None,
            media_url: None,
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    pub fn display_caption(&self) -> &str {
        self.caption.as_deref().unwrap_or("(no caption)")
    }

    /// Likes and comments per hundred views, from the counters as they are
    /// right now. View counts bump asynchronously, so this is a point-in-time
    /// figure and can lag the server.
    pub fn engagement_rate(&self) -> f64 {
        let e = &self.engagement;
        if e.view_count == 0 {
            return 0.0;
        }
        (e.like_count + e.comment_count) as f64 / e.view_count as f64 * 100.0
    }
}

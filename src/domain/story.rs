use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, OwnerRef};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: ItemId,
    pub owner: OwnerRef,
    #[serde(default)]
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the server already counts this story as viewed by the user.
    #[serde(default, alias = "viewed")]
    pub is_viewed: bool,
    /// Local seen state; set by the composer from the server flag and the
    /// session view ledger.
    #[serde(skip)]
    pub seen: bool,
}

impl Story {
    pub fn new(id: impl Into<ItemId>, owner: OwnerRef) -> Self {
        Self {
            id: id.into(),
            owner,
            media_url: None,
            created_at: Utc::now(),
            expires_at: None,
            is_viewed: false,
            seen: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

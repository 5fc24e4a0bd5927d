use std::fmt;

use super::ItemId;

/// Opaque pagination token handed out by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    next_page: u32,
}

impl Cursor {
    pub(crate) fn first() -> Self {
        Self { next_page: 1 }
    }

    pub(crate) fn after(page: u32) -> Self {
        Self {
            next_page: page.saturating_add(1),
        }
    }

    pub(crate) fn page(&self) -> u32 {
        self.next_page
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page:{}", self.next_page)
    }
}

/// One page of the post feed, in rank order.
///
/// Items are references into the `ContentItemStore`; ids are unique within
/// a page and across all pages of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
    pub items: Vec<ItemId>,
    pub cursor: Cursor,
    pub has_more: bool,
}

impl FeedPage {
    pub fn empty(cursor: Cursor) -> Self {
        Self {
            items: Vec::new(),
            cursor,
            has_more: false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

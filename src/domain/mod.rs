pub mod item;
pub mod page;
pub mod story;

pub use item::{ContentItem, ContentKind, Engagement, ItemId, OwnerRef};
pub use page::{Cursor, FeedPage};
pub use story::Story;

use crate::domain::{ContentItem, Engagement};

/// `likes*2 + views/10 + comments*3`, with views divided as floats.
pub fn popularity_score(e: &Engagement) -> f64 {
    e.like_count as f64 * 2.0 + e.view_count as f64 / 10.0 + e.comment_count as f64 * 3.0
}

/// Sort reels by descending popularity. The sort is stable: reels with equal
/// scores keep the order the source returned them in.
pub fn rank_reels(reels: &mut [ContentItem]) {
    reels.sort_by(|a, b| {
        popularity_score(&b.engagement).total_cmp(&popularity_score(&a.engagement))
    });
}

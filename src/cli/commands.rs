use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::app::{AppContext, EddyError, Result};
use crate::domain::{ContentKind, ItemId};
use crate::feed::{ComposedFeed, FeedUpdate};
use crate::playback::{PlaybackEvent, TickDriver};
use crate::store::{MutationOutcome, Resolution};

async fn compose(ctx: &AppContext, page_size: usize) -> Result<ComposedFeed> {
    match ctx.composer.compose_initial_feed(page_size).await? {
        FeedUpdate::Applied(feed) => Ok(feed),
        FeedUpdate::Discarded => Err(EddyError::Other(
            "feed composition was superseded".to_string(),
        )),
    }
}

fn print_item(ctx: &AppContext, id: &ItemId) {
    if let Some(item) = ctx.store.get(id) {
        let e = &item.engagement;
        println!(
            "  {} @{}: {}",
            item.id,
            item.owner.display_name(),
            item.display_caption()
        );
        println!(
            "      {} likes{}  {} comments  {} views  {:.1}% engagement{}",
            e.like_count,
            if e.is_liked { " (liked)" } else { "" },
            e.comment_count,
            e.view_count,
            item.engagement_rate(),
            if e.is_bookmarked { "  [saved]" } else { "" },
        );
    }
}

pub async fn show_feed(ctx: &AppContext, page_size: Option<usize>, more: usize) -> Result<()> {
    let page_size = page_size.unwrap_or(ctx.config.feed.page_size);
    let feed = compose(ctx, page_size).await?;

    for source in &feed.failed_sources {
        eprintln!("Warning: {} unavailable", source);
    }

    if !feed.stories.is_empty() {
        println!("Stories:");
        for story in &feed.stories {
            let marker = if story.seen { " " } else { "*" };
            println!("  {} {} @{}", marker, story.id, story.owner.display_name());
        }
    }

    println!("Posts:");
    for id in &feed.page.items {
        print_item(ctx, id);
    }

    for _ in 0..more {
        if !ctx.composer.has_more() {
            break;
        }
        match ctx.composer.load_more().await? {
            FeedUpdate::Applied(page) => {
                for id in &page.items {
                    print_item(ctx, id);
                }
            }
            FeedUpdate::Discarded => break,
        }
    }

    if !feed.reels.is_empty() {
        println!("Popular reels:");
        for id in &feed.reels {
            print_item(ctx, id);
        }
    }

    println!(
        "{} posts, {} reels{}",
        ctx.composer.posts().len(),
        feed.reels.len(),
        if ctx.composer.has_more() {
            format!(", more at {}", ctx.composer.cursor())
        } else {
            String::new()
        }
    );
    Ok(())
}

/// The store only knows items it has been hydrated with, so compose first
/// and make sure the id refers to the kind the user asked for.
async fn locate(ctx: &AppContext, kind: ContentKind, id: &str) -> Result<ItemId> {
    compose(ctx, ctx.config.feed.page_size).await?;
    let id = ItemId::from(id);
    match ctx.store.get(&id) {
        Some(item) if item.kind == kind => Ok(id),
        _ => Err(EddyError::ItemNotFound(format!("{} {}", kind, id))),
    }
}

fn report(outcome: MutationOutcome) -> Result<()> {
    match outcome.resolution {
        Resolution::Confirmed => println!("{} {}: done", outcome.action, outcome.item_id),
        Resolution::AlreadyViewed => {
            println!("{} already viewed this session", outcome.item_id)
        }
        Resolution::RolledBack => eprintln!("{} {}: reverted", outcome.action, outcome.item_id),
        Resolution::Kept | Resolution::NotFound => {}
    }

    if let Some(e) = &outcome.engagement {
        println!(
            "  {} likes, {} views, liked: {}, saved: {}",
            e.like_count, e.view_count, e.is_liked, e.is_bookmarked
        );
        if let Some(before) = &outcome.previous {
            if before != e {
                println!(
                    "  was {} likes, {} views, liked: {}, saved: {}",
                    before.like_count, before.view_count, before.is_liked, before.is_bookmarked
                );
            }
        }
    }

    match outcome.error {
        Some(e) if outcome.resolution == Resolution::Kept => {
            eprintln!("Warning: {}", e);
            Ok(())
        }
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub async fn like(ctx: &AppContext, kind: ContentKind, id: &str) -> Result<()> {
    let id = locate(ctx, kind, id).await?;
    report(ctx.store.toggle_like(&id).await)
}

pub async fn bookmark(ctx: &AppContext, kind: ContentKind, id: &str) -> Result<()> {
    let id = locate(ctx, kind, id).await?;
    report(ctx.store.toggle_bookmark(&id).await)
}

pub async fn view(ctx: &AppContext, kind: ContentKind, id: &str) -> Result<()> {
    let id = locate(ctx, kind, id).await?;
    report(ctx.store.record_view(&id).await)
}

pub async fn play_stories(ctx: &AppContext, start: usize) -> Result<()> {
    compose(ctx, ctx.config.feed.page_size).await?;
    let stories = ctx.composer.stories();
    if stories.is_empty() {
        println!("No stories");
        return Ok(());
    }

    let engine = Arc::new(Mutex::new(ctx.story_engine()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let opened = {
        let mut engine = engine.lock().unwrap_or_else(|e| e.into_inner());
        engine.open(stories.clone(), start)
    };
    let _ = tx.send(opened);
    let _driver = TickDriver::spawn(engine.clone(), ctx.config.playback.tick_interval(), Some(tx));

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(PlaybackEvent::Entered { index }) => {
                    if let Some(story) = stories.get(index) {
                        println!(
                            "[{}/{}] @{} {}",
                            index + 1,
                            stories.len(),
                            story.owner.display_name(),
                            story.media_url.as_deref().unwrap_or("")
                        );
                    }
                }
                Some(PlaybackEvent::Closed(reason)) => {
                    println!("Closed: {:?}", reason);
                    break;
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let mut engine = engine.lock().unwrap_or_else(|e| e.into_inner());
                engine.close();
                println!("Closed by user");
                break;
            }
        }
    }

    Ok(())
}

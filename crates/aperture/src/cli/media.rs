//! Media directory commands: `list`, `usage`, `delete`, `clear`.

use aperture_core::queue::InlineExecutor;
use aperture_core::{format_size, Config, MediaItem, MediaStore, MediaType, MetadataWriteQueue};
use chrono::Local;
use clap::Args;
use dialoguer::Confirm;
use std::sync::Arc;

use super::theme;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print items as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Show at most this many items (newest first)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for the `delete` command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// File names (not paths) of the captures to delete
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Arguments for the `clear` command.
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// A store for management commands. Nothing here queues metadata writes.
fn open_store(config: &Config) -> MediaStore {
    let queue = Arc::new(MetadataWriteQueue::new(Arc::new(InlineExecutor)));
    MediaStore::new(config, queue)
}

pub async fn list(config: &Config, args: ListArgs) -> anyhow::Result<()> {
    let store = open_store(config);
    let mut items = store.discover()?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        eprintln!("No captures in {}", store.directory()?.display());
        return Ok(());
    }

    for item in &items {
        println!("{}", format_row(item));
    }
    Ok(())
}

pub async fn usage(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config);
    let items = store.discover()?;
    let photos = items.iter().filter(|item| item.is_photo()).count();
    let videos = items.len() - photos;

    println!("{}", theme::heading().apply_to(store.directory()?.display()));
    println!("  photos: {photos}");
    println!("  videos: {videos}");
    println!("  total:  {}", format_size(store.total_storage_used()?));
    Ok(())
}

pub async fn delete(config: &Config, args: DeleteArgs) -> anyhow::Result<()> {
    let store = open_store(config);
    let (selected, missing) = select_by_name(store.discover()?, &args.names);

    for name in &missing {
        tracing::warn!("No capture named {name}");
    }

    let deleted = store.delete_many(&selected).await;
    println!("Deleted {deleted} of {} captures", args.names.len());
    Ok(())
}

pub async fn clear(config: &Config, args: ClearArgs) -> anyhow::Result<()> {
    let store = open_store(config);
    let dir = store.directory()?;

    if !args.yes {
        let confirmed = Confirm::with_theme(&theme::aperture_theme())
            .with_prompt(format!("Delete every file in {}?", dir.display()))
            .default(false)
            .interact_opt()?;
        if confirmed != Some(true) {
            eprintln!("Aborted");
            return Ok(());
        }
    }

    let removed = store.clear_all().await?;
    println!("Removed {removed} files");
    Ok(())
}

fn format_row(item: &MediaItem) -> String {
    let kind = match item.media_type {
        MediaType::Photo => "photo",
        MediaType::Video => "video",
    };
    let captured = item
        .captured_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    let thumbnail = if item.thumbnail_path.is_some() { " [thumb]" } else { "" };

    format!(
        "{captured}  {kind}  {:>9}  {}{}",
        format_size(item.file_size),
        item.file_name(),
        theme::dim().apply_to(thumbnail)
    )
}

/// Split discovered items into those named and the names that matched nothing.
fn select_by_name(items: Vec<MediaItem>, names: &[String]) -> (Vec<MediaItem>, Vec<String>) {
    let missing = names
        .iter()
        .filter(|name| !items.iter().any(|item| item.file_name() == name.as_str()))
        .cloned()
        .collect();
    let selected = items
        .into_iter()
        .filter(|item| names.iter().any(|name| name == item.file_name()))
        .collect();
    (selected, missing)
}

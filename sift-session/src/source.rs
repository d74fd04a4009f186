use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use tokio::fs;

use crate::{
    catalog::AssetSource,
    error::AppError,
    model::item::{Item, ItemKind},
};

/// Asset source over a local media library directory. Item ids are the
/// file paths, item facts are derived from file metadata.
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: PathBuf) -> Result<Self, AppError> {
        if !root.is_dir() {
            return Err(AppError::InvalidLibraryPath);
        }

        Ok(Self { root })
    }
}

impl AssetSource for FsAssetSource {
    async fn list_all(&self) -> Result<Vec<Item>, AppError> {
        let mut pending = vec![self.root.clone()];
        let mut files = Vec::new();

        while let Some(directory) = pending.pop() {
            let mut entries = fs::read_dir(&directory).await.map_err(|error| {
                tracing::error!("reading {:?} failed: {:?}", directory, error);
                AppError::SourceUnavailable
            })?;

            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }

        let mut items = Vec::new();
        for path in &files {
            if let Some(item) = read_item(path).await {
                items.push(item);
            }
        }

        mark_live_photos(&mut items);

        // Most recent first, items without a capture date at the end.
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        tracing::debug!("library scan found {} media items", items.len());

        Ok(items)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), AppError> {
        let mut failed = Vec::new();
        for id in ids {
            if let Err(error) = fs::remove_file(id).await {
                tracing::error!("deleting {} failed: {:?}", id, error);
                failed.push(id.clone());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AppError::DeletionFailed { ids: failed })
        }
    }

    async fn estimate_byte_size(&self, id: &str) -> u64 {
        fs::metadata(id)
            .await
            .map(|metadata| metadata.len())
            .unwrap_or(0)
    }
}

async fn read_item(path: &Path) -> Option<Item> {
    let kind = match infer::get_from_path(path) {
        Ok(Some(mime)) if mime.mime_type().starts_with("image/") => ItemKind::Photo,
        Ok(Some(mime)) if mime.mime_type().starts_with("video/") => ItemKind::Video,
        _ => return None,
    };

    let metadata = fs::metadata(path).await.ok()?;
    let created_at = metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Local>::from);

    let (pixel_width, pixel_height) = match kind {
        ItemKind::Photo => image::image_dimensions(path).unwrap_or((0, 0)),
        _ => (0, 0),
    };

    let is_screenshot = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_lowercase().contains("screenshot"))
        .unwrap_or(false);

    Some(Item {
        id: path.to_str()?.to_owned(),
        kind,
        created_at,
        is_screenshot,
        byte_size: metadata.len(),
        pixel_width,
        pixel_height,
    })
}

// A photo with a video sibling of the same stem is treated as a live
// photo, the common layout of exported live captures.
fn mark_live_photos(items: &mut [Item]) {
    let video_stems: HashSet<PathBuf> = items
        .iter()
        .filter(|item| item.is_video())
        .map(|item| Path::new(&item.id).with_extension(""))
        .collect();

    for item in items {
        if item.kind == ItemKind::Photo
            && video_stems.contains(&Path::new(&item.id).with_extension(""))
        {
            item.kind = ItemKind::LivePhoto;
        }
    }
}

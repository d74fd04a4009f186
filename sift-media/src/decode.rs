use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{MediaImage, Tier};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Decoding image content failed")]
    DecodingFailed(#[from] image::ImageError),
    #[error("Reading media content failed")]
    ReadFailed(#[from] std::io::Error),
}

/// One delivery from a running decode. Decoders may hand out a fast low
/// quality frame before the final one; `is_final` marks the last frame of
/// the request.
pub enum DecodeUpdate {
    Frame { image: MediaImage, is_final: bool },
    Failed(DecodeError),
}

impl std::fmt::Debug for DecodeUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeUpdate::Frame { image, is_final } => write!(
                f,
                "Frame({}x{}, is_final: {})",
                image.width(),
                image.height(),
                is_final
            ),
            DecodeUpdate::Failed(error) => write!(f, "Failed({:?})", error),
        }
    }
}

/// Turns an item id into displayable images at the requested tier.
///
/// `decode` must not block: work happens in the background and updates
/// arrive on the returned channel. Dropping the receiver withdraws interest
/// and the decoder is free to stop early.
pub trait ImageDecoder: Send + Sync + 'static {
    fn decode(&self, id: &str, tier: Tier) -> mpsc::Receiver<DecodeUpdate>;
}

/// Decoder for items whose id is a path on the local filesystem.
///
/// Runs on the blocking pool. For the card and full tiers a fast preview
/// frame is delivered first, followed by the properly filtered final frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, id: &str, tier: Tier) -> mpsc::Receiver<DecodeUpdate> {
        let (sender, receiver) = mpsc::channel(2);
        let path = PathBuf::from(id);

        tokio::task::spawn_blocking(move || {
            if let Err(error) = decode_file(&path, tier, &sender) {
                tracing::debug!("decoding {:?} failed: {:?}", path, error);
                let _ = sender.blocking_send(DecodeUpdate::Failed(error));
            }
        });

        receiver
    }
}

fn decode_file(
    path: &Path,
    tier: Tier,
    sender: &mpsc::Sender<DecodeUpdate>,
) -> Result<(), DecodeError> {
    let image = image::open(path)?;

    match tier.target_size() {
        Some((width, height)) if tier.accepts_preview() => {
            let frame = Arc::new(image.thumbnail(width, height));
            let _ = sender.blocking_send(DecodeUpdate::Frame {
                image: frame,
                is_final: true,
            });
        }
        Some((width, height)) => {
            let preview = Arc::new(image.thumbnail(width, height));
            // Receiver gone means the request was withdrawn, stop early.
            if sender
                .blocking_send(DecodeUpdate::Frame {
                    image: preview,
                    is_final: false,
                })
                .is_err()
            {
                return Ok(());
            }

            let frame = Arc::new(image.resize(width, height, FilterType::Lanczos3));
            let _ = sender.blocking_send(DecodeUpdate::Frame {
                image: frame,
                is_final: true,
            });
        }
        None => {
            let _ = sender.blocking_send(DecodeUpdate::Frame {
                image: Arc::new(image),
                is_final: true,
            });
        }
    }

    Ok(())
}

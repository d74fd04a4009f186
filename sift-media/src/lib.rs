use std::sync::Arc;

mod cache;
mod decode;
mod lru;
mod prefetch;

pub use cache::MediaCache;
pub use decode::{DecodeError, DecodeUpdate, FileDecoder, ImageDecoder};

/// A decoded image handed out by the cache. Shared, never mutated.
pub type MediaImage = Arc<image::DynamicImage>;

/// Resolution class an image is requested at.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Tier {
    /// Small square-ish renditions for grid views.
    Thumbnail,
    /// The rendition shown while reviewing a single item.
    Card,
    /// Native resolution, only used by the detail view. Never cached.
    Full,
}

impl Tier {
    /// Bounding box decoders should fit the image into, `None` for native size.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        match self {
            Tier::Thumbnail => Some((200, 200)),
            Tier::Card => Some((600, 800)),
            Tier::Full => None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        match self {
            Tier::Thumbnail => 200,
            Tier::Card => 20,
            Tier::Full => 0,
        }
    }

    /// Whether a fast low quality frame is good enough to resolve a fetch.
    /// Thumbnails favor latency over fidelity, every other tier waits for
    /// the final frame.
    pub(crate) fn accepts_preview(&self) -> bool {
        matches!(self, Tier::Thumbnail)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Thumbnail => write!(f, "thumbnail"),
            Tier::Card => write!(f, "card"),
            Tier::Full => write!(f, "full"),
        }
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use crate::decode::{DecodeUpdate, ImageDecoder};
use crate::lru::BoundedCache;
use crate::prefetch::Prefetcher;
use crate::{MediaImage, Tier};

/// Shared image cache over two bounded tiers plus an uncached full
/// resolution path.
///
/// Concurrent fetches for the same `(id, tier)` coalesce into a single
/// decode: the first caller publishes a flight on a watch channel and every
/// later caller awaits the same result. A flight resolves exactly once by
/// construction; failures resolve every waiter with `None` and leave the
/// cache untouched so a later fetch can retry.
#[derive(Clone)]
pub struct MediaCache {
    inner: Arc<Inner>,
}

struct Inner {
    decoder: Box<dyn ImageDecoder>,
    thumbnails: Mutex<TierSlot>,
    cards: Mutex<TierSlot>,
    prefetch: Prefetcher,
}

struct TierSlot {
    cache: BoundedCache,
    in_flight: HashMap<String, watch::Receiver<Flight>>,
    // Bumped on clear so flights started before it neither populate the
    // fresh cache nor disturb newer flights for the same id.
    epoch: u64,
}

impl TierSlot {
    fn new(capacity: usize) -> Self {
        Self {
            cache: BoundedCache::new(capacity),
            in_flight: HashMap::new(),
            epoch: 0,
        }
    }
}

#[derive(Clone)]
enum Flight {
    Pending,
    Done(Option<MediaImage>),
}

impl MediaCache {
    pub fn new(decoder: impl ImageDecoder) -> Self {
        Self::with_capacity(
            decoder,
            Tier::Thumbnail.capacity(),
            Tier::Card.capacity(),
        )
    }

    pub fn with_capacity(decoder: impl ImageDecoder, thumbnails: usize, cards: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                decoder: Box::new(decoder),
                thumbnails: Mutex::new(TierSlot::new(thumbnails)),
                cards: Mutex::new(TierSlot::new(cards)),
                prefetch: Prefetcher::new(),
            }),
        }
    }

    /// Resolves `id` at `tier`, hitting the cache when possible and joining
    /// an in-flight decode otherwise. `None` stands for "no image": the
    /// caller shows a placeholder and may try again later.
    pub async fn fetch(&self, id: &str, tier: Tier) -> Option<MediaImage> {
        if let Tier::Full = tier {
            // Full resolution is only used by the detail view and too large
            // to keep around.
            return consume(self.inner.decoder.decode(id, tier), id, tier).await;
        }

        let mut receiver = {
            let mut slot = self.slot(tier).lock().await;
            if let Some(image) = slot.cache.get(id) {
                return Some(image);
            }

            match slot.in_flight.get(id) {
                Some(receiver) => receiver.clone(),
                None => {
                    let (sender, receiver) = watch::channel(Flight::Pending);
                    slot.in_flight.insert(id.to_owned(), receiver.clone());
                    self.spawn_flight(id.to_owned(), tier, sender, slot.epoch);
                    receiver
                }
            }
        };

        loop {
            if let Flight::Done(result) = receiver.borrow().clone() {
                return result;
            }

            if receiver.changed().await.is_err() {
                return None;
            }
        }
    }

    pub async fn is_cached(&self, id: &str, tier: Tier) -> bool {
        if let Tier::Full = tier {
            return false;
        }

        self.slot(tier).lock().await.cache.contains(id)
    }

    /// Declares intent to warm the card tier for the given ids, earliest
    /// first. Fire and forget; completion is not guaranteed.
    pub fn start_prefetch(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }

        self.inner.prefetch.start(self.clone(), ids.to_vec());
    }

    /// Withdraws prefetch intent for ids no longer upcoming. Best effort:
    /// entries already resolved into the cache stay there.
    pub fn stop_prefetch(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }

        self.inner.prefetch.stop(ids.to_vec());
    }

    /// Evicts both tiers and withdraws all outstanding prefetch intent.
    /// Used when the catalog is reloaded.
    pub async fn clear(&self) {
        self.inner.prefetch.stop_all().await;

        for slot in [&self.inner.thumbnails, &self.inner.cards] {
            let mut slot = slot.lock().await;
            slot.cache.clear();
            slot.in_flight.clear();
            slot.epoch += 1;
        }
    }

    fn slot(&self, tier: Tier) -> &Mutex<TierSlot> {
        match tier {
            Tier::Thumbnail => &self.inner.thumbnails,
            Tier::Card | Tier::Full => &self.inner.cards,
        }
    }

    // The flight runs detached from the requesting task: an aborted
    // prefetch must not tear down a decode other callers await.
    fn spawn_flight(&self, id: String, tier: Tier, sender: watch::Sender<Flight>, epoch: u64) {
        let cache = self.clone();

        tokio::spawn(async move {
            let updates = cache.inner.decoder.decode(&id, tier);
            let result = consume(updates, &id, tier).await;

            let mut slot = cache.slot(tier).lock().await;
            if slot.epoch == epoch {
                if let Some(image) = &result {
                    slot.cache.insert(id.clone(), image.clone());
                }

                slot.in_flight.remove(&id);
            }
            drop(slot);

            let _ = sender.send(Flight::Done(result));
        });
    }
}

async fn consume(
    mut updates: mpsc::Receiver<DecodeUpdate>,
    id: &str,
    tier: Tier,
) -> Option<MediaImage> {
    while let Some(update) = updates.recv().await {
        match update {
            DecodeUpdate::Frame { image, is_final } => {
                if is_final || tier.accepts_preview() {
                    return Some(image);
                }
            }
            DecodeUpdate::Failed(error) => {
                tracing::debug!("decode failed for {} at {}: {:?}", id, tier, error);
                return None;
            }
        }
    }

    // Stream ended without a final frame: the decoder gave up or was
    // cancelled mid-request.
    tracing::debug!("decode ended early for {} at {}", id, tier);
    None
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::join_all;

    use super::*;
    use crate::decode::DecodeError;

    struct ScriptedDecoder {
        decodes: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    impl ScriptedDecoder {
        fn new(delay: Duration, fail: bool) -> (Self, Arc<AtomicUsize>) {
            let decodes = Arc::new(AtomicUsize::new(0));
            let decoder = Self {
                decodes: decodes.clone(),
                delay,
                fail,
            };

            (decoder, decodes)
        }
    }

    impl ImageDecoder for ScriptedDecoder {
        fn decode(&self, _id: &str, _tier: Tier) -> mpsc::Receiver<DecodeUpdate> {
            self.decodes.fetch_add(1, Ordering::SeqCst);

            let (sender, receiver) = mpsc::channel(2);
            let delay = self.delay;
            let fail = self.fail;

            tokio::spawn(async move {
                tokio::time::sleep(delay).await;

                if fail {
                    let error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
                    let _ = sender
                        .send(DecodeUpdate::Failed(DecodeError::ReadFailed(error)))
                        .await;
                    return;
                }

                let _ = sender
                    .send(DecodeUpdate::Frame {
                        image: Arc::new(image::DynamicImage::new_rgb8(1, 1)),
                        is_final: false,
                    })
                    .await;

                let _ = sender
                    .send(DecodeUpdate::Frame {
                        image: Arc::new(image::DynamicImage::new_rgb8(2, 2)),
                        is_final: true,
                    })
                    .await;
            });

            receiver
        }
    }

    #[tokio::test]
    async fn fetch_returns_cached_entry_without_decoding() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::new(decoder);

        assert!(cache.fetch("a", Tier::Card).await.is_some());
        assert!(cache.fetch("a", Tier::Card).await.is_some());

        assert_eq!(1, decodes.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_decode() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::from_millis(50), false);
        let cache = MediaCache::new(decoder);

        let fetches = (0..8).map(|_| cache.fetch("a", Tier::Card));
        let results = join_all(fetches).await;

        assert_eq!(1, decodes.load(Ordering::SeqCst));
        assert!(results.iter().all(|result| result.is_some()));
    }

    #[tokio::test]
    async fn failed_decode_resolves_waiters_without_poisoning() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::from_millis(20), true);
        let cache = MediaCache::new(decoder);

        let results = join_all([cache.fetch("a", Tier::Card), cache.fetch("a", Tier::Card)]).await;

        assert_eq!(1, decodes.load(Ordering::SeqCst));
        assert!(results.iter().all(|result| result.is_none()));

        // Not cached, not stuck: the next fetch decodes again.
        assert!(cache.fetch("a", Tier::Card).await.is_none());
        assert_eq!(2, decodes.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn thumbnail_resolves_on_first_delivered_frame() {
        let (decoder, _) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::new(decoder);

        let image = cache.fetch("a", Tier::Thumbnail).await.expect("image");

        assert_eq!(1, image.width());
    }

    #[tokio::test]
    async fn card_waits_for_the_final_frame() {
        let (decoder, _) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::new(decoder);

        let image = cache.fetch("a", Tier::Card).await.expect("image");

        assert_eq!(2, image.width());
    }

    #[tokio::test]
    async fn full_resolution_is_never_cached() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::new(decoder);

        assert!(cache.fetch("a", Tier::Full).await.is_some());
        assert!(cache.fetch("a", Tier::Full).await.is_some());

        assert_eq!(2, decodes.load(Ordering::SeqCst));
        assert!(!cache.is_cached("a", Tier::Full).await);
    }

    #[tokio::test]
    async fn tier_bound_evicts_least_recently_used() {
        let (decoder, _) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::with_capacity(decoder, 2, 2);

        for id in ["a", "b", "c"] {
            assert!(cache.fetch(id, Tier::Thumbnail).await.is_some());
        }

        assert!(!cache.is_cached("a", Tier::Thumbnail).await);
        assert!(cache.is_cached("b", Tier::Thumbnail).await);
        assert!(cache.is_cached("c", Tier::Thumbnail).await);
    }

    #[tokio::test]
    async fn prefetch_warms_the_card_tier() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::new(decoder);

        cache.start_prefetch(&["a".to_owned()]);

        let mut warmed = false;
        for _ in 0..100 {
            if cache.is_cached("a", Tier::Card).await {
                warmed = true;
                break;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(warmed);
        assert!(cache.fetch("a", Tier::Card).await.is_some());
        assert_eq!(1, decodes.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_prefetch_withdraws_queued_intent() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::from_secs(10), false);
        let cache = MediaCache::new(decoder);

        let ids: Vec<_> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        cache.start_prefetch(&ids);

        // Three workers occupy the gate, the rest waits for a permit.
        for _ in 0..100 {
            if decodes.load(Ordering::SeqCst) >= 3 {
                break;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cache.stop_prefetch(&ids[3..]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(3, decodes.load(Ordering::SeqCst));
        cache.clear().await;
    }

    #[tokio::test]
    async fn clear_evicts_and_allows_refetch() {
        let (decoder, decodes) = ScriptedDecoder::new(Duration::ZERO, false);
        let cache = MediaCache::new(decoder);

        assert!(cache.fetch("a", Tier::Card).await.is_some());
        cache.clear().await;

        assert!(!cache.is_cached("a", Tier::Card).await);
        assert!(cache.fetch("a", Tier::Card).await.is_some());
        assert_eq!(2, decodes.load(Ordering::SeqCst));
    }
}

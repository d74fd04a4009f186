use std::sync::Arc;

use tokio::{
    sync::{Mutex, Semaphore},
    task::AbortHandle,
};

use crate::{cache::MediaCache, Tier};

const PREFETCH_WORKERS: usize = 3;

/// Warms the card tier for upcoming items without blocking the caller.
///
/// Every declared id gets its own worker task holding an abort handle, so
/// intent can be withdrawn per id while the rest keeps going. Workers funnel
/// through a semaphore to bound concurrent decodes; permits are granted in
/// request order, which gives ids at the front of a batch the best chance
/// to be warm first.
pub(crate) struct Prefetcher {
    gate: Arc<Semaphore>,
    handles: Arc<Mutex<Vec<(String, AbortHandle)>>>,
}

impl Prefetcher {
    pub(crate) fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(PREFETCH_WORKERS)),
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn start(&self, cache: MediaCache, ids: Vec<String>) {
        let gate = self.gate.clone();
        let handles = self.handles.clone();

        tokio::spawn(async move {
            for id in ids {
                let mut held = handles.lock().await;
                if held.iter().any(|(queued, _)| queued == &id) {
                    continue;
                }

                let worker = spawn_worker(cache.clone(), gate.clone(), handles.clone(), id.clone());
                held.push((id, worker));
            }
        });
    }

    pub(crate) fn stop(&self, ids: Vec<String>) {
        let handles = self.handles.clone();

        tokio::spawn(async move {
            let mut held = handles.lock().await;
            held.retain(|(queued, handle)| {
                if ids.contains(queued) {
                    tracing::trace!("withdrawing prefetch intent: {}", queued);
                    handle.abort();
                    false
                } else {
                    true
                }
            });
        });
    }

    pub(crate) async fn stop_all(&self) {
        let mut held = self.handles.lock().await;
        for (_, handle) in held.drain(..) {
            handle.abort();
        }
    }
}

fn spawn_worker(
    cache: MediaCache,
    gate: Arc<Semaphore>,
    handles: Arc<Mutex<Vec<(String, AbortHandle)>>>,
    id: String,
) -> AbortHandle {
    let handle = tokio::spawn(async move {
        let _permit = match gate.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        if cache.fetch(&id, Tier::Card).await.is_none() {
            tracing::debug!("prefetch delivered no image: {}", id);
        }

        handles.lock().await.retain(|(queued, _)| queued != &id);
    });

    handle.abort_handle()
}

// pixbatch/src/core/store.rs
use super::item::{ImageItem, IngestedImage, ItemId, ItemState, ItemStatus, ProcessedImage};
use super::processor::ProcessOutcome;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    // Ids grow monotonically, so key order is insertion order.
    items: BTreeMap<ItemId, ImageItem>,
}

/// The item collection shared between ingestion, the batch controller and
/// whatever displays results.
///
/// Every mutation happens under one lock, which is what makes the
/// "mark processing" and "merge result" steps atomic with respect to
/// `remove` and `clear` running on another thread.
#[derive(Debug, Default)]
pub struct ItemStore {
    inner: Mutex<StoreInner>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A panic while holding the lock cannot leave an item half-written:
        // every mutation is a single assignment.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, image: IngestedImage) -> ItemId {
        let mut inner = self.lock();
        let id = ItemId(inner.next_id);
        inner.next_id += 1;
        log::debug!(
            "Added {} '{}' ({}x{}, {} bytes)",
            id,
            image.name,
            image.width,
            image.height,
            image.bytes.len()
        );
        inner.items.insert(id, ImageItem::new(id, image));
        id
    }

    /// Removes an item and releases its payloads. A result still in flight
    /// for it will be discarded on arrival.
    pub fn remove(&self, id: ItemId) -> bool {
        self.lock().items.remove(&id).is_some()
    }

    pub fn clear(&self) {
        self.lock().items.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.lock().items.contains_key(&id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.lock().items.keys().copied().collect()
    }

    pub fn status(&self, id: ItemId) -> Option<ItemStatus> {
        self.lock().items.get(&id).map(ImageItem::status)
    }

    pub fn statuses(&self) -> Vec<(ItemId, ItemStatus)> {
        self.lock()
            .items
            .values()
            .map(|item| (item.id(), item.status()))
            .collect()
    }

    /// A copy of the item as it is right now.
    pub fn get(&self, id: ItemId) -> Option<ImageItem> {
        self.lock().items.get(&id).cloned()
    }

    pub fn completed(&self) -> Vec<(ItemId, String, ProcessedImage)> {
        self.lock()
            .items
            .values()
            .filter_map(|item| {
                item.output()
                    .map(|output| (item.id(), item.name().to_string(), output.clone()))
            })
            .collect()
    }

    /// Items a normal run should visit: every idle or failed item, or the
    /// whole collection when nothing is pending. Taken as one snapshot.
    pub fn select_candidates(&self) -> Vec<ItemId> {
        let inner = self.lock();
        let pending: Vec<ItemId> = inner
            .items
            .values()
            .filter(|item| matches!(item.status(), ItemStatus::Idle | ItemStatus::Error))
            .map(ImageItem::id)
            .collect();

        if pending.is_empty() {
            inner.items.keys().copied().collect()
        } else {
            pending
        }
    }

    /// Moves the item to `Processing`, clearing any earlier output or error,
    /// and hands back its original bytes. `None` when the item is gone.
    pub fn begin_processing(&self, id: ItemId) -> Option<Arc<[u8]>> {
        let mut inner = self.lock();
        let item = inner.items.get_mut(&id)?;
        item.set_state(ItemState::Processing);
        Some(item.original_shared())
    }

    /// Writes a terminal result. Returns `false`, dropping the result, if the
    /// item was removed while it was being processed.
    pub fn merge_result(&self, id: ItemId, outcome: ProcessOutcome) -> bool {
        let mut inner = self.lock();
        let Some(item) = inner.items.get_mut(&id) else {
            return false;
        };
        let state = match outcome {
            Ok(output) => ItemState::Completed(output),
            Err(failure) => ItemState::Error(failure),
        };
        item.set_state(state);
        true
    }
}

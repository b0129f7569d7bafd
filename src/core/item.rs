// pixbatch/src/core/item.rs
use super::{OutputFormat, ProcessingFailure};
use std::fmt;
use std::sync::Arc;

/// Opaque item identity. Assigned by the store and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Idle,
    Processing,
    Completed,
    Error,
}

/// An image handed over by ingestion.
#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A successfully converted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl ProcessedImage {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Processing state of an item.
///
/// Output and error live inside the variants, so an item can never carry
/// both, and neither survives a move back to `Processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Idle,
    Processing,
    Completed(ProcessedImage),
    Error(ProcessingFailure),
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemState::Idle => ItemStatus::Idle,
            ItemState::Processing => ItemStatus::Processing,
            ItemState::Completed(_) => ItemStatus::Completed,
            ItemState::Error(_) => ItemStatus::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageItem {
    id: ItemId,
    name: String,
    original: Arc<[u8]>,
    width: u32,
    height: u32,
    state: ItemState,
}

impl ImageItem {
    pub(crate) fn new(id: ItemId, image: IngestedImage) -> Self {
        Self {
            id,
            name: image.name,
            original: Arc::from(image.bytes),
            width: image.width,
            height: image.height,
            state: ItemState::Idle,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub(crate) fn original_shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.original)
    }

    pub fn original_size(&self) -> u64 {
        self.original.len() as u64
    }

    /// Natural size captured at ingestion.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    pub fn output(&self) -> Option<&ProcessedImage> {
        match &self.state {
            ItemState::Completed(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ProcessingFailure> {
        match &self.state {
            ItemState::Error(failure) => Some(failure),
            _ => None,
        }
    }

    /// Replacing the state drops any previous output buffer.
    pub(crate) fn set_state(&mut self, state: ItemState) {
        self.state = state;
    }
}

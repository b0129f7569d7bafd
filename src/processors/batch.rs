// pixbatch/src/processors/batch.rs
use super::codec::{ImageCodec, RustCodec};
use crate::core::{
    ImageProcessor, ImageToolError, ItemId, ItemStore, ProcessOutcome, ProcessingOptions,
    ProcessingStats, Result,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Which items a run visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    /// Idle and failed items; everything when none are pending.
    Pending,
    /// Every item, completed ones included.
    All,
}

/// Drives the transform pipeline over the items of an [`ItemStore`].
///
/// Candidates are snapshotted once, before any item starts, and fed to the
/// workers through a FIFO, so items start in insertion order. With one
/// worker the run is strictly sequential on the calling thread; with more,
/// a dedicated rayon pool runs that many workers and completion order may
/// differ from start order.
pub struct BatchProcessor<C = RustCodec> {
    store: Arc<ItemStore>,
    processor: ImageProcessor<C>,
    max_threads: usize,
    thread_pool: Option<rayon::ThreadPool>,
    show_progress: bool,
}

impl BatchProcessor<RustCodec> {
    pub fn new(store: Arc<ItemStore>, max_threads: usize) -> Result<Self> {
        Self::with_codec(store, RustCodec::new(), max_threads)
    }
}

impl<C: ImageCodec> BatchProcessor<C> {
    pub fn with_codec(store: Arc<ItemStore>, codec: C, max_threads: usize) -> Result<Self> {
        let max_threads = max_threads.max(1);

        let thread_pool = if max_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(max_threads)
                .thread_name(|i| format!("pixbatch-worker-{}", i))
                .build()
                .map_err(|e| {
                    ImageToolError::ProcessingError(format!("Failed to create thread pool: {}", e))
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            store,
            processor: ImageProcessor::with_codec(codec),
            max_threads,
            thread_pool,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    pub fn processor(&self) -> &ImageProcessor<C> {
        &self.processor
    }

    /// Processes idle and failed items, or all items if nothing is pending.
    pub fn run(&self, options: &ProcessingOptions) -> ProcessingStats {
        self.run_with_scope(options, RunScope::Pending)
    }

    /// Reprocesses the whole collection, e.g. after the options changed.
    pub fn rerun_all(&self, options: &ProcessingOptions) -> ProcessingStats {
        self.run_with_scope(options, RunScope::All)
    }

    pub fn run_with_scope(&self, options: &ProcessingOptions, scope: RunScope) -> ProcessingStats {
        let candidates = match scope {
            RunScope::Pending => self.store.select_candidates(),
            RunScope::All => self.store.ids(),
        };

        if candidates.is_empty() {
            log::warn!("No images to process");
            return ProcessingStats::default();
        }

        log::info!(
            "Processing {} images as {} with {} worker(s)",
            candidates.len(),
            options.format,
            self.max_threads
        );
        log::debug!("Selected candidates: {:?}", candidates);

        let pb = self.create_progress_bar(candidates.len());
        let queue = Mutex::new(VecDeque::from(candidates));
        let stats = Mutex::new(ProcessingStats::default());

        match &self.thread_pool {
            Some(pool) => pool.scope(|scope| {
                for _ in 0..self.max_threads {
                    scope.spawn(|_| self.drain_queue(&queue, options, &stats, &pb));
                }
            }),
            None => self.drain_queue(&queue, options, &stats, &pb),
        }

        let stats = stats.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());

        pb.finish_with_message(format!(
            "Processed {} images, {} failed ({:.1}% size reduction)",
            stats.processed_count,
            stats.failed_count,
            stats.overall_savings()
        ));
        log::info!(
            "Batch finished: {} completed, {} failed, {} discarded",
            stats.processed_count,
            stats.failed_count,
            stats.discarded_count
        );

        stats
    }

    fn drain_queue(
        &self,
        queue: &Mutex<VecDeque<ItemId>>,
        options: &ProcessingOptions,
        stats: &Mutex<ProcessingStats>,
        pb: &ProgressBar,
    ) {
        loop {
            let next = queue
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .pop_front();
            let Some(id) = next else {
                break;
            };

            self.process_one(id, options, stats);
            pb.inc(1);
        }
    }

    fn process_one(&self, id: ItemId, options: &ProcessingOptions, stats: &Mutex<ProcessingStats>) {
        // Removed since the snapshot was taken
        let Some(original) = self.store.begin_processing(id) else {
            log::debug!("Skipping {}: no longer in the collection", id);
            return;
        };

        let outcome = self.processor.process(&original, options);
        let original_size = original.len() as u64;
        drop(original);

        let summary = summarize(&outcome);
        if !self.store.merge_result(id, outcome) {
            log::warn!("Discarding result for {}: removed while processing", id);
            lock_stats(stats).discarded_count += 1;
            return;
        }

        let mut stats = lock_stats(stats);
        match summary {
            Ok(output_size) => {
                stats.processed_count += 1;
                stats.total_size_before += original_size;
                stats.total_size_after += output_size;
            }
            Err(message) => {
                log::warn!("Failed to process {}: {}", id, message);
                stats.failed_count += 1;
                stats.errors.push((id, message));
            }
        }
    }

    fn create_progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(e) => log::debug!("Falling back to default progress style: {}", e),
        }
        pb
    }
}

fn summarize(outcome: &ProcessOutcome) -> std::result::Result<u64, String> {
    match outcome {
        Ok(output) => Ok(output.size()),
        Err(failure) => Err(failure.to_string()),
    }
}

fn lock_stats(stats: &Mutex<ProcessingStats>) -> std::sync::MutexGuard<'_, ProcessingStats> {
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IngestedImage, ItemStatus, OutputFormat, ProcessingFailure, ResizeMode};
    use crate::processors::codec::tests::{MockCodec, RecordedOp, CORRUPT};
    use image::DynamicImage;

    fn ingest(store: &ItemStore, bytes: &[u8]) -> ItemId {
        store.add(IngestedImage {
            name: "img".to_string(),
            bytes: bytes.to_vec(),
            width: 100,
            height: 50,
        })
    }

    fn batch(store: &Arc<ItemStore>, threads: usize) -> BatchProcessor<MockCodec> {
        BatchProcessor::with_codec(Arc::clone(store), MockCodec::new(100, 50), threads).unwrap()
    }

    fn decode_count(batch: &BatchProcessor<MockCodec>) -> usize {
        decode_count_of(batch.processor().codec())
    }

    #[test]
    fn run_processes_idle_and_error_but_skips_completed() {
        let store = Arc::new(ItemStore::new());
        let idle = ingest(&store, b"a");
        let done = ingest(&store, b"bb");
        let failed = ingest(&store, b"ccc");

        store.begin_processing(done);
        store.merge_result(
            done,
            Ok(crate::core::ProcessedImage {
                bytes: vec![1],
                format: OutputFormat::Png,
                width: 1,
                height: 1,
            }),
        );
        store.begin_processing(failed);
        store.merge_result(failed, Err(ProcessingFailure::decode("earlier")));

        let batch = batch(&store, 1);
        let stats = batch.run(&ProcessingOptions::default());

        assert_eq!(stats.processed_count, 2);
        assert_eq!(store.status(idle), Some(ItemStatus::Completed));
        assert_eq!(store.status(failed), Some(ItemStatus::Completed));
        // The completed item kept its old output
        assert_eq!(store.get(done).unwrap().output().unwrap().bytes, vec![1]);
        // Decoded in insertion order: payload lengths 1 then 3
        assert_eq!(
            batch
                .processor()
                .codec()
                .get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Decode(_)))
                .collect::<Vec<_>>(),
            vec![RecordedOp::Decode(1), RecordedOp::Decode(3)]
        );
    }

    #[test]
    fn run_reprocesses_everything_when_all_completed() {
        let store = Arc::new(ItemStore::new());
        for _ in 0..3 {
            ingest(&store, b"fine");
        }
        let batch = batch(&store, 1);

        let first = batch.run(&ProcessingOptions::default());
        assert_eq!(first.processed_count, 3);

        let second = batch.run(&ProcessingOptions {
            format: OutputFormat::Png,
            ..Default::default()
        });
        assert_eq!(second.processed_count, 3);
        assert_eq!(decode_count(&batch), 6);
        for (_, _, output) in store.completed() {
            assert_eq!(output.format, OutputFormat::Png);
        }
    }

    #[test]
    fn one_bad_item_does_not_stop_the_batch() {
        let store = Arc::new(ItemStore::new());
        let first = ingest(&store, b"good");
        let second = ingest(&store, CORRUPT);
        let third = ingest(&store, b"good");

        let stats = batch(&store, 1).run(&ProcessingOptions::default());

        assert_eq!(store.status(first), Some(ItemStatus::Completed));
        assert_eq!(store.status(second), Some(ItemStatus::Error));
        assert_eq!(store.status(third), Some(ItemStatus::Completed));
        assert_eq!(stats.processed_count, 2);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.errors[0].0, second);
        assert!(stats.errors[0].1.starts_with("decode error"));

        // Original bytes are kept for a retry
        assert_eq!(store.get(second).unwrap().original(), CORRUPT);
    }

    #[test]
    fn failed_items_are_retried_on_next_run() {
        let store = Arc::new(ItemStore::new());
        ingest(&store, b"good");
        let bad = ingest(&store, CORRUPT);
        let batch = batch(&store, 1);

        batch.run(&ProcessingOptions::default());
        let retry = batch.run(&ProcessingOptions::default());

        // Only the failed item is a candidate the second time
        assert_eq!(retry.failed_count, 1);
        assert_eq!(retry.processed_count, 0);
        assert_eq!(store.status(bad), Some(ItemStatus::Error));
        assert_eq!(decode_count(&batch), 3);
    }

    #[test]
    fn rerun_all_includes_completed_items() {
        let store = Arc::new(ItemStore::new());
        ingest(&store, b"one");
        ingest(&store, CORRUPT);
        let batch = batch(&store, 1);

        batch.run(&ProcessingOptions::default());
        let stats = batch.rerun_all(&ProcessingOptions::default());
        assert_eq!(stats.processed_count + stats.failed_count, 2);
    }

    #[test]
    fn concurrent_run_matches_sequential_outcome() {
        let store = Arc::new(ItemStore::new());
        let ids: Vec<ItemId> = (0..12)
            .map(|i| ingest(&store, if i % 4 == 1 { CORRUPT } else { &b"ok"[..] }))
            .collect();

        let options = ProcessingOptions {
            resize_mode: ResizeMode::Percentage,
            resize_value: 50,
            ..Default::default()
        };
        let stats = batch(&store, 4).run(&options);

        assert_eq!(stats.processed_count, 9);
        assert_eq!(stats.failed_count, 3);
        for (i, id) in ids.iter().enumerate() {
            let expected = if i % 4 == 1 {
                ItemStatus::Error
            } else {
                ItemStatus::Completed
            };
            assert_eq!(store.status(*id), Some(expected));
        }
        for (_, _, output) in store.completed() {
            assert_eq!((output.width, output.height), (50, 25));
        }
    }

    #[test]
    fn empty_store_is_a_no_op() {
        let store = Arc::new(ItemStore::new());
        let stats = batch(&store, 2).run(&ProcessingOptions::default());
        assert_eq!(stats.processed_count, 0);
        assert!(stats.errors.is_empty());
    }

    enum Removal {
        Item(ItemId),
        Everything,
    }

    /// Mutates the store the first time it is asked to decode, simulating a
    /// user removing items while the batch runs. Also snapshots every
    /// item's status at each decode.
    struct RemovingCodec {
        inner: MockCodec,
        store: Arc<ItemStore>,
        removal: Mutex<Option<Removal>>,
        snapshots: Mutex<Vec<Vec<(ItemId, ItemStatus)>>>,
    }

    impl RemovingCodec {
        fn new(store: &Arc<ItemStore>, removal: Removal) -> Self {
            let codec = Self::watching(store);
            *codec.removal.lock().unwrap() = Some(removal);
            codec
        }

        fn watching(store: &Arc<ItemStore>) -> Self {
            Self {
                inner: MockCodec::new(10, 10),
                store: Arc::clone(store),
                removal: Mutex::new(None),
                snapshots: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImageCodec for RemovingCodec {
        fn decode(&self, bytes: &[u8]) -> std::result::Result<DynamicImage, ProcessingFailure> {
            self.snapshots.lock().unwrap().push(self.store.statuses());
            match self.removal.lock().unwrap().take() {
                Some(Removal::Item(id)) => {
                    self.store.remove(id);
                }
                Some(Removal::Everything) => self.store.clear(),
                None => {}
            }
            self.inner.decode(bytes)
        }

        fn resample(
            &self,
            image: DynamicImage,
            width: u32,
            height: u32,
        ) -> std::result::Result<DynamicImage, ProcessingFailure> {
            self.inner.resample(image, width, height)
        }

        fn encode(
            &self,
            image: &DynamicImage,
            format: OutputFormat,
            quality: u8,
        ) -> std::result::Result<Vec<u8>, ProcessingFailure> {
            self.inner.encode(image, format, quality)
        }
    }

    #[test]
    fn item_is_processing_while_its_pipeline_runs() {
        let store = Arc::new(ItemStore::new());
        let ids: Vec<ItemId> = [b"a", b"b", b"c"]
            .iter()
            .map(|bytes| ingest(&store, *bytes))
            .collect();

        let codec = RemovingCodec::watching(&store);
        let batch = BatchProcessor::with_codec(Arc::clone(&store), codec, 1).unwrap();
        batch.run(&ProcessingOptions::default());

        let snapshots = batch.processor().codec().snapshots.lock().unwrap().clone();
        assert_eq!(snapshots.len(), 3);
        for (current, snapshot) in snapshots.iter().enumerate() {
            let expected: Vec<(ItemId, ItemStatus)> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let status = match i.cmp(&current) {
                        std::cmp::Ordering::Less => ItemStatus::Completed,
                        std::cmp::Ordering::Equal => ItemStatus::Processing,
                        std::cmp::Ordering::Greater => ItemStatus::Idle,
                    };
                    (*id, status)
                })
                .collect();
            assert_eq!(snapshot, &expected);
        }
    }

    #[test]
    fn result_for_item_removed_mid_flight_is_discarded() {
        let store = Arc::new(ItemStore::new());
        let doomed = ingest(&store, b"first");
        let kept = ingest(&store, b"second");

        let codec = RemovingCodec::new(&store, Removal::Item(doomed));
        let stats = BatchProcessor::with_codec(Arc::clone(&store), codec, 1)
            .unwrap()
            .run(&ProcessingOptions::default());

        assert_eq!(stats.discarded_count, 1);
        assert_eq!(stats.processed_count, 1);
        assert!(!store.contains(doomed));
        assert_eq!(store.status(kept), Some(ItemStatus::Completed));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clearing_mid_run_skips_the_rest() {
        let store = Arc::new(ItemStore::new());
        for bytes in [b"1", b"2", b"3"] {
            ingest(&store, bytes);
        }

        let codec = RemovingCodec::new(&store, Removal::Everything);
        let batch = BatchProcessor::with_codec(Arc::clone(&store), codec, 1).unwrap();
        let stats = batch.run(&ProcessingOptions::default());

        // Only the first item reached the codec; its result was dropped
        assert_eq!(stats.processed_count, 0);
        assert_eq!(stats.discarded_count, 1);
        assert_eq!(decode_count_of(&batch.processor().codec().inner), 1);
        assert!(store.is_empty());
    }

    fn decode_count_of(codec: &MockCodec) -> usize {
        codec
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Decode(_)))
            .count()
    }
}

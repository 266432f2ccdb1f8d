use crate::buffer::WorkQueue;
use crate::config::StatsConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::page::Page;
use crate::source::{open_input, PageSource};
use crate::stats::PageStatistics;
use crossbeam::queue::SegQueue;
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Claims input files one at a time and pushes their pages into the queue.
///
/// All producers share one file list; a file is popped by exactly one of
/// them.
pub struct ProducerRunner {
    files: Arc<SegQueue<PathBuf>>,
    queue: WorkQueue<Page>,
    source: Arc<dyn PageSource>,
    metrics: PipelineMetrics,
}

impl ProducerRunner {
    pub fn new(
        files: Arc<SegQueue<PathBuf>>,
        queue: WorkQueue<Page>,
        source: Arc<dyn PageSource>,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            files,
            queue,
            source,
            metrics,
        }
    }

    /// Run until the shared file list is empty.
    ///
    /// On failure the queue is closed, so the other producers stop at their
    /// next push and the run winds down without decoding the remaining files.
    pub fn run(self) -> Result<()> {
        let guard = CloseOnPanic(&self.queue);
        let result = self.produce();
        drop(guard);
        if let Err(e) = &result {
            if !e.is_secondary() {
                self.queue.close();
            }
        }
        result
    }

    fn produce(&self) -> Result<()> {
        while let Some(path) = self.files.pop() {
            let start = Instant::now();
            let mut input = open_input(&path)?;
            let mut pages = 0u64;

            self.source.read_pages(&mut input, &mut |page| {
                self.queue
                    .push(page)
                    .map_err(|_| PipelineError::QueueClosed)?;
                self.metrics.record_produced();
                pages += 1;
                Ok(())
            })?;

            let elapsed = start.elapsed();
            self.metrics.record_file(elapsed);
            debug!(
                "decoded {} pages from {} in {:.2}s",
                pages,
                path.display(),
                elapsed.as_secs_f64()
            );
        }
        Ok(())
    }
}

/// Closes the queue if the owning worker unwinds, so nobody is left blocked
/// on a queue whose other side is gone.
struct CloseOnPanic<'a>(&'a WorkQueue<Page>);

impl Drop for CloseOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.close();
        }
    }
}

/// Drains the queue into one private statistics shard.
pub struct AggregatorRunner {
    queue: WorkQueue<Page>,
    shard: PageStatistics,
    metrics: PipelineMetrics,
}

impl AggregatorRunner {
    pub fn new(queue: WorkQueue<Page>, config: &StatsConfig, metrics: PipelineMetrics) -> Self {
        Self {
            queue,
            shard: PageStatistics::new(config),
            metrics,
        }
    }

    /// Consume pages until end-of-stream and hand back the shard.
    ///
    /// Pages still queued when the queue is closed are processed before
    /// returning. On failure the queue is closed so the run winds down.
    pub fn run(mut self) -> Result<PageStatistics> {
        let guard = CloseOnPanic(&self.queue);
        for page in self.queue.iter() {
            match self.shard.consume(&page) {
                Ok(()) => self.metrics.record_consumed(),
                Err(PipelineError::YearOutOfRange { year, first, last }) => {
                    warn!(
                        "skipping page '{}': year {} outside {}..={}",
                        page.title(),
                        year,
                        first,
                        last
                    );
                    self.metrics.record_rejected();
                }
                Err(e) => {
                    self.queue.close();
                    return Err(e);
                }
            }
        }
        drop(guard);
        Ok(self.shard)
    }
}

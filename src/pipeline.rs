use crate::buffer::WorkQueue;
use crate::config::{validate_inputs, validate_pool_size, StatsConfig};
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::page::Page;
use crate::source::{PageSource, XmlPageSource};
use crate::stats::{merge_all, PageStatistics};
use crate::worker::{AggregatorRunner, ProducerRunner};
use crossbeam::queue::SegQueue;
use log::{error, info};
use std::any::Any;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

/// Decoding rarely benefits from more producers than this
pub const MAX_PRODUCERS: usize = 8;

/// Default number of pages buffered between producers and aggregators
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    producers: usize,
    aggregators: usize,
    queue_capacity: usize,
    stats: StatsConfig,
    source: Option<Arc<dyn PageSource>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            producers: 4,
            aggregators: 4,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            stats: StatsConfig::default(),
            source: None,
        }
    }

    /// Use `threads` aggregators and up to [`MAX_PRODUCERS`] producers
    pub fn threads(mut self, threads: usize) -> Self {
        self.aggregators = threads;
        self.producers = threads.min(MAX_PRODUCERS);
        self
    }

    pub fn producers(mut self, producers: usize) -> Self {
        self.producers = producers;
        self
    }

    pub fn aggregators(mut self, aggregators: usize) -> Self {
        self.aggregators = aggregators;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn stats(mut self, stats: StatsConfig) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the default MediaWiki XML adapter
    pub fn source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        validate_pool_size("producers", self.producers)?;
        validate_pool_size("aggregators", self.aggregators)?;
        if self.queue_capacity == 0 {
            return Err(PipelineError::Config("queue capacity must be positive".into()));
        }
        self.stats.validate()?;

        Ok(Pipeline {
            producers: self.producers,
            aggregators: self.aggregators,
            queue_capacity: self.queue_capacity,
            stats: self.stats,
            source: self
                .source
                .unwrap_or_else(|| Arc::new(XmlPageSource::new())),
            metrics: PipelineMetrics::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured producer/aggregator pipeline, ready to run over a file set
pub struct Pipeline {
    producers: usize,
    aggregators: usize,
    queue_capacity: usize,
    stats: StatsConfig,
    source: Arc<dyn PageSource>,
    metrics: PipelineMetrics,
}

impl Pipeline {
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn stats_config(&self) -> &StatsConfig {
        &self.stats
    }

    /// Validate `files` and start every worker thread.
    ///
    /// Aggregators are started before producers so that pages have somewhere
    /// to go as soon as the first file is decoded.
    pub fn start(self, files: Vec<PathBuf>) -> Result<RunningPipeline> {
        validate_inputs(&files)?;
        info!(
            "processing {} file(s) with {} producer(s), {} aggregator(s), {:?} body counting",
            files.len(),
            self.producers,
            self.aggregators,
            self.stats.strategy
        );

        let mut running = RunningPipeline {
            queue: WorkQueue::new(self.queue_capacity),
            producers: Vec::with_capacity(self.producers),
            aggregators: Vec::with_capacity(self.aggregators),
            stats: self.stats.clone(),
            metrics: self.metrics.clone(),
        };

        for idx in 0..self.aggregators {
            let runner =
                AggregatorRunner::new(running.queue.clone(), &self.stats, self.metrics.clone());
            match spawn(format!("aggregator-{}", idx), move || runner.run()) {
                Ok(handle) => running.aggregators.push(handle),
                Err(e) => return Err(running.abort(e)),
            }
        }

        let file_list = Arc::new(SegQueue::new());
        for file in files {
            file_list.push(file);
        }

        for idx in 0..self.producers {
            let runner = ProducerRunner::new(
                Arc::clone(&file_list),
                running.queue.clone(),
                Arc::clone(&self.source),
                self.metrics.clone(),
            );
            match spawn(format!("producer-{}", idx), move || runner.run()) {
                Ok(handle) => running.producers.push(handle),
                Err(e) => return Err(running.abort(e)),
            }
        }

        Ok(running)
    }

    /// Run over `files` and return the merged statistics
    pub fn run(self, files: Vec<PathBuf>) -> Result<PageStatistics> {
        self.start(files)?.wait()
    }
}

/// A running pipeline that can be monitored and waited on.
///
/// Dropping it without calling [`RunningPipeline::wait`] closes the work
/// queue and detaches the worker threads.
pub struct RunningPipeline {
    queue: WorkQueue<Page>,
    producers: Vec<JoinHandle<Result<()>>>,
    aggregators: Vec<JoinHandle<Result<PageStatistics>>>,
    stats: StatsConfig,
    metrics: PipelineMetrics,
}

impl RunningPipeline {
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Pages currently waiting for an aggregator
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.producers.iter().all(JoinHandle::is_finished)
            && self.aggregators.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every producer, close the queue, wait for the aggregators to
    /// drain it and merge their shards.
    ///
    /// Any worker error or panic fails the whole run; the first root-cause
    /// error is returned.
    pub fn wait(mut self) -> Result<PageStatistics> {
        let mut errors = Vec::new();

        for handle in mem::take(&mut self.producers) {
            if let Err(e) = join(handle) {
                errors.push(e);
            }
        }
        self.queue.close();

        let mut shards = Vec::with_capacity(self.aggregators.len());
        for handle in mem::take(&mut self.aggregators) {
            match join(handle) {
                Ok(shard) => shards.push(shard),
                Err(e) => errors.push(e),
            }
        }
        self.metrics.set_blocked_pushes(self.queue.blocked_pushes());

        if let Some(e) = root_cause(errors) {
            error!("pipeline failed: {}", e);
            return Err(e);
        }

        let stats = merge_all(shards).unwrap_or_else(|| PageStatistics::new(&self.stats));
        info!("pipeline finished: {}", self.metrics.snapshot().format());
        Ok(stats)
    }

    /// Tear down a partially started pipeline and return `cause`
    fn abort(mut self, cause: PipelineError) -> PipelineError {
        self.queue.close();
        for handle in mem::take(&mut self.producers) {
            let _ = join(handle);
        }
        for handle in mem::take(&mut self.aggregators) {
            let _ = join(handle);
        }
        cause
    }
}

impl Drop for RunningPipeline {
    /// Workers of a pipeline dropped without [`RunningPipeline::wait`] are
    /// detached; closing the queue lets them run out instead of blocking.
    fn drop(&mut self) {
        self.queue.close();
    }
}

fn spawn<T, F>(name: String, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|e| PipelineError::Thread(format!("cannot spawn {}: {}", name, e)))
}

fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    handle
        .join()
        .map_err(|payload| {
            PipelineError::Thread(format!("{} panicked: {}", name, panic_message(&*payload)))
        })?
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Prefers an error that caused the failure over its knock-on effects
fn root_cause(errors: Vec<PipelineError>) -> Option<PipelineError> {
    let mut fallback = None;
    for e in errors {
        if !e.is_secondary() {
            return Some(e);
        }
        fallback.get_or_insert(e);
    }
    fallback
}

//! Multi-threaded statistics over large document dumps.
//!
//! Producer threads decode input files into [`Page`]s and push them into a
//! bounded [`WorkQueue`]; aggregator threads drain the queue into private
//! [`PageStatistics`] shards, which are merged once every producer is done
//! and the queue has been drained.
//!
//! # Features
//!
//! - Top-K title and body words, page size and publication year histograms
//! - Exact word counting, or a bounded mode that caps memory by evicting
//!   rare tokens (counts become lower bounds)
//! - Randomized linear-time selection for top-K and eviction cutoffs
//! - Closable blocking queue that never drops queued pages on shutdown
//! - MediaWiki XML input, plain or bzip2-compressed
//! - Per-run metrics: pages, files, throughput, per-file latency percentiles
//!
//! # Example
//!
//! ```ignore
//! use page_stats::{CountingStrategy, PipelineBuilder, StatsConfig};
//!
//! let stats = PipelineBuilder::new()
//!     .threads(4)
//!     .stats(StatsConfig::default().with_strategy(CountingStrategy::Bounded))
//!     .build()?
//!     .run(vec!["ruwiki-pages-articles1.xml.bz2".into()])?;
//!
//! page_stats::report::write_report_file(&stats, 300, "statistics.txt".as_ref())?;
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod histogram;
pub mod metrics;
pub mod page;
pub mod pipeline;
pub mod report;
pub mod select;
pub mod source;
pub mod stats;
pub mod words;
pub mod worker;

// Re-exports for convenience
pub use buffer::WorkQueue;
pub use config::{Alphabet, CountingStrategy, StatsConfig};
pub use error::{PipelineError, Result};
pub use histogram::{SizeHistogram, YearHistogram};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use page::{Page, PageBuilder};
pub use pipeline::{Pipeline, PipelineBuilder, RunningPipeline};
pub use source::{PageSource, XmlPageSource};
pub use stats::{merge_all, PageStatistics};
pub use words::{BoundedCounter, ExactCounter, WordCounter, WordStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

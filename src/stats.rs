use crate::config::{CountingStrategy, StatsConfig};
use crate::error::Result;
use crate::histogram::{SizeHistogram, YearHistogram};
use crate::page::Page;
use crate::words::{WordCounter, WordStats};

/// All statistics gathered over a set of pages.
///
/// Each aggregator owns one of these as its shard; shards are combined with
/// [`PageStatistics::merge`] once every aggregator has finished.
#[derive(Debug, Clone)]
pub struct PageStatistics {
    titles: WordStats,
    bodies: WordStats,
    sizes: SizeHistogram,
    years: YearHistogram,
    pages: u64,
}

impl PageStatistics {
    /// Creates empty statistics. Titles are always counted exactly; the
    /// configured strategy applies to page bodies.
    pub fn new(config: &StatsConfig) -> Self {
        Self {
            titles: WordStats::new(CountingStrategy::Exact, config, config.seed),
            bodies: WordStats::new(config.strategy, config, config.seed.wrapping_add(1)),
            sizes: SizeHistogram::new(),
            years: YearHistogram::new(config.start_year, config.end_year),
            pages: 0,
        }
    }

    /// Adds one page to every counter.
    ///
    /// A page whose year falls outside the year histogram is rejected with
    /// `YearOutOfRange` and leaves the statistics unchanged.
    pub fn consume(&mut self, page: &Page) -> Result<()> {
        self.years.consume(page.year())?;
        self.sizes.consume(page.byte_size());
        self.titles.consume(page.title());
        self.bodies.consume(page.body());
        self.pages += 1;
        Ok(())
    }

    /// Folds `other` into `self`; `other` is only read
    pub fn merge(&mut self, other: &PageStatistics) {
        self.titles.merge(&other.titles);
        self.bodies.merge(&other.bodies);
        self.sizes.merge(&other.sizes);
        self.years.merge(&other.years);
        self.pages += other.pages;
    }

    pub fn titles(&self) -> &WordStats {
        &self.titles
    }

    pub fn bodies(&self) -> &WordStats {
        &self.bodies
    }

    pub fn sizes(&self) -> &SizeHistogram {
        &self.sizes
    }

    pub fn years(&self) -> &YearHistogram {
        &self.years
    }

    /// Number of pages consumed, including those merged in
    pub fn pages(&self) -> u64 {
        self.pages
    }
}

/// Merges shards pairwise, level by level, into a single result.
///
/// Returns `None` for an empty input.
pub fn merge_all(shards: impl IntoIterator<Item = PageStatistics>) -> Option<PageStatistics> {
    let mut level: Vec<PageStatistics> = shards.into_iter().collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        let mut iter = level.into_iter();
        while let Some(mut left) = iter.next() {
            if let Some(right) = iter.next() {
                left.merge(&right);
            }
            next.push(left);
        }
        level = next;
    }
    level.pop()
}

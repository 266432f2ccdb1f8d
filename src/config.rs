use crate::error::{PipelineError, Result};
use chrono::{Datelike, Utc};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Upper bound for either worker pool
pub const MAX_THREADS: usize = 32;

/// Default number of entries printed per word section
pub const DEFAULT_TOP_K: usize = 300;

/// First year tracked by the year histogram unless configured otherwise
pub const DEFAULT_START_YEAR: i32 = 2000;

/// Word counting strategy used for page bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountingStrategy {
    /// Keep every token, counts are exact
    #[default]
    Exact,
    /// Periodically evict the rarer half of the tokens; counts are lower bounds
    Bounded,
}

/// Letters that may form a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alphabet {
    /// `а..я` and `А..Я`
    #[default]
    Cyrillic,
    /// ASCII `a..z` and `A..Z`
    Latin,
}

impl Alphabet {
    pub fn contains(self, c: char) -> bool {
        match self {
            Alphabet::Cyrillic => matches!(c, 'а'..='я' | 'А'..='Я'),
            Alphabet::Latin => c.is_ascii_alphabetic(),
        }
    }
}

/// Settings shared by every statistics shard of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    pub strategy: CountingStrategy,
    pub alphabet: Alphabet,
    /// First year of the year histogram (inclusive)
    pub start_year: i32,
    /// Last year of the year histogram (inclusive)
    pub end_year: i32,
    /// Seed for the selection pivots and bounded-counter reductions
    pub seed: u64,
    /// Number of additions between two reductions of a bounded counter
    pub reduce_every: usize,
    /// Distinct tokens a bounded counter aims to keep; a reduction retains the top half
    pub capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            strategy: CountingStrategy::Exact,
            alphabet: Alphabet::Cyrillic,
            start_year: DEFAULT_START_YEAR,
            end_year: Utc::now().year(),
            seed: 0,
            reduce_every: 100_000,
            capacity: 100_000,
        }
    }
}

impl StatsConfig {
    pub fn with_strategy(mut self, strategy: CountingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_years(mut self, start_year: i32, end_year: i32) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    pub fn with_reduction(mut self, reduce_every: usize, capacity: usize) -> Self {
        self.reduce_every = reduce_every;
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(PipelineError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if self.reduce_every == 0 {
            return Err(PipelineError::Config("reduce_every must be positive".into()));
        }
        if self.capacity < 2 {
            return Err(PipelineError::Config("bounded capacity must be at least 2".into()));
        }
        Ok(())
    }
}

/// Checks that a pool size lies within `1..=MAX_THREADS`
pub fn validate_pool_size(name: &str, size: usize) -> Result<()> {
    if (1..=MAX_THREADS).contains(&size) {
        Ok(())
    } else {
        Err(PipelineError::Config(format!(
            "{} must be in 1..={}, got {}",
            name, MAX_THREADS, size
        )))
    }
}

/// Fails fast unless every input is an existing, readable regular file
pub fn validate_inputs(paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Err(PipelineError::Config("no input files given".into()));
    }
    for path in paths {
        check_readable(path)?;
    }
    Ok(())
}

fn check_readable(path: &Path) -> Result<()> {
    let input_error = |source| PipelineError::Input {
        path: path.to_path_buf(),
        source,
    };
    let metadata = path.metadata().map_err(input_error)?;
    if !metadata.is_file() {
        return Err(input_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    File::open(path).map_err(input_error)?;
    Ok(())
}

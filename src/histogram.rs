use crate::error::{PipelineError, Result};

/// Number of decimal digits of `u64::MAX`
const SIZE_BUCKETS: usize = 20;

/// Page count per decimal-digit length of the page size.
///
/// Bucket `i` holds pages whose size has `i + 1` digits, i.e.
/// `floor(log10(size))` for non-zero sizes; a size of 0 lands in bucket 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeHistogram {
    buckets: [u64; SIZE_BUCKETS],
}

impl Default for SizeHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeHistogram {
    pub fn new() -> Self {
        Self {
            buckets: [0; SIZE_BUCKETS],
        }
    }

    pub fn bucket_of(size: u64) -> usize {
        size.checked_ilog10().unwrap_or(0) as usize
    }

    pub fn consume(&mut self, size: u64) {
        self.buckets[Self::bucket_of(size)] += 1;
    }

    pub fn merge(&mut self, other: &SizeHistogram) {
        for (bucket, count) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *bucket += count;
        }
    }

    pub fn count(&self, bucket: usize) -> u64 {
        self.buckets.get(bucket).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// `(bucket, count)` pairs between the first and last non-empty bucket
    pub fn rows(&self) -> Vec<(usize, u64)> {
        trimmed(&self.buckets)
            .map(|(offset, &count)| (offset, count))
            .collect()
    }
}

/// Page count per publication year within `first..=last`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearHistogram {
    first: i32,
    buckets: Vec<u64>,
}

impl YearHistogram {
    /// Creates an empty histogram for `first..=last`; an inverted range is empty
    pub fn new(first: i32, last: i32) -> Self {
        let len = (i64::from(last) - i64::from(first) + 1).max(0) as usize;
        Self {
            first,
            buckets: vec![0; len],
        }
    }

    pub fn first_year(&self) -> i32 {
        self.first
    }

    pub fn last_year(&self) -> i32 {
        self.first + self.buckets.len() as i32 - 1
    }

    pub fn contains(&self, year: i32) -> bool {
        self.index_of(year).is_some()
    }

    fn index_of(&self, year: i32) -> Option<usize> {
        let offset = usize::try_from(i64::from(year) - i64::from(self.first)).ok()?;
        (offset < self.buckets.len()).then_some(offset)
    }

    /// Counts one page of `year`; years outside the range are rejected
    pub fn consume(&mut self, year: i32) -> Result<()> {
        let index = self.index_of(year).ok_or(PipelineError::YearOutOfRange {
            year,
            first: self.first,
            last: self.last_year(),
        })?;
        self.buckets[index] += 1;
        Ok(())
    }

    /// Adds `other` bucket by bucket, widening the range if `other` covers more years
    pub fn merge(&mut self, other: &YearHistogram) {
        if other.buckets.is_empty() {
            return;
        }
        if self.buckets.is_empty() {
            *self = other.clone();
            return;
        }

        let first = self.first.min(other.first);
        let last = self.last_year().max(other.last_year());
        if first != self.first || last != self.last_year() {
            let mut widened = YearHistogram::new(first, last);
            let shift = (self.first - first) as usize;
            widened.buckets[shift..shift + self.buckets.len()].copy_from_slice(&self.buckets);
            *self = widened;
        }

        let shift = (other.first - self.first) as usize;
        for (bucket, count) in self.buckets[shift..].iter_mut().zip(other.buckets.iter()) {
            *bucket += count;
        }
    }

    pub fn count(&self, year: i32) -> u64 {
        self.index_of(year).map_or(0, |index| self.buckets[index])
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// `(year, count)` pairs between the first and last non-empty year
    pub fn rows(&self) -> Vec<(i32, u64)> {
        trimmed(&self.buckets)
            .map(|(offset, &count)| (self.first + offset as i32, count))
            .collect()
    }
}

/// Enumerates `buckets` without the leading and trailing zero runs
fn trimmed(buckets: &[u64]) -> impl Iterator<Item = (usize, &u64)> {
    let start = buckets.iter().position(|&c| c != 0).unwrap_or(buckets.len());
    let end = buckets.iter().rposition(|&c| c != 0).map_or(start, |i| i + 1);
    buckets[start..end]
        .iter()
        .enumerate()
        .map(move |(i, count)| (start + i, count))
}

//! Word frequency counters.
//!
//! Two strategies share the [`WordCounter`] capability set: [`ExactCounter`]
//! keeps every token it has seen, [`BoundedCounter`] periodically drops the
//! rarer half of its tokens to keep memory flat. [`WordStats`] picks one of
//! them at construction time.

use crate::config::{Alphabet, CountingStrategy, StatsConfig};
use crate::select::{select_kth, smallest_k};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Shortest run of letters that counts as a token
pub const MIN_TOKEN_LEN: usize = 3;

/// Splits `text` into lowercase tokens.
///
/// Text is cut on whitespace into units; a unit with fewer than
/// [`MIN_TOKEN_LEN`] letters of `alphabet` is skipped entirely, otherwise
/// each of its letter runs at least [`MIN_TOKEN_LEN`] long becomes a token.
pub fn tokens(text: &str, alphabet: Alphabet) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .filter(move |unit| unit.chars().filter(|&c| alphabet.contains(c)).count() >= MIN_TOKEN_LEN)
        .flat_map(move |unit| unit.split(move |c: char| !alphabet.contains(c)))
        .filter(|run| run.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
}

/// Descending by count, then ascending by token.
pub fn by_frequency(a: &(&str, u64), b: &(&str, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Operations every word counting strategy supports
pub trait WordCounter {
    /// Adds `delta` occurrences of `token`
    fn add(&mut self, token: &str, delta: u64);

    /// Current token counts
    fn counts(&self) -> &HashMap<String, u64>;

    /// Letters accepted by [`WordCounter::consume`]
    fn alphabet(&self) -> Alphabet;

    /// Seed used for the top-K selection pivots
    fn seed(&self) -> u64;

    fn len(&self) -> usize {
        self.counts().len()
    }

    fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }

    fn count(&self, token: &str) -> u64 {
        self.counts().get(token).copied().unwrap_or(0)
    }

    /// Adds every count of `other` into `self`; `other` is left untouched
    fn merge(&mut self, other: &dyn WordCounter) {
        for (token, &count) in other.counts() {
            self.add(token, count);
        }
    }

    /// Tokenizes `text` and counts each token once
    fn consume(&mut self, text: &str) {
        let alphabet = self.alphabet();
        for token in tokens(text, alphabet) {
            self.add(&token, 1);
        }
    }

    /// At most `k` entries, descending by count then ascending by token
    fn top_k(&self, k: usize) -> Vec<(String, u64)> {
        let entries: Vec<(&str, u64)> = self
            .counts()
            .iter()
            .map(|(token, &count)| (token.as_str(), count))
            .collect();
        let mut rng = StdRng::seed_from_u64(self.seed());
        smallest_k(entries, k, &mut rng, by_frequency)
            .into_iter()
            .map(|(token, count)| (token.to_owned(), count))
            .collect()
    }
}

fn bump(counts: &mut HashMap<String, u64>, token: &str, delta: u64) {
    match counts.get_mut(token) {
        Some(count) => *count += delta,
        None => {
            counts.insert(token.to_owned(), delta);
        }
    }
}

/// Unbounded token counter; merge is lossless, associative and commutative.
#[derive(Debug, Clone)]
pub struct ExactCounter {
    counts: HashMap<String, u64>,
    alphabet: Alphabet,
    seed: u64,
}

impl ExactCounter {
    pub fn new(alphabet: Alphabet, seed: u64) -> Self {
        Self {
            counts: HashMap::new(),
            alphabet,
            seed,
        }
    }
}

impl WordCounter for ExactCounter {
    fn add(&mut self, token: &str, delta: u64) {
        if delta > 0 {
            bump(&mut self.counts, token, delta);
        }
    }

    fn counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

/// Token counter with a soft cap on distinct tokens.
///
/// Every `reduce_every` additions the counter finds the count of the entry
/// ranked `capacity / 2` and drops every entry below it. Entries tied with
/// that cutoff all survive unless they would exceed `capacity`, in which case
/// only the first `capacity / 2` ranks are kept. A dropped token starts again
/// from zero, so every reported count is a lower bound of the true one.
#[derive(Debug, Clone)]
pub struct BoundedCounter {
    counts: HashMap<String, u64>,
    alphabet: Alphabet,
    seed: u64,
    rng: StdRng,
    additions: usize,
    reduce_every: usize,
    capacity: usize,
    reductions: usize,
}

impl BoundedCounter {
    pub fn new(alphabet: Alphabet, seed: u64, reduce_every: usize, capacity: usize) -> Self {
        Self {
            counts: HashMap::new(),
            alphabet,
            seed,
            rng: StdRng::seed_from_u64(seed),
            additions: 0,
            reduce_every: reduce_every.max(1),
            capacity: capacity.max(2),
            reductions: 0,
        }
    }

    /// How many reductions ran so far
    pub fn reductions(&self) -> usize {
        self.reductions
    }

    fn reduce(&mut self) {
        let keep = self.capacity / 2;
        let before = self.counts.len();
        if before <= keep {
            return;
        }

        let (cutoff, head) = {
            let mut entries: Vec<(&str, u64)> = self
                .counts
                .iter()
                .map(|(token, &count)| (token.as_str(), count))
                .collect();
            let cutoff = match select_kth(&mut entries, keep, &mut self.rng, by_frequency) {
                Some(&(_, count)) => count,
                None => return,
            };
            // Too many ties at the cutoff: fall back to the first `keep`
            // ranks, which the selection left at the front.
            let tied = entries.iter().filter(|&&(_, count)| count >= cutoff).count();
            let head = (tied > self.capacity).then(|| {
                entries[..keep]
                    .iter()
                    .map(|&(token, count)| (token.to_owned(), count))
                    .collect::<HashMap<_, _>>()
            });
            (cutoff, head)
        };

        match head {
            Some(head) => self.counts = head,
            None => self.counts.retain(|_, count| *count >= cutoff),
        }
        self.reductions += 1;
        debug!(
            "reduced word counter from {} to {} tokens (cutoff {})",
            before,
            self.counts.len(),
            cutoff
        );
    }
}

impl WordCounter for BoundedCounter {
    fn add(&mut self, token: &str, delta: u64) {
        if delta == 0 {
            return;
        }
        bump(&mut self.counts, token, delta);
        self.additions += 1;
        if self.additions >= self.reduce_every {
            self.additions = 0;
            self.reduce();
        }
    }

    fn counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

/// A word counter whose strategy is chosen when it is created
#[derive(Debug, Clone)]
pub enum WordStats {
    Exact(ExactCounter),
    Bounded(BoundedCounter),
}

impl WordStats {
    pub fn new(strategy: CountingStrategy, config: &StatsConfig, seed: u64) -> Self {
        match strategy {
            CountingStrategy::Exact => WordStats::Exact(ExactCounter::new(config.alphabet, seed)),
            CountingStrategy::Bounded => WordStats::Bounded(BoundedCounter::new(
                config.alphabet,
                seed,
                config.reduce_every,
                config.capacity,
            )),
        }
    }

    pub fn strategy(&self) -> CountingStrategy {
        match self {
            WordStats::Exact(_) => CountingStrategy::Exact,
            WordStats::Bounded(_) => CountingStrategy::Bounded,
        }
    }
}

impl WordCounter for WordStats {
    fn add(&mut self, token: &str, delta: u64) {
        match self {
            WordStats::Exact(counter) => counter.add(token, delta),
            WordStats::Bounded(counter) => counter.add(token, delta),
        }
    }

    fn counts(&self) -> &HashMap<String, u64> {
        match self {
            WordStats::Exact(counter) => counter.counts(),
            WordStats::Bounded(counter) => counter.counts(),
        }
    }

    fn alphabet(&self) -> Alphabet {
        match self {
            WordStats::Exact(counter) => counter.alphabet(),
            WordStats::Bounded(counter) => counter.alphabet(),
        }
    }

    fn seed(&self) -> u64 {
        match self {
            WordStats::Exact(counter) => counter.seed(),
            WordStats::Bounded(counter) => counter.seed(),
        }
    }
}

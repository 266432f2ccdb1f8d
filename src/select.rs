//! Randomized order-statistic selection (quickselect).
//!
//! Both the exact top-K query and the bounded counter's eviction cutoff
//! are answered by partitioning a scratch vector in place around random
//! pivots until the requested rank is isolated.

use rand::Rng;
use std::cmp::Ordering;

/// Partitions `items` so that its first `k` slots hold the `k` smallest
/// elements under `cmp` (in no particular order) and returns the element of
/// rank `k`.
///
/// `k` is 1-indexed. Returns `None` when `k == 0` or `k > items.len()`.
/// Runs in expected linear time; the pivot is drawn uniformly from the active
/// range with `rng`, so feeding a seeded generator gives reproducible
/// partitions.
pub fn select_kth<'a, T, R, F>(items: &'a mut [T], k: usize, rng: &mut R, mut cmp: F) -> Option<&'a T>
where
    T: Clone,
    R: Rng + ?Sized,
    F: FnMut(&T, &T) -> Ordering,
{
    if k == 0 || k > items.len() {
        return None;
    }

    let (mut lo, mut hi, mut k) = (0, items.len() - 1, k);
    while lo < hi {
        let mid = partition(items, lo, hi, rng, &mut cmp);
        let left = mid - lo + 1;
        if left >= k {
            hi = mid;
        } else {
            lo = mid + 1;
            k -= left;
        }
    }
    Some(&items[lo])
}

/// Keeps the `k` smallest elements of `items` under `cmp`, sorted.
///
/// Only the retained prefix is sorted, so this costs O(n + k log k) on
/// average instead of a full sort.
pub fn smallest_k<T, R, F>(mut items: Vec<T>, k: usize, rng: &mut R, mut cmp: F) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
    F: FnMut(&T, &T) -> Ordering,
{
    let k = k.min(items.len());
    select_kth(&mut items, k, rng, &mut cmp);
    items.truncate(k);
    items.sort_unstable_by(|a, b| cmp(a, b));
    items
}

/// Hoare partition of `items[lo..=hi]` around a random pivot.
///
/// Returns `mid` in `lo..hi` such that every element in `lo..=mid` is not
/// greater than every element in `mid + 1..=hi`. Requires `lo < hi`.
fn partition<T, R, F>(items: &mut [T], lo: usize, hi: usize, rng: &mut R, cmp: &mut F) -> usize
where
    T: Clone,
    R: Rng + ?Sized,
    F: FnMut(&T, &T) -> Ordering,
{
    let pos = rng.gen_range(lo..=hi);
    items.swap(lo, pos);
    let pivot = items[lo].clone();

    let (mut i, mut j) = (lo, hi);
    loop {
        // Both scans are bounded: a value equal to or on the other side of
        // the pivot always sits ahead of them.
        while cmp(&items[i], &pivot) == Ordering::Less {
            i += 1;
        }
        while cmp(&items[j], &pivot) == Ordering::Greater {
            j -= 1;
        }
        if i >= j {
            return j;
        }
        items.swap(i, j);
        i += 1;
        j -= 1;
    }
}

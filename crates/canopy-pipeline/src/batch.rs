//! Dataset batching: deterministic partitioning and uniform shuffling
//!
//! Partitioning is deterministic for a given input order; randomness comes
//! from the separate shuffle step applied to the input beforehand, never
//! from the partitioner itself.

use crate::error::PipelineError;
use rand::Rng;

/// Split `items` into `min(batch_count, len)` contiguous batches.
///
/// The first `len % n` batches receive one extra element; batch sizes
/// differ by at most one, and the concatenation of all batches in order
/// reproduces the input exactly.
pub fn split_into_batches<T>(
    items: Vec<T>,
    batch_count: usize,
) -> Result<Vec<Vec<T>>, PipelineError> {
    if batch_count == 0 {
        return Err(PipelineError::InvalidBatchCount(batch_count));
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let n = batch_count.min(items.len());
    let base = items.len() / n;
    let mut remainder = items.len() % n;

    let mut batches = Vec::with_capacity(n);
    let mut items = items.into_iter();
    for _ in 0..n {
        let size = base
            + if remainder > 0 {
                remainder -= 1;
                1
            } else {
                0
            };
        batches.push(items.by_ref().take(size).collect());
    }

    Ok(batches)
}

/// Uniform Fisher-Yates shuffle, in place.
///
/// For each index `i` from the last down to 1, swaps with a uniformly
/// random index in `[0, i]`.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

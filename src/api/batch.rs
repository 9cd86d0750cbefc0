//! Batching of ID lists for endpoints with payload limits
//!
//! Several endpoints accept many IDs per request but cap how many fit in one
//! call. The helpers here split large lists into ordered chunks; callers
//! sleep `INTER_BATCH_DELAY` between chunks to keep burst pressure down.

use std::time::Duration;

/// Default maximum number of IDs per request
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Fixed pause between consecutive batches. A policy constant, not a
/// computed value; the rate-limit tracker handles the dynamic part.
pub const INTER_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Returns true when the item list exceeds one batch
pub fn needs_batching<T>(items: &[T], batch_size: usize) -> bool {
    items.len() > batch_size.max(1)
}

/// Splits items into ordered chunks of at most `batch_size`
///
/// Every item appears exactly once, in its original position; only the last
/// chunk may be short. A zero batch size is treated as one.
pub fn split_into_batches<T: Clone>(items: &[T], batch_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(batch_size.max(1))
        .map(<[T]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_batching() {
        assert!(!needs_batching(&[1, 2, 3], 3));
        assert!(needs_batching(&[1, 2, 3, 4], 3));
        assert!(!needs_batching::<u64>(&[], 50));
    }

    #[test]
    fn test_split_preserves_order_and_count() {
        let items: Vec<u64> = (0..123).collect();
        let batches = split_into_batches(&items, 50);

        // ceil(123 / 50) = 3 batches
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 50);
        assert_eq!(batches[1].len(), 50);
        assert_eq!(batches[2].len(), 23);

        let rejoined: Vec<u64> = batches.into_iter().flatten().collect();
        assert_eq!(rejoined, items);
    }

    #[test]
    fn test_split_exact_multiple() {
        let items: Vec<u64> = (0..100).collect();
        let batches = split_into_batches(&items, 50);

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 50));
    }

    #[test]
    fn test_split_single_batch() {
        let items = vec![1, 2, 3];
        let batches = split_into_batches(&items, 50);

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], items);
    }

    #[test]
    fn test_split_empty_list() {
        let batches = split_into_batches::<u64>(&[], 50);
        assert!(batches.is_empty());
    }

    #[test]
    fn test_zero_batch_size_treated_as_one() {
        let batches = split_into_batches(&[1, 2], 0);
        assert_eq!(batches.len(), 2);
    }
}

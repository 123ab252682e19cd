//! Batch sizing for imports
//!
//! Small imports go in one batch. Larger ones are split into 2 or 10 parts
//! to bound per-transaction write size and memory footprint.

/// Largest total still imported as a single batch
pub const SINGLE_BATCH_MAX: usize = 1_000;

/// Totals at or above this are split into [`LARGE_IMPORT_PARTS`] batches
pub const LARGE_IMPORT_MIN: usize = 100_000;

/// Parts used for mid-sized imports
pub const MEDIUM_IMPORT_PARTS: usize = 2;

/// Parts used for large imports
pub const LARGE_IMPORT_PARTS: usize = 10;

/// Batch size for an import of `total` records
///
/// | total               | parts | batch size       |
/// |---------------------|-------|------------------|
/// | `0..=1000`          | 1     | `total`          |
/// | `1001..100000`      | 2     | `ceil(total/2)`  |
/// | `100000..`          | 10    | `ceil(total/10)` |
///
/// Never returns less than 1.
pub fn plan_batch_size(total: usize) -> usize {
    let size = if total <= SINGLE_BATCH_MAX {
        total
    } else if total < LARGE_IMPORT_MIN {
        total.div_ceil(MEDIUM_IMPORT_PARTS)
    } else {
        total.div_ceil(LARGE_IMPORT_PARTS)
    };
    size.max(1)
}

/// Split `items` into order-preserving batches of `batch_size`
///
/// The last batch may be shorter. A `batch_size` of 0 is treated as 1.
pub fn chunk<T>(items: &[T], batch_size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(batch_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_batch_range() {
        assert_eq!(plan_batch_size(0), 1);
        assert_eq!(plan_batch_size(1), 1);
        assert_eq!(plan_batch_size(500), 500);
        assert_eq!(plan_batch_size(1000), 1000);
    }

    #[test]
    fn test_two_part_range() {
        assert_eq!(plan_batch_size(1001), 501);
        assert_eq!(plan_batch_size(5000), 2500);
        assert_eq!(plan_batch_size(99_999), 50_000);
    }

    #[test]
    fn test_ten_part_range() {
        assert_eq!(plan_batch_size(100_000), 10_000);
        assert_eq!(plan_batch_size(150_000), 15_000);
        assert_eq!(plan_batch_size(100_001), 10_001);
    }

    #[test]
    fn test_chunk_preserves_order() {
        let items: Vec<u32> = (1..=7).collect();
        let batches: Vec<&[u32]> = chunk(&items, 3).collect();
        assert_eq!(batches, vec![&[1, 2, 3][..], &[4, 5, 6][..], &[7][..]]);
    }

    #[test]
    fn test_chunk_planned_counts() {
        let items = vec![0u8; 5000];
        let size = plan_batch_size(items.len());
        assert_eq!(chunk(&items, size).count(), 2);

        let items = vec![0u8; 150_000];
        let size = plan_batch_size(items.len());
        assert_eq!(chunk(&items, size).count(), 10);
    }

    #[test]
    fn test_chunk_empty_and_zero_size() {
        let empty: Vec<u8> = Vec::new();
        assert_eq!(chunk(&empty, 1).count(), 0);

        let items = [1, 2];
        assert_eq!(chunk(&items, 0).count(), 2);
    }
}

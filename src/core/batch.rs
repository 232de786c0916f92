use std::ops::Range;

/// A contiguous slice of the file list scanned as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub range: Range<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Split `len` items into ordered batches of at most `batch_size` items.
/// A zero batch size is treated as one.
pub fn partition(len: usize, batch_size: usize) -> Vec<Batch> {
    let size = batch_size.max(1);
    (0..len)
        .step_by(size)
        .enumerate()
        .map(|(index, start)| Batch {
            index,
            range: start..(start + size).min(len),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_every_item_once() {
        let batches = partition(120, 50);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].range, 0..50);
        assert_eq!(batches[2].range, 100..120);
        assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), 120);
        assert!(batches.iter().enumerate().all(|(i, b)| b.index == i));
    }

    #[test]
    fn test_partition_edge_sizes() {
        assert!(partition(0, 50).is_empty());
        assert_eq!(partition(3, 0).len(), 3);
        assert_eq!(partition(50, 50).len(), 1);
    }
}

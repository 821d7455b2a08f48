//! Free-space index: extents keyed by size for best-fit lookup.
//!
//! Sizes map to a stack of offsets (`BTreeMap<usize, Vec<usize>>`), giving
//! `O(log K)` bucket lookup with `K` = distinct sizes and "last-inserted
//! wins" within a bucket, per the best-fit-from-bucket-tail policy.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Extent {
    pub(crate) offset: usize,
    pub(crate) size: usize,
}

#[derive(Default)]
pub(crate) struct FreeSpaceIndex {
    buckets: std::collections::BTreeMap<usize, Vec<usize>>,
    total_free_bytes: usize,
    total_free_blocks: usize,
}

impl FreeSpaceIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn total_free_bytes(&self) -> usize {
        self.total_free_bytes
    }

    pub(crate) fn total_free_blocks(&self) -> usize {
        self.total_free_blocks
    }

    pub(crate) fn insert(&mut self, extent: Extent) {
        self.buckets.entry(extent.size).or_default().push(extent.offset);
        self.total_free_bytes += extent.size;
        self.total_free_blocks += 1;
    }

    /// Removes the exact `(offset, size)` extent, if present.
    pub(crate) fn remove(&mut self, extent: Extent) -> bool {
        let Some(offsets) = self.buckets.get_mut(&extent.size) else {
            return false;
        };
        let Some(pos) = offsets.iter().position(|&o| o == extent.offset) else {
            return false;
        };
        offsets.remove(pos);
        if offsets.is_empty() {
            self.buckets.remove(&extent.size);
        }
        self.total_free_bytes -= extent.size;
        self.total_free_blocks -= 1;
        true
    }

    /// Smallest bucket with `size >= required_size`; within it, the last
    /// inserted offset (stack top).
    pub(crate) fn find_fit(&self, required_size: usize) -> Option<Extent> {
        let (&size, offsets) = self.buckets.range(required_size..).next()?;
        let &offset = offsets.last()?;
        Some(Extent { offset, size })
    }

    /// Merges all physically adjacent extents. Rebuilds the index from
    /// scratch, so `total_free_bytes` is preserved and `total_free_blocks`
    /// drops by however many merges happened.
    pub(crate) fn coalesce(&mut self) {
        let mut extents: Vec<Extent> = self
            .buckets
            .iter()
            .flat_map(|(&size, offsets)| offsets.iter().map(move |&offset| Extent { offset, size }))
            .collect();
        extents.sort_by_key(|e| e.offset);

        let mut merged: Vec<Extent> = Vec::with_capacity(extents.len());
        for extent in extents {
            if let Some(last) = merged.last_mut() {
                if last.offset + last.size == extent.offset {
                    last.size += extent.size;
                    continue;
                }
            }
            merged.push(extent);
        }

        self.buckets.clear();
        self.total_free_bytes = 0;
        self.total_free_blocks = 0;
        for extent in merged {
            self.insert(extent);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.total_free_bytes = 0;
        self.total_free_blocks = 0;
    }
}

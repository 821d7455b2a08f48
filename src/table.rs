//! Allocation table: maps live identifiers to `(offset, length)` records.

use std::collections::HashMap;

/// Identifier naming a live allocation for the life of its pool. `0` is
/// reserved for the canonical empty string and is never minted.
pub type AllocationId = u32;

/// Where an allocation's bytes currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Record {
    pub(crate) offset_bytes: usize,
    pub(crate) length_units: usize,
}

/// Owns the identifier counter and the id -> record mapping.
///
/// Identifier 0 is reserved for the empty string and is never stored here;
/// `lookup`/`unregister` special-case it at the call site in `pool`.
#[derive(Default)]
pub(crate) struct AllocationTable {
    next_id: AllocationId,
    records: HashMap<AllocationId, Record>,
}

impl AllocationTable {
    pub(crate) fn new() -> Self {
        Self { next_id: 0, records: HashMap::new() }
    }

    /// Mints a fresh id and stores `record` under it. Wraps to 1 on overflow,
    /// skipping the reserved 0 (spec's accepted identifier-overflow policy).
    pub(crate) fn register(&mut self, record: Record) -> AllocationId {
        let id = match self.next_id.checked_add(1) {
            Some(0) | None => 1,
            Some(n) => n,
        };
        self.next_id = id;
        self.records.insert(id, record);
        id
    }

    pub(crate) fn lookup(&self, id: AllocationId) -> Option<Record> {
        self.records.get(&id).copied()
    }

    pub(crate) fn unregister(&mut self, id: AllocationId) -> Option<Record> {
        self.records.remove(&id)
    }

    pub(crate) fn rewrite_offset(&mut self, id: AllocationId, new_offset: usize) {
        if let Some(record) = self.records.get_mut(&id) {
            record.offset_bytes = new_offset;
        }
    }

    pub(crate) fn iterate_all(&self) -> impl Iterator<Item = (AllocationId, Record)> + '_ {
        self.records.iter().map(|(&id, &record)| (id, record))
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}

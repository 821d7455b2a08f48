//! Pool coordinator: the public face of the allocator.
//!
//! Owns the backing buffer, the allocation table, and the free-space index,
//! and orchestrates allocate/free/compact policy over them. Grounded in the
//! teacher's `allocator::pool::PoolAllocator` for the overall shape (a
//! config-driven allocator with stats and a production/debug split) and
//! `arena::Arena` for the bump-then-grow placement strategy.

use tracing::{debug, warn};

use crate::buffer::BackingBuffer;
use crate::config::{PoolConfig, ALIGN, UNIT_BYTES};
use crate::error::{PoolError, PoolResult};
use crate::free_index::{Extent, FreeSpaceIndex};
use crate::table::{AllocationId, AllocationTable, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Disposed,
}

/// A contiguous arena of UTF-16 code units, addressed through small,
/// copyable [`crate::handle::Handle`] values.
pub struct Pool {
    /// `None` only after `dispose()`; released synchronously there rather
    /// than deferred to `Pool`'s own drop.
    buffer: Option<BackingBuffer>,
    table: AllocationTable,
    free_index: FreeSpaceIndex,
    bump_offset: usize,
    allow_growth: bool,
    config: PoolConfig,
    frees_since_coalesce: usize,
    state: Lifecycle,
}

impl Pool {
    /// Creates a pool with the given initial capacity (in code units).
    pub fn new(initial_capacity_units: usize, allow_growth: bool) -> PoolResult<Self> {
        Self::with_config(initial_capacity_units, allow_growth, PoolConfig::default())
    }

    /// As [`Pool::new`], with an explicit [`PoolConfig`].
    pub fn with_config(
        initial_capacity_units: usize,
        allow_growth: bool,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        if initial_capacity_units < 1 {
            return Err(PoolError::invalid_argument("initial capacity must be at least 1 unit"));
        }
        let capacity_bytes = initial_capacity_units
            .checked_mul(UNIT_BYTES)
            .ok_or_else(|| PoolError::invalid_argument("initial capacity overflows the size word"))?;

        let buffer = BackingBuffer::new(capacity_bytes)?;

        Ok(Self {
            buffer: Some(buffer),
            table: AllocationTable::new(),
            free_index: FreeSpaceIndex::new(),
            bump_offset: 0,
            allow_growth,
            config,
            frees_since_coalesce: 0,
            state: Lifecycle::Open,
        })
    }

    fn ensure_open(&self) -> PoolResult<()> {
        match self.state {
            Lifecycle::Open => Ok(()),
            Lifecycle::Disposed => Err(PoolError::Disposed),
        }
    }

    /// Borrows the backing buffer. Only called after `ensure_open()` has
    /// succeeded, so `buffer` is always `Some` here.
    fn buffer(&self) -> &BackingBuffer {
        self.buffer.as_ref().expect("buffer present while pool is open")
    }

    fn buffer_mut(&mut self) -> &mut BackingBuffer {
        self.buffer.as_mut().expect("buffer present while pool is open")
    }

    /// Maximum `length_units` that cannot overflow the byte-size arithmetic.
    fn max_safe_length_units() -> usize {
        (usize::MAX - ALIGN + 1) / UNIT_BYTES
    }

    fn required_bytes(length_units: usize) -> PoolResult<usize> {
        if length_units > Self::max_safe_length_units() {
            return Err(PoolError::invalid_argument(
                "length_units would overflow size arithmetic after alignment",
            ));
        }
        let raw = length_units * UNIT_BYTES;
        Ok(align_up(raw, ALIGN).max(ALIGN))
    }

    /// Allocates room for `length_units` code units with unspecified
    /// contents; the caller writes via [`Pool::write`] before `read`ing.
    pub fn allocate_raw(&mut self, length_units: usize) -> PoolResult<AllocationId> {
        self.ensure_open()?;
        if length_units == 0 {
            return Ok(0);
        }
        let need_bytes = Self::required_bytes(length_units)?;
        let offset = self.place(need_bytes)?;
        Ok(self.table.register(Record { offset_bytes: offset, length_units }))
    }

    /// Allocates room for `src` and copies it in. Empty input yields id 0
    /// without touching the buffer or the table.
    pub fn allocate_filled(&mut self, src: &[u16]) -> PoolResult<AllocationId> {
        self.ensure_open()?;
        if src.is_empty() {
            return Ok(0);
        }
        let id = self.allocate_raw(src.len())?;
        self.write(id, src)?;
        Ok(id)
    }

    /// Overwrites the bytes of an existing allocation with `src`. `src` must
    /// be no longer than the allocation's `length_units`.
    pub fn write(&mut self, id: AllocationId, src: &[u16]) -> PoolResult<()> {
        self.ensure_open()?;
        if id == 0 {
            return if src.is_empty() {
                Ok(())
            } else {
                Err(PoolError::invalid_argument("cannot write into the reserved empty allocation"))
            };
        }
        let record = self.table.lookup(id).ok_or(PoolError::StaleId(id))?;
        if src.len() > record.length_units {
            return Err(PoolError::invalid_argument("write exceeds the allocation's length_units"));
        }
        let bytes = units_to_bytes(src);
        self.buffer_mut().place_at(record.offset_bytes, &bytes);
        Ok(())
    }

    /// Finds room for `need_bytes`, growing the pool if necessary and
    /// permitted. Returns the byte offset at which the caller should
    /// register its allocation record.
    fn place(&mut self, need_bytes: usize) -> PoolResult<usize> {
        if let Some(extent) = self.free_index.find_fit(need_bytes) {
            self.free_index.remove(extent);
            let remainder = extent.size - need_bytes;
            if remainder >= ALIGN {
                self.free_index.insert(Extent { offset: extent.offset + need_bytes, size: remainder });
            }
            return Ok(extent.offset);
        }

        if self.bump_offset + need_bytes <= self.buffer().capacity_bytes() {
            let offset = self.bump_offset;
            self.bump_offset += need_bytes;
            return Ok(offset);
        }

        if !self.allow_growth {
            warn!(need_bytes, "pool is out of memory and growth is disabled");
            return Err(PoolError::OutOfMemory { requested: need_bytes });
        }

        let grown = (self.buffer().capacity_bytes() as f64 * self.config.growth_factor) as usize;
        let additional = need_bytes.max(grown.saturating_sub(self.buffer().capacity_bytes()));
        self.compact_and_grow(additional)?;

        let offset = self.bump_offset;
        self.bump_offset += need_bytes;
        Ok(offset)
    }

    /// Frees an allocation. No-op on a disposed pool, on id 0, and on an id
    /// that is not (or no longer) present — double-free is always safe.
    pub fn free(&mut self, id: AllocationId) {
        if self.state == Lifecycle::Disposed || id == 0 {
            return;
        }
        let Some(record) = self.table.unregister(id) else {
            return;
        };

        let size_bytes = align_up(record.length_units * UNIT_BYTES, ALIGN).max(ALIGN);
        if self.config.zero_on_free {
            let zeros = vec![0u8; size_bytes];
            self.buffer_mut().place_at(record.offset_bytes, &zeros);
        }
        self.free_index.insert(Extent { offset: record.offset_bytes, size: size_bytes });
        self.frees_since_coalesce += 1;

        if self.should_coalesce() {
            debug!(
                free_blocks = self.free_index.total_free_blocks(),
                frag_pct = self.fragmentation_pct(),
                "coalescing free-space index"
            );
            self.free_index.coalesce();
            self.frees_since_coalesce = 0;
        }
    }

    fn should_coalesce(&self) -> bool {
        self.fragmentation_pct() > self.config.frag_threshold * 100.0
            && self.free_index.total_free_blocks() >= self.config.min_blocks_to_coalesce
            && self.frees_since_coalesce >= self.config.min_frees_between_coalesce
    }

    /// Defragments all live allocations into a fresh buffer, at least
    /// `additional_bytes` larger than the current capacity, rewriting
    /// every record's offset. Handle ids are untouched.
    pub fn compact_and_grow(&mut self, additional_bytes: usize) -> PoolResult<()> {
        self.ensure_open()?;
        let new_capacity = self
            .buffer()
            .capacity_bytes()
            .checked_add(additional_bytes)
            .ok_or_else(|| PoolError::invalid_argument("grown capacity overflows the size word"))?;

        let mut new_buffer = BackingBuffer::new(new_capacity.max(ALIGN))?;

        let mut ids: Vec<AllocationId> = self.table.iterate_all().map(|(id, _)| id).collect();
        ids.sort_unstable();

        let mut cursor = 0usize;
        for id in ids {
            let record = self.table.lookup(id).expect("id came from iterate_all");
            let size_bytes = align_up(record.length_units * UNIT_BYTES, ALIGN).max(ALIGN);
            let bytes = self.buffer().read_span(record.offset_bytes, size_bytes).to_vec();
            new_buffer.place_copy_from(cursor, &bytes);
            self.table.rewrite_offset(id, cursor);
            cursor += size_bytes;
        }

        debug!(old_capacity = self.buffer().capacity_bytes(), new_capacity, "compacted pool");

        self.buffer = Some(new_buffer);
        self.bump_offset = cursor;
        self.free_index.clear();
        self.frees_since_coalesce = 0;
        Ok(())
    }

    /// Returns a view of an allocation's bytes, as raw code units.
    pub fn read(&self, id: AllocationId) -> PoolResult<Vec<u16>> {
        self.ensure_open()?;
        if id == 0 {
            return Ok(Vec::new());
        }
        let record = self.table.lookup(id).ok_or(PoolError::StaleId(id))?;
        let size_bytes = align_up(record.length_units * UNIT_BYTES, ALIGN).max(ALIGN);
        let raw = self.buffer().read_span(record.offset_bytes, size_bytes);
        Ok(bytes_to_units(raw, record.length_units))
    }

    pub fn length_units(&self, id: AllocationId) -> PoolResult<usize> {
        self.ensure_open()?;
        if id == 0 {
            return Ok(0);
        }
        self.table.lookup(id).map(|r| r.length_units).ok_or(PoolError::StaleId(id))
    }

    /// Drops all live allocations and free extents; the identifier counter
    /// is preserved so ids minted before and after `clear` never collide.
    pub fn clear(&mut self) -> PoolResult<()> {
        self.ensure_open()?;
        self.table.clear();
        self.free_index.clear();
        self.bump_offset = 0;
        self.frees_since_coalesce = 0;
        Ok(())
    }

    /// Releases the backing buffer and marks the pool dead. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == Lifecycle::Disposed {
            return;
        }
        self.table.clear();
        self.free_index.clear();
        // Drop the buffer now, synchronously, rather than waiting for
        // `Pool` itself to go out of scope.
        self.buffer.take();
        self.state = Lifecycle::Disposed;
    }

    pub fn active_allocations(&self) -> usize {
        self.table.len()
    }

    pub fn free_space_units(&self) -> usize {
        let tail = self.buffer().capacity_bytes() - self.bump_offset;
        (tail + self.free_index.total_free_bytes()) / UNIT_BYTES
    }

    pub fn tail_free_units(&self) -> usize {
        (self.buffer().capacity_bytes() - self.bump_offset) / UNIT_BYTES
    }

    pub fn fragmentation_pct(&self) -> f64 {
        100.0 * self.free_index.total_free_bytes() as f64 / self.buffer().capacity_bytes() as f64
    }
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

fn units_to_bytes(units: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(units.len() * UNIT_BYTES);
    for unit in units {
        bytes.extend_from_slice(&unit.to_ne_bytes());
    }
    bytes
}

fn bytes_to_units(bytes: &[u8], length_units: usize) -> Vec<u16> {
    let mut units = Vec::with_capacity(length_units);
    for chunk in bytes.chunks_exact(UNIT_BYTES).take(length_units) {
        units.push(u16::from_ne_bytes([chunk[0], chunk[1]]));
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn allocate_read_free_basic() {
        let mut p = Pool::new(64, false).unwrap();
        let a = p.allocate_filled(&units("Hello")).unwrap();
        let b = p.allocate_filled(&units("World")).unwrap();
        assert_eq!(p.read(a).unwrap(), units("Hello"));
        assert_eq!(p.read(b).unwrap(), units("World"));
        assert_eq!(p.active_allocations(), 2);

        p.free(a);
        assert_eq!(p.active_allocations(), 1);
        assert_eq!(p.read(b).unwrap(), units("World"));
        assert!(matches!(p.read(a), Err(PoolError::StaleId(_))));
    }

    #[test]
    fn empty_allocation_yields_reserved_id() {
        let mut p = Pool::new(16, false).unwrap();
        let id = p.allocate_filled(&[]).unwrap();
        assert_eq!(id, 0);
        assert_eq!(p.active_allocations(), 0);
        assert_eq!(p.read(0).unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut p = Pool::new(64, false).unwrap();
        let a = p.allocate_filled(&units("ABCDEF")).unwrap();
        p.free(a);
        let b = p.allocate_filled(&units("UVWXYZ")).unwrap();
        assert_ne!(a, b);
        assert_eq!(p.read(b).unwrap(), units("UVWXYZ"));
        assert!(p.read(a).is_err());
    }

    #[test]
    fn free_on_zero_and_unknown_id_is_noop() {
        let mut p = Pool::new(16, false).unwrap();
        p.free(0);
        p.free(9999);
        assert_eq!(p.active_allocations(), 0);
    }

    #[test]
    fn double_free_is_safe() {
        let mut p = Pool::new(16, false).unwrap();
        let a = p.allocate_filled(&units("hi")).unwrap();
        p.free(a);
        p.free(a);
        assert_eq!(p.active_allocations(), 0);
    }

    #[test]
    fn out_of_memory_without_growth_leaves_pool_intact() {
        let mut p = Pool::new(4, false).unwrap();
        let a = p.allocate_filled(&units("ab")).unwrap();
        let err = p.allocate_filled(&units("this is far too long to fit"));
        assert!(matches!(err, Err(PoolError::OutOfMemory { .. })));
        assert_eq!(p.read(a).unwrap(), units("ab"));
    }

    #[test]
    fn compact_and_grow_preserves_live_contents_and_ids() {
        let mut p = Pool::new(64, true).unwrap();
        let a = p.allocate_filled(&units("one")).unwrap();
        let b = p.allocate_filled(&units("two")).unwrap();
        let c = p.allocate_filled(&units("three")).unwrap();
        p.free(b);

        p.compact_and_grow(64).unwrap();

        assert_eq!(p.read(a).unwrap(), units("one"));
        assert_eq!(p.read(c).unwrap(), units("three"));
        assert!(p.read(b).is_err());
        assert_eq!(p.fragmentation_pct(), 0.0);
        assert_eq!(p.buffer().capacity_bytes(), 64 * UNIT_BYTES + 64);
    }

    #[test]
    fn growth_factor_from_config_controls_grow_amount() {
        let mut p =
            Pool::with_config(64, true, PoolConfig::default().with_growth_factor(3.0)).unwrap();
        let before_capacity = p.buffer().capacity_bytes();

        // fill the bump region exactly, so the next allocation forces a grow
        // driven entirely by `growth_factor`, not by the request size.
        let filler: Vec<u16> = vec![0u16; 64];
        p.allocate_filled(&filler).unwrap();
        p.allocate_raw(1).unwrap();

        assert_eq!(p.buffer().capacity_bytes(), before_capacity * 3);
    }

    #[test]
    fn dispose_releases_the_backing_buffer_synchronously() {
        let mut p = Pool::new(16, false).unwrap();
        let a = p.allocate_filled(&units("x")).unwrap();
        p.dispose();
        assert!(p.buffer.is_none());
        assert!(matches!(p.read(a), Err(PoolError::Disposed)));
        p.free(a);
    }

    #[test]
    fn dispose_is_idempotent_and_blocks_other_ops() {
        let mut p = Pool::new(16, false).unwrap();
        let a = p.allocate_filled(&units("x")).unwrap();
        p.dispose();
        p.dispose();
        assert!(matches!(p.read(a), Err(PoolError::Disposed)));
        p.free(a);
    }

    #[test]
    fn allocating_over_max_safe_length_is_invalid_argument() {
        let mut p = Pool::new(16, true).unwrap();
        let err = p.allocate_raw(usize::MAX);
        assert!(matches!(err, Err(PoolError::InvalidArgument(_))));
    }

    #[test]
    fn clear_preserves_identifier_counter() {
        let mut p = Pool::new(64, false).unwrap();
        let a = p.allocate_filled(&units("x")).unwrap();
        p.clear().unwrap();
        let b = p.allocate_filled(&units("y")).unwrap();
        assert!(b > a);
    }
}

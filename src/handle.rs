//! Small, copyable references to a pool allocation.

use crate::error::PoolResult;
use crate::pool::Pool;
use crate::table::AllocationId;

/// A lightweight, `Copy` reference to an allocation living in some [`Pool`].
///
/// Holds only the allocation id, not a borrow of the pool: a handle that
/// embedded `&'a Pool` for reads would conflict with the `&mut Pool` its own
/// `free` needs on the same pool, in the same scope — a sound borrow split
/// isn't possible if the reference lives inside the value. Instead the pool
/// is supplied at each call site, which is what the spec's "2-word value"
/// becomes once `pool_ref` can't be stored without upsetting the borrow
/// checker: the caller already has a `&Pool`/`&mut Pool` in hand whenever it
/// would dereference a handle, so passing it costs nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    id: AllocationId,
}

impl Handle {
    pub fn new(id: AllocationId) -> Self {
        Self { id }
    }

    /// The canonical empty handle. `id == 0` always resolves to the empty
    /// string without consulting any pool.
    pub const EMPTY: Handle = Handle { id: 0 };

    pub fn id(&self) -> AllocationId {
        self.id
    }

    pub fn is_empty(&self, pool: &Pool) -> PoolResult<bool> {
        if self.id == 0 {
            return Ok(true);
        }
        Ok(pool.length_units(self.id)? == 0)
    }

    pub fn read(&self, pool: &Pool) -> PoolResult<Vec<u16>> {
        pool.read(self.id)
    }

    pub fn length_units(&self, pool: &Pool) -> PoolResult<usize> {
        pool.length_units(self.id)
    }

    /// Frees this handle's allocation. Unconditional and idempotent,
    /// matching [`Pool::free`]; safe to call on an already-freed or
    /// already-disposed pool.
    pub fn free(&self, pool: &mut Pool) {
        pool.free(self.id);
    }
}

impl From<AllocationId> for Handle {
    fn from(id: AllocationId) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_id_handle_is_empty_without_pool_lookup() {
        let pool = Pool::new(16, false).unwrap();
        let h = Handle::EMPTY;
        assert!(h.is_empty(&pool).unwrap());
        assert_eq!(h.read(&pool).unwrap(), Vec::<u16>::new());
    }

    #[test]
    fn handle_reads_through_pool() {
        let mut pool = Pool::new(32, false).unwrap();
        let units: Vec<u16> = "hi".encode_utf16().collect();
        let id = pool.allocate_filled(&units).unwrap();
        let h = Handle::new(id);
        assert_eq!(h.read(&pool).unwrap(), units);
        assert!(!h.is_empty(&pool).unwrap());
    }

    #[test]
    fn handle_free_forwards_to_pool() {
        let mut pool = Pool::new(32, false).unwrap();
        let units: Vec<u16> = "hi".encode_utf16().collect();
        let id = pool.allocate_filled(&units).unwrap();
        let h = Handle::new(id);
        h.free(&mut pool);
        assert_eq!(pool.active_allocations(), 0);
    }

    #[test]
    fn stale_handle_read_is_an_error() {
        let mut pool = Pool::new(32, false).unwrap();
        let units: Vec<u16> = "hi".encode_utf16().collect();
        let id = pool.allocate_filled(&units).unwrap();
        let h = Handle::new(id);
        h.free(&mut pool);
        assert!(h.read(&pool).is_err());
    }
}

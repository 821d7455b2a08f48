//! Arena-style allocator for variable-length UTF-16 strings.
//!
//! A [`Pool`] owns one contiguous backing buffer and hands out small,
//! copyable [`Handle`] values that name a string allocation by an
//! identifier rather than an address. Handles stay valid across
//! [`Pool::compact_and_grow`], which is the only operation that may move
//! live bytes around; identifiers are never reused within a pool's
//! lifetime, so a handle derived from freed or reclaimed space can never
//! resolve to live memory.
//!
//! ```
//! use string_arena::Pool;
//!
//! let mut pool = Pool::new(64, true).unwrap();
//! let units: Vec<u16> = "hello".encode_utf16().collect();
//! let id = pool.allocate_filled(&units).unwrap();
//! assert_eq!(pool.read(id).unwrap(), units);
//! pool.free(id);
//! ```

mod buffer;
mod config;
mod error;
mod free_index;
mod handle;
mod pool;
mod table;

pub use config::{PoolConfig, ALIGN, UNIT_BYTES};
pub use error::{PoolError, PoolResult};
pub use handle::Handle;
pub use pool::Pool;
pub use table::AllocationId;

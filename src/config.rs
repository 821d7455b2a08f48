//! Tunable constants for the coalesce/grow policy.
//!
//! Follows the teacher's `PoolConfig`/`ArenaConfig` shape: a `Default`
//! impl holding the values named in the design, plus named presets for
//! common deployment profiles instead of one hardcoded constant set.

/// Allocator alignment, in bytes. Every extent size is a multiple of this,
/// with a floor of `ALIGN`.
pub const ALIGN: usize = 8;

/// Bytes per code unit of the stored text encoding (UTF-16-width `char`).
pub const UNIT_BYTES: usize = 2;

/// Policy knobs for when the pool coalesces free space and how much it
/// grows by when a bump allocation doesn't fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolConfig {
    /// Fragmentation ratio (free bytes / capacity) above which coalesce
    /// becomes eligible to run. Expressed as a fraction, e.g. `0.35` for 35%.
    pub frag_threshold: f64,

    /// Minimum number of free blocks before coalesce is eligible to run.
    pub min_blocks_to_coalesce: usize,

    /// Minimum frees since the last coalesce before it's eligible to run again.
    pub min_frees_between_coalesce: usize,

    /// Growth multiplier applied to capacity when a grow is needed and the
    /// requested size alone wouldn't justify a larger jump.
    pub growth_factor: f64,

    /// Overwrite freed bytes with a fill pattern before returning them to
    /// the free index. Catches accidental reads of freed storage; adds a
    /// pass over the freed extent on every `free`, so it's off by default.
    pub zero_on_free: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            frag_threshold: 0.35,
            min_blocks_to_coalesce: 8,
            min_frees_between_coalesce: 10,
            growth_factor: 1.5,
            zero_on_free: cfg!(debug_assertions),
        }
    }
}

impl PoolConfig {
    /// Production configuration: no debug fill pattern, default coalesce policy.
    pub fn production() -> Self {
        Self {
            zero_on_free: false,
            ..Self::default()
        }
    }

    /// Debug configuration: zero freed bytes and coalesce more eagerly, to
    /// surface use-after-free and fragmentation bugs sooner in test runs.
    pub fn debug() -> Self {
        Self {
            zero_on_free: true,
            min_blocks_to_coalesce: 2,
            min_frees_between_coalesce: 1,
            ..Self::default()
        }
    }

    pub fn with_frag_threshold(mut self, frag_threshold: f64) -> Self {
        self.frag_threshold = frag_threshold;
        self
    }

    pub fn with_growth_factor(mut self, growth_factor: f64) -> Self {
        self.growth_factor = growth_factor;
        self
    }
}

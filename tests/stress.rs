//! Randomized stress run over a long operation sequence, checking the
//! bookkeeping invariants hold under realistic allocate/free churn
//! (complements the proptest suite's shrinking-oriented search).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use string_arena::Pool;

#[test]
fn long_random_sequence_keeps_consistent_bookkeeping() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut pool = Pool::new(4096, true).unwrap();
    let mut live: Vec<u32> = Vec::new();

    for _ in 0..4000 {
        if live.is_empty() || rng.random_bool(0.6) {
            let len = rng.random_range(0..48);
            let units: Vec<u16> = (0..len).map(|_| rng.random()).collect();
            if let Ok(id) = pool.allocate_filled(&units) {
                if id != 0 {
                    live.push(id);
                }
                assert_eq!(pool.read(id).unwrap(), units);
            }
        } else {
            let idx = rng.random_range(0..live.len());
            let id = live.swap_remove(idx);
            pool.free(id);
        }

        assert_eq!(pool.active_allocations(), live.len());
    }

    for &id in &live {
        assert!(pool.read(id).is_ok());
    }
}

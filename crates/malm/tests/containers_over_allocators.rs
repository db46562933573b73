//! End-to-end flows across allocators and containers.

use std::cell::Cell;
use std::collections::HashMap;

use malm::prelude::*;

type Person<'s> = (&'s str, i32);

/// Allocator serving at most `budget` bytes in total, for failure
/// injection.
struct Budget {
    heap: Heap,
    remaining: Cell<usize>,
}

impl Budget {
    fn new(budget: usize) -> Self {
        Self {
            heap: Heap::new(),
            remaining: Cell::new(budget),
        }
    }
}

impl Alloc for Budget {
    fn resize(&self, existing: Option<RawBlock>, new_size: usize) -> Option<RawBlock> {
        let old = existing.map_or(0, |block| block.size());
        if new_size > old {
            let growth = new_size - old;
            if growth > self.remaining.get() {
                return None;
            }
            self.remaining.set(self.remaining.get() - growth);
        } else {
            self.remaining.set(self.remaining.get() + (old - new_size));
        }
        self.heap.resize(existing, new_size)
    }
}

#[test]
fn person_table_scenario() {
    let heap = Heap::new();
    let mut table: RobinHood<'_, Person<'_>, _, _> = RobinHood::new(&heap, 4, StrKeys).unwrap();
    let people = [
        ("carl", 23),
        ("chloe", 23),
        ("wyatt", 20),
        ("kagami", 18),
        ("konata", 18),
        ("tsukasa", 18),
    ];
    for person in people {
        table.insert(person).unwrap();
    }
    assert_eq!(table.len(), 6);
    for (name, age) in people {
        assert_eq!(table.get(name), Some(&(name, age)));
    }

    // Iteration visits each entry exactly once.
    let mut times_found = HashMap::new();
    for &(name, _) in table.iter() {
        *times_found.entry(name).or_insert(0u32) += 1;
    }
    assert_eq!(times_found.len(), 6);
    assert!(people.iter().all(|(name, _)| times_found[name] == 1));

    // Removal must leave every other entry reachable, including ones
    // that were displaced past the removed slot.
    assert_eq!(table.remove("wyatt"), Some(("wyatt", 20)));
    assert_eq!(table.get("wyatt"), None);
    assert_eq!(table.remove("tsukasa"), Some(("tsukasa", 18)));
    assert_eq!(table.get("tsukasa"), None);
    assert_eq!(table.len(), 4);
    for name in ["carl", "chloe", "kagami", "konata"] {
        assert!(table.get(name).is_some(), "{name} lost after removals");
    }
}

#[test]
fn failed_array_growth_is_atomic() {
    // Enough for the initial block (4 bytes) and one doubling (to 8),
    // not the next (to 16).
    let alloc = Budget::new(12);
    let mut array: Array<'_, u32, _> = Array::new(&alloc, 1).unwrap();
    array.push(1).unwrap();
    array.push(2).unwrap();

    let len = array.len();
    let capacity = array.capacity();
    let err = array.push(3).unwrap_err();
    assert!(matches!(err, CollectionError::AllocFailed { .. }));
    assert_eq!(array.len(), len);
    assert_eq!(array.capacity(), capacity);
    assert_eq!(array.as_slice(), &[1, 2]);

    // The array is still usable after the failure.
    let _ = array.pop();
    array.push(9).unwrap();
    assert_eq!(array.as_slice(), &[1, 9]);
}

#[test]
fn failed_set_growth_is_atomic() {
    // Budget covers the initial 4-capacity table and nothing more.
    let slot_bytes = 8 + std::mem::size_of::<(u64, u64)>();
    let alloc = Budget::new(5 * slot_bytes);
    let mut set: RobinHood<'_, (u64, u64), _, _> = RobinHood::new(&alloc, 4, U64Keys).unwrap();
    for key in 1..=3u64 {
        set.insert((key, key * 10)).unwrap();
    }

    let err = set.insert((4, 40)).unwrap_err();
    assert!(matches!(err, CollectionError::AllocFailed { .. }));
    assert_eq!(set.len(), 3);
    assert_eq!(set.capacity(), 4);
    for key in 1..=3u64 {
        assert_eq!(set.get(&key), Some(&(key, key * 10)));
    }
}

#[test]
fn array_over_an_arena_cannot_grow() {
    let mut buffer = [0u8; 128];
    let arena = Arena::new(&mut buffer).unwrap();
    let mut array: Array<'_, u32, dyn Alloc> = Array::new(arena.as_alloc(), 4).unwrap();
    array.extend_from_slice(&[1, 2, 3, 4]).unwrap();

    assert!(matches!(
        array.push(5),
        Err(CollectionError::AllocFailed { .. })
    ));
    assert_eq!(array.as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn arena_checkpoint_bounds_a_cycle() {
    let mut buffer = [0u8; 1024];
    let arena = Arena::new(&mut buffer).unwrap();
    let mark = arena.checkpoint();
    let full = arena.remaining();

    for _ in 0..8 {
        // One cycle: a handful of scratch allocations, then rewind.
        assert!(arena.alloc(100).is_some());
        assert!(arena.alloc(17).is_some());
        assert!(arena.alloc(256).is_some());
        arena.reset_to(mark);
        assert_eq!(arena.remaining(), full);
    }
}

#[test]
fn pools_cycle_and_clear() {
    let heap = Heap::new();
    let mut pool = DynPool::new(&heap, PoolConfig::new(32)).unwrap();
    let mut held = Vec::new();
    for _ in 0..100 {
        held.push(pool.alloc().unwrap());
    }
    assert_eq!(pool.chunk_count(), 100);
    assert_eq!(pool.block_count(), 2);

    for chunk in held.drain(50..) {
        pool.free(chunk).unwrap();
    }
    assert_eq!(pool.chunk_count(), 50);

    pool.fast_clear();
    assert!(pool.is_empty());
    assert_eq!(pool.chunk_count(), 0);

    // Tokens from before the clear are refused, not corrupting.
    let stale = held.pop().unwrap();
    assert!(matches!(pool.free(stale), Err(PoolError::StaleChunk { .. })));
    assert!(pool.is_empty());

    drop(held);
    drop(pool);
    assert_eq!(heap.live_bytes(), 0);
}

#[test]
fn fixed_pool_recycles_in_place() {
    // A buffer holding exactly one 24-byte chunk.
    let mut buffer = [0u8; 32];
    let pool = FixedPool::new(&mut buffer, 24).unwrap();
    assert_eq!(pool.chunk_capacity(), 1);
    let first = pool.alloc().unwrap();
    let ptr = first.as_ptr();
    pool.free(first);

    // alloc -> free -> alloc hands back the just-freed chunk.
    let second = pool.alloc().unwrap();
    assert_eq!(second.as_ptr(), ptr);
    pool.free(second);
    assert!(pool.is_empty());
}

#[test]
fn every_byte_returns_to_the_heap() {
    let heap = Heap::new();
    {
        let mut array: Array<'_, u64, Heap> = Array::new(&heap, 0).unwrap();
        let mut set = RobinHood::new(&heap, 2, U64Keys).unwrap();
        for value in 0..200u64 {
            array.push(value).unwrap();
            set.insert((value, value)).unwrap();
        }
        assert_eq!(array.len(), 200);
        assert_eq!(set.len(), 200);
        assert!(heap.live_bytes() > 0);
    }
    assert_eq!(heap.live_bytes(), 0);
}

//! Lifecycle of the process-wide arena.

use serial_test::serial;
use strata_arena::{global, ArenaConfig, ArenaError, BumpAllocator};
use strata_test_utils::init_logging;

fn fresh() {
    init_logging();
    global::reset();
    global::configure(ArenaConfig::default()).unwrap();
    global::reset();
}

fn identity() -> usize {
    global::with_instance(|bump| bump as *const BumpAllocator as usize).unwrap()
}

#[test]
#[serial]
fn uninitialized_active_uninitialized() {
    fresh();
    assert!(!global::is_initialized());

    global::allocate(16, 8).unwrap();
    assert!(global::is_initialized());

    global::reset();
    assert!(!global::is_initialized());

    global::allocate(16, 8).unwrap();
    assert!(global::is_initialized());
}

#[test]
#[serial]
fn consecutive_access_sees_same_instance() {
    fresh();
    let generation = global::generation();
    let a = identity();
    let b = identity();
    assert_eq!(a, b);
    assert_eq!(global::generation(), generation);
}

#[test]
#[serial]
fn global_scenario_with_reset() {
    fresh();
    let first = global::allocate(16, 8).unwrap();
    let second = global::allocate(3, 1).unwrap();
    assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 16);

    let generation = global::generation();
    global::reset();
    assert_eq!(global::generation(), generation + 1);

    let used = global::with_instance(BumpAllocator::allocated_bytes).unwrap();
    assert_eq!(used, 0);
}

#[test]
#[serial]
fn invalid_alignment_leaves_global_untouched() {
    fresh();
    global::allocate(5, 1).unwrap();
    let before = global::with_instance(BumpAllocator::allocated_bytes).unwrap();
    assert_eq!(
        global::allocate(16, 3),
        Err(ArenaError::InvalidAlignment { align: 3 })
    );
    let after = global::with_instance(BumpAllocator::allocated_bytes).unwrap();
    assert_eq!(before, after);
}

#[test]
#[serial]
fn configured_chunk_size_used_on_creation() {
    fresh();
    global::configure(ArenaConfig::new(256)).unwrap();
    global::allocate(300, 8).unwrap();
    let chunks = global::with_instance(BumpAllocator::chunk_count).unwrap();
    assert_eq!(chunks, 2);
    fresh();
}

#[test]
#[serial]
fn threads_share_one_instance() {
    fresh();
    let main_identity = identity();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                for _ in 0..100 {
                    global::allocate(24, 8).unwrap();
                }
                identity()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), main_identity);
    }
    let used = global::with_instance(BumpAllocator::allocated_bytes).unwrap();
    assert_eq!(used, 4 * 100 * 24);
}

#[test]
#[serial]
fn panicking_closure_does_not_wedge_the_lock() {
    fresh();
    let result = std::panic::catch_unwind(|| {
        global::with_instance(|_| panic!("inside the lock")).unwrap();
    });
    assert!(result.is_err());
    global::allocate(8, 8).unwrap();
}

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use inany::{ConvertingAny, SmallAny, StorageMode};

/// Counts allocations made by the current thread and can be told to fail
/// allocations of one particular size.
pub struct TracingAllocator;

thread_local! {
    static ALLOCS: Cell<isize> = const { Cell::new(0) };
    static LIVE: Cell<isize> = const { Cell::new(0) };
    static FAIL_SIZE: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for TracingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == FAIL_SIZE.with(Cell::get) {
            return std::ptr::null_mut();
        }
        ALLOCS.with(|c| c.set(c.get() + 1));
        LIVE.with(|c| c.set(c.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        LIVE.with(|c| c.set(c.get() - 1));
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
pub static ALLOCATOR: TracingAllocator = TracingAllocator;

fn allocs() -> isize {
    ALLOCS.with(Cell::get)
}

fn live() -> isize {
    LIVE.with(Cell::get)
}

/// Runs `f` with allocations of `Odd` failing.
fn failing<R>(f: impl FnOnce() -> R) -> R {
    FAIL_SIZE.with(|c| c.set(std::mem::size_of::<Odd>()));
    let result = f();
    FAIL_SIZE.with(|c| c.set(0));
    result
}

#[derive(Clone, Debug, PartialEq)]
struct Big {
    a: f64,
    b: f64,
}

/// Payload with a size nothing else allocates.
#[derive(Clone, Debug, PartialEq)]
struct Odd([u8; 97]);

#[test]
fn value_mode_does_not_allocate() {
    let before = allocs();

    let a = SmallAny::new(42usize);
    let b = a.clone();
    let mut c = ConvertingAny::new(7u8);
    let d = c.take();
    assert_eq!(d.convert::<u64>(), Some(7));
    drop((a, b, c, d));

    assert_eq!(allocs(), before);
}

#[test]
fn referential_mode_allocates_once_per_payload() {
    let before = allocs();
    let live_before = live();

    let a = SmallAny::new(Big { a: 1.0, b: 2.0 });
    assert_eq!(a.storage_mode(), Some(StorageMode::Referential));
    assert_eq!(allocs(), before + 1);

    let b = a.clone();
    assert_eq!(allocs(), before + 2);

    let mut c = b.clone();
    let d = c.take();
    assert_eq!(allocs(), before + 3);

    let value = d.downcast::<Big>().ok().unwrap();
    assert_eq!(value, Big { a: 1.0, b: 2.0 });

    drop((a, b, c));
    assert_eq!(live(), live_before);
}

#[test]
fn allocation_failure_is_reported() {
    let err = failing(|| SmallAny::try_new(Odd([1; 97]))).unwrap_err();
    assert_eq!(err.layout(), Layout::new::<Odd>());

    // Inline values don't need the allocator.
    let small = failing(|| SmallAny::try_new(5u32)).unwrap();
    assert_eq!(small.get::<u32>(), Ok(&5));
}

#[test]
fn failed_clone_leaves_source_intact() {
    let a = ConvertingAny::new(Odd([3; 97]));
    let live_before = live();

    let result = failing(|| a.try_clone());
    assert!(result.is_err());
    assert_eq!(live(), live_before);
    assert_eq!(a.get::<Odd>(), Ok(&Odd([3; 97])));

    let b = SmallAny::new(Odd([4; 97]));
    let live_before = live();

    let err = failing(|| b.try_clone()).unwrap_err();
    assert_eq!(err.layout(), Layout::new::<Odd>());
    assert_eq!(live(), live_before);
    assert_eq!(b.get::<Odd>(), Ok(&Odd([4; 97])));
    assert!(b.try_clone().is_ok());

    let mut target = SmallAny::new(1u8);
    let err = failing(|| target.try_set(Odd([0; 97]))).unwrap_err();
    assert_eq!(err.layout().size(), std::mem::size_of::<Odd>());
    assert_eq!(target.get::<u8>(), Ok(&1));
}

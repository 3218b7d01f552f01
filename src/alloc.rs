//! The allocation policy abstraction used for blocks and the block directory.
//!
//! A [`SegmentedDeque`] does not call the global allocator directly; every
//! allocation goes through an [`AllocPolicy`]. The default policy, [`Heap`],
//! forwards to [`std::alloc`]. A custom policy can redirect storage to an
//! arena, instrument allocations in tests, or add alignment padding.
//!
//! [`SegmentedDeque`]: crate::SegmentedDeque

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// A source of raw memory for a deque's blocks and directory.
///
/// Implementations hand out uninitialized memory; element lifecycle
/// (construction and destruction) is managed by the container on top of it.
///
/// The policy is `Clone` because a cloned deque carries a clone of its
/// policy, mirroring the original container.
///
/// # Contract
///
/// * `allocate` never returns memory that is too small or misaligned for
///   `layout`. It does not return at all on failure: it must divert to
///   [`std::alloc::handle_alloc_error`] (or panic), leaving the caller's
///   data structures untouched.
/// * `deallocate` must be called with a pointer previously returned by
///   `allocate` on a policy it is compatible with, and the same layout.
pub trait AllocPolicy: Clone {
    /// Allocates a chunk of uninitialized memory for `layout`.
    ///
    /// `layout` always has a non-zero size; containers never ask a policy
    /// for zero-sized or zero-count allocations.
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// Releases a chunk previously obtained from [`allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` with the same `layout`, and must not
    /// be used afterwards.
    ///
    /// [`allocate`]: AllocPolicy::allocate
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The default allocation policy: the process heap via [`std::alloc`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Heap;

impl AllocPolicy for Heap {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() != 0);
        match NonNull::new(unsafe { alloc::alloc(layout) }) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Allocates an uninitialized array of `n` values of `T`.
pub(crate) fn alloc_array<T, A: AllocPolicy>(alloc: &A, n: usize) -> NonNull<T> {
    debug_assert!(n != 0 && std::mem::size_of::<T>() != 0);
    let layout = Layout::array::<T>(n).unwrap();
    alloc.allocate(layout).cast()
}

/// Releases an array previously obtained from [`alloc_array`] with the same `n`.
pub(crate) unsafe fn dealloc_array<T, A: AllocPolicy>(alloc: &A, ptr: NonNull<T>, n: usize) {
    let layout = Layout::array::<T>(n).unwrap();
    unsafe { alloc.deallocate(ptr.cast(), layout) }
}

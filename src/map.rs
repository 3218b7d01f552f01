//! The block directory: a growable array of block handles with headroom at
//! both ends, so the deque can gain blocks at either end without moving any
//! element.
//!
//! Growing the directory copies only the handles (one pointer per block) and
//! re-centers them in the larger array; the blocks themselves never move.

use std::ptr::{self, NonNull};

use crate::alloc::{alloc_array, dealloc_array, AllocPolicy};
use crate::cursor::{block_capacity, Cursor};

/// The directory plus the allocation policy it draws from.
///
/// The map owns the directory *array*; the blocks its live slots point to
/// are owned by the deque, which frees them before the map is dropped
/// (only the deque knows which slots are live).
pub(crate) struct BlockMap<T, A: AllocPolicy> {
    slots: NonNull<NonNull<T>>,
    cap: usize,
    pub alloc: A,
}

impl<T, A: AllocPolicy> BlockMap<T, A> {
    /// A map with no directory. The resting state for zero-sized `T`.
    pub fn unallocated(alloc: A) -> Self {
        BlockMap {
            slots: NonNull::dangling(),
            cap: 0,
            alloc,
        }
    }

    /// Allocates a directory of `map_size` uninitialized handle slots.
    pub fn with_capacity(map_size: usize, alloc: A) -> Self {
        let slots = alloc_array::<NonNull<T>, A>(&alloc, map_size);
        BlockMap {
            slots,
            cap: map_size,
            alloc,
        }
    }

    /// Directory length (`map_size`).
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Pointer to the first directory slot.
    pub fn base(&self) -> *mut NonNull<T> {
        self.slots.as_ptr()
    }

    /// Index of a cursor's directory slot within this map.
    ///
    /// # Safety
    ///
    /// The cursor must point into this map's directory.
    pub unsafe fn node_index(&self, cursor: &Cursor<T>) -> usize {
        unsafe { cursor.node.offset_from(self.base()) as usize }
    }

    /// Allocates one element block.
    pub fn alloc_block(&self) -> NonNull<T> {
        alloc_array::<T, A>(&self.alloc, block_capacity::<T>())
    }

    /// Releases one element block. All elements in it must already be dead.
    pub unsafe fn dealloc_block(&self, block: NonNull<T>) {
        unsafe { dealloc_array::<T, A>(&self.alloc, block, block_capacity::<T>()) }
    }

    /// Grows the directory so that at least `add_front` free slots exist
    /// before `start`'s block and `add_back` after `finish`'s block,
    /// re-centering the live handle run and repointing both cursors.
    ///
    /// The new size is `old + max(old, add_front + add_back)`: doubling or
    /// more, which amortizes growth to O(1) per end-insertion. The new
    /// directory is fully built before the old one is released, and element
    /// blocks are untouched, so a failed allocation diverts with the deque
    /// still in its prior state.
    ///
    /// # Safety
    ///
    /// `start` and `finish` must be this map's live cursor pair.
    pub unsafe fn grow(
        &mut self,
        start: &mut Cursor<T>,
        finish: &mut Cursor<T>,
        add_front: usize,
        add_back: usize,
    ) {
        let old_size = self.cap;
        let old_nodes = unsafe { finish.node.offset_from(start.node) as usize } + 1;
        let new_size = old_size + old_size.max(add_front + add_back);

        let new_slots = alloc_array::<NonNull<T>, A>(&self.alloc, new_size);

        // Center the run within the slack left after the requested headroom,
        // so both ends keep room to grow before the next reallocation.
        let slack = new_size - old_nodes - add_front - add_back;
        let run_index = add_front + slack / 2;

        unsafe {
            ptr::copy_nonoverlapping(start.node, new_slots.as_ptr().add(run_index), old_nodes);
            dealloc_array(&self.alloc, self.slots, old_size);
        }
        self.slots = new_slots;
        self.cap = new_size;

        // Same in-block offsets, new directory slots.
        unsafe {
            let start_offset = start.cur.offset_from(start.first);
            let finish_offset = finish.cur.offset_from(finish.first);
            start.set_node(new_slots.as_ptr().add(run_index));
            start.cur = start.first.offset(start_offset);
            finish.set_node(new_slots.as_ptr().add(run_index + old_nodes - 1));
            finish.cur = finish.first.offset(finish_offset);
        }
    }
}

impl<T, A: AllocPolicy> Drop for BlockMap<T, A> {
    fn drop(&mut self) {
        if self.cap != 0 {
            unsafe {
                dealloc_array(&self.alloc, self.slots, self.cap);
            }
        }
    }
}

//! The raw cursor: a position inside the block-indirected storage.
//!
//! A cursor knows the slot it points at (`cur`), the bounds of the block
//! that slot lives in (`first`/`last`), and the directory slot that block
//! hangs off (`node`). Stepping across a block boundary re-derives the
//! block bounds from the directory; jumping by an arbitrary offset is a
//! division by the block capacity.
//!
//! Cursors are plain `Copy` pointer bundles with no lifetime. They are only
//! ever handed out wrapped in iterators that borrow the deque, so the borrow
//! checker rules out use across a directory reallocation.

use std::ptr::NonNull;

pub(crate) const fn is_zst<T>() -> bool {
    std::mem::size_of::<T>() == 0
}

/// Number of element slots in one block: 512 bytes worth of `T`, at least
/// one slot for oversized `T`. Zero-sized `T` never allocates blocks; the
/// reported capacity is the usable length limit instead.
pub(crate) const fn block_capacity<T>() -> usize {
    let size = std::mem::size_of::<T>();
    if size == 0 {
        usize::MAX
    } else if size < 512 {
        512 / size
    } else {
        1
    }
}

/// A position in a deque's storage.
///
/// Invariant for a cursor placed on live storage: `first <= cur <= last`,
/// `last == first + block_capacity::<T>()`, and `node` addresses the
/// directory slot holding `first`'s block.
///
/// For zero-sized `T` no blocks exist; `cur` is a dangling pointer whose
/// address doubles as an element counter (the `std::vec::IntoIter`
/// technique), and the other fields are unused.
pub(crate) struct Cursor<T> {
    pub cur: *mut T,
    pub first: *mut T,
    pub last: *mut T,
    pub node: *mut NonNull<T>,
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Cursor<T> {}

impl<T> Cursor<T> {
    /// A cursor not attached to any storage. Used as the resting state for
    /// zero-sized `T`, where `cur`'s address counts elements.
    pub fn dangling() -> Self {
        let dangling = NonNull::dangling().as_ptr();
        Cursor {
            cur: dangling,
            first: dangling,
            last: dangling,
            node: std::ptr::null_mut(),
        }
    }

    /// Re-targets the cursor at the block in directory slot `node`,
    /// leaving `cur` untouched.
    ///
    /// # Safety
    ///
    /// `node` must point at a directory slot holding a valid block handle.
    pub unsafe fn set_node(&mut self, node: *mut NonNull<T>) {
        self.node = node;
        self.first = unsafe { (*node).as_ptr() };
        self.last = unsafe { self.first.add(block_capacity::<T>()) };
    }

    /// Places the cursor on slot `index` of the block in directory slot `node`.
    ///
    /// # Safety
    ///
    /// Same as [`set_node`]; `index` must be at most the block capacity.
    ///
    /// [`set_node`]: Cursor::set_node
    pub unsafe fn at(node: *mut NonNull<T>, index: usize) -> Self {
        let mut cursor = Cursor::dangling();
        unsafe {
            cursor.set_node(node);
            cursor.cur = cursor.first.add(index);
        }
        cursor
    }

    /// Steps one element forward, hopping to the next block when the current
    /// one is exhausted.
    ///
    /// # Safety
    ///
    /// The position one past `self` must be inside the live directory run
    /// (at worst the one-past-the-end position of the sequence).
    pub unsafe fn bump_up(&mut self) {
        unsafe {
            self.cur = self.cur.add(1);
            if self.cur == self.last {
                self.set_node(self.node.add(1));
                self.cur = self.first;
            }
        }
    }

    /// Steps one element backward, hopping to the previous block when the
    /// current slot is the block's first.
    ///
    /// # Safety
    ///
    /// The position one before `self` must be inside the live directory run.
    pub unsafe fn bump_down(&mut self) {
        unsafe {
            if self.cur == self.first {
                self.set_node(self.node.sub(1));
                self.cur = self.last;
            }
            self.cur = self.cur.sub(1);
        }
    }

    /// Returns the cursor `n` elements away.
    ///
    /// The target block index is the floor of the element offset over the
    /// block capacity; plain integer division truncates toward zero, so a
    /// negative remainder borrows one block.
    ///
    /// # Safety
    ///
    /// The target position must be inside the live directory run (at worst
    /// the one-past-the-end position).
    pub unsafe fn offset(mut self, n: isize) -> Self {
        let cap = block_capacity::<T>() as isize;
        let offset = unsafe { self.cur.offset_from(self.first) } + n;
        let mut block = offset / cap;
        let mut index = offset % cap;
        if index < 0 {
            index += cap;
            block -= 1;
        }
        unsafe {
            self.set_node(self.node.offset(block));
            self.cur = self.first.offset(index);
        }
        self
    }

    /// Number of elements from `other` up to `self`.
    ///
    /// # Safety
    ///
    /// Both cursors must point into the same deque's storage.
    pub unsafe fn distance_from(&self, other: &Self) -> isize {
        let cap = block_capacity::<T>() as isize;
        unsafe {
            let block_diff = self.node.offset_from(other.node);
            let cur_diff = self.cur.offset_from(self.first) - other.cur.offset_from(other.first);
            block_diff * cap + cur_diff
        }
    }

    /// Whether two cursors denote the same position.
    ///
    /// Under the normalized-end invariant a logical position has exactly one
    /// representation, so comparing the slot pointers suffices. This also
    /// holds for the zero-sized-`T` counter encoding.
    pub fn same_pos(&self, other: &Self) -> bool {
        self.cur == other.cur
    }

    /// Sequence order of two positions: by directory slot, tie-broken by the
    /// in-block slot. Consistent with element order even though blocks are
    /// scattered in memory.
    pub fn precedes_or_is(&self, other: &Self) -> bool {
        match (self.node, other.node) {
            (a, b) if a == b => self.cur <= other.cur,
            (a, b) => a < b,
        }
    }
}

#![warn(missing_docs)]
#![doc(test(attr(deny(warnings))))]

//! A double-ended queue over fixed-size storage blocks.
//!
//! # [`SegmentedDeque`] vs [`VecDeque`]
//!
//! ## Stable element addresses
//!
//! The standard [`VecDeque`] keeps all elements in one ring buffer, so
//! growing it moves every element to a new allocation. [`SegmentedDeque`]
//! stores elements in independently allocated blocks of 512 bytes and keeps
//! a small directory of block pointers. Growing the deque at either end
//! allocates a new block and, at worst, reallocates the *directory*; the
//! elements themselves never move.
//!
//! ## Mid-sequence insertion
//!
//! Inserting or removing in the middle shifts whichever side of the split
//! point is cheaper to move, so at most `min(i, len - i)` elements are
//! moved, and the other side keeps its addresses.
//!
//! ## The cost
//!
//! Elements are not contiguous, so a `SegmentedDeque` cannot be borrowed as
//! a single slice, and random access resolves through the directory (an
//! integer division plus one extra pointer hop).
//!
//! [`VecDeque`]: std::collections::VecDeque

use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Bound, Index, IndexMut, RangeBounds};
use std::ptr::{self, NonNull};

use cursor::{block_capacity, is_zst, Cursor};
use map::BlockMap;

mod alloc;
mod cursor;
mod iter;
mod map;

#[cfg(test)]
mod test_support;

pub use alloc::{AllocPolicy, Heap};
pub use iter::{Drain, IntoIter, Iter, IterMut};

/// A double-ended queue implemented with fixed-size blocks behind a block
/// directory.
///
/// A `SegmentedDeque` with a known list of items can be initialized from an
/// array:
///
/// ```
/// use segmented_deque::SegmentedDeque;
///
/// # #[allow(unused)]
/// let deq = SegmentedDeque::from([-1, 0, 1]);
/// ```
///
/// Pushing at either end is amortized O(1) and never moves existing
/// elements; indexing and iteration cost O(1) per element despite the
/// non-contiguous storage.
pub struct SegmentedDeque<T, A: AllocPolicy = Heap> {
    map: BlockMap<T, A>,
    start: Cursor<T>,
    finish: Cursor<T>,
    marker: PhantomData<T>,
}

unsafe impl<T: Send, A: AllocPolicy + Send> Send for SegmentedDeque<T, A> {}
unsafe impl<T: Sync, A: AllocPolicy + Sync> Sync for SegmentedDeque<T, A> {}

impl<T> SegmentedDeque<T> {
    /// Creates an empty deque.
    ///
    /// One block is pre-allocated, so the first pushes at either end are
    /// pure writes.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    /// # #[allow(unused)]
    /// let deque: SegmentedDeque<u32> = SegmentedDeque::new();
    /// ```
    pub fn new() -> Self {
        Self::new_in(Heap)
    }

    /// Creates an empty deque with block and directory space for `capacity`
    /// elements pushed at the back, so filling it to that point triggers no
    /// directory growth.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque: SegmentedDeque<u32> = SegmentedDeque::with_capacity(1000);
    /// for i in 0..1000 {
    ///     deque.push_back(i);
    /// }
    /// assert_eq!(deque.len(), 1000);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Heap)
    }

    /// Creates a deque holding `count` clones of `value`.
    ///
    /// Storage is sized for exactly `count` elements up front.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let deque = SegmentedDeque::from_elem('x', 3);
    /// assert_eq!(deque, ['x', 'x', 'x']);
    /// ```
    pub fn from_elem(value: T, count: usize) -> Self
    where
        T: Clone,
    {
        let mut deque = Self::with_capacity(count);
        if count > 0 {
            for _ in 1..count {
                deque.push_back(value.clone());
            }
            deque.push_back(value);
        }
        deque
    }

    /// Creates a deque holding `count` default-constructed elements.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let deque: SegmentedDeque<i32> = SegmentedDeque::with_default(4);
    /// assert_eq!(deque, [0, 0, 0, 0]);
    /// ```
    pub fn with_default(count: usize) -> Self
    where
        T: Default,
    {
        let mut deque = Self::with_capacity(count);
        deque.extend((0..count).map(|_| T::default()));
        deque
    }
}

impl<T, A: AllocPolicy> SegmentedDeque<T, A> {
    /// Creates an empty deque drawing storage from `alloc`.
    pub fn new_in(alloc: A) -> Self {
        if is_zst::<T>() {
            return SegmentedDeque {
                map: BlockMap::unallocated(alloc),
                start: Cursor::dangling(),
                finish: Cursor::dangling(),
                marker: PhantomData,
            };
        }
        Self::with_block_run(0, alloc)
    }

    /// Creates an empty deque with storage for `capacity` back-pushes,
    /// drawing from `alloc`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        if is_zst::<T>() {
            return Self::new_in(alloc);
        }
        Self::with_block_run(capacity, alloc)
    }

    /// Returns a deep copy of the deque drawing storage from `alloc`.
    ///
    /// This is the only copy that can change the allocation policy; a plain
    /// [`clone`](Clone::clone) keeps a clone of the source's policy.
    pub fn clone_in(&self, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut clone = Self::with_capacity_in(self.len(), alloc);
        for value in self {
            clone.push_back(value.clone());
        }
        clone
    }

    /// Returns the allocation policy this deque draws storage from.
    pub fn allocator(&self) -> &A {
        &self.map.alloc
    }

    /// Returns the number of elements in the deque.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let deque = SegmentedDeque::from([1, 2, 3]);
    /// assert_eq!(deque.len(), 3);
    /// ```
    pub fn len(&self) -> usize {
        if is_zst::<T>() {
            (self.finish.cur as usize).wrapping_sub(self.start.cur as usize)
        } else {
            unsafe { self.finish.distance_from(&self.start) as usize }
        }
    }

    /// Returns `true` if the deque holds no elements.
    pub fn is_empty(&self) -> bool {
        self.start.same_pos(&self.finish)
    }

    /// Returns a reference to the element at `index`, or `None` if `index`
    /// is out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let deque = SegmentedDeque::from([1, 2, 3]);
    /// assert_eq!(deque.get(1), Some(&2));
    /// assert_eq!(deque.get(3), None);
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        if is_zst::<T>() {
            return Some(unsafe { &*NonNull::<T>::dangling().as_ptr() });
        }
        unsafe { Some(&*self.start.offset(index as isize).cur) }
    }

    /// Returns a mutable reference to the element at `index`, or `None` if
    /// `index` is out of range.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len() {
            return None;
        }
        if is_zst::<T>() {
            return Some(unsafe { &mut *NonNull::<T>::dangling().as_ptr() });
        }
        unsafe { Some(&mut *self.start.offset(index as isize).cur) }
    }

    /// Provides a reference to the front element, or `None` if the deque is
    /// empty.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut d = SegmentedDeque::new();
    /// assert_eq!(d.front(), None);
    ///
    /// d.push_back(1);
    /// d.push_back(2);
    /// assert_eq!(d.front(), Some(&1));
    /// ```
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }

    /// Provides a mutable reference to the front element, or `None` if the
    /// deque is empty.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(0)
    }

    /// Provides a reference to the back element, or `None` if the deque is
    /// empty.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut d = SegmentedDeque::new();
    /// assert_eq!(d.back(), None);
    ///
    /// d.push_back(1);
    /// d.push_back(2);
    /// assert_eq!(d.back(), Some(&2));
    /// ```
    pub fn back(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Provides a mutable reference to the back element, or `None` if the
    /// deque is empty.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.len()
            .checked_sub(1)
            .and_then(move |last| self.get_mut(last))
    }

    /// Prepends an element to the deque.
    ///
    /// Amortized O(1); existing elements are never moved.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut d = SegmentedDeque::new();
    /// d.push_front(1);
    /// d.push_front(2);
    /// assert_eq!(d.front(), Some(&2));
    /// ```
    pub fn push_front(&mut self, value: T) {
        if is_zst::<T>() {
            unsafe { Self::zst_write(value) };
            self.zst_grow(1);
            return;
        }
        unsafe {
            if self.start.cur == self.start.first {
                self.new_front_block();
            }
            let slot = self.start.cur.sub(1);
            ptr::write(slot, value);
            self.start.cur = slot;
        }
    }

    /// Appends an element to the back of the deque.
    ///
    /// Amortized O(1); existing elements are never moved.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut buf = SegmentedDeque::new();
    /// buf.push_back(1);
    /// buf.push_back(3);
    /// assert_eq!(3, *buf.back().unwrap());
    /// ```
    pub fn push_back(&mut self, value: T) {
        if is_zst::<T>() {
            unsafe { Self::zst_write(value) };
            self.zst_grow(1);
            return;
        }
        unsafe {
            ptr::write(self.finish.cur, value);
            self.extend_finish_one();
        }
    }

    /// Removes the first element and returns it, or `None` if the deque is
    /// empty.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut d = SegmentedDeque::new();
    /// d.push_back(1);
    /// d.push_back(2);
    ///
    /// assert_eq!(d.pop_front(), Some(1));
    /// assert_eq!(d.pop_front(), Some(2));
    /// assert_eq!(d.pop_front(), None);
    /// ```
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        if is_zst::<T>() {
            self.zst_shrink(1);
            return Some(unsafe { Self::zst_read() });
        }
        unsafe {
            let value = ptr::read(self.start.cur);
            self.advance_start_one();
            Some(value)
        }
    }

    /// Removes the last element from the deque and returns it, or `None` if
    /// it is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut buf = SegmentedDeque::new();
    /// assert_eq!(buf.pop_back(), None);
    /// buf.push_back(1);
    /// buf.push_back(3);
    /// assert_eq!(buf.pop_back(), Some(3));
    /// ```
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        if is_zst::<T>() {
            self.zst_shrink(1);
            return Some(unsafe { Self::zst_read() });
        }
        unsafe {
            self.retreat_finish_one();
            Some(ptr::read(self.finish.cur))
        }
    }

    /// Inserts an element at `index`, shifting whichever side of the split
    /// point is cheaper to move.
    ///
    /// A boundary block with spare room on exactly one side tips the choice
    /// toward that side; otherwise the smaller half moves, so at most
    /// `min(index, len - index)` elements are shifted. Element at index 0
    /// is the front of the queue.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than the deque's length.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::new();
    /// deque.push_back('a');
    /// deque.push_back('b');
    /// deque.push_back('c');
    /// assert_eq!(deque, ['a', 'b', 'c']);
    ///
    /// deque.insert(1, 'd');
    /// assert_eq!(deque, ['a', 'd', 'b', 'c']);
    /// ```
    pub fn insert(&mut self, index: usize, value: T) {
        let len = self.len();
        assert!(index <= len, "index out of bounds");

        if index == 0 {
            return self.push_front(value);
        }
        if index == len {
            return self.push_back(value);
        }
        if is_zst::<T>() {
            unsafe { Self::zst_write(value) };
            self.zst_grow(1);
            return;
        }

        let front_spare = self.start.cur != self.start.first;
        let back_spare = unsafe { self.finish.cur.add(1) } != self.finish.last;
        let shift_front = match (front_spare, back_spare) {
            (true, false) => true,
            (false, true) => false,
            _ => index * 2 < len,
        };

        unsafe {
            if shift_front {
                if self.start.cur == self.start.first {
                    self.new_front_block();
                }
                self.start.cur = self.start.cur.sub(1);

                let mut dst = self.start;
                let mut src = self.start;
                src.bump_up();
                for _ in 0..index {
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                    dst.bump_up();
                    src.bump_up();
                }
                ptr::write(dst.cur, value);
            } else {
                self.extend_finish_one();

                let mut src = self.finish.offset(-1);
                let mut dst = self.finish;
                for _ in 0..(len - index) {
                    src.bump_down();
                    dst.bump_down();
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                }
                ptr::write(src.cur, value);
            }
        }
    }

    /// Inserts `count` clones of `value` at `index` with a single bulk
    /// shift of the cheaper side.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than the deque's length.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::from([1, 4]);
    /// deque.insert_from_elem(1, 2, 2);
    /// assert_eq!(deque, [1, 2, 2, 4]);
    /// ```
    pub fn insert_from_elem(&mut self, index: usize, value: T, count: usize)
    where
        T: Clone,
    {
        assert!(index <= self.len(), "index out of bounds");
        self.splice(index, vec![value; count]);
    }

    /// Inserts every element of `iter` at `index`, in order, with a single
    /// bulk shift of the cheaper side.
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than the deque's length.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::from([1, 5]);
    /// deque.insert_many(1, [2, 3, 4]);
    /// assert_eq!(deque, [1, 2, 3, 4, 5]);
    /// ```
    pub fn insert_many<I: IntoIterator<Item = T>>(&mut self, index: usize, iter: I) {
        assert!(index <= self.len(), "index out of bounds");
        self.splice(index, iter.into_iter().collect());
    }

    /// Removes and returns the element at `index`, or `None` if `index` is
    /// out of bounds. Whichever side of the removal point is smaller is
    /// shifted to close the hole.
    ///
    /// Element at index 0 is the front of the queue.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut buf = SegmentedDeque::from([1, 2, 3]);
    ///
    /// assert_eq!(buf.remove(1), Some(2));
    /// assert_eq!(buf, [1, 3]);
    /// ```
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let len = self.len();
        if index >= len {
            return None;
        }
        if is_zst::<T>() {
            self.zst_shrink(1);
            return Some(unsafe { Self::zst_read() });
        }
        unsafe {
            let pos = self.start.offset(index as isize);
            let value = ptr::read(pos.cur);

            if index < len - index - 1 {
                // fewer elements before the hole: shift them up
                let mut dst = pos;
                let mut src = pos;
                for _ in 0..index {
                    src.bump_down();
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                    dst.bump_down();
                }
                self.advance_start_one();
            } else {
                let mut dst = pos;
                let mut src = pos;
                for _ in 0..(len - index - 1) {
                    src.bump_up();
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                    dst.bump_up();
                }
                self.retreat_finish_one();
            }
            Some(value)
        }
    }

    /// Removes the elements in `range` in bulk, returning them as an
    /// iterator. When the iterator is dropped, any unconsumed elements are
    /// dropped, the gap is closed by shifting the smaller remaining part,
    /// and blocks left wholly outside the live range are released.
    ///
    /// # Panics
    ///
    /// Panics if the range's start is greater than its end or its end is
    /// greater than the deque's length.
    ///
    /// # Leaking
    ///
    /// If the returned iterator goes out of scope without being dropped
    /// (due to [`std::mem::forget`], for example), the deque is left valid
    /// but may have lost and leaked elements arbitrarily, including
    /// elements outside the range.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::from([1, 2, 3, 4, 5]);
    /// let drained: Vec<_> = deque.drain(1..4).collect();
    /// assert_eq!(drained, [2, 3, 4]);
    /// assert_eq!(deque, [1, 5]);
    /// ```
    pub fn drain<R: RangeBounds<usize>>(&mut self, range: R) -> Drain<'_, T, A> {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&i) => i + 1,
            Bound::Excluded(&i) => i,
            Bound::Unbounded => len,
        };
        assert!(start <= end && end <= len, "drain range out of bounds");
        Drain::new(self, start, end)
    }

    /// Clears the deque, removing all values.
    ///
    /// All blocks but one are released; the retained block keeps the next
    /// pushes allocation-free.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::new();
    /// deque.push_back(1);
    /// deque.clear();
    /// assert!(deque.is_empty());
    /// ```
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
        if !is_zst::<T>() {
            self.start.cur = self.start.first;
            self.finish = self.start;
        }
    }

    /// Shortens the deque, keeping the first `len` elements and dropping
    /// the rest.
    ///
    /// If `len` is greater than the deque's current length, this has no
    /// effect.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut buf = SegmentedDeque::from([5, 10, 15]);
    /// buf.truncate_back(1);
    /// assert_eq!(buf, [5]);
    /// ```
    pub fn truncate_back(&mut self, len: usize) {
        while self.len() > len {
            self.pop_back();
        }
    }

    /// Shortens the deque, keeping the last `len` elements and dropping
    /// the rest.
    ///
    /// If `len` is greater than the deque's current length, this has no
    /// effect.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut buf = SegmentedDeque::from([5, 10, 15]);
    /// buf.truncate_front(1);
    /// assert_eq!(buf, [15]);
    /// ```
    pub fn truncate_front(&mut self, len: usize) {
        while self.len() > len {
            self.pop_front();
        }
    }

    /// Replaces the contents with the elements of `iter`, reusing storage.
    ///
    /// Existing elements are overwritten in place; a surplus tail is
    /// dropped (releasing wholly-vacated blocks), a deficit is filled by
    /// pushing at the back.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::from([1, 2, 3, 4]);
    /// deque.assign([7, 8]);
    /// assert_eq!(deque, [7, 8]);
    /// ```
    pub fn assign<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let mut iter = iter.into_iter();
        let mut kept = 0;
        for slot in self.iter_mut() {
            match iter.next() {
                Some(value) => {
                    *slot = value;
                    kept += 1;
                }
                None => break,
            }
        }
        if kept < self.len() {
            self.truncate_back(kept);
        } else {
            for value in iter {
                self.push_back(value);
            }
        }
    }

    /// Replaces the contents with `count` clones of `value`, reusing
    /// storage like [`assign`](SegmentedDeque::assign).
    pub fn assign_elem(&mut self, value: T, count: usize)
    where
        T: Clone,
    {
        self.assign(std::iter::repeat(value).take(count));
    }

    /// Returns a front-to-back iterator.
    ///
    /// Reverse iteration is `deque.iter().rev()`.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let deque = SegmentedDeque::from([1, 2, 3]);
    /// let collected: Vec<i32> = deque.iter().copied().collect();
    /// assert_eq!(collected, [1, 2, 3]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.start, self.len())
    }

    /// Returns a front-to-back iterator of mutable references.
    ///
    /// # Example
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let mut deque = SegmentedDeque::from([1, 2, 3]);
    /// for value in deque.iter_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(deque, [10, 20, 30]);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.start, self.len())
    }
}

// Internal machinery. Everything below upholds the storage invariants:
// `[start, finish)` is exactly the live elements, every directory slot in
// `start.node..=finish.node` holds an allocated block, and `finish` always
// rests on a writable slot (`finish.cur < finish.last`).
impl<T, A: AllocPolicy> SegmentedDeque<T, A> {
    /// An empty deque whose directory has room for `capacity_for` elements
    /// worth of back growth. Allocates the directory and the first block.
    fn with_block_run(capacity_for: usize, alloc: A) -> Self {
        debug_assert!(!is_zst::<T>());
        let nblocks = capacity_for / block_capacity::<T>() + 1;
        let map = BlockMap::with_capacity(nblocks + 2, alloc);
        unsafe {
            let first_node = map.base().add(1);
            first_node.write(map.alloc_block());
            let start = Cursor::at(first_node, 0);
            SegmentedDeque {
                map,
                start,
                finish: start,
                marker: PhantomData,
            }
        }
    }

    /// Allocates a block in front of `start`'s block, growing the directory
    /// first if its front headroom is exhausted. Leaves `start.cur` at the
    /// new block's one-past-last slot; the caller claims slots from there.
    unsafe fn new_front_block(&mut self) {
        unsafe {
            if self.map.node_index(&self.start) == 0 {
                self.map.grow(&mut self.start, &mut self.finish, 1, 0);
            }
            let node = self.start.node.sub(1);
            node.write(self.map.alloc_block());
            self.start.set_node(node);
            self.start.cur = self.start.last;
        }
    }

    /// Allocates a block after `finish`'s block, growing the directory
    /// first if its back headroom is exhausted, and parks `finish` on the
    /// new block's first slot.
    unsafe fn new_back_block(&mut self) {
        unsafe {
            if self.map.node_index(&self.finish) == self.map.capacity() - 1 {
                self.map.grow(&mut self.start, &mut self.finish, 0, 1);
            }
            let node = self.finish.node.add(1);
            node.write(self.map.alloc_block());
            self.finish.set_node(node);
            self.finish.cur = self.finish.first;
        }
    }

    /// Advances `finish` past a slot that was just written, keeping it on a
    /// writable slot (allocating the next block when the write filled the
    /// current one).
    unsafe fn extend_finish_one(&mut self) {
        unsafe {
            if self.finish.cur.add(1) == self.finish.last {
                self.new_back_block();
            } else {
                self.finish.cur = self.finish.cur.add(1);
            }
        }
    }

    /// Steps `start` forward off a consumed slot, releasing its block when
    /// the step leaves the block.
    unsafe fn advance_start_one(&mut self) {
        unsafe {
            if self.start.cur.add(1) == self.start.last {
                let vacated = *self.start.node;
                self.start.set_node(self.start.node.add(1));
                self.start.cur = self.start.first;
                self.map.dealloc_block(vacated);
            } else {
                self.start.cur = self.start.cur.add(1);
            }
        }
    }

    /// Steps `finish` back onto the last live slot, releasing the block it
    /// vacates when it crosses a boundary.
    unsafe fn retreat_finish_one(&mut self) {
        unsafe {
            if self.finish.cur == self.finish.first {
                let vacated = *self.finish.node;
                self.finish.set_node(self.finish.node.sub(1));
                self.finish.cur = self.finish.last;
                self.map.dealloc_block(vacated);
            }
            self.finish.cur = self.finish.cur.sub(1);
        }
    }

    /// Makes `count` slots reachable before `start` without moving it:
    /// allocates the blocks (and directory headroom) that
    /// `start.offset(-count)` will land in.
    unsafe fn reserve_front(&mut self, count: usize) {
        let room = unsafe { self.start.cur.offset_from(self.start.first) } as usize;
        if room >= count {
            return;
        }
        let need_blocks = (count - room).div_ceil(block_capacity::<T>());
        unsafe {
            if self.map.node_index(&self.start) < need_blocks {
                self.map
                    .grow(&mut self.start, &mut self.finish, need_blocks, 0);
            }
            for i in 1..=need_blocks {
                self.start.node.sub(i).write(self.map.alloc_block());
            }
        }
    }

    /// Makes `count` slots reachable at and after `finish.cur`, plus one
    /// more for the advanced `finish` itself: allocates the blocks that
    /// `finish.offset(count)` will land in.
    unsafe fn reserve_back(&mut self, count: usize) {
        let room = unsafe { self.finish.last.offset_from(self.finish.cur) } as usize;
        if room > count {
            return;
        }
        let need_blocks = (count + 1 - room).div_ceil(block_capacity::<T>());
        unsafe {
            if self.map.node_index(&self.finish) + need_blocks > self.map.capacity() - 1 {
                self.map
                    .grow(&mut self.start, &mut self.finish, 0, need_blocks);
            }
            for i in 1..=need_blocks {
                self.finish.node.add(i).write(self.map.alloc_block());
            }
        }
    }

    /// Bulk insert: opens a `count`-wide gap at `index` by shifting the
    /// cheaper side once, then moves `items` in. `items` is pre-collected
    /// so no user code runs while the gap holds uninitialized slots.
    fn splice(&mut self, index: usize, items: Vec<T>) {
        let count = items.len();
        if count == 0 {
            return;
        }
        if count == 1 {
            let mut items = items;
            if let Some(value) = items.pop() {
                self.insert(index, value);
            }
            return;
        }
        if is_zst::<T>() {
            for value in items {
                unsafe { Self::zst_write(value) };
            }
            self.zst_grow(count);
            return;
        }
        unsafe {
            self.open_gap(index, count);
            let mut dst = self.start.offset(index as isize);
            for value in items {
                ptr::write(dst.cur, value);
                dst.bump_up();
            }
        }
    }

    /// Turns `[index, index + count)` into uninitialized slots inside the
    /// live range, shifting the cheaper side of the split point.
    unsafe fn open_gap(&mut self, index: usize, count: usize) {
        let len = self.len();
        let front_room = unsafe { self.start.cur.offset_from(self.start.first) } as usize;
        let back_room = unsafe { self.finish.last.offset_from(self.finish.cur) } as usize;
        let shift_front = match (front_room >= count, back_room > count) {
            (true, false) => true,
            (false, true) => false,
            _ => index * 2 < len,
        };
        unsafe {
            if shift_front {
                self.reserve_front(count);
                let new_start = self.start.offset(-(count as isize));
                let mut dst = new_start;
                let mut src = self.start;
                for _ in 0..index {
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                    dst.bump_up();
                    src.bump_up();
                }
                self.start = new_start;
            } else {
                self.reserve_back(count);
                let new_finish = self.finish.offset(count as isize);
                let mut src = self.finish;
                let mut dst = new_finish;
                for _ in 0..(len - index) {
                    src.bump_down();
                    dst.bump_down();
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                }
                self.finish = new_finish;
            }
        }
    }

    /// Closes the gap a [`Drain`] leaves behind: shifts the smaller of the
    /// two remaining parts over the drained range, restores `start` and
    /// `finish`, and releases blocks left wholly outside the live range.
    ///
    /// # Safety
    ///
    /// `orig_start`/`orig_finish` must be the cursors this deque held when
    /// the drain began, with all blocks of that range still allocated, and
    /// the `removed` elements starting at `front_len` already dead.
    pub(crate) unsafe fn close_gap(
        &mut self,
        orig_start: Cursor<T>,
        orig_finish: Cursor<T>,
        front_len: usize,
        removed: usize,
        orig_len: usize,
    ) {
        if is_zst::<T>() {
            self.start = Cursor::dangling();
            self.finish = Cursor::dangling();
            self.zst_grow(orig_len - removed);
            return;
        }
        if removed == 0 {
            self.start = orig_start;
            self.finish = orig_finish;
            return;
        }
        let tail_len = orig_len - front_len - removed;
        unsafe {
            if front_len <= tail_len {
                let mut src = orig_start.offset(front_len as isize);
                let mut dst = src.offset(removed as isize);
                for _ in 0..front_len {
                    src.bump_down();
                    dst.bump_down();
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                }
                let new_start = orig_start.offset(removed as isize);
                let mut node = orig_start.node;
                while node < new_start.node {
                    self.map.dealloc_block(*node);
                    node = node.add(1);
                }
                self.start = new_start;
                self.finish = orig_finish;
            } else {
                let mut src = orig_start.offset((front_len + removed) as isize);
                let mut dst = orig_start.offset(front_len as isize);
                for _ in 0..tail_len {
                    ptr::copy_nonoverlapping(src.cur, dst.cur, 1);
                    src.bump_up();
                    dst.bump_up();
                }
                let new_finish = dst;
                let mut node = new_finish.node;
                while node < orig_finish.node {
                    node = node.add(1);
                    self.map.dealloc_block(*node);
                }
                self.start = orig_start;
                self.finish = new_finish;
            }
        }
        debug_assert!(self.start.precedes_or_is(&self.finish));
    }

    // Zero-sized elements: no blocks exist, `finish.cur`'s address is the
    // element count, and values are written to / read from the dangling
    // pointer so `Drop` types stay balanced.

    fn zst_grow(&mut self, n: usize) {
        self.finish.cur = self.finish.cur.wrapping_byte_add(n);
    }

    fn zst_shrink(&mut self, n: usize) {
        self.finish.cur = self.finish.cur.wrapping_byte_sub(n);
    }

    unsafe fn zst_write(value: T) {
        unsafe { ptr::write(NonNull::<T>::dangling().as_ptr(), value) }
    }

    unsafe fn zst_read() -> T {
        unsafe { ptr::read(NonNull::<T>::dangling().as_ptr()) }
    }
}

impl<T, A: AllocPolicy> Drop for SegmentedDeque<T, A> {
    fn drop(&mut self) {
        while self.pop_back().is_some() {}
        if !is_zst::<T>() {
            // the one block popping everything leaves behind
            unsafe { self.map.dealloc_block(*self.start.node) };
        }
    }
}

impl<T: Clone, A: AllocPolicy> Clone for SegmentedDeque<T, A> {
    fn clone(&self) -> Self {
        self.clone_in(self.map.alloc.clone())
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source.iter().cloned());
    }
}

impl<T, A: AllocPolicy + Default> Default for SegmentedDeque<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: std::fmt::Debug, A: AllocPolicy> std::fmt::Debug for SegmentedDeque<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, A: AllocPolicy> Index<usize> for SegmentedDeque<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "index out of bounds: the len is {} but the index is {}",
                self.len(),
                index
            ),
        }
    }
}

impl<T, A: AllocPolicy> IndexMut<usize> for SegmentedDeque<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index out of bounds: the len is {len} but the index is {index}"),
        }
    }
}

impl<T, A: AllocPolicy> IntoIterator for SegmentedDeque<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, A: AllocPolicy> IntoIterator for &'a SegmentedDeque<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: AllocPolicy> IntoIterator for &'a mut SegmentedDeque<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: AllocPolicy> Extend<T> for SegmentedDeque<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for SegmentedDeque<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        // An exact size hint lets the directory be sized up front; a
        // single-pass source grows incrementally instead.
        let mut deque = match iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Self::with_capacity(lower),
            _ => Self::new(),
        };
        for value in iter {
            deque.push_back(value);
        }
        deque
    }
}

impl<T, const N: usize> From<[T; N]> for SegmentedDeque<T> {
    /// Converts a `[T; N]` into a `SegmentedDeque<T>`.
    ///
    /// ```
    /// use segmented_deque::SegmentedDeque;
    ///
    /// let deq = SegmentedDeque::from([1, 2, 3, 4]);
    /// assert_eq!(deq, [1, 2, 3, 4]);
    /// ```
    fn from(value: [T; N]) -> Self {
        Self::from_iter(value)
    }
}

impl<T> From<Vec<T>> for SegmentedDeque<T> {
    /// Turns a [`Vec<T>`] into a [`SegmentedDeque<T>`].
    fn from(value: Vec<T>) -> Self {
        Self::from_iter(value)
    }
}

macro_rules! impl_partial_eq {
    ([$($vars:tt)*] $rhs:ty) => {
        impl<T, U, A, $($vars)*> PartialEq<$rhs> for SegmentedDeque<T, A>
        where
            T: PartialEq<U>,
            A: AllocPolicy,
        {
            fn eq(&self, other: &$rhs) -> bool {
                self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
            }
        }
    };
}

impl_partial_eq!([const N: usize] [U; N]);
impl_partial_eq!([const N: usize] &[U; N]);
impl_partial_eq!([] &[U]);
impl_partial_eq!([] &mut [U]);
impl_partial_eq!([] Vec<U>);

impl<T, U, A, B> PartialEq<SegmentedDeque<U, B>> for SegmentedDeque<T, A>
where
    T: PartialEq<U>,
    A: AllocPolicy,
    B: AllocPolicy,
{
    fn eq(&self, other: &SegmentedDeque<U, B>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq, A: AllocPolicy> Eq for SegmentedDeque<T, A> {}

impl<T: PartialOrd, A: AllocPolicy> PartialOrd for SegmentedDeque<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, A: AllocPolicy> Ord for SegmentedDeque<T, A> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, A: AllocPolicy> Hash for SegmentedDeque<T, A> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for value in self {
            value.hash(state);
        }
    }
}

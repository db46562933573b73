//! Growable contiguous array over an allocator handle.

use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use malm_core::{Alloc, RawBlock};

use crate::error::CollectionError;

/// Contiguous homogeneous storage with amortized O(1) append.
///
/// Every byte comes from the allocator handle the array is created
/// over; the handle must outlive the array. Growth doubles the
/// capacity until a request fits, and commits the new block and
/// capacity only after the backing resize has succeeded — a failed
/// growth leaves length, capacity, and contents exactly as they were.
///
/// There is no shrink-to-fit; storage is released in one step when the
/// array is dropped.
pub struct Array<'a, T, A: Alloc + ?Sized> {
    alloc: &'a A,
    block: Option<RawBlock>,
    len: usize,
    capacity: usize,
    _elems: PhantomData<T>,
}

impl<'a, T, A: Alloc + ?Sized> std::fmt::Debug for Array<'a, T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<'a, T, A: Alloc + ?Sized> Array<'a, T, A> {
    /// Create an array with an initial capacity.
    ///
    /// Capacity 0 defers the first allocation to the first append.
    pub fn new(alloc: &'a A, capacity: usize) -> Result<Self, CollectionError> {
        crate::check_layout::<T>()?;
        let block = if capacity > 0 {
            let bytes = capacity
                .checked_mul(std::mem::size_of::<T>())
                .ok_or(CollectionError::CapacityOverflow)?;
            Some(
                alloc
                    .alloc(bytes)
                    .ok_or(CollectionError::AllocFailed { requested: bytes })?,
            )
        } else {
            None
        };
        Ok(Self {
            alloc,
            block,
            len: 0,
            capacity,
            _elems: PhantomData,
        })
    }

    fn data(&self) -> *mut T {
        match &self.block {
            Some(block) => block.as_ptr().cast::<T>(),
            None => NonNull::dangling().as_ptr(),
        }
    }

    /// Grow (if needed) so that `needed` elements fit.
    ///
    /// Capacity and block are committed only after the resize succeeds.
    fn ensure_capacity(&mut self, needed: usize) -> Result<(), CollectionError> {
        if needed <= self.capacity {
            return Ok(());
        }
        let mut new_capacity = self.capacity.max(1);
        while new_capacity < needed {
            new_capacity = new_capacity
                .checked_mul(2)
                .ok_or(CollectionError::CapacityOverflow)?;
        }
        let bytes = new_capacity
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(CollectionError::CapacityOverflow)?;
        let block = self
            .alloc
            .resize(self.block, bytes)
            .ok_or(CollectionError::AllocFailed { requested: bytes })?;
        self.block = Some(block);
        self.capacity = new_capacity;
        Ok(())
    }

    /// Append one element.
    pub fn push(&mut self, value: T) -> Result<(), CollectionError> {
        self.ensure_capacity(self.len.checked_add(1).ok_or(CollectionError::CapacityOverflow)?)?;
        // SAFETY: len < capacity after ensure_capacity, so the slot is
        // inside the block and unoccupied.
        unsafe { self.data().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Append `items.len()` elements, copied from `items`.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), CollectionError>
    where
        T: Copy,
    {
        let needed = self
            .len
            .checked_add(items.len())
            .ok_or(CollectionError::CapacityOverflow)?;
        self.ensure_capacity(needed)?;
        // SAFETY: capacity covers len + items.len(); source and
        // destination cannot overlap because the array owns its block.
        unsafe {
            ptr::copy_nonoverlapping(items.as_ptr(), self.data().add(self.len), items.len());
        }
        self.len = needed;
        Ok(())
    }

    /// Grow capacity for `additional` more elements without committing
    /// any.
    ///
    /// This is the append-without-items mode: reserve space, fill it in
    /// place through [`as_mut_slice`](Array::as_mut_slice) after a
    /// [`set_len`](Array::set_len), or push into it without further
    /// allocation.
    pub fn reserve(&mut self, additional: usize) -> Result<(), CollectionError> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(CollectionError::CapacityOverflow)?;
        self.ensure_capacity(needed)
    }

    /// Set the length directly.
    ///
    /// # Safety
    ///
    /// `new_len` must not exceed the capacity, and the first `new_len`
    /// elements must be initialized.
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity);
        self.len = new_len;
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the element at the old last index is initialized, and
        // shrinking len first makes this a move out.
        Some(unsafe { self.data().add(self.len).read() })
    }

    /// Remove the last `out.len()` elements, copying them into `out` in
    /// storage order.
    ///
    /// Returns `false`, removing nothing, if the array holds fewer
    /// elements than `out` wants.
    pub fn pop_slice(&mut self, out: &mut [T]) -> bool
    where
        T: Copy,
    {
        if out.len() > self.len {
            return false;
        }
        self.len -= out.len();
        // SAFETY: the removed tail [len, len + out.len()) is initialized
        // and no longer reachable through the array.
        unsafe {
            ptr::copy_nonoverlapping(self.data().add(self.len), out.as_mut_ptr(), out.len());
        }
        true
    }

    /// Shorten the array to `new_len` elements, dropping the tail.
    ///
    /// Does nothing when `new_len >= len`.
    pub fn truncate(&mut self, new_len: usize) {
        while self.len > new_len {
            self.len -= 1;
            // SAFETY: each popped slot is initialized and dropped once.
            unsafe { ptr::drop_in_place(self.data().add(self.len)) };
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements the current block can hold without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first len elements are initialized.
        unsafe { std::slice::from_raw_parts(self.data(), self.len) }
    }

    /// The elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first len elements are initialized and exclusively
        // borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.data(), self.len) }
    }

    /// Bytes held by the backing block.
    pub fn memory_bytes(&self) -> usize {
        self.block.map_or(0, |block| block.size())
    }
}

impl<T, A: Alloc + ?Sized> Drop for Array<'_, T, A> {
    fn drop(&mut self) {
        self.truncate(0);
        if let Some(block) = self.block.take() {
            self.alloc.release(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use malm_alloc::{Arena, Heap};

    #[test]
    fn push_pop_round_trip() {
        let heap = Heap::new();
        let mut array: Array<'_, u32, _> = Array::new(&heap, 1).unwrap();
        array.extend_from_slice(&[1, 2, 3]).unwrap();
        assert_eq!(array.len(), 3);
        assert!(array.capacity() >= 3);
        assert!(array.capacity() > 1, "growth must have happened");

        let mut out = [0u32; 2];
        assert!(array.pop_slice(&mut out));
        assert_eq!(out, [2, 3]);
        assert_eq!(array.as_slice(), &[1]);
    }

    #[test]
    fn growth_doubles_until_the_request_fits() {
        let heap = Heap::new();
        let mut array: Array<'_, u8, _> = Array::new(&heap, 1).unwrap();
        // A 100-element append through capacity 1 needs several doublings
        // in one call.
        array.extend_from_slice(&[7u8; 100]).unwrap();
        assert_eq!(array.len(), 100);
        assert!(array.capacity() >= 100);
        assert_eq!(array.capacity(), 128);
    }

    #[test]
    fn len_never_exceeds_capacity() {
        let heap = Heap::new();
        let mut array: Array<'_, u64, _> = Array::new(&heap, 0).unwrap();
        for i in 0..100 {
            array.push(i).unwrap();
            assert!(array.len() <= array.capacity());
        }
        for _ in 0..50 {
            array.pop();
            assert!(array.len() <= array.capacity());
        }
    }

    #[test]
    fn pop_slice_refuses_oversized_out() {
        let heap = Heap::new();
        let mut array: Array<'_, u32, _> = Array::new(&heap, 4).unwrap();
        array.extend_from_slice(&[1, 2]).unwrap();
        let mut out = [0u32; 3];
        assert!(!array.pop_slice(&mut out));
        assert_eq!(array.as_slice(), &[1, 2]);
    }

    #[test]
    fn truncate_drops_the_tail() {
        let heap = Heap::new();
        let mut array: Array<'_, String, _> = Array::new(&heap, 2).unwrap();
        array.push("keep".to_string()).unwrap();
        array.push("drop".to_string()).unwrap();
        array.truncate(1);
        assert_eq!(array.as_slice(), &["keep".to_string()]);
        array.truncate(5);
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn reserve_grows_without_committing_length() {
        let heap = Heap::new();
        let mut array: Array<'_, u32, _> = Array::new(&heap, 0).unwrap();
        array.reserve(10).unwrap();
        assert_eq!(array.len(), 0);
        assert!(array.capacity() >= 10);
        let capacity = array.capacity();
        for i in 0..10 {
            array.push(i).unwrap();
        }
        // No further allocation was needed.
        assert_eq!(array.capacity(), capacity);
    }

    #[test]
    fn failed_growth_leaves_the_array_intact() {
        let mut buffer = [0u8; 64];
        let arena = Arena::new(&mut buffer).unwrap();
        let mut array: Array<'_, u32, _> = Array::new(&arena, 2).unwrap();
        array.extend_from_slice(&[1, 2]).unwrap();

        // The arena refuses resize requests, so growth must fail and
        // change nothing.
        let err = array.push(3).unwrap_err();
        assert!(matches!(err, CollectionError::AllocFailed { .. }));
        assert_eq!(array.len(), 2);
        assert_eq!(array.capacity(), 2);
        assert_eq!(array.as_slice(), &[1, 2]);
    }

    #[test]
    fn drop_returns_storage_to_the_allocator() {
        let heap = Heap::new();
        {
            let mut array: Array<'_, u64, _> = Array::new(&heap, 8).unwrap();
            array.push(1).unwrap();
            assert!(heap.live_bytes() > 0);
        }
        assert_eq!(heap.live_bytes(), 0);
    }

    #[test]
    fn zero_sized_elements_are_rejected() {
        let heap = Heap::new();
        assert_eq!(
            Array::<(), _>::new(&heap, 4).unwrap_err(),
            CollectionError::ZeroSizedElement
        );
    }

    #[test]
    fn overaligned_elements_are_rejected() {
        #[repr(align(16))]
        struct Wide(#[allow(dead_code)] [u8; 16]);
        let heap = Heap::new();
        assert_eq!(
            Array::<Wide, _>::new(&heap, 4).unwrap_err(),
            CollectionError::AlignTooLarge { align: 16 }
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn matches_a_reference_vec(
                ops in proptest::collection::vec(
                    prop_oneof![
                        (any::<u32>()).prop_map(Some),
                        Just(None),
                    ],
                    1..128,
                ),
            ) {
                let heap = Heap::new();
                let mut array: Array<'_, u32, _> = Array::new(&heap, 1).unwrap();
                let mut reference = Vec::new();
                for op in ops {
                    match op {
                        Some(value) => {
                            array.push(value).unwrap();
                            reference.push(value);
                        }
                        None => {
                            prop_assert_eq!(array.pop(), reference.pop());
                        }
                    }
                    prop_assert!(array.len() <= array.capacity());
                    prop_assert_eq!(array.as_slice(), reference.as_slice());
                }
            }
        }
    }
}

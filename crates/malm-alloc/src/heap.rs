//! General-purpose heap adapter.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use malm_core::{Alloc, RawBlock, BLOCK_ALIGN};

/// [`Alloc`] adapter over the process heap.
///
/// Blocks come from `std::alloc` with [`BLOCK_ALIGN`] layouts. The
/// handle keeps a running count of live bytes, so tests and callers can
/// verify that containers return everything they took.
///
/// Interior state lives in `Cell`s so the handle can be shared by
/// reference; the type is intentionally not `Sync`.
pub struct Heap {
    live: Cell<usize>,
}

impl Heap {
    /// Create a heap handle with zero live bytes.
    pub fn new() -> Self {
        Self {
            live: Cell::new(0),
        }
    }

    /// Bytes currently allocated through this handle.
    pub fn live_bytes(&self) -> usize {
        self.live.get()
    }

    fn layout(size: usize) -> Option<Layout> {
        Layout::from_size_align(size, BLOCK_ALIGN).ok()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Alloc for Heap {
    fn resize(&self, existing: Option<RawBlock>, new_size: usize) -> Option<RawBlock> {
        match (existing, new_size) {
            (None, 0) => None,
            (None, size) => {
                let layout = Self::layout(size)?;
                // SAFETY: layout has nonzero size (size > 0 in this arm).
                let ptr = NonNull::new(unsafe { alloc::alloc(layout) })?;
                self.live.set(self.live.get() + size);
                Some(RawBlock::new(ptr, size))
            }
            (Some(block), 0) => {
                let layout = Self::layout(block.size())
                    .expect("released block was allocated with a valid layout");
                // SAFETY: `block` was produced by this allocator with the
                // same size and alignment, and the caller hands ownership
                // back by passing it here.
                unsafe { alloc::dealloc(block.as_ptr(), layout) };
                self.live.set(self.live.get() - block.size());
                None
            }
            (Some(block), size) => {
                let old_layout = Self::layout(block.size())
                    .expect("resized block was allocated with a valid layout");
                // Reject sizes no layout can describe before touching the block.
                Self::layout(size)?;
                // SAFETY: `block` was produced by this allocator with
                // `old_layout`, and `size` is nonzero and layout-valid. On
                // failure realloc leaves the original allocation intact.
                let ptr = NonNull::new(unsafe { alloc::realloc(block.as_ptr(), old_layout, size) })?;
                self.live.set(self.live.get() - block.size() + size);
                Some(RawBlock::new(ptr, size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_release_returns_to_zero() {
        let heap = Heap::new();
        let block = heap.alloc(100).unwrap();
        assert_eq!(heap.live_bytes(), 100);
        heap.release(block);
        assert_eq!(heap.live_bytes(), 0);
    }

    #[test]
    fn zero_size_requests_yield_no_block() {
        let heap = Heap::new();
        assert!(heap.resize(None, 0).is_none());
        assert_eq!(heap.live_bytes(), 0);
    }

    #[test]
    fn blocks_are_aligned() {
        let heap = Heap::new();
        let block = heap.alloc(24).unwrap();
        assert_eq!(block.as_ptr() as usize % BLOCK_ALIGN, 0);
        heap.release(block);
    }

    #[test]
    fn resize_preserves_contents() {
        let heap = Heap::new();
        let block = heap.alloc(8).unwrap();
        // SAFETY: the block is 8 bytes and exclusively ours.
        unsafe {
            block.as_ptr().cast::<u64>().write(0xdead_beef);
        }
        let grown = heap.resize(Some(block), 64).unwrap();
        // SAFETY: resize preserves min(old, new) bytes.
        let value = unsafe { grown.as_ptr().cast::<u64>().read() };
        assert_eq!(value, 0xdead_beef);
        assert_eq!(heap.live_bytes(), 64);
        heap.release(grown);
        assert_eq!(heap.live_bytes(), 0);
    }
}

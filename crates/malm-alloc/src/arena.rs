//! Bump arena over a caller buffer.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use malm_core::{align_down, align_up, Alloc, RawBlock, BLOCK_ALIGN};

use crate::error::ArenaError;

/// Bump allocator cutting 8-byte-aligned pieces from the top of a
/// caller buffer.
///
/// The arena does not own the buffer; it borrows it for `'buf` and
/// keeps a cursor that only ever moves toward the buffer start. There
/// is no per-object release — the only way back is
/// [`reset_to`](Arena::reset_to) with a previously taken
/// [`checkpoint`](Arena::checkpoint), which invalidates everything
/// allocated after that checkpoint. The caller must not touch memory
/// handed out before a rewind it intends to reuse.
///
/// Through [`Alloc`] the arena serves the allocate mode only: any
/// resize or free request against an existing block returns `None`
/// unconditionally, because arena memory is never moved or individually
/// reclaimed. Growable containers therefore cannot grow over an arena
/// handle.
pub struct Arena<'buf> {
    /// Start of the aligned usable span.
    base: NonNull<u8>,
    /// Length of the usable span in bytes (a multiple of 8).
    len: usize,
    /// Offset of the lowest live allocation from `base`; `len` when empty.
    cursor: Cell<usize>,
    _buf: PhantomData<&'buf mut [u8]>,
}

impl<'buf> Arena<'buf> {
    /// Set up an arena over `buffer`.
    ///
    /// The usable span is the buffer trimmed to [`BLOCK_ALIGN`]
    /// boundaries on both ends; the trim is the arena's bookkeeping
    /// overhead. Fails with [`ArenaError::BufferTooSmall`] when nothing
    /// remains after trimming.
    pub fn new(buffer: &'buf mut [u8]) -> Result<Self, ArenaError> {
        let addr = buffer.as_mut_ptr() as usize;
        let start = align_up(addr, BLOCK_ALIGN);
        let end = align_down(addr + buffer.len(), BLOCK_ALIGN);
        if start >= end {
            return Err(ArenaError::BufferTooSmall {
                provided: buffer.len(),
            });
        }

        // SAFETY: start lies within the buffer (start < end <= addr + len),
        // so offsetting the buffer pointer to it stays in bounds and nonnull.
        let base = unsafe { NonNull::new_unchecked(buffer.as_mut_ptr().add(start - addr)) };
        Ok(Self {
            base,
            len: end - start,
            cursor: Cell::new(end - start),
            _buf: PhantomData,
        })
    }

    /// Cut `size` bytes from the top of the arena.
    ///
    /// The cursor moves down by `size` rounded up to 8 bytes. Returns
    /// `None`, with the cursor unchanged, when the request would pass
    /// the buffer start — or when `size` is zero.
    pub fn alloc(&self, size: usize) -> Option<RawBlock> {
        if size == 0 {
            return None;
        }
        let cursor = self.cursor.get();
        let new_cursor = align_down(cursor.checked_sub(size)?, BLOCK_ALIGN);
        self.cursor.set(new_cursor);
        // SAFETY: new_cursor < len, so the offset stays inside the span.
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(new_cursor)) };
        Some(RawBlock::new(ptr, size))
    }

    /// Record the current cursor for a later rewind.
    pub fn checkpoint(&self) -> ArenaMark {
        ArenaMark(self.cursor.get())
    }

    /// Rewind unconditionally to a previously taken checkpoint.
    ///
    /// Every allocation made after the checkpoint becomes dead space to
    /// be reused; the caller must not retain references into it.
    pub fn reset_to(&self, mark: ArenaMark) {
        self.cursor.set(mark.0);
    }

    /// Bytes still available to allocate.
    pub fn remaining(&self) -> usize {
        self.cursor.get()
    }

    /// Total usable bytes in the arena.
    pub fn capacity(&self) -> usize {
        self.len
    }

    /// Borrow the arena as a plain allocator handle.
    pub fn as_alloc(&self) -> &dyn Alloc {
        self
    }
}

impl Alloc for Arena<'_> {
    fn resize(&self, existing: Option<RawBlock>, new_size: usize) -> Option<RawBlock> {
        match existing {
            None if new_size > 0 => self.alloc(new_size),
            // Arena memory is never moved or individually reclaimed.
            _ => None,
        }
    }
}

/// Cursor checkpoint for [`Arena::reset_to`].
///
/// Only obtainable from [`Arena::checkpoint`], so a rewind target is
/// always a cursor value the arena actually had.
#[derive(Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ArenaMark(usize);

impl fmt::Debug for ArenaMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArenaMark({})", self.0)
    }
}

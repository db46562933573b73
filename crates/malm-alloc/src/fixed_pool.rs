//! Fixed-size chunk pool over a single caller buffer.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use malm_core::{align_up, BLOCK_ALIGN};

use crate::error::PoolError;

/// Free-list terminator stored inside the last free chunk.
const LINK_NONE: u64 = u64::MAX;

/// Pool of uniform chunks carved from one caller buffer, no growth.
///
/// The element size is padded to [`BLOCK_ALIGN`] so a free chunk has
/// room for the free-list link that is stored inside it; the chunk
/// count is derived from the padded size. Allocation hands out
/// never-used chunks first by bumping an index, then falls back to the
/// free-list head, so the most recently freed chunk is reused first.
///
/// Chunks are returned as [`PoolChunk`] tokens that borrow the pool:
/// freeing consumes the token, which makes a double free a compile
/// error, and [`fast_clear`](FixedPool::fast_clear) takes `&mut self`,
/// which makes clearing while chunks are outstanding a compile error.
pub struct FixedPool<'buf> {
    base: NonNull<u8>,
    chunk_size: usize,
    chunk_capacity: usize,
    /// Index of the next never-used chunk.
    bump: Cell<usize>,
    /// Head of the free list, as a chunk index.
    free_head: Cell<Option<usize>>,
    live: Cell<usize>,
    _buf: PhantomData<&'buf mut [u8]>,
}

impl<'buf> FixedPool<'buf> {
    /// Set up a pool of `elem_size`-byte chunks over `buffer`.
    ///
    /// Fails with [`PoolError::InvalidElemSize`] for a zero element
    /// size, or [`PoolError::BufferTooSmall`] when not even one padded
    /// chunk fits in the aligned part of the buffer.
    pub fn new(buffer: &'buf mut [u8], elem_size: usize) -> Result<Self, PoolError> {
        if elem_size == 0 {
            return Err(PoolError::InvalidElemSize);
        }
        let chunk_size = align_up(elem_size, BLOCK_ALIGN);

        let addr = buffer.as_mut_ptr() as usize;
        let start = align_up(addr, BLOCK_ALIGN);
        let usable = (addr + buffer.len()).saturating_sub(start);
        let chunk_capacity = usable / chunk_size;
        if chunk_capacity == 0 {
            return Err(PoolError::BufferTooSmall {
                provided: buffer.len(),
                required: chunk_size,
            });
        }

        // SAFETY: start lies within the buffer, so offsetting the buffer
        // pointer to it stays in bounds and nonnull.
        let base = unsafe { NonNull::new_unchecked(buffer.as_mut_ptr().add(start - addr)) };
        Ok(Self {
            base,
            chunk_size,
            chunk_capacity,
            bump: Cell::new(0),
            free_head: Cell::new(None),
            live: Cell::new(0),
            _buf: PhantomData,
        })
    }

    fn chunk_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.chunk_capacity);
        // SAFETY: index < chunk_capacity keeps the offset inside the span.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index * self.chunk_size)) }
    }

    /// Hand out one chunk, or `None` once the buffer is exhausted.
    pub fn alloc(&self) -> Option<PoolChunk<'_>> {
        let index = if self.bump.get() < self.chunk_capacity {
            let index = self.bump.get();
            self.bump.set(index + 1);
            index
        } else {
            let head = self.free_head.get()?;
            // SAFETY: a free chunk stores the next-free link in its first
            // 8 bytes; the chunk start is 8-aligned (aligned base, padded
            // chunk size).
            let link = unsafe { self.chunk_ptr(head).as_ptr().cast::<u64>().read() };
            self.free_head
                .set((link != LINK_NONE).then(|| link as usize));
            head
        };

        self.live.set(self.live.get() + 1);
        Some(PoolChunk {
            ptr: self.chunk_ptr(index),
            index,
            _pool: PhantomData,
        })
    }

    /// Return a chunk to the pool; it becomes the next one handed out.
    ///
    /// # Panics
    ///
    /// Panics if the token comes from a different pool.
    pub fn free(&self, chunk: PoolChunk<'_>) {
        assert!(
            chunk.index < self.chunk_capacity && chunk.ptr == self.chunk_ptr(chunk.index),
            "chunk does not belong to this pool"
        );
        let link = match self.free_head.get() {
            Some(head) => head as u64,
            None => LINK_NONE,
        };
        // SAFETY: the chunk is within this pool (asserted above), 8-aligned,
        // and at least 8 bytes; it is no longer in use, so overwriting its
        // first bytes with the link is fine.
        unsafe { chunk.ptr.as_ptr().cast::<u64>().write(link) };
        self.free_head.set(Some(chunk.index));
        self.live.set(self.live.get() - 1);
    }

    /// Whether no chunks are currently live.
    pub fn is_empty(&self) -> bool {
        self.live.get() == 0
    }

    /// Forget every allocation without touching chunk memory.
    ///
    /// Takes `&mut self`, so outstanding [`PoolChunk`] tokens must be
    /// freed (or dropped) first.
    pub fn fast_clear(&mut self) {
        self.bump.set(0);
        self.free_head.set(None);
        self.live.set(0);
    }

    /// Number of chunks currently live.
    pub fn live_chunks(&self) -> usize {
        self.live.get()
    }

    /// Total chunks the buffer holds.
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Bytes one padded chunk occupies.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

/// Move-only token for a chunk handed out by a [`FixedPool`].
///
/// Holding the token is holding the chunk: it cannot be copied, and
/// [`FixedPool::free`] consumes it. Dropping a token without freeing
/// leaks the chunk until the next
/// [`fast_clear`](FixedPool::fast_clear).
#[must_use]
pub struct PoolChunk<'p> {
    ptr: NonNull<u8>,
    index: usize,
    _pool: PhantomData<&'p ()>,
}

impl PoolChunk<'_> {
    /// Base pointer of the chunk.
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Base pointer of the chunk as a raw pointer.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl fmt::Debug for PoolChunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolChunk({:p})", self.ptr.as_ptr())
    }
}

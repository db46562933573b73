//! Dynamic pool: fixed-size chunks across a growing list of blocks.

use std::fmt;
use std::ptr::NonNull;

use smallvec::SmallVec;

use malm_core::{Alloc, RawBlock};

use crate::config::{PoolConfig, CHUNK_HEADER};
use crate::error::PoolError;

/// Free-list terminator stored in a free chunk's header.
const LINK_NONE: u64 = u64::MAX;

/// One block of chunks plus its bookkeeping.
///
/// Storage lives in `buf`, obtained from the backing allocator; the
/// bookkeeping lives here, addressed by block index. Spare-list links
/// are indices into the pool's block list.
struct Block {
    buf: RawBlock,
    /// Index of the next never-used chunk.
    bump: usize,
    /// Head of this block's free list, as a chunk index.
    free_head: Option<usize>,
    /// Chunks currently handed out from this block.
    live: usize,
    next_spare: Option<usize>,
    prev_spare: Option<usize>,
}

/// Pool of uniform chunks across an unbounded list of same-sized
/// blocks.
///
/// Blocks come from a backing [`Alloc`] handle; a new one is created
/// exactly when no existing block has spare capacity. Every block is
/// sized like the first. The pool keeps a doubly linked spare-capacity
/// list across blocks: a block is on it iff it has at least one chunk
/// to hand out.
///
/// Chunks are [`DynChunk`] tokens carrying the pool generation.
/// [`fast_clear`](DynPool::fast_clear) bumps the generation, so a
/// token that survived a clear is rejected by
/// [`free`](DynPool::free) with [`PoolError::StaleChunk`] instead of
/// corrupting the pool. Double frees are unrepresentable: the token is
/// consumed.
pub struct DynPool<'a, A: Alloc + ?Sized> {
    alloc: &'a A,
    config: PoolConfig,
    chunk_size: usize,
    blocks: SmallVec<[Block; 4]>,
    spare_head: Option<usize>,
    generation: u32,
    live: usize,
}

impl<'a, A: Alloc + ?Sized> DynPool<'a, A> {
    /// Create a pool over a backing allocator handle.
    ///
    /// Validates `config` and eagerly allocates the first block, so a
    /// pool that constructs successfully can hand out at least one
    /// chunk.
    pub fn new(alloc: &'a A, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let mut pool = Self {
            alloc,
            config,
            chunk_size: config.chunk_bytes(),
            blocks: SmallVec::new(),
            spare_head: None,
            generation: 0,
            live: 0,
        };
        pool.grow()?;
        Ok(pool)
    }

    /// Allocate a new block and put it on the spare list.
    fn grow(&mut self) -> Result<usize, PoolError> {
        let requested = self.config.block_bytes();
        let buf = self
            .alloc
            .alloc(requested)
            .ok_or(PoolError::AllocFailed { requested })?;
        let index = self.blocks.len();
        self.blocks.push(Block {
            buf,
            bump: 0,
            free_head: None,
            live: 0,
            next_spare: None,
            prev_spare: None,
        });
        self.push_spare(index);
        Ok(index)
    }

    fn push_spare(&mut self, index: usize) {
        self.blocks[index].prev_spare = None;
        self.blocks[index].next_spare = self.spare_head;
        if let Some(head) = self.spare_head {
            self.blocks[head].prev_spare = Some(index);
        }
        self.spare_head = Some(index);
    }

    fn remove_spare(&mut self, index: usize) {
        let prev = self.blocks[index].prev_spare;
        let next = self.blocks[index].next_spare;
        match prev {
            Some(prev) => self.blocks[prev].next_spare = next,
            None => self.spare_head = next,
        }
        if let Some(next) = next {
            self.blocks[next].prev_spare = prev;
        }
        self.blocks[index].next_spare = None;
        self.blocks[index].prev_spare = None;
    }

    /// Start of a chunk (its header) within a block.
    fn chunk_start(&self, block: usize, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.config.chunks_per_block);
        let offset = index * self.chunk_size;
        debug_assert!(offset + self.chunk_size <= self.blocks[block].buf.size());
        // SAFETY: the offset stays inside the block's allocation.
        unsafe { NonNull::new_unchecked(self.blocks[block].buf.as_ptr().add(offset)) }
    }

    /// Hand out one chunk, creating a block if none has spare capacity.
    ///
    /// Returns `None` only when the backing allocator is exhausted.
    pub fn alloc(&mut self) -> Option<DynChunk> {
        let block_index = match self.spare_head {
            Some(index) => index,
            None => self.grow().ok()?,
        };

        let chunks_per_block = self.config.chunks_per_block;
        let index = if self.blocks[block_index].bump < chunks_per_block {
            let index = self.blocks[block_index].bump;
            self.blocks[block_index].bump += 1;
            index
        } else {
            let head = self.blocks[block_index]
                .free_head
                .expect("a spare block past its bump index has a free list");
            let start = self.chunk_start(block_index, head);
            // SAFETY: a free chunk's 8-aligned header holds the next-free
            // link.
            let link = unsafe { start.as_ptr().cast::<u64>().read() };
            self.blocks[block_index].free_head = (link != LINK_NONE).then(|| link as usize);
            head
        };

        let start = self.chunk_start(block_index, index);
        // SAFETY: the header is inside the chunk and 8-aligned; recording
        // the owning block index claims the chunk.
        unsafe { start.as_ptr().cast::<u64>().write(block_index as u64) };

        let block = &mut self.blocks[block_index];
        block.live += 1;
        if block.live == chunks_per_block {
            self.remove_spare(block_index);
        }
        self.live += 1;

        // SAFETY: header + payload fit in the chunk, so the payload
        // pointer stays in bounds.
        let ptr = unsafe { NonNull::new_unchecked(start.as_ptr().add(CHUNK_HEADER)) };
        Some(DynChunk {
            ptr,
            block: block_index,
            index,
            generation: self.generation,
        })
    }

    /// Return a chunk to its owning block.
    ///
    /// A token from before the last [`fast_clear`](DynPool::fast_clear)
    /// is rejected with [`PoolError::StaleChunk`] and nothing changes.
    ///
    /// # Panics
    ///
    /// Panics if the token comes from a different pool.
    pub fn free(&mut self, chunk: DynChunk) -> Result<(), PoolError> {
        if chunk.generation != self.generation {
            return Err(PoolError::StaleChunk {
                chunk_generation: chunk.generation,
                pool_generation: self.generation,
            });
        }
        assert!(
            chunk.block < self.blocks.len()
                && chunk.index < self.config.chunks_per_block
                && chunk.ptr.as_ptr()
                    == self.chunk_start(chunk.block, chunk.index).as_ptr().wrapping_add(CHUNK_HEADER),
            "chunk does not belong to this pool"
        );

        let start = self.chunk_start(chunk.block, chunk.index);
        let block = &mut self.blocks[chunk.block];
        debug_assert_eq!(
            // SAFETY: a live chunk's header holds its owning block index.
            unsafe { start.as_ptr().cast::<u64>().read() },
            chunk.block as u64,
        );

        let link = match block.free_head {
            Some(head) => head as u64,
            None => LINK_NONE,
        };
        // SAFETY: the chunk is no longer in use; its header becomes the
        // free-list link.
        unsafe { start.as_ptr().cast::<u64>().write(link) };
        block.free_head = Some(chunk.index);

        let was_full = block.live == self.config.chunks_per_block;
        block.live -= 1;
        self.live -= 1;
        if was_full {
            self.push_spare(chunk.block);
        }
        Ok(())
    }

    /// Reset every block to empty and rebuild the spare list, touching
    /// no chunk memory. O(block count).
    ///
    /// Outstanding [`DynChunk`] tokens become stale and will be
    /// rejected by [`free`](DynPool::free).
    pub fn fast_clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.live = 0;
        self.spare_head = None;
        for block in &mut self.blocks {
            block.bump = 0;
            block.free_head = None;
            block.live = 0;
            block.next_spare = None;
            block.prev_spare = None;
        }
        for index in 0..self.blocks.len() {
            self.push_spare(index);
        }
    }

    /// Whether no chunks are currently live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Chunks currently handed out across all blocks.
    pub fn chunk_count(&self) -> usize {
        self.live
    }

    /// Number of blocks created so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Element size this pool serves, in bytes (unpadded).
    pub fn elem_size(&self) -> usize {
        self.config.elem_size
    }

    /// Total bytes held in blocks.
    pub fn memory_bytes(&self) -> usize {
        self.blocks.iter().map(|block| block.buf.size()).sum()
    }

    /// Check the spare-list invariant: a block is listed iff it has
    /// spare capacity.
    #[cfg(test)]
    fn assert_spare_invariant(&self) {
        let mut listed = vec![false; self.blocks.len()];
        let mut cursor = self.spare_head;
        let mut prev = None;
        while let Some(index) = cursor {
            assert!(!listed[index], "spare list loops through block {index}");
            listed[index] = true;
            assert_eq!(self.blocks[index].prev_spare, prev);
            prev = cursor;
            cursor = self.blocks[index].next_spare;
        }
        for (index, block) in self.blocks.iter().enumerate() {
            assert_eq!(
                listed[index],
                block.live < self.config.chunks_per_block,
                "spare list disagrees with block {index} occupancy"
            );
        }
    }
}

impl<A: Alloc + ?Sized> Drop for DynPool<'_, A> {
    fn drop(&mut self) {
        for block in &self.blocks {
            self.alloc.release(block.buf);
        }
    }
}

/// Move-only token for a chunk handed out by a [`DynPool`].
///
/// Records the owning block and the pool generation at allocation
/// time. Dropping a token without freeing leaks the chunk until the
/// next [`fast_clear`](DynPool::fast_clear).
#[must_use]
pub struct DynChunk {
    ptr: NonNull<u8>,
    block: usize,
    index: usize,
    generation: u32,
}

impl DynChunk {
    /// Payload pointer of the chunk.
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Payload pointer of the chunk as a raw pointer.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl fmt::Debug for DynChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DynChunk({:p}, block {}, gen {})",
            self.ptr.as_ptr(),
            self.block,
            self.generation
        )
    }
}

//! The allocator capability trait.

use crate::block::RawBlock;

/// Capability for obtaining, resizing, and releasing memory blocks.
///
/// The whole interface is one tri-mode operation, [`resize`](Alloc::resize):
///
/// | `existing` | `new_size` | meaning                                     |
/// |------------|------------|---------------------------------------------|
/// | `None`     | `> 0`      | fresh allocation; `None` only on exhaustion |
/// | `Some`     | `0`        | release; always succeeds, returns `None`    |
/// | `Some`     | `> 0`      | resize in place or relocate                 |
/// | `None`     | `0`        | no block; returns `None`                    |
///
/// # Contract
///
/// - Every returned block starts on a [`BLOCK_ALIGN`] boundary and is at
///   least `new_size` bytes.
/// - A resize preserves the first `min(old, new)` bytes, possibly at a
///   new address.
/// - On failure the existing block is **untouched**: callers must not
///   commit new size bookkeeping until the call has succeeded.
/// - Exhaustion is reported as `None`, never as a panic.
///
/// Handles are shared by reference (`&self` receiver, interior
/// mutability in implementations) and must outlive every container
/// built over them; containers express this with an `&'a A` borrow.
///
/// Implementations are single-threaded: callable from any thread, but
/// never concurrently on the same instance.
///
/// [`BLOCK_ALIGN`]: crate::block::BLOCK_ALIGN
pub trait Alloc {
    /// The tri-mode allocate / resize / free entry point.
    fn resize(&self, existing: Option<RawBlock>, new_size: usize) -> Option<RawBlock>;

    /// Allocate a fresh block of `size` bytes.
    ///
    /// Returns `None` on exhaustion, or when `size` is zero.
    fn alloc(&self, size: usize) -> Option<RawBlock> {
        self.resize(None, size)
    }

    /// Release a block obtained from this allocator.
    fn release(&self, block: RawBlock) {
        let _ = self.resize(Some(block), 0);
    }
}

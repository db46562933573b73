//! Containers built over malm allocator handles.
//!
//! Two containers, both generic over an [`Alloc`](malm_core::Alloc)
//! borrow that must outlive them:
//!
//! - [`Array`]: contiguous homogeneous storage with amortized O(1)
//!   append and doubling growth.
//! - [`RobinHood`]: open-addressing hash set with Robin Hood
//!   displacement and backward-shift deletion.
//!
//! Both own their storage exclusively, obtain every byte through the
//! allocator handle, and release it in `Drop`. Neither should be backed
//! by an arena handle: the arena refuses the array's resize requests
//! (reported as an allocation failure, state unchanged), and the set's
//! rebuilt tables would strand their predecessors in arena space.
//!
//! This crate contains the bounded `unsafe` needed to manage raw
//! element storage; every unsafe block carries its safety argument.
//!
//! Containers are single-threaded: callable from any thread, never
//! concurrently on the same instance.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod array;
pub mod error;
pub mod robin_hood;

// Public re-exports for the primary API surface.
pub use array::Array;
pub use error::CollectionError;
pub use robin_hood::RobinHood;

use malm_core::BLOCK_ALIGN;

/// Reject element types the 8-byte-aligned block interface cannot hold.
fn check_layout<T>() -> Result<(), CollectionError> {
    if std::mem::size_of::<T>() == 0 {
        return Err(CollectionError::ZeroSizedElement);
    }
    if std::mem::align_of::<T>() > BLOCK_ALIGN {
        return Err(CollectionError::AlignTooLarge {
            align: std::mem::align_of::<T>(),
        });
    }
    Ok(())
}

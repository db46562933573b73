//! Core types and traits for the malm allocation toolkit.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the malm workspace:
//! the raw block handle, the allocator capability trait, alignment
//! helpers, the default mixing hash, and the key capabilities consumed
//! by the containers.
//!
//! Allocator implementations live in `malm-alloc`; containers live in
//! `malm-collections`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod hash;
pub mod keys;
pub mod traits;

// Public re-exports for the primary API surface.
pub use block::{align_down, align_up, RawBlock, BLOCK_ALIGN};
pub use hash::hash64;
pub use keys::{ByteKeys, EntryKey, KeyOps, StrKeys, U64Keys};
pub use traits::Alloc;

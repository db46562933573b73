//! Allocator implementations for the malm toolkit.
//!
//! Four allocators, all speaking the [`Alloc`](malm_core::Alloc)
//! capability or feeding the containers built over it:
//!
//! - [`Heap`]: general-purpose adapter over the process heap, with
//!   live-byte accounting.
//! - [`Arena`]: bump allocation cut from the top of a caller buffer,
//!   rewound wholesale via checkpoints. Adapts to `Alloc` in its
//!   allocate-only mode.
//! - [`FixedPool`]: fixed-size chunks carved from one caller buffer,
//!   free list threaded through the free chunks themselves.
//! - [`DynPool`]: fixed-size chunks across an unbounded list of blocks
//!   obtained from a backing allocator handle.
//!
//! This crate is one of two in the workspace that may contain `unsafe`
//! code (along with `malm-collections`); every unsafe block is local
//! to an allocator module and carries its safety argument.
//!
//! All types are single-threaded: callable from any thread, never
//! concurrently on the same instance. None of them is `Sync`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod arena;
pub mod config;
pub mod dyn_pool;
pub mod error;
pub mod fixed_pool;
pub mod heap;

// Public re-exports for the primary API surface.
pub use arena::{Arena, ArenaMark};
pub use config::PoolConfig;
pub use dyn_pool::{DynChunk, DynPool};
pub use error::{ArenaError, PoolError};
pub use fixed_pool::{FixedPool, PoolChunk};
pub use heap::Heap;

//! malm: allocator and container primitives with explicit ownership.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the malm sub-crates. For most users, adding `malm` as a single
//! dependency is sufficient.
//!
//! The library is built around one capability: an [`Alloc`] handle with
//! a tri-mode allocate / resize / free operation. Containers
//! ([`Array`], [`RobinHood`]) obtain every byte through a handle they
//! borrow; arenas and pools either adapt to the same interface or
//! serve fixed-size chunks for allocate/free churn. Everything is
//! single-threaded and nothing is garbage collected — each type has
//! one well-defined release operation.
//!
//! # Quick start
//!
//! ```rust
//! use malm::prelude::*;
//!
//! // A general-purpose handle; must outlive everything built over it.
//! let heap = Heap::new();
//!
//! // Growable array over the handle.
//! let mut samples: Array<'_, u32, Heap> = Array::new(&heap, 1).unwrap();
//! samples.extend_from_slice(&[1, 2, 3]).unwrap();
//! assert_eq!(samples.as_slice(), &[1, 2, 3]);
//!
//! // Robin Hood table with string-view keys.
//! let mut ages = RobinHood::new(&heap, 4, StrKeys).unwrap();
//! ages.insert(("carl", 23)).unwrap();
//! ages.insert(("chloe", 23)).unwrap();
//! assert_eq!(ages.get("carl"), Some(&("carl", 23)));
//!
//! // Per-cycle scratch: a bump arena over a caller buffer.
//! let mut buffer = [0u8; 256];
//! let arena = Arena::new(&mut buffer).unwrap();
//! let mark = arena.checkpoint();
//! let scratch = arena.alloc(64).unwrap();
//! assert_eq!(scratch.size(), 64);
//! arena.reset_to(mark);
//!
//! // Containers return every byte they took.
//! drop(samples);
//! drop(ages);
//! assert_eq!(heap.live_bytes(), 0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for items not in
//! the prelude:
//!
//! - [`types`]: the `Alloc` trait, `RawBlock`, alignment helpers, the
//!   mixing hash, and key capabilities.
//! - [`allocators`]: `Heap`, `Arena`, `FixedPool`, `DynPool`, and
//!   their errors and configuration.
//! - [`containers`]: `Array`, `RobinHood`, and their errors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use malm_alloc as allocators;
pub use malm_collections as containers;
pub use malm_core as types;

pub use malm_alloc::{Arena, ArenaMark, DynChunk, DynPool, FixedPool, Heap, PoolChunk, PoolConfig};
pub use malm_collections::{Array, CollectionError, RobinHood};
pub use malm_core::{hash64, Alloc, RawBlock, BLOCK_ALIGN};

/// The most commonly used malm types in one import.
pub mod prelude {
    pub use malm_alloc::{
        Arena, ArenaError, ArenaMark, DynChunk, DynPool, FixedPool, Heap, PoolChunk, PoolConfig,
        PoolError,
    };
    pub use malm_collections::{Array, CollectionError, RobinHood};
    pub use malm_core::{
        hash64, Alloc, ByteKeys, EntryKey, KeyOps, RawBlock, StrKeys, U64Keys, BLOCK_ALIGN,
    };
}

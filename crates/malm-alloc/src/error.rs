//! Allocator-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur when setting up an arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The caller buffer leaves no usable 8-byte-aligned span.
    BufferTooSmall {
        /// Size of the buffer the caller provided, in bytes.
        provided: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { provided } => {
                write!(
                    f,
                    "arena buffer of {provided} bytes leaves no aligned span to allocate from"
                )
            }
        }
    }
}

impl Error for ArenaError {}

/// Errors that can occur during pool setup and use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The element size was zero.
    InvalidElemSize,
    /// The configured chunks-per-block count was zero.
    InvalidChunksPerBlock,
    /// A block of the configured geometry would overflow `usize`.
    BlockTooLarge {
        /// Element size from the configuration, in bytes.
        elem_size: usize,
        /// Chunks-per-block count from the configuration.
        chunks_per_block: usize,
    },
    /// The caller buffer cannot hold even one chunk.
    BufferTooSmall {
        /// Size of the buffer the caller provided, in bytes.
        provided: usize,
        /// Bytes one padded chunk occupies.
        required: usize,
    },
    /// The backing allocator could not provide a block.
    AllocFailed {
        /// Number of bytes requested.
        requested: usize,
    },
    /// A chunk token from before the last `fast_clear`.
    StaleChunk {
        /// The generation encoded in the token.
        chunk_generation: u32,
        /// The pool's current generation.
        pool_generation: u32,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidElemSize => {
                write!(f, "pool element size must be nonzero")
            }
            Self::InvalidChunksPerBlock => {
                write!(f, "pool chunks-per-block count must be nonzero")
            }
            Self::BlockTooLarge {
                elem_size,
                chunks_per_block,
            } => {
                write!(
                    f,
                    "pool block of {chunks_per_block} chunks of {elem_size} bytes overflows usize"
                )
            }
            Self::BufferTooSmall { provided, required } => {
                write!(
                    f,
                    "pool buffer of {provided} bytes cannot hold one {required}-byte chunk"
                )
            }
            Self::AllocFailed { requested } => {
                write!(f, "backing allocator refused a {requested}-byte block")
            }
            Self::StaleChunk {
                chunk_generation,
                pool_generation,
            } => {
                write!(
                    f,
                    "stale chunk: generation {chunk_generation}, pool is at {pool_generation}"
                )
            }
        }
    }
}

impl Error for PoolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_numbers() {
        let err = PoolError::StaleChunk {
            chunk_generation: 1,
            pool_generation: 3,
        };
        let text = err.to_string();
        assert!(text.contains('1'));
        assert!(text.contains('3'));
    }
}

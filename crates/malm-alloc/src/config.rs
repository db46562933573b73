//! Pool configuration parameters.

use malm_core::{align_up, BLOCK_ALIGN};

use crate::error::PoolError;

/// Bytes reserved at the front of every dynamic-pool chunk.
///
/// Holds the owning block index while the chunk is live and the
/// free-list link while it is free.
pub const CHUNK_HEADER: usize = 8;

/// Configuration for a [`DynPool`](crate::dyn_pool::DynPool).
///
/// Controls chunk geometry and block sizing. Validated at pool
/// construction; all values are immutable after creation. Every block
/// the pool ever creates is sized from this configuration — there is no
/// geometric growth, which bounds worst-case per-block memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Size of one element in bytes. Padded to [`BLOCK_ALIGN`] inside
    /// the pool.
    pub elem_size: usize,

    /// Chunks in every block.
    ///
    /// Default: [`PoolConfig::DEFAULT_CHUNKS_PER_BLOCK`].
    pub chunks_per_block: usize,
}

impl PoolConfig {
    /// Default chunks-per-block count.
    pub const DEFAULT_CHUNKS_PER_BLOCK: usize = 64;

    /// Create a config for the given element size.
    ///
    /// Uses the default chunks-per-block count.
    pub fn new(elem_size: usize) -> Self {
        Self {
            elem_size,
            chunks_per_block: Self::DEFAULT_CHUNKS_PER_BLOCK,
        }
    }

    /// Check the configuration for zero sizes and overflow.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.elem_size == 0 {
            return Err(PoolError::InvalidElemSize);
        }
        if self.chunks_per_block == 0 {
            return Err(PoolError::InvalidChunksPerBlock);
        }
        let too_large = PoolError::BlockTooLarge {
            elem_size: self.elem_size,
            chunks_per_block: self.chunks_per_block,
        };
        self.elem_size
            .checked_add(BLOCK_ALIGN - 1)
            .and_then(|padded| (padded & !(BLOCK_ALIGN - 1)).checked_add(CHUNK_HEADER))
            .and_then(|chunk| chunk.checked_mul(self.chunks_per_block))
            .map(|_| ())
            .ok_or(too_large)
    }

    /// Bytes one chunk occupies: header plus the padded element.
    ///
    /// Only meaningful for a configuration that passed
    /// [`validate`](PoolConfig::validate).
    pub fn chunk_bytes(&self) -> usize {
        CHUNK_HEADER + align_up(self.elem_size, BLOCK_ALIGN)
    }

    /// Bytes one block occupies.
    ///
    /// Only meaningful for a configuration that passed
    /// [`validate`](PoolConfig::validate).
    pub fn block_bytes(&self) -> usize {
        self.chunk_bytes() * self.chunks_per_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bytes_pads_to_alignment() {
        let config = PoolConfig::new(1);
        assert_eq!(config.chunk_bytes(), CHUNK_HEADER + BLOCK_ALIGN);
        let config = PoolConfig::new(24);
        assert_eq!(config.chunk_bytes(), CHUNK_HEADER + 24);
    }

    #[test]
    fn default_chunks_per_block_applies() {
        let config = PoolConfig::new(16);
        assert_eq!(
            config.block_bytes(),
            (CHUNK_HEADER + 16) * PoolConfig::DEFAULT_CHUNKS_PER_BLOCK
        );
    }

    #[test]
    fn zero_sizes_fail_validation() {
        assert_eq!(
            PoolConfig::new(0).validate(),
            Err(PoolError::InvalidElemSize)
        );
        let config = PoolConfig {
            elem_size: 8,
            chunks_per_block: 0,
        };
        assert_eq!(config.validate(), Err(PoolError::InvalidChunksPerBlock));
    }

    #[test]
    fn overflowing_geometry_fails_validation() {
        let config = PoolConfig {
            elem_size: usize::MAX - 2,
            chunks_per_block: 2,
        };
        assert!(matches!(
            config.validate(),
            Err(PoolError::BlockTooLarge { .. })
        ));
    }
}

//! Container-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during container setup and growth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionError {
    /// The allocator handle could not provide a block.
    ///
    /// The container's length, capacity, and contents are exactly what
    /// they were before the failing call.
    AllocFailed {
        /// Number of bytes requested.
        requested: usize,
    },
    /// The requested capacity overflows `usize` arithmetic.
    CapacityOverflow,
    /// A hash set needs a nonzero initial capacity.
    InvalidCapacity,
    /// Zero-sized element types are not storable.
    ZeroSizedElement,
    /// The element type's alignment exceeds the 8-byte block alignment.
    AlignTooLarge {
        /// The element type's alignment.
        align: usize,
    },
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocFailed { requested } => {
                write!(f, "allocator refused a {requested}-byte block")
            }
            Self::CapacityOverflow => {
                write!(f, "requested capacity overflows usize")
            }
            Self::InvalidCapacity => {
                write!(f, "hash set capacity must be nonzero")
            }
            Self::ZeroSizedElement => {
                write!(f, "zero-sized element types are not storable")
            }
            Self::AlignTooLarge { align } => {
                write!(
                    f,
                    "element alignment {align} exceeds the 8-byte block alignment"
                )
            }
        }
    }
}

impl Error for CollectionError {}

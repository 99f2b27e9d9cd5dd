//! Chunk reading and writing configuration
//!
//! The byte order and checksum seed are part of a format's definition: a reader must use
//! the same values the writer used. The size limit and checksum verification only affect
//! how defensively a reader treats its input.

use crate::stream::io::ByteOrder;

/// Default upper bound for a single chunk payload (1 GiB).
pub const DEFAULT_MAX_DATA_SIZE: u64 = 1 << 30;

/// Configuration for chunk serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Byte order of every multi-byte header and footer field
    pub byte_order: ByteOrder,

    /// Initial value of the CRC-32 state the payload checksum starts from
    pub checksum_seed: u32,

    /// Largest `data_size` a reader accepts before allocating (default: 1 GiB)
    /// Guards against damaged headers requesting huge allocations
    pub max_data_size: u64,

    /// Recompute and compare the payload checksum on read (recommended: always true)
    pub verify_checksum: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            checksum_seed: 0,
            max_data_size: DEFAULT_MAX_DATA_SIZE,
            verify_checksum: true,
        }
    }
}

impl ChunkConfig {
    /// Creates a configuration for formats with big-endian headers
    #[must_use]
    pub fn big_endian() -> Self {
        Self {
            byte_order: ByteOrder::Big,
            ..Self::default()
        }
    }

    /// Creates a configuration that skips checksum verification on read
    ///
    /// **Warning**: Corrupted payloads are returned as if they were intact. Use only for
    /// recovery tooling or input that was verified elsewhere.
    #[must_use]
    pub fn unchecked() -> Self {
        Self {
            verify_checksum: false,
            ..Self::default()
        }
    }

    /// Replaces the checksum seed
    #[must_use]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.checksum_seed = seed;
        self
    }

    /// Replaces the payload size limit
    #[must_use]
    pub fn with_max_data_size(mut self, max_data_size: u64) -> Self {
        self.max_data_size = max_data_size;
        self
    }
}

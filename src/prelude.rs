//! # chunkio Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the chunkio library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all chunkio operations
pub use crate::Error;

/// The result type used throughout chunkio
pub use crate::Result;

// ================================================================================================
// Streams
// ================================================================================================

/// The stream, its backend trait and the packed operation result
pub use crate::{Backend, Capabilities, ErrorCode, IoResult, SeekOrigin, Stream};

/// File-backed streams
pub use crate::{BufferedFileReader, MappedFile};

/// Endian codec functions and traits
pub use crate::io::{self, ByteOrder, ByteOrdered, ReprEnum};

// ================================================================================================
// Layouts and Chunks
// ================================================================================================

/// Relocatable layout types
pub use crate::{Blob, BlobWriter, RelArray, RelPtr};

/// Chunk format entry points
pub use crate::{read_chunk, write_chunk, ChunkConfig, ChunkHeader, ChunkWriter};

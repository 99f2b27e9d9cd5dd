// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
//#![deny(unsafe_code)]
// - 'stream/physical.rs' uses mmap to map a file into memory

//! # chunkio
//!
//! A binary data access layer: write a binary format once against one stream interface and
//! run it over memory regions, growable buffers, files and memory-mapped files, with
//! relocatable pointer layouts and checksummed chunks on top.
//!
//! ## Features
//!
//! - **Uniform streams** - One [`Stream`] type over pluggable [`Backend`]s with capability queries
//! - **Sticky errors** - The first failure on a stream is kept until explicitly reset
//! - **Buffer-centric reads** - Zero-copy access to a backend's buffer with a fail-fast refill protocol
//! - **Endian codec** - Little and big endian integers, floats and enums on streams and slices
//! - **Relocatable layouts** - [`RelPtr`] / [`RelArray`] offsets that survive moving the blob
//! - **Chunk container** - Typed, versioned payloads verified with CRC-32
//!
//! ## Quick Start
//!
//! ```rust
//! use chunkio::prelude::*;
//!
//! let mut storage = Vec::new();
//! let mut stream = Stream::from_vec(&mut storage);
//! write_chunk(&mut stream, 0x1, 1, &[0u8; 100], &ChunkConfig::default())?;
//! drop(stream);
//!
//! let mut stream = Stream::from_ro_memory(&storage);
//! let chunk = read_chunk(&mut stream, &ChunkConfig::default())?;
//! assert_eq!(chunk.header.data_size, 100);
//! # Ok::<(), chunkio::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`stream`] - The stream abstraction, its backends and the endian codec
//! - [`layout`] - Relative pointers and arrays, blob builder
//! - [`chunk`] - Chunk header/footer format and its read and write paths
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Stream operations return an [`IoResult`]: a byte count or position packed with an
//! [`ErrorCode`], and every failure is also recorded in the stream's sticky error state.
//! Higher layers return [`Result<T, Error>`](Result); [`IoResult::into_result`] and
//! [`Error::code`] convert between the two.
//!
//! Violated preconditions (misaligned relative pointers, offsets out of range, a backend
//! breaking the refill protocol) are bugs, not data errors: they are logged and panic.
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs a
//! logger itself.
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run read_chunk --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// ```rust
/// use chunkio::prelude::*;
///
/// let data = [1u8, 0, 0, 0];
/// let mut stream = Stream::from_ro_memory(&data);
/// assert_eq!(io::read_le::<u32>(&mut stream)?, 1);
/// # Ok::<(), chunkio::Error>(())
/// ```
pub mod prelude;

/// Stream abstraction, backends and the endian codec.
pub mod stream;

/// Relocatable layouts built from relative offsets.
pub mod layout;

/// Checksummed chunk container format.
pub mod chunk;

/// `chunkio` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `chunkio` Error type
///
/// Every variant classifies into an [`ErrorCode`] through [`Error::code`].
pub use error::Error;

/// Core stream types.
pub use stream::{
    Backend, BufferedIo, Capabilities, ErrorCode, IoOffset, IoResult, IoSize, SeekOrigin, Stream,
};

/// Endian codec entry points.
pub use stream::io::{self, ByteOrder, ByteOrdered, ReprEnum};

/// Stream backends.
pub use stream::{
    memory::{ReadOnlyMemory, ReadWriteMemory, VecMemory},
    physical::{BufferedFileReader, FileStream, MappedFile},
};

/// Relative pointers and arrays.
pub use layout::{
    Blob, BlobWriter, RelArray, RelArray16, RelArray32, RelArray64, RelArray8, RelPtr, RelPtr16,
    RelPtr32, RelPtr64, RelPtr8,
};

/// Chunk format.
pub use chunk::{
    read_chunk, read_header, read_payload_verified, skip_chunk, write_chunk, Chunk, ChunkConfig,
    ChunkFooter, ChunkHeader, ChunkWriter,
};

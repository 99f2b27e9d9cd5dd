//! Checksummed chunk container format.
//!
//! A chunk wraps an opaque payload between a fixed header and a footer:
//!
//! ```text
//! +-----------+---------+-----------+---------------------+----------+
//! | type_id   | version | data_size | payload             | checksum |
//! | u32       | u16     | u64       | data_size bytes     | u32      |
//! +-----------+---------+-----------+---------------------+----------+
//! ```
//!
//! Multi-byte fields use the byte order of the [`ChunkConfig`] (little endian by default).
//! The checksum is a CRC-32 over exactly the payload bytes, started from the configured seed.
//! `(type_id, version)` is a dispatch key for the caller; the payload is never interpreted here.
//!
//! # Key Components
//!
//! - [`crate::chunk::write_chunk`] / [`crate::chunk::read_chunk`] - One-shot write and verified read
//! - [`crate::chunk::ChunkWriter`] - Streaming writer that patches the size once the payload is done
//! - [`crate::chunk::read_header`] / [`crate::chunk::skip_chunk`] - Dispatch without reading payloads
//!
//! # Examples
//!
//! ```rust
//! use chunkio::{read_chunk, write_chunk, ChunkConfig, SeekOrigin, Stream};
//!
//! let config = ChunkConfig::default();
//! let mut storage = Vec::new();
//! let mut stream = Stream::from_vec(&mut storage);
//! write_chunk(&mut stream, 0x4D455348, 2, b"payload", &config)?;
//!
//! stream.seek(0, SeekOrigin::Begin);
//! let chunk = read_chunk(&mut stream, &config)?;
//! assert_eq!(chunk.header.type_id, 0x4D455348);
//! assert_eq!(chunk.payload, b"payload");
//! # Ok::<(), chunkio::Error>(())
//! ```

mod config;

pub use config::{ChunkConfig, DEFAULT_MAX_DATA_SIZE};

use crc32fast::Hasher;

use crate::{
    stream::{
        io::{read_ordered, write_ordered, ByteOrder},
        ErrorCode, IoOffset, SeekOrigin, Stream,
    },
    Error, Result,
};

/// CRC-32 (IEEE) of `bytes`, starting from `seed`.
#[must_use]
pub fn checksum(bytes: &[u8], seed: u32) -> u32 {
    let mut hasher = Hasher::new_with_initial(seed);
    hasher.update(bytes);
    hasher.finalize()
}

/// Fixed chunk header preceding the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHeader {
    /// Format-defined identifier of the payload kind
    pub type_id: u32,
    /// Format-defined payload revision
    pub version: u16,
    /// Number of payload bytes following the header
    pub data_size: u64,
}

impl ChunkHeader {
    /// Serialized size in bytes.
    pub const SIZE: usize = 4 + 2 + 8;

    /// Offset of `data_size` inside the serialized header.
    const DATA_SIZE_OFFSET: u64 = 4 + 2;

    /// Create a new header.
    #[must_use]
    pub fn new(type_id: u32, version: u16, data_size: u64) -> ChunkHeader {
        ChunkHeader {
            type_id,
            version,
            data_size,
        }
    }

    /// Total serialized size of the chunk this header starts.
    #[must_use]
    pub fn chunk_len(&self) -> u64 {
        (Self::SIZE + ChunkFooter::SIZE) as u64 + self.data_size
    }

    /// Reads the header fields in the given byte order.
    ///
    /// # Errors
    /// Returns the stream's failure, [`Error::EndOfStream`] for a truncated header.
    pub fn read(stream: &mut Stream<'_>, order: ByteOrder) -> Result<ChunkHeader> {
        Ok(ChunkHeader {
            type_id: read_ordered(stream, order)?,
            version: read_ordered(stream, order)?,
            data_size: read_ordered(stream, order)?,
        })
    }

    /// Writes the header fields in the given byte order.
    ///
    /// # Errors
    /// Returns the stream's failure.
    pub fn write(&self, stream: &mut Stream<'_>, order: ByteOrder) -> Result<()> {
        write_ordered(stream, self.type_id, order).into_result()?;
        write_ordered(stream, self.version, order).into_result()?;
        write_ordered(stream, self.data_size, order).into_result()?;
        Ok(())
    }
}

/// Chunk footer following the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkFooter {
    /// CRC-32 of the payload
    pub checksum: u32,
}

impl ChunkFooter {
    /// Serialized size in bytes.
    pub const SIZE: usize = 4;

    /// Reads the footer in the given byte order.
    ///
    /// # Errors
    /// Returns the stream's failure, [`Error::EndOfStream`] for a truncated footer.
    pub fn read(stream: &mut Stream<'_>, order: ByteOrder) -> Result<ChunkFooter> {
        Ok(ChunkFooter {
            checksum: read_ordered(stream, order)?,
        })
    }

    /// Writes the footer in the given byte order.
    ///
    /// # Errors
    /// Returns the stream's failure.
    pub fn write(&self, stream: &mut Stream<'_>, order: ByteOrder) -> Result<()> {
        write_ordered(stream, self.checksum, order).into_result()?;
        Ok(())
    }
}

/// A fully read and verified chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk header
    pub header: ChunkHeader,
    /// Exactly `header.data_size` payload bytes
    pub payload: Vec<u8>,
    /// Checksum stored in the footer
    pub checksum: u32,
}

/// Writes a complete chunk around `payload`.
///
/// # Errors
/// Returns the stream's failure; the stream's error state holds the same code.
pub fn write_chunk(
    stream: &mut Stream<'_>,
    type_id: u32,
    version: u16,
    payload: &[u8],
    config: &ChunkConfig,
) -> Result<ChunkHeader> {
    let header = ChunkHeader::new(type_id, version, payload.len() as u64);
    header.write(stream, config.byte_order)?;
    stream.write(payload).into_result()?;

    let footer = ChunkFooter {
        checksum: checksum(payload, config.checksum_seed),
    };
    footer.write(stream, config.byte_order)?;

    log::debug!(
        "wrote chunk {:#010x} v{} ({} bytes)",
        type_id,
        version,
        payload.len()
    );
    Ok(header)
}

/// Reads a chunk header and validates its size against the configured limit.
///
/// # Errors
/// Returns the stream's failure, or [`Error::Malformed`] if `data_size` exceeds
/// [`ChunkConfig::max_data_size`]. A malformed header is recorded as
/// [`ErrorCode::InvalidData`] on the stream.
pub fn read_header(stream: &mut Stream<'_>, config: &ChunkConfig) -> Result<ChunkHeader> {
    let header = ChunkHeader::read(stream, config.byte_order)?;

    if header.data_size > config.max_data_size {
        stream.record(ErrorCode::InvalidData);
        return Err(malformed_error!(
            "Chunk {:#010x} declares {} payload bytes, limit is {}",
            header.type_id,
            header.data_size,
            config.max_data_size
        ));
    }

    log::debug!(
        "chunk {:#010x} v{} with {} payload bytes",
        header.type_id,
        header.version,
        header.data_size
    );
    Ok(header)
}

/// Reads the payload and footer that follow `header` and verifies the checksum.
///
/// # Errors
/// Returns the stream's failure, [`Error::AllocationFailure`] if the payload buffer
/// cannot be reserved, or [`Error::ChecksumMismatch`] (recorded on the stream as
/// [`ErrorCode::InvalidData`]) if verification is enabled and fails.
pub fn read_payload_verified(
    stream: &mut Stream<'_>,
    header: &ChunkHeader,
    config: &ChunkConfig,
) -> Result<(Vec<u8>, u32)> {
    let Ok(len) = usize::try_from(header.data_size) else {
        stream.record(ErrorCode::InvalidData);
        return Err(malformed_error!(
            "Chunk payload of {} bytes exceeds the address space",
            header.data_size
        ));
    };

    let mut payload = Vec::new();
    if payload.try_reserve_exact(len).is_err() {
        stream.record(ErrorCode::AllocationFailure);
        return Err(Error::AllocationFailure);
    }

    let mut hasher = Hasher::new_with_initial(config.checksum_seed);
    if stream.supports_buffered_read() {
        read_buffered_payload(stream, &mut payload, len, &mut hasher)?;
    } else {
        payload.resize(len, 0);
        stream.read(&mut payload).into_result()?;
        hasher.update(&payload);
    }

    let footer = ChunkFooter::read(stream, config.byte_order)?;
    let actual = hasher.finalize();

    if config.verify_checksum && actual != footer.checksum {
        stream.record(ErrorCode::InvalidData);
        log::warn!(
            "checksum mismatch in chunk {:#010x}: stored {:#010x}, computed {:#010x}",
            header.type_id,
            footer.checksum,
            actual
        );
        return Err(Error::ChecksumMismatch {
            expected: footer.checksum,
            actual,
        });
    }

    Ok((payload, footer.checksum))
}

// Copies straight out of the live window, hashing each piece as it goes by.
fn read_buffered_payload(
    stream: &mut Stream<'_>,
    payload: &mut Vec<u8>,
    len: usize,
    hasher: &mut Hasher,
) -> Result<()> {
    while payload.len() < len {
        if stream.num_bytes_available() == 0 {
            stream.refill().into_result()?;
        }

        let count = (len - payload.len()).min(stream.num_bytes_available());
        let piece = &stream.buffer()[..count];
        hasher.update(piece);
        payload.extend_from_slice(piece);
        stream.consume(count);
    }

    log::trace!("read {len} payload bytes through the buffered window");
    Ok(())
}

/// Reads and verifies one complete chunk.
///
/// # Errors
/// See [`read_header`] and [`read_payload_verified`].
pub fn read_chunk(stream: &mut Stream<'_>, config: &ChunkConfig) -> Result<Chunk> {
    let header = read_header(stream, config)?;
    let (payload, checksum) = read_payload_verified(stream, &header, config)?;

    Ok(Chunk {
        header,
        payload,
        checksum,
    })
}

/// Seeks past the payload and footer of a chunk whose header was just read.
///
/// # Errors
/// Returns [`Error::SeekError`] if the target is unreachable, [`Error::InvalidOperation`]
/// if the stream cannot seek.
pub fn skip_chunk(stream: &mut Stream<'_>, header: &ChunkHeader) -> Result<()> {
    let skip = header
        .data_size
        .checked_add(ChunkFooter::SIZE as u64)
        .and_then(|skip| IoOffset::try_from(skip).ok());

    let Some(skip) = skip else {
        stream.record(ErrorCode::SeekError);
        return Err(Error::SeekError);
    };

    stream.seek(skip, SeekOrigin::Current).into_result()?;
    Ok(())
}

/// Streaming chunk writer for payloads whose size is not known up front.
///
/// Writes a header with a placeholder size, hashes the payload as it is written, and on
/// [`ChunkWriter::finish`] appends the footer and patches the real size into the header.
/// The stream must support seeking.
pub struct ChunkWriter<'s, 'a> {
    stream: &'s mut Stream<'a>,
    config: ChunkConfig,
    header: ChunkHeader,
    header_pos: u64,
    hasher: Hasher,
}

impl<'s, 'a> ChunkWriter<'s, 'a> {
    /// Starts a chunk at the current position.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperation`] for streams that cannot seek, or the stream's
    /// failure while writing the placeholder header.
    pub fn begin(
        stream: &'s mut Stream<'a>,
        type_id: u32,
        version: u16,
        config: &ChunkConfig,
    ) -> Result<ChunkWriter<'s, 'a>> {
        if !stream.supports_seek() {
            stream.record(ErrorCode::InvalidOperation);
            return Err(Error::InvalidOperation);
        }

        let header_pos = stream.position().into_result()?;
        let header = ChunkHeader::new(type_id, version, 0);
        header.write(stream, config.byte_order)?;

        Ok(ChunkWriter {
            stream,
            config: *config,
            header,
            header_pos,
            hasher: Hasher::new_with_initial(config.checksum_seed),
        })
    }

    /// Appends payload bytes.
    ///
    /// # Errors
    /// Returns the stream's failure.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write(bytes).into_result()?;
        self.hasher.update(bytes);
        self.header.data_size += bytes.len() as u64;
        Ok(())
    }

    /// Payload bytes written so far.
    #[must_use]
    pub fn data_size(&self) -> u64 {
        self.header.data_size
    }

    /// Writes the footer, patches the header size and leaves the stream after the footer.
    ///
    /// # Errors
    /// Returns the stream's failure.
    pub fn finish(self) -> Result<ChunkHeader> {
        let order = self.config.byte_order;
        let footer = ChunkFooter {
            checksum: self.hasher.finalize(),
        };
        footer.write(self.stream, order)?;

        let end = self.stream.position().into_result()?;
        let Ok(size_pos) = IoOffset::try_from(self.header_pos + ChunkHeader::DATA_SIZE_OFFSET) else {
            self.stream.record(ErrorCode::SeekError);
            return Err(Error::SeekError);
        };

        self.stream.seek(size_pos, SeekOrigin::Begin).into_result()?;
        write_ordered(self.stream, self.header.data_size, order).into_result()?;
        self.stream
            .seek(end as IoOffset, SeekOrigin::Begin)
            .into_result()?;

        log::debug!(
            "finished chunk {:#010x} v{} ({} bytes)",
            self.header.type_id,
            self.header.version,
            self.header.data_size
        );
        Ok(self.header)
    }
}

impl std::fmt::Debug for ChunkWriter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkWriter")
            .field("header", &self.header)
            .field("header_pos", &self.header_pos)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{ChunkedSource, WriteOnlySink};

    fn encode(type_id: u32, version: u16, payload: &[u8], config: &ChunkConfig) -> Vec<u8> {
        let mut storage = Vec::new();
        let mut stream = Stream::from_vec(&mut storage);
        write_chunk(&mut stream, type_id, version, payload, config).unwrap();
        drop(stream);
        storage
    }

    #[test]
    fn crc32_reference_value() {
        assert_eq!(checksum(b"123456789", 0), 0xCBF4_3926);
        assert_ne!(checksum(b"123456789", 1), 0xCBF4_3926);
        assert_eq!(checksum(b"", 0), 0);
    }

    #[test]
    fn layout_is_little_endian_by_default() {
        let bytes = encode(0x0102_0304, 0x0506, &[0xAA; 3], &ChunkConfig::default());
        assert_eq!(bytes.len(), ChunkHeader::SIZE + 3 + ChunkFooter::SIZE);
        assert_eq!(&bytes[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..6], &[0x06, 0x05]);
        assert_eq!(&bytes[6..14], &3u64.to_le_bytes());
        assert_eq!(&bytes[14..17], &[0xAA; 3]);
        assert_eq!(&bytes[17..], &checksum(&[0xAA; 3], 0).to_le_bytes());
    }

    #[test]
    fn big_endian_round_trip() {
        let config = ChunkConfig::big_endian().with_seed(0x1234);
        let bytes = encode(7, 3, b"big", &config);
        assert_eq!(&bytes[..4], &[0, 0, 0, 7]);

        let mut stream = Stream::from_ro_memory(&bytes);
        let chunk = read_chunk(&mut stream, &config).unwrap();
        assert_eq!(chunk.header, ChunkHeader::new(7, 3, 3));
        assert_eq!(chunk.payload, b"big");
        assert_eq!(chunk.checksum, checksum(b"big", 0x1234));

        // Wrong seed fails verification.
        let mut stream = Stream::from_ro_memory(&bytes);
        let result = read_chunk(&mut stream, &ChunkConfig::big_endian());
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn corrupted_footer_is_detected() {
        let config = ChunkConfig::default();
        let mut bytes = encode(0x1, 1, &[0u8; 100], &config);
        let footer = bytes.len() - ChunkFooter::SIZE;
        bytes[footer] ^= 0x01;

        let mut stream = Stream::from_ro_memory(&bytes);
        match read_chunk(&mut stream, &config) {
            Err(Error::ChecksumMismatch { expected, actual }) => {
                assert_eq!(actual, checksum(&[0u8; 100], 0));
                assert_eq!(expected, actual ^ 0x01);
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
        assert_eq!(stream.error_state(), ErrorCode::InvalidData);
    }

    #[test]
    fn corrupted_payload_is_detected() {
        let config = ChunkConfig::default();
        let mut bytes = encode(0x1, 1, &[0u8; 100], &config);

        for index in ChunkHeader::SIZE..ChunkHeader::SIZE + 100 {
            bytes[index] ^= 0x01;

            let mut storage = bytes.clone();
            let mut stream = Stream::from_vec(&mut storage);
            let error = read_chunk(&mut stream, &config).unwrap_err();
            assert_eq!(error.code(), ErrorCode::InvalidData, "byte {index}");
            assert_eq!(stream.error_state(), ErrorCode::InvalidData);

            bytes[index] ^= 0x01;
        }

        bytes[ChunkHeader::SIZE + 42] = 0xFF;

        // Verification off hands back the damaged payload.
        let mut stream = Stream::from_ro_memory(&bytes);
        let chunk = read_chunk(&mut stream, &ChunkConfig::unchecked()).unwrap();
        assert_eq!(chunk.payload[42], 0xFF);
    }

    #[test]
    fn oversized_header_is_rejected_before_allocating() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());

        let mut stream = Stream::from_ro_memory(&bytes);
        let result = read_chunk(&mut stream, &ChunkConfig::default());
        assert!(matches!(result, Err(Error::Malformed { .. })));
        assert_eq!(stream.error_state(), ErrorCode::InvalidData);

        let config = ChunkConfig::default().with_max_data_size(8);
        let bytes = encode(2, 1, &[0u8; 9], &ChunkConfig::default());
        let mut stream = Stream::from_ro_memory(&bytes);
        assert!(read_header(&mut stream, &config).is_err());
    }

    #[test]
    fn truncated_payload_is_end_of_stream() {
        let bytes = encode(3, 1, &[9u8; 32], &ChunkConfig::default());
        let mut stream = Stream::from_ro_memory(&bytes[..ChunkHeader::SIZE + 10]);
        let error = read_chunk(&mut stream, &ChunkConfig::default()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::EndOfStream);
    }

    #[test]
    fn irregular_refills_give_the_same_chunk() {
        let payload: Vec<u8> = (0..300u32).map(|i| (i % 256) as u8).collect();
        let bytes = encode(0xC0FFEE, 9, &payload, &ChunkConfig::default());

        for pattern in [&[1usize][..], &[3, 5, 7], &[64, 1, 2], &[1000]] {
            let mut stream = Stream::new(ChunkedSource::new(bytes.clone(), pattern));
            let chunk = read_chunk(&mut stream, &ChunkConfig::default()).unwrap();
            assert_eq!(chunk.payload, payload);
            assert_eq!(chunk.header.type_id, 0xC0FFEE);
        }
    }

    #[test]
    fn skip_and_dispatch() {
        let config = ChunkConfig::default();
        let mut storage = Vec::new();
        let mut stream = Stream::from_vec(&mut storage);
        write_chunk(&mut stream, 1, 1, b"first", &config).unwrap();
        write_chunk(&mut stream, 2, 1, b"second", &config).unwrap();
        write_chunk(&mut stream, 3, 1, b"third", &config).unwrap();
        drop(stream);

        let mut stream = Stream::from_ro_memory(&storage);
        let mut seen = Vec::new();
        while let Ok(header) = read_header(&mut stream, &config) {
            if header.type_id == 2 {
                let (payload, _) = read_payload_verified(&mut stream, &header, &config).unwrap();
                seen.push(payload);
            } else {
                skip_chunk(&mut stream, &header).unwrap();
            }
        }

        assert_eq!(seen, [b"second".to_vec()]);
        assert_eq!(stream.error_state(), ErrorCode::EndOfStream);
    }

    #[test]
    fn streaming_writer_patches_size() {
        let config = ChunkConfig::default();
        let mut storage = vec![0xEE; 2];
        let mut stream = Stream::from_vec(&mut storage);
        stream.seek(2, SeekOrigin::Begin);

        let mut writer = ChunkWriter::begin(&mut stream, 0xAB, 4, &config).unwrap();
        writer.write(b"stream").unwrap();
        writer.write(b"ed").unwrap();
        assert_eq!(writer.data_size(), 8);
        let header = writer.finish().unwrap();
        assert_eq!(header.data_size, 8);

        // Cursor sits after the footer.
        assert_eq!(stream.position().value(), 2 + header.chunk_len());
        drop(stream);

        assert_eq!(&storage[2..], encode(0xAB, 4, b"streamed", &config).as_slice());
    }

    #[test]
    fn streaming_writer_needs_seek() {
        let mut stream = Stream::new(WriteOnlySink::default());
        let result = ChunkWriter::begin(&mut stream, 1, 1, &ChunkConfig::default());
        assert!(matches!(result, Err(Error::InvalidOperation)));
        assert_eq!(stream.error_state(), ErrorCode::InvalidOperation);
    }

    #[test]
    fn write_into_full_region_fails() {
        let mut storage = [0u8; 16];
        let mut stream = Stream::from_rw_memory(&mut storage);
        let error = write_chunk(&mut stream, 1, 1, b"too long", &ChunkConfig::default()).unwrap_err();
        assert_eq!(error.code(), ErrorCode::EndOfStream);
        assert_eq!(stream.error_state(), ErrorCode::EndOfStream);
    }
}

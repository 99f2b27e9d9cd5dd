//! File-backed stream backends.
//!
//! This module provides the backends that reach the filesystem:
//!
//! - [`FileStream`] - unbuffered size/read/write/seek/close over a caller-owned [`fs::File`]
//! - [`BufferedFileReader`] - read-only buffered reader with a fixed local buffer
//! - [`MappedFile`] - memory-mapped file handing out read-only streams
//!
//! # Examples
//!
//! ```rust,no_run
//! use chunkio::stream::physical::MappedFile;
//!
//! let mapped = MappedFile::open("assets.bin")?;
//! let mut stream = mapped.stream();
//! println!("{} bytes mapped", stream.size().value());
//! # Ok::<(), chunkio::Error>(())
//! ```

use std::{
    fs,
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use memmap2::Mmap;

use super::{
    memory::ReadOnlyMemory, Backend, BufferedIo, Capabilities, ErrorCode, IoOffset, IoResult,
    IoSize, SeekOrigin, Stream,
};
use crate::{Error::FileError, Result};

/// Default buffer size of a [`BufferedFileReader`].
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

fn to_seek_from(offset: IoOffset, origin: SeekOrigin) -> Option<SeekFrom> {
    match origin {
        SeekOrigin::Begin => u64::try_from(offset).ok().map(SeekFrom::Start),
        SeekOrigin::Current => Some(SeekFrom::Current(offset)),
        SeekOrigin::End => Some(SeekFrom::End(offset)),
    }
}

fn write_error_code(error: &io::Error) -> ErrorCode {
    match error.kind() {
        io::ErrorKind::WriteZero => ErrorCode::EndOfStream,
        io::ErrorKind::OutOfMemory => ErrorCode::AllocationFailure,
        _ => ErrorCode::UnknownError,
    }
}

/// Unbuffered stream over an open file handle.
///
/// The handle stays owned by the caller; [`Stream::close`] flushes and syncs it but does
/// not drop it.
#[derive(Debug)]
pub struct FileStream<'a> {
    file: &'a mut fs::File,
}

impl<'a> FileStream<'a> {
    /// Create a new backend over `file`, starting at the handle's current position.
    pub fn new(file: &'a mut fs::File) -> FileStream<'a> {
        FileStream { file }
    }
}

impl Backend for FileStream<'_> {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SIZE
            | Capabilities::READ
            | Capabilities::WRITE
            | Capabilities::SEEK
            | Capabilities::CLOSE
    }

    fn size(&mut self) -> IoResult {
        match self.file.metadata() {
            Ok(metadata) => IoResult::ok(metadata.len()),
            Err(error) => {
                log::debug!("file size query failed: {error}");
                IoResult::error(ErrorCode::UnknownError)
            }
        }
    }

    fn read(&mut self, destination: &mut [u8]) -> IoResult {
        let mut total = 0;
        while total < destination.len() {
            match self.file.read(&mut destination[total..]) {
                Ok(0) => return IoResult::new(total as IoSize, ErrorCode::EndOfStream),
                Ok(count) => total += count,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    log::debug!("file read failed after {total} bytes: {error}");
                    return IoResult::new(total as IoSize, ErrorCode::ReadError);
                }
            }
        }

        IoResult::ok(total as IoSize)
    }

    fn write(&mut self, source: &[u8]) -> IoResult {
        let mut total = 0;
        while total < source.len() {
            match self.file.write(&source[total..]) {
                Ok(0) => return IoResult::new(total as IoSize, ErrorCode::EndOfStream),
                Ok(count) => total += count,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    log::debug!("file write failed after {total} bytes: {error}");
                    return IoResult::new(total as IoSize, write_error_code(&error));
                }
            }
        }

        IoResult::ok(total as IoSize)
    }

    fn seek(&mut self, offset: IoOffset, origin: SeekOrigin, _buffered: &mut BufferedIo) -> IoResult {
        let Some(target) = to_seek_from(offset, origin) else {
            return IoResult::error(ErrorCode::SeekError);
        };

        match self.file.seek(target) {
            Ok(position) => IoResult::ok(position),
            Err(_) => IoResult::error(ErrorCode::SeekError),
        }
    }

    fn close(&mut self) -> ErrorCode {
        match self.file.flush().and_then(|()| self.file.sync_all()) {
            Ok(()) => ErrorCode::Success,
            Err(error) => {
                log::warn!("failed to sync file on close: {error}");
                ErrorCode::UnknownError
            }
        }
    }
}

/// Read-only buffered reader over any seekable byte source.
///
/// Bytes are pulled from the source into a fixed local buffer that is exposed through the
/// stream's buffered window. Reaching the end of the source, or any read failure, is
/// terminal for the stream.
pub struct BufferedFileReader<R> {
    inner: R,
    buffer: Box<[u8]>,
}

impl<R: Read + Seek> BufferedFileReader<R> {
    /// Create a new reader with a buffer of [`DEFAULT_BUFFER_CAPACITY`] bytes.
    pub fn new(inner: R) -> BufferedFileReader<R> {
        BufferedFileReader::with_capacity(inner, DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a new reader with a buffer of `capacity` bytes (at least one).
    pub fn with_capacity(inner: R, capacity: usize) -> BufferedFileReader<R> {
        BufferedFileReader {
            inner,
            buffer: vec![0; capacity.max(1)].into_boxed_slice(),
        }
    }

    /// Size of the local buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Gives back the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> std::fmt::Debug for BufferedFileReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedFileReader")
            .field("capacity", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek> Backend for BufferedFileReader<R> {
    fn kind(&self) -> &'static str {
        "buffered-file"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SIZE | Capabilities::SEEK | Capabilities::BUFFERED_READ
    }

    fn size(&mut self) -> IoResult {
        let size = self.inner.stream_position().and_then(|position| {
            let end = self.inner.seek(SeekFrom::End(0))?;
            self.inner.seek(SeekFrom::Start(position))?;
            Ok(end)
        });

        match size {
            Ok(size) => IoResult::ok(size),
            Err(error) => {
                log::debug!("buffered file size query failed: {error}");
                IoResult::error(ErrorCode::UnknownError)
            }
        }
    }

    fn seek(&mut self, offset: IoOffset, origin: SeekOrigin, buffered: &mut BufferedIo) -> IoResult {
        // The source sits past every unread byte of the window.
        let target = match origin {
            SeekOrigin::Current => IoOffset::try_from(buffered.available())
                .ok()
                .and_then(|unread| offset.checked_sub(unread))
                .map(SeekFrom::Current),
            _ => to_seek_from(offset, origin),
        };

        let Some(target) = target else {
            return IoResult::error(ErrorCode::SeekError);
        };

        match self.inner.seek(target) {
            Ok(position) => {
                buffered.set_window(0, 0);
                IoResult::ok(position)
            }
            Err(_) => IoResult::error(ErrorCode::SeekError),
        }
    }

    fn window(&self) -> &[u8] {
        &self.buffer
    }

    fn refill(&mut self, buffered: &mut BufferedIo) -> ErrorCode {
        // Keep anything still unread at the front of the buffer.
        let unread = buffered.available();
        self.buffer
            .copy_within(buffered.cursor()..buffered.end(), 0);

        loop {
            match self.inner.read(&mut self.buffer[unread..]) {
                Ok(0) if unread == 0 => return ErrorCode::EndOfStream,
                Ok(count) => {
                    buffered.set_window(0, unread + count);
                    return ErrorCode::Success;
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    log::debug!("buffered file refill failed: {error}");
                    return ErrorCode::ReadError;
                }
            }
        }
    }
}

/// A read-only memory-mapped file.
///
/// Owns the mapping; streams handed out by [`MappedFile::stream`] borrow it and therefore
/// cannot outlive it.
#[derive(Debug)]
pub struct MappedFile {
    // Empty files cannot be mapped on every platform.
    map: Option<Mmap>,
}

impl MappedFile {
    /// Maps the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>) -> Result<MappedFile> {
        let file = fs::File::open(path).map_err(FileError)?;
        MappedFile::from_std_file(&file)
    }

    /// Maps an already opened file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be mapped.
    pub fn from_std_file(file: &fs::File) -> Result<MappedFile> {
        if file.metadata().map_err(FileError)?.len() == 0 {
            return Ok(MappedFile { map: None });
        }

        // The mapping is read-only; concurrent modification of the file is the caller's concern.
        let map = unsafe { Mmap::map(file) }.map_err(FileError)?;
        log::debug!("mapped {} bytes", map.len());

        Ok(MappedFile { map: Some(map) })
    }

    /// The mapped bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    /// Length of the mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` for an empty file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// A buffered, read-only stream over the mapping.
    #[must_use]
    pub fn stream(&self) -> Stream<'_> {
        Stream::new(ReadOnlyMemory::new(self.data()))
    }
}

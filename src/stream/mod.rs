//! Uniform binary stream abstraction with pluggable backends.
//!
//! A [`Stream`] is one open binary data source or sink. It dispatches a closed set of
//! operations (size, read, write, seek, close) to a [`Backend`], which advertises the subset
//! it implements through [`Capabilities`]. Formats are written once against [`Stream`] and
//! work unchanged over memory regions, growable vectors, files and memory-mapped files.
//!
//! # Architecture
//!
//! - **Capability dispatch** - an operation whose capability is absent returns
//!   [`ErrorCode::InvalidOperation`] without reaching the backend or moving the position.
//! - **Sticky error state** - the first failure recorded on a stream wins and is reported by
//!   every later operation until [`Stream::reset_error_state`] is called.
//! - **Buffered reads** - backends that own a buffer expose it directly through a
//!   [`BufferedIo`] window, so bulk reads amortise backend calls and callers may read from
//!   the live buffer without an intermediate copy.
//!
//! # Key Components
//!
//! - [`crate::stream::Stream`] - Dispatch, error accumulation and the buffered read loop
//! - [`crate::stream::Backend`] - Trait implemented by byte sources and sinks
//! - [`crate::stream::io`] - Endian-aware integer codec on top of streams and slices
//! - [`crate::stream::memory`] - Fixed memory, read-only memory and `Vec` backends
//! - [`crate::stream::physical`] - File, buffered file and memory-mapped file backends
//!
//! # Examples
//!
//! ```rust
//! use chunkio::{ErrorCode, SeekOrigin, Stream};
//!
//! let mut storage = [0u8; 8];
//! let mut stream = Stream::from_rw_memory(&mut storage);
//!
//! assert_eq!(stream.write(b"abcd").value(), 4);
//! assert_eq!(stream.seek(0, SeekOrigin::Begin).value(), 0);
//!
//! let mut out = [0u8; 4];
//! assert!(stream.read(&mut out).is_ok());
//! assert_eq!(&out, b"abcd");
//!
//! // Reading past the end is a short read.
//! let mut tail = [0u8; 8];
//! let result = stream.read(&mut tail);
//! assert_eq!(result.value(), 4);
//! assert_eq!(result.error_code(), ErrorCode::EndOfStream);
//! ```
//!
//! # Thread Safety
//!
//! A [`Stream`] is a plain single-threaded value: it is not `Sync`, and its cursor, window
//! and error state are unprotected. Independent streams over independent backends share no
//! mutable state. The only global is the read-only zero buffer served after a permanent
//! buffered-read failure.

pub mod io;
pub mod memory;
pub mod physical;

mod buffered;
mod types;

use std::fs;

use bitflags::bitflags;

use buffered::FAILURE_BUFFER;
pub use buffered::BufferedIo;
pub use types::{ErrorCode, IoOffset, IoResult, IoSize, SeekOrigin};

use memory::{ReadOnlyMemory, ReadWriteMemory, VecMemory};
use physical::{BufferedFileReader, FileStream};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Operations a [`Backend`] implements.
    pub struct Capabilities: u8 {
        /// [`Backend::size`] is implemented
        const SIZE = 0x01;
        /// [`Backend::read`] is implemented
        const READ = 0x02;
        /// [`Backend::write`] is implemented
        const WRITE = 0x04;
        /// [`Backend::seek`] is implemented
        const SEEK = 0x08;
        /// [`Backend::close`] does something
        const CLOSE = 0x10;
        /// [`Backend::window`] and [`Backend::refill`] are implemented
        const BUFFERED_READ = 0x20;
    }
}

/// A concrete byte source or sink.
///
/// Implementors advertise what they support through [`Backend::capabilities`]; the stream
/// never calls a method whose capability is absent, so the defaults only exist to keep
/// partial backends short.
///
/// Short transfers must be reported as such: a read that fills fewer bytes than requested
/// returns the partial count with [`ErrorCode::EndOfStream`] (or a more specific failure).
pub trait Backend {
    /// Short human readable name used in log output.
    fn kind(&self) -> &'static str;

    /// Operations this backend implements.
    fn capabilities(&self) -> Capabilities;

    /// Total size of the underlying data.
    fn size(&mut self) -> IoResult {
        IoResult::error(ErrorCode::InvalidOperation)
    }

    /// Copies bytes at the current position into `destination`.
    ///
    /// `destination` is never empty.
    fn read(&mut self, _destination: &mut [u8]) -> IoResult {
        IoResult::error(ErrorCode::InvalidOperation)
    }

    /// Copies `source` into the data at the current position.
    ///
    /// `source` is never empty.
    fn write(&mut self, _source: &[u8]) -> IoResult {
        IoResult::error(ErrorCode::InvalidOperation)
    }

    /// Moves the current position, returning the new absolute position.
    ///
    /// Buffered backends must account for the unread part of `buffered` when seeking
    /// relative to the current position, and leave the window in a valid state afterwards.
    fn seek(&mut self, _offset: IoOffset, _origin: SeekOrigin, _buffered: &mut BufferedIo) -> IoResult {
        IoResult::error(ErrorCode::InvalidOperation)
    }

    /// Releases whatever the backend documents it releases.
    fn close(&mut self) -> ErrorCode {
        ErrorCode::Success
    }

    /// Window a freshly constructed stream starts with.
    fn initial_window(&self) -> BufferedIo {
        BufferedIo::empty()
    }

    /// The buffer that [`BufferedIo`] indices refer to.
    fn window(&self) -> &[u8] {
        &[]
    }

    /// Makes more bytes available in the window.
    ///
    /// Called only when the window is exhausted. On success the backend must have called
    /// [`BufferedIo::set_window`] with at least one byte. Any other return value is treated
    /// as terminal; the stream then stops calling into the backend for buffered reads.
    fn refill(&mut self, _buffered: &mut BufferedIo) -> ErrorCode {
        ErrorCode::EndOfStream
    }
}

/// One open binary data source or sink.
///
/// Constructed from a backend through [`Stream::new`] or one of the `from_*` factories. The
/// stream borrows whatever backing storage its factory was given (`'a`); it never takes
/// ownership of caller memory or file handles, and dropping it performs no cleanup. Call
/// [`Stream::close`] to run the backend's close behaviour.
pub struct Stream<'a> {
    backend: Box<dyn Backend + 'a>,
    capabilities: Capabilities,
    buffered: BufferedIo,
    error_state: ErrorCode,
}

impl<'a> Stream<'a> {
    /// Wraps a backend.
    pub fn new<B: Backend + 'a>(backend: B) -> Stream<'a> {
        let capabilities = backend.capabilities();
        let buffered = backend.initial_window();

        log::debug!(
            "opened {} stream with capabilities {:?}",
            backend.kind(),
            capabilities
        );

        Stream {
            backend: Box::new(backend),
            capabilities,
            buffered,
            error_state: ErrorCode::Success,
        }
    }

    /// Stream over a fixed, writable memory region.
    pub fn from_rw_memory(bytes: &'a mut [u8]) -> Stream<'a> {
        Stream::new(ReadWriteMemory::new(bytes))
    }

    /// Buffered, read-only stream over a memory region.
    pub fn from_ro_memory(bytes: &'a [u8]) -> Stream<'a> {
        Stream::new(ReadOnlyMemory::new(bytes))
    }

    /// Stream over a growable vector, starting at position 0.
    pub fn from_vec(buffer: &'a mut Vec<u8>) -> Stream<'a> {
        Stream::new(VecMemory::new(buffer))
    }

    /// Unbuffered stream over an open file handle.
    pub fn from_file(file: &'a mut fs::File) -> Stream<'a> {
        Stream::new(FileStream::new(file))
    }

    /// Buffered, read-only stream over an open file handle.
    pub fn from_file_buffered(file: &'a mut fs::File) -> Stream<'a> {
        Stream::new(BufferedFileReader::new(file))
    }

    /// Operations the backend implements.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Plain reads are possible, either directly or through the buffered window.
    #[must_use]
    pub fn supports_read(&self) -> bool {
        self.capabilities
            .intersects(Capabilities::READ | Capabilities::BUFFERED_READ)
    }

    /// Writes are possible.
    #[must_use]
    pub fn supports_write(&self) -> bool {
        self.capabilities.contains(Capabilities::WRITE)
    }

    /// The buffered window API is available.
    #[must_use]
    pub fn supports_buffered_read(&self) -> bool {
        self.capabilities.contains(Capabilities::BUFFERED_READ)
    }

    /// Seeking is possible.
    #[must_use]
    pub fn supports_seek(&self) -> bool {
        self.capabilities.contains(Capabilities::SEEK)
    }

    /// Size queries are possible.
    #[must_use]
    pub fn supports_size(&self) -> bool {
        self.capabilities.contains(Capabilities::SIZE)
    }

    /// The sticky error state.
    #[must_use]
    pub fn error_state(&self) -> ErrorCode {
        self.error_state
    }

    /// Clears the sticky error state, returning what it was.
    ///
    /// A buffered stream that failed permanently stays failed: the next buffered read
    /// goes back through the failure stub and records the terminal error again.
    pub fn reset_error_state(&mut self) -> ErrorCode {
        if self.buffered.failure().is_some() {
            self.buffered.exhaust();
        }

        std::mem::take(&mut self.error_state)
    }

    /// Total size of the stream.
    pub fn size(&mut self) -> IoResult {
        if !self.supports_size() {
            return self.unsupported();
        }

        let result = self.backend.size();
        self.finish(result)
    }

    /// Reads exactly `destination.len()` bytes unless the stream runs dry or fails.
    ///
    /// Returns the number of bytes transferred; fewer than requested is never reported as
    /// success. Backends without a direct read are serviced through the buffered window.
    pub fn read(&mut self, destination: &mut [u8]) -> IoResult {
        if destination.is_empty() {
            return IoResult::ok(0);
        }

        if self.capabilities.contains(Capabilities::READ) {
            let result = self.backend.read(destination);
            return self.finish(result);
        }

        if self.supports_buffered_read() {
            return self.buffered_read(destination);
        }

        self.unsupported()
    }

    /// Writes all of `source` unless the stream fails.
    pub fn write(&mut self, source: &[u8]) -> IoResult {
        if source.is_empty() {
            return IoResult::ok(0);
        }

        if !self.supports_write() {
            return self.unsupported();
        }

        let result = self.backend.write(source);
        self.finish(result)
    }

    /// Moves the current position. The magnitude of the result is the new position.
    ///
    /// Seeking a buffered stream that has failed permanently reports the terminal error.
    pub fn seek(&mut self, offset: IoOffset, origin: SeekOrigin) -> IoResult {
        if !self.supports_seek() {
            return self.unsupported();
        }

        if let Some(code) = self.buffered.failure() {
            self.buffered.fail(code);
            self.record(code);
            return IoResult::error(code);
        }

        let result = self.backend.seek(offset, origin, &mut self.buffered);
        self.finish(result)
    }

    /// Current absolute position.
    pub fn position(&mut self) -> IoResult {
        self.seek(0, SeekOrigin::Current)
    }

    /// Runs the backend's close behaviour and consumes the stream.
    ///
    /// Returns the backend's result, or [`ErrorCode::Success`] when it has nothing to close.
    pub fn close(mut self) -> ErrorCode {
        if !self.capabilities.contains(Capabilities::CLOSE) {
            return ErrorCode::Success;
        }

        let code = self.backend.close();
        log::debug!("closed {} stream ({code})", self.backend.kind());
        code
    }

    // Buffered IO

    /// Unread bytes in the buffered window.
    #[must_use]
    pub fn num_bytes_available(&self) -> usize {
        self.buffered.available()
    }

    /// The unread part of the buffered window, borrowed straight from the backend.
    ///
    /// Use [`Stream::consume`] to mark bytes as read. Empty for unbuffered streams.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        &self.window_bytes()[self.buffered.cursor()..self.buffered.end()]
    }

    /// Marks `count` bytes of [`Stream::buffer`] as consumed.
    ///
    /// Consuming more than [`Stream::num_bytes_available`] is a programmer error.
    pub fn consume(&mut self, count: usize) {
        self.buffered.consume(count);
    }

    /// The buffered window record.
    #[must_use]
    pub fn buffered_io(&self) -> &BufferedIo {
        &self.buffered
    }

    /// Makes more bytes available in the buffered window.
    ///
    /// Must only be called once the window is exhausted. On success the window holds at
    /// least one unread byte. A backend failure is terminal: the window is rebound to a
    /// zero-filled stub that keeps reporting the same error without calling the backend.
    pub fn refill(&mut self) -> ErrorCode {
        if !self.supports_buffered_read() {
            return self.unsupported().error_code();
        }

        binary_assert!(
            self.buffered.is_exhausted(),
            "refill requires an exhausted buffer, {} bytes unread",
            self.buffered.available()
        );

        if let Some(code) = self.buffered.failure() {
            self.buffered.fail(code);
            self.record(code);
            return code;
        }

        let code = self.backend.refill(&mut self.buffered);
        if !code.is_success() {
            return self.fail_buffered(code);
        }

        binary_assert!(
            self.buffered.cursor() == self.buffered.start()
                && self.buffered.cursor() < self.buffered.end(),
            "{} refill must produce at least one byte",
            self.backend.kind()
        );
        binary_assert!(
            self.buffered.end() <= self.backend.window().len(),
            "{} refill window ends past its buffer",
            self.backend.kind()
        );

        log::trace!(
            "{} refilled {} bytes",
            self.backend.kind(),
            self.buffered.available()
        );
        code
    }

    /// Copies up to `destination.len()` bytes out of the buffered window, refilling as needed.
    ///
    /// Stops early once the stream's error state is not [`ErrorCode::Success`]. Returns the
    /// number of bytes copied paired with the stream's error state.
    pub fn buffered_read(&mut self, destination: &mut [u8]) -> IoResult {
        if destination.is_empty() {
            return IoResult::ok(0);
        }

        if !self.supports_buffered_read() {
            return self.unsupported();
        }

        let mut written = 0;
        while written < destination.len() {
            if self.buffered.is_exhausted() {
                self.refill();
            }

            if !self.error_state.is_success() {
                break;
            }

            let count = (destination.len() - written).min(self.buffered.available());
            let cursor = self.buffered.cursor();
            destination[written..written + count]
                .copy_from_slice(&self.window_bytes()[cursor..cursor + count]);

            written += count;
            self.buffered.consume(count);
        }

        IoResult::new(written as IoSize, self.error_state)
    }

    /// Records an error that a layer above the backend detected (e.g. a parse failure).
    pub(crate) fn record(&mut self, code: ErrorCode) -> ErrorCode {
        if self.error_state.is_success() {
            self.error_state = code;
        }

        self.error_state
    }

    // A sticky error zeroes the magnitude unless the backend itself reported a short transfer.
    fn finish(&mut self, result: IoResult) -> IoResult {
        let code = self.record(result.error_code());
        if result.is_ok() && !code.is_success() {
            return IoResult::error(code);
        }

        result.with_code(code)
    }

    fn unsupported(&mut self) -> IoResult {
        self.record(ErrorCode::InvalidOperation);
        IoResult::error(ErrorCode::InvalidOperation)
    }

    fn fail_buffered(&mut self, code: ErrorCode) -> ErrorCode {
        log::warn!(
            "{} stream failed permanently with {code}",
            self.backend.kind()
        );

        self.buffered.fail(code);
        self.record(code)
    }

    fn window_bytes(&self) -> &[u8] {
        if self.buffered.failure().is_some() {
            &FAILURE_BUFFER
        } else {
            self.backend.window()
        }
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("backend", &self.backend.kind())
            .field("capabilities", &self.capabilities)
            .field("buffered", &self.buffered)
            .field("error_state", &self.error_state)
            .finish()
    }
}

fn to_io_error(code: ErrorCode) -> std::io::Error {
    let kind = match code {
        ErrorCode::EndOfStream => std::io::ErrorKind::UnexpectedEof,
        ErrorCode::AllocationFailure => std::io::ErrorKind::OutOfMemory,
        ErrorCode::SeekError | ErrorCode::InvalidData => std::io::ErrorKind::InvalidInput,
        ErrorCode::InvalidOperation => std::io::ErrorKind::Unsupported,
        _ => std::io::ErrorKind::Other,
    };

    std::io::Error::new(kind, crate::Error::from(code))
}

impl std::io::Read for Stream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let result = Stream::read(self, buf);
        match result.error_code() {
            _ if result.value() > 0 => Ok(result.value() as usize),
            ErrorCode::Success | ErrorCode::EndOfStream => Ok(0),
            code => Err(to_io_error(code)),
        }
    }
}

impl std::io::Write for Stream<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let result = Stream::write(self, buf);
        match result.error_code() {
            _ if result.value() > 0 => Ok(result.value() as usize),
            ErrorCode::Success => Ok(0),
            code => Err(to_io_error(code)),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::io::Seek for Stream<'_> {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let (offset, origin) = match pos {
            std::io::SeekFrom::Start(offset) => (
                IoOffset::try_from(offset).map_err(|_| to_io_error(ErrorCode::SeekError))?,
                SeekOrigin::Begin,
            ),
            std::io::SeekFrom::Current(offset) => (offset, SeekOrigin::Current),
            std::io::SeekFrom::End(offset) => (offset, SeekOrigin::End),
        };

        Stream::seek(self, offset, origin)
            .into_result()
            .map_err(|error| to_io_error(error.code()))
    }
}

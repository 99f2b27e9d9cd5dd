//! Memory-backed stream backends.
//!
//! - [`ReadWriteMemory`] - fixed-size writable region, never grows
//! - [`ReadOnlyMemory`] - read-only region exposed as one buffered window
//! - [`VecMemory`] - growable `Vec<u8>`, writes and seeks past the end extend it
//!
//! None of them own their storage; the caller keeps it alive for the lifetime of the stream.

use super::{Backend, BufferedIo, Capabilities, ErrorCode, IoOffset, IoResult, IoSize, SeekOrigin};

/// Copies as many of `desired` bytes from `source` into `destination` as both allow,
/// advancing `cursor` by the amount copied.
///
/// A transfer shorter than `desired` reports [`ErrorCode::EndOfStream`] with the partial count.
pub fn copy_bytes(destination: &mut [u8], source: &[u8], desired: usize, cursor: &mut usize) -> IoResult {
    let count = desired.min(destination.len()).min(source.len());
    destination[..count].copy_from_slice(&source[..count]);
    *cursor += count;

    if count < desired {
        IoResult::new(count as IoSize, ErrorCode::EndOfStream)
    } else {
        IoResult::ok(count as IoSize)
    }
}

fn seek_within(offset: IoOffset, origin: SeekOrigin, current: usize, len: usize) -> Option<usize> {
    let target = origin.resolve(offset, current as IoSize, len as IoSize)?;
    usize::try_from(target).ok().filter(|&target| target <= len)
}

/// A fixed-size, writable memory region.
///
/// Reads and writes past the end transfer what fits and report [`ErrorCode::EndOfStream`];
/// seeking is limited to `[0, len]`.
#[derive(Debug)]
pub struct ReadWriteMemory<'a> {
    data: &'a mut [u8],
    cursor: usize,
}

impl<'a> ReadWriteMemory<'a> {
    /// Create a new backend over `data`, positioned at the start.
    pub fn new(data: &'a mut [u8]) -> ReadWriteMemory<'a> {
        ReadWriteMemory { data, cursor: 0 }
    }

    fn bytes_left(&self) -> usize {
        self.data.len() - self.cursor
    }
}

impl Backend for ReadWriteMemory<'_> {
    fn kind(&self) -> &'static str {
        "rw-memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SIZE | Capabilities::READ | Capabilities::WRITE | Capabilities::SEEK
    }

    fn size(&mut self) -> IoResult {
        IoResult::ok(self.data.len() as IoSize)
    }

    fn read(&mut self, destination: &mut [u8]) -> IoResult {
        let desired = destination.len();
        copy_bytes(destination, &self.data[self.cursor..], desired, &mut self.cursor)
    }

    fn write(&mut self, source: &[u8]) -> IoResult {
        if self.bytes_left() == 0 {
            return IoResult::error(ErrorCode::EndOfStream);
        }

        let start = self.cursor;
        copy_bytes(&mut self.data[start..], source, source.len(), &mut self.cursor)
    }

    fn seek(&mut self, offset: IoOffset, origin: SeekOrigin, _buffered: &mut BufferedIo) -> IoResult {
        match seek_within(offset, origin, self.cursor, self.data.len()) {
            Some(target) => {
                self.cursor = target;
                IoResult::ok(target as IoSize)
            }
            None => IoResult::error(ErrorCode::SeekError),
        }
    }
}

/// A read-only memory region.
///
/// The whole region is the buffered window from the start, so reads never copy into an
/// intermediate buffer and a refill can only mean the end of the data.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnlyMemory<'a> {
    data: &'a [u8],
}

impl<'a> ReadOnlyMemory<'a> {
    /// Create a new backend over `data`.
    pub fn new(data: &'a [u8]) -> ReadOnlyMemory<'a> {
        ReadOnlyMemory { data }
    }
}

impl Backend for ReadOnlyMemory<'_> {
    fn kind(&self) -> &'static str {
        "ro-memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SIZE | Capabilities::SEEK | Capabilities::BUFFERED_READ
    }

    fn size(&mut self) -> IoResult {
        IoResult::ok(self.data.len() as IoSize)
    }

    fn seek(&mut self, offset: IoOffset, origin: SeekOrigin, buffered: &mut BufferedIo) -> IoResult {
        match seek_within(offset, origin, buffered.cursor(), self.data.len()) {
            Some(target) => {
                buffered.set_window(0, self.data.len());
                buffered.set_cursor(target);
                IoResult::ok(target as IoSize)
            }
            None => IoResult::error(ErrorCode::SeekError),
        }
    }

    fn initial_window(&self) -> BufferedIo {
        BufferedIo::over(0, self.data.len())
    }

    fn window(&self) -> &[u8] {
        self.data
    }

    fn refill(&mut self, _buffered: &mut BufferedIo) -> ErrorCode {
        // A memory region cannot be refilled.
        ErrorCode::EndOfStream
    }
}

/// A growable vector.
///
/// Writing past the end grows the vector, seeking past the end zero-extends it. Allocation
/// failures are reported as [`ErrorCode::AllocationFailure`] instead of aborting.
#[derive(Debug)]
pub struct VecMemory<'a> {
    buffer: &'a mut Vec<u8>,
    cursor: usize,
}

impl<'a> VecMemory<'a> {
    /// Create a new backend over `buffer`, positioned at the start.
    pub fn new(buffer: &'a mut Vec<u8>) -> VecMemory<'a> {
        VecMemory { buffer, cursor: 0 }
    }

    fn grow_to(&mut self, len: usize) -> ErrorCode {
        if len <= self.buffer.len() {
            return ErrorCode::Success;
        }

        if self.buffer.try_reserve(len - self.buffer.len()).is_err() {
            return ErrorCode::AllocationFailure;
        }

        self.buffer.resize(len, 0);
        ErrorCode::Success
    }
}

impl Backend for VecMemory<'_> {
    fn kind(&self) -> &'static str {
        "vec"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SIZE | Capabilities::READ | Capabilities::WRITE | Capabilities::SEEK
    }

    fn size(&mut self) -> IoResult {
        IoResult::ok(self.buffer.len() as IoSize)
    }

    fn read(&mut self, destination: &mut [u8]) -> IoResult {
        let desired = destination.len();
        let start = self.cursor.min(self.buffer.len());
        copy_bytes(destination, &self.buffer[start..], desired, &mut self.cursor)
    }

    fn write(&mut self, source: &[u8]) -> IoResult {
        let Some(needed) = self.cursor.checked_add(source.len()) else {
            return IoResult::error(ErrorCode::AllocationFailure);
        };

        let code = self.grow_to(needed);
        if !code.is_success() {
            return IoResult::error(code);
        }

        let start = self.cursor;
        copy_bytes(&mut self.buffer[start..], source, source.len(), &mut self.cursor)
    }

    fn seek(&mut self, offset: IoOffset, origin: SeekOrigin, _buffered: &mut BufferedIo) -> IoResult {
        let target = origin
            .resolve(offset, self.cursor as IoSize, self.buffer.len() as IoSize)
            .and_then(|target| usize::try_from(target).ok());

        let Some(target) = target else {
            return IoResult::error(ErrorCode::SeekError);
        };

        let code = self.grow_to(target);
        if !code.is_success() {
            return IoResult::error(code);
        }

        self.cursor = target;
        IoResult::ok(target as IoSize)
    }
}

//! Value types shared by every stream operation.
//!
//! Stream operations report their outcome as an [`IoResult`]: a magnitude (bytes
//! transferred, a size or a seek position) packed together with an [`ErrorCode`].
//! The packing keeps the result a single `u64`, so streams can return it by value
//! through the backend dispatch without allocating or boxing an error.
//!
//! # Encoding
//!
//! ```text
//!  63                                   3 2     0
//! +--------------------------------------+-------+
//! |              magnitude               | code  |
//! +--------------------------------------+-------+
//! ```
//!
//! Magnitudes up to `2^61 - 1` round-trip losslessly, which covers any realistic
//! file or buffer size.

use strum::{Display, EnumCount, EnumIter, FromRepr};

use crate::{Error, Result};

/// Size type used for stream operations.
pub type IoSize = u64;

/// Signed offset type used for seeking.
pub type IoOffset = i64;

/// Outcome classification of a stream operation.
///
/// The numeric values are part of the packed [`IoResult`] encoding and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, EnumCount, FromRepr)]
#[repr(u8)]
pub enum ErrorCode {
    /// No error occurred.
    #[default]
    Success = 0,
    /// No more data in stream.
    EndOfStream = 1,
    /// Failed to allocate memory for internal stream operations.
    AllocationFailure = 2,
    /// Failed to get more data from the stream.
    ReadError = 3,
    /// Invalid seek location.
    SeekError = 4,
    /// The data read could not be parsed.
    InvalidData = 5,
    /// The stream does not support the requested operation.
    InvalidOperation = 6,
    /// Unknown failure.
    UnknownError = 7,
}

impl ErrorCode {
    /// Number of low bits an [`IoResult`] reserves for the code.
    pub const BITS: u32 = 3;

    /// Mask selecting the code bits of a packed [`IoResult`].
    pub const MASK: u64 = (1 << Self::BITS) - 1;

    /// Returns `true` for [`ErrorCode::Success`].
    #[must_use]
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }

    /// Converts a failure code into the matching [`Error`], `None` for success.
    #[must_use]
    pub fn into_error(self) -> Option<Error> {
        match self {
            ErrorCode::Success => None,
            ErrorCode::EndOfStream => Some(Error::EndOfStream),
            ErrorCode::AllocationFailure => Some(Error::AllocationFailure),
            ErrorCode::ReadError => Some(Error::ReadError),
            ErrorCode::SeekError => Some(Error::SeekError),
            ErrorCode::InvalidData => Some(Error::InvalidData),
            ErrorCode::InvalidOperation => Some(Error::InvalidOperation),
            ErrorCode::UnknownError => Some(Error::UnknownError),
        }
    }

    /// `Ok(())` for success, the matching [`Error`] otherwise.
    ///
    /// # Errors
    /// Returns the [`Error`] variant corresponding to a non-success code.
    pub fn into_result(self) -> Result<()> {
        match self.into_error() {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

/// Reference point for [`crate::Stream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum SeekOrigin {
    /// Offset is relative to the start of the stream.
    Begin = 0,
    /// Offset is relative to the current position.
    Current = 1,
    /// Offset is relative to the end of the stream.
    End = 2,
}

impl SeekOrigin {
    /// Resolves `offset` against this origin into an absolute position.
    ///
    /// Returns `None` when the target lies before the start of the stream or overflows.
    #[must_use]
    pub fn resolve(self, offset: IoOffset, current: IoSize, end: IoSize) -> Option<IoSize> {
        let base = match self {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => current,
            SeekOrigin::End => end,
        };

        let target = i128::from(base) + i128::from(offset);
        IoSize::try_from(target).ok()
    }
}

/// Outcome of a stream operation: a magnitude packed together with an [`ErrorCode`].
///
/// The magnitude is the number of bytes transferred for reads and writes, the total
/// size for size queries and the resulting absolute position for seeks. Failed
/// operations report a magnitude of 0 unless they transferred part of a request.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IoResult(u64);

impl IoResult {
    /// Largest magnitude that survives packing.
    pub const MAX_VALUE: IoSize = u64::MAX >> ErrorCode::BITS;

    /// Packs a magnitude and an error code.
    #[must_use]
    pub const fn new(value: IoSize, code: ErrorCode) -> IoResult {
        IoResult((value << ErrorCode::BITS) | code as u64)
    }

    /// A successful result with the given magnitude.
    #[must_use]
    pub const fn ok(value: IoSize) -> IoResult {
        IoResult::new(value, ErrorCode::Success)
    }

    /// A failed result with a magnitude of 0.
    #[must_use]
    pub const fn error(code: ErrorCode) -> IoResult {
        IoResult::new(0, code)
    }

    /// The error code.
    #[must_use]
    pub fn error_code(self) -> ErrorCode {
        // Three bits always hold a valid discriminant.
        ErrorCode::from_repr((self.0 & ErrorCode::MASK) as u8).unwrap_or(ErrorCode::UnknownError)
    }

    /// The magnitude.
    #[must_use]
    pub const fn value(self) -> IoSize {
        self.0 >> ErrorCode::BITS
    }

    /// Returns `true` when the error code is [`ErrorCode::Success`].
    #[must_use]
    pub fn is_ok(self) -> bool {
        self.error_code().is_success()
    }

    /// Same magnitude, different code.
    #[must_use]
    pub fn with_code(self, code: ErrorCode) -> IoResult {
        IoResult::new(self.value(), code)
    }

    /// The raw packed representation.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Converts into a [`Result`], dropping the magnitude of failures.
    ///
    /// # Errors
    /// Returns the [`Error`] variant matching a non-success code.
    pub fn into_result(self) -> Result<IoSize> {
        match self.error_code().into_error() {
            None => Ok(self.value()),
            Some(error) => Err(error),
        }
    }
}

impl From<ErrorCode> for IoResult {
    fn from(code: ErrorCode) -> Self {
        IoResult::error(code)
    }
}

impl std::fmt::Debug for IoResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoResult")
            .field("value", &self.value())
            .field("code", &self.error_code())
            .finish()
    }
}

use thiserror::Error;

use crate::stream::ErrorCode;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Stream operations themselves report failures as packed [`crate::IoResult`] values; this enum
/// is what those values turn into once a caller leaves the value-style API through
/// [`crate::IoResult::into_result`], and what the chunk and layout layers return directly.
///
/// Every variant classifies into exactly one [`ErrorCode`] through [`Error::code`], so the two
/// representations interconvert without losing the failure class.
///
/// # Error Categories
///
/// ## Stream Errors
/// - [`Error::EndOfStream`] - No more data, or a short read/write
/// - [`Error::AllocationFailure`] - A growable backend could not reserve memory
/// - [`Error::ReadError`] - The backend failed to produce data
/// - [`Error::SeekError`] - Invalid seek target
/// - [`Error::InvalidOperation`] - The stream does not support the operation
/// - [`Error::UnknownError`] - Unclassified backend failure
///
/// ## Data Errors
/// - [`Error::InvalidData`] - Data could not be parsed
/// - [`Error::Malformed`] - Data could not be parsed, with context
/// - [`Error::ChecksumMismatch`] - A chunk payload failed verification
/// - [`Error::OutOfBounds`] - Slice or blob access past its end
///
/// ## External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// # Examples
///
/// ```rust
/// use chunkio::{read_chunk, ChunkConfig, Error, ErrorCode, Stream};
///
/// let bytes = [0u8; 3];
/// let mut stream = Stream::from_ro_memory(&bytes);
/// match read_chunk(&mut stream, &ChunkConfig::default()) {
///     Ok(chunk) => println!("chunk {:#x}", chunk.header.type_id),
///     Err(Error::ChecksumMismatch { expected, actual }) => {
///         eprintln!("corrupt payload: {expected:#010x} != {actual:#010x}");
///     }
///     Err(e) => assert_eq!(e.code(), ErrorCode::EndOfStream),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// No more data in the stream.
    ///
    /// Any read that transfers fewer bytes than requested is classified as this.
    #[error("Reached the end of the stream")]
    EndOfStream,

    /// Failed to allocate memory for internal stream operations.
    #[error("Failed to allocate memory for a stream operation")]
    AllocationFailure,

    /// The backend failed to produce more data.
    #[error("Failed to read from the stream")]
    ReadError,

    /// The seek target is outside of what the backend supports.
    #[error("Invalid seek location")]
    SeekError,

    /// Data read from the stream could not be parsed.
    #[error("Invalid data")]
    InvalidData,

    /// The stream has no backend support for the requested operation.
    #[error("Operation not supported by this stream")]
    InvalidOperation,

    /// Unclassified backend failure.
    #[error("Unknown stream failure")]
    UnknownError,

    /// The data is damaged and could not be parsed.
    ///
    /// Includes the source location where the malformation was detected for debugging
    /// purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A chunk payload did not match the checksum stored in its footer.
    #[error("Checksum mismatch - stored {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum read from the footer
        expected: u32,
        /// Checksum computed over the payload that was read
        actual: u32,
    },

    /// An out of bound access was attempted on a slice or blob.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening or mapping files.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Classifies this error into the numeric code space used by stream results.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::EndOfStream | Error::OutOfBounds => ErrorCode::EndOfStream,
            Error::AllocationFailure => ErrorCode::AllocationFailure,
            Error::ReadError => ErrorCode::ReadError,
            Error::SeekError => ErrorCode::SeekError,
            Error::InvalidData | Error::Malformed { .. } | Error::ChecksumMismatch { .. } => {
                ErrorCode::InvalidData
            }
            Error::InvalidOperation => ErrorCode::InvalidOperation,
            Error::UnknownError | Error::FileError(_) => ErrorCode::UnknownError,
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        code.into_error().unwrap_or(Error::UnknownError)
    }
}

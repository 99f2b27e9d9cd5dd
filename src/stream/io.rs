//! Endian-aware reading and writing of fixed-width values.
//!
//! Values are serialised by their byte decomposition, never by reinterpreting memory, so the
//! result is identical on every host regardless of its native byte order
//! ([the byte order fallacy](https://commandcenter.blogspot.com/2012/04/byte-order-fallacy.html)).
//!
//! # Key Components
//!
//! ## Core Traits
//! - [`crate::stream::io::ByteOrdered`] - Fixed-width types with a little- and big-endian form
//! - [`crate::stream::io::ReprEnum`] - Enums encoded through their integer representation
//!
//! ## Stream Functions
//! - [`crate::stream::io::write_le`] / [`crate::stream::io::write_be`] - One `write` of `W` bytes
//! - [`crate::stream::io::read_le`] / [`crate::stream::io::read_be`] - One `read` of `W` bytes
//! - [`crate::stream::io::read_le_into`] / [`crate::stream::io::read_be_into`] - Value-style
//!   variants that leave the destination untouched unless the read fully succeeded
//! - [`crate::stream::io::write_ordered`] / [`crate::stream::io::read_ordered`] - Byte order
//!   chosen at runtime
//!
//! ## Slice Functions
//! - [`crate::stream::io::read_le_at`] / [`crate::stream::io::read_be_at`] - Read at an offset
//!   with auto-advance
//! - [`crate::stream::io::write_le_at`] / [`crate::stream::io::write_be_at`] - Write at an
//!   offset with auto-advance
//!
//! # Examples
//!
//! ```rust
//! use chunkio::{io, Stream};
//!
//! let mut storage = Vec::new();
//! let mut stream = Stream::from_vec(&mut storage);
//! io::write_le(&mut stream, 0x0102_0304u32);
//! io::write_be(&mut stream, 0x0102_0304u32);
//! drop(stream);
//!
//! assert_eq!(storage, [0x04, 0x03, 0x02, 0x01, 0x01, 0x02, 0x03, 0x04]);
//!
//! let mut offset = 4;
//! let value: u32 = io::read_be_at(&storage, &mut offset)?;
//! assert_eq!(value, 0x0102_0304);
//! assert_eq!(offset, 8);
//! # Ok::<(), chunkio::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All functions here are stateless. Concurrent use on independent streams or buffers needs
//! no coordination.

use strum::{Display, EnumIter, FromRepr};

use crate::{
    stream::{ErrorCode, IoResult, SeekOrigin, Stream},
    Error::OutOfBounds,
    Result,
};

/// Byte order of a serialised value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, FromRepr)]
#[repr(u8)]
pub enum ByteOrder {
    /// Least significant byte first.
    #[default]
    Little = 0,
    /// Most significant byte first.
    Big = 1,
}

/// Fixed-width types that can be converted to and from a byte array in either byte order.
///
/// Each implementation defines a `Bytes` array type of exactly `size_of::<Self>()` bytes.
pub trait ByteOrdered: Sized + Copy {
    /// The byte array form of this type, e.g. `[u8; 4]` for `u32`.
    type Bytes: Copy + Default + AsRef<[u8]> + AsMut<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Reconstruct from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Reconstruct from big-endian bytes
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Decompose into little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
    /// Decompose into big-endian bytes
    fn to_be_bytes(self) -> Self::Bytes;

    /// Reconstruct from bytes in the given order.
    fn from_bytes(bytes: Self::Bytes, order: ByteOrder) -> Self {
        match order {
            ByteOrder::Little => Self::from_le_bytes(bytes),
            ByteOrder::Big => Self::from_be_bytes(bytes),
        }
    }

    /// Decompose into bytes in the given order.
    fn to_bytes(self, order: ByteOrder) -> Self::Bytes {
        match order {
            ByteOrder::Little => self.to_le_bytes(),
            ByteOrder::Big => self.to_be_bytes(),
        }
    }
}

macro_rules! impl_byte_ordered {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteOrdered for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_byte_ordered!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

/// Enums serialised through their underlying integer representation.
///
/// Decoding an unknown discriminant yields [`crate::Error::Malformed`].
pub trait ReprEnum: Sized + Copy {
    /// The underlying integer type.
    type Repr: ByteOrdered + std::fmt::Debug;

    /// The discriminant of `self`.
    fn to_repr(self) -> Self::Repr;

    /// The variant for `repr`, if there is one.
    fn from_repr_value(repr: Self::Repr) -> Option<Self>;
}

macro_rules! impl_repr_enum {
    ($($ty:ty => $repr:ty),* $(,)?) => {
        $(
            impl ReprEnum for $ty {
                type Repr = $repr;

                fn to_repr(self) -> $repr {
                    self as $repr
                }

                fn from_repr_value(repr: $repr) -> Option<Self> {
                    <$ty>::from_repr(repr)
                }
            }
        )*
    };
}

impl_repr_enum!(ByteOrder => u8, ErrorCode => u8, SeekOrigin => u8);

// Stream functions

/// Writes `value` to the stream in the given byte order with a single `write` call.
pub fn write_ordered<T: ByteOrdered>(stream: &mut Stream<'_>, value: T, order: ByteOrder) -> IoResult {
    stream.write(value.to_bytes(order).as_ref())
}

/// Writes `value` in little-endian byte order.
pub fn write_le<T: ByteOrdered>(stream: &mut Stream<'_>, value: T) -> IoResult {
    write_ordered(stream, value, ByteOrder::Little)
}

/// Writes `value` in big-endian byte order.
pub fn write_be<T: ByteOrdered>(stream: &mut Stream<'_>, value: T) -> IoResult {
    write_ordered(stream, value, ByteOrder::Big)
}

/// Reads a value in the given byte order with a single `read` call.
///
/// `value` is only assigned when all `size_of::<T>()` bytes were read and the stream reports
/// success; otherwise it keeps its previous contents.
pub fn read_ordered_into<T: ByteOrdered>(stream: &mut Stream<'_>, value: &mut T, order: ByteOrder) -> IoResult {
    let mut bytes = T::Bytes::default();
    let result = stream.read(bytes.as_mut());

    if result.is_ok() && result.value() == bytes.as_ref().len() as u64 {
        *value = T::from_bytes(bytes, order);
    }

    result
}

/// Reads a little-endian value into `value`, see [`read_ordered_into`].
pub fn read_le_into<T: ByteOrdered>(stream: &mut Stream<'_>, value: &mut T) -> IoResult {
    read_ordered_into(stream, value, ByteOrder::Little)
}

/// Reads a big-endian value into `value`, see [`read_ordered_into`].
pub fn read_be_into<T: ByteOrdered>(stream: &mut Stream<'_>, value: &mut T) -> IoResult {
    read_ordered_into(stream, value, ByteOrder::Big)
}

/// Reads a value in the given byte order.
///
/// # Errors
/// Returns the error matching the stream's error code, [`crate::Error::EndOfStream`] for a
/// short read.
pub fn read_ordered<T: ByteOrdered>(stream: &mut Stream<'_>, order: ByteOrder) -> Result<T> {
    let mut bytes = T::Bytes::default();
    let count = stream.read(bytes.as_mut()).into_result()?;

    if count != bytes.as_ref().len() as u64 {
        return Err(crate::Error::EndOfStream);
    }

    Ok(T::from_bytes(bytes, order))
}

/// Reads a little-endian value.
///
/// # Errors
/// See [`read_ordered`].
pub fn read_le<T: ByteOrdered>(stream: &mut Stream<'_>) -> Result<T> {
    read_ordered(stream, ByteOrder::Little)
}

/// Reads a big-endian value.
///
/// # Errors
/// See [`read_ordered`].
pub fn read_be<T: ByteOrdered>(stream: &mut Stream<'_>) -> Result<T> {
    read_ordered(stream, ByteOrder::Big)
}

/// Writes an enum through its integer representation.
pub fn write_enum<E: ReprEnum>(stream: &mut Stream<'_>, value: E, order: ByteOrder) -> IoResult {
    write_ordered(stream, value.to_repr(), order)
}

/// Reads an enum through its integer representation.
///
/// An unknown discriminant is recorded on the stream as [`ErrorCode::InvalidData`].
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for unknown discriminants and the stream's error for
/// failed reads.
pub fn read_enum<E: ReprEnum>(stream: &mut Stream<'_>, order: ByteOrder) -> Result<E> {
    let repr = read_ordered::<E::Repr>(stream, order)?;

    match E::from_repr_value(repr) {
        Some(value) => Ok(value),
        None => {
            stream.record(ErrorCode::InvalidData);
            Err(malformed_error!(
                "Unknown {} discriminant {:?}",
                std::any::type_name::<E>(),
                repr
            ))
        }
    }
}

// Slice functions

/// Safely reads a value of type `T` in little-endian byte order from a data buffer at a
/// specific offset, advancing the offset by the number of bytes read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: ByteOrdered>(data: &[u8], offset: &mut usize) -> Result<T> {
    read_at(data, offset, ByteOrder::Little)
}

/// Safely reads a value of type `T` in big-endian byte order from a data buffer at a
/// specific offset, advancing the offset by the number of bytes read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: ByteOrdered>(data: &[u8], offset: &mut usize) -> Result<T> {
    read_at(data, offset, ByteOrder::Big)
}

/// Safely writes a value of type `T` in little-endian byte order into a data buffer at a
/// specific offset, advancing the offset by the number of bytes written.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_le_at<T: ByteOrdered>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    write_at(data, offset, value, ByteOrder::Little)
}

/// Safely writes a value of type `T` in big-endian byte order into a data buffer at a
/// specific offset, advancing the offset by the number of bytes written.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_be_at<T: ByteOrdered>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    write_at(data, offset, value, ByteOrder::Big)
}

/// Reads at an offset in a runtime-selected byte order.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_at<T: ByteOrdered>(data: &[u8], offset: &mut usize, order: ByteOrder) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = checked!(offset.checked_add(type_len));
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_bytes(read, order))
}

/// Writes at an offset in a runtime-selected byte order.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_at<T: ByteOrdered>(data: &mut [u8], offset: &mut usize, value: T, order: ByteOrder) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let end = checked!(offset.checked_add(type_len));
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(value.to_bytes(order).as_ref());
    *offset = end;

    Ok(())
}

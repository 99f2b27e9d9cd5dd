//! Relocatable binary layouts built from relative offsets.
//!
//! A [`RelPtr`] stores the distance from its own position to its target instead of an
//! absolute address, and a [`RelArray`] pairs such a pointer with an element count. A
//! structure graph encoded this way is a single contiguous byte blob that stays valid
//! wherever it is loaded or mapped, as long as the relative positions of its parts are
//! preserved. No pointer fixup pass is needed.
//!
//! Positions are byte indices into a blob, never raw machine addresses. Offsets and counts
//! are stored little endian; element data keeps the host's byte order.
//!
//! # Hazard
//!
//! Copying the bytes of a single pointer to a different position without recomputing it
//! silently retargets it. Relocating the *whole* blob is safe.
//!
//! # Examples
//!
//! ```rust
//! use chunkio::layout::{BlobWriter, RelArray32};
//!
//! let mut writer = BlobWriter::new();
//! let root = writer.alloc(RelArray32::<u32>::SIZE, 4);
//! let values = writer.push_slice(&[10u32, 20, 30]);
//! let _: RelArray32<u32> = writer.write_array(root, values, 3)?;
//!
//! // Relocate the blob, the array still resolves.
//! let mut moved = vec![0xAA; 5];
//! moved.extend_from_slice(writer.as_bytes());
//! let blob = &moved[5..];
//!
//! let array = RelArray32::<u32>::read_from(blob, root)?;
//! assert_eq!(array.iter(blob, root)?.collect::<Vec<_>>(), [10, 20, 30]);
//! # Ok::<(), chunkio::Error>(())
//! ```

mod blob;
mod relarray;
mod relptr;

use std::fmt::Debug;

pub use blob::{Blob, BlobWriter};
pub use relarray::{RelArray, RelArray16, RelArray32, RelArray64, RelArray8, RelArrayIter};
pub use relptr::{RelPtr, RelPtr16, RelPtr32, RelPtr64, RelPtr8};

use crate::stream::io::ByteOrdered;

/// Integer types usable as the stored offset of a [`RelPtr`].
///
/// Signed types reserve their minimum value as the null sentinel, unsigned types their
/// maximum. The sentinel is never produced by a non-null assignment.
pub trait OffsetType: ByteOrdered + Eq + Debug + 'static {
    /// Stored value representing null.
    const SENTINEL: Self;
    /// Smallest storable non-null offset.
    const MIN_OFFSET: i128;
    /// Largest storable non-null offset.
    const MAX_OFFSET: i128;

    /// Widens the offset.
    fn to_i128(self) -> i128;

    /// Narrows a value into this type, `None` if it does not fit.
    fn from_i128(value: i128) -> Option<Self>;
}

macro_rules! impl_signed_offset {
    ($($ty:ty),*) => {
        $(
            impl OffsetType for $ty {
                const SENTINEL: Self = <$ty>::MIN;
                const MIN_OFFSET: i128 = <$ty>::MIN as i128 + 1;
                const MAX_OFFSET: i128 = <$ty>::MAX as i128;

                fn to_i128(self) -> i128 {
                    i128::from(self)
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

macro_rules! impl_unsigned_offset {
    ($($ty:ty),*) => {
        $(
            impl OffsetType for $ty {
                const SENTINEL: Self = <$ty>::MAX;
                const MIN_OFFSET: i128 = 0;
                const MAX_OFFSET: i128 = <$ty>::MAX as i128 - 1;

                fn to_i128(self) -> i128 {
                    i128::from(self)
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_signed_offset!(i8, i16, i32, i64);
impl_unsigned_offset!(u8, u16, u32, u64);

/// Integer types usable as the element count of a [`RelArray`].
pub trait CountType: ByteOrdered + Eq + Debug + 'static {
    /// The empty count.
    const ZERO: Self;

    /// Widens the count, `None` if it exceeds the address space.
    fn to_usize(self) -> Option<usize>;

    /// Narrows a count into this type, `None` if it does not fit.
    fn from_usize(value: usize) -> Option<Self>;
}

macro_rules! impl_count {
    ($($ty:ty),*) => {
        $(
            impl CountType for $ty {
                const ZERO: Self = 0;

                fn to_usize(self) -> Option<usize> {
                    usize::try_from(self).ok()
                }

                fn from_usize(value: usize) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_count!(u8, u16, u32, u64);

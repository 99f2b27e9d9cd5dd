use std::{fmt, marker::PhantomData, mem::size_of};

use super::OffsetType;
use crate::{
    stream::io::{read_le_at, write_le_at},
    Result,
};

/// Relative pointer with an 8-bit signed offset.
pub type RelPtr8<T, const STRIDE: usize = 1> = RelPtr<i8, T, STRIDE>;
/// Relative pointer with a 16-bit signed offset.
pub type RelPtr16<T, const STRIDE: usize = 1> = RelPtr<i16, T, STRIDE>;
/// Relative pointer with a 32-bit signed offset.
pub type RelPtr32<T, const STRIDE: usize = 1> = RelPtr<i32, T, STRIDE>;
/// Relative pointer with a 64-bit signed offset.
pub type RelPtr64<T, const STRIDE: usize = 1> = RelPtr<i64, T, STRIDE>;

/// A pointer stored as the distance from its own position to its target.
///
/// The target position is `self_pos + offset * STRIDE`. The offset type `O` and the
/// `STRIDE` multiplier trade space against reach: an `i8` offset with a stride of 4 reaches
/// 508 bytes in either direction in a single byte. A reserved sentinel offset encodes null.
///
/// Assigning a target that is not a multiple of `STRIDE` bytes away, or that lies beyond
/// the offset's range, is a layout bug and aborts through `binary_assert!`. Use
/// [`RelPtr::checked_offset`] to test a position without the fatal path.
///
/// The pointer does not know its own position; every operation that resolves it takes
/// `self_pos`, the byte index of the pointer inside its blob.
///
/// The offset is always serialized little endian. The referent copied out by
/// [`RelPtr::load`] is read in host byte order.
#[repr(transparent)]
pub struct RelPtr<O, T, const STRIDE: usize = 1> {
    offset: O,
    _marker: PhantomData<fn() -> T>,
}

impl<O: OffsetType, T, const STRIDE: usize> RelPtr<O, T, STRIDE> {
    const STRIDE_IS_VALID: () = assert!(STRIDE > 0, "relative pointer stride must be positive");

    /// Serialized size in bytes.
    pub const SIZE: usize = size_of::<O>();

    /// The null pointer.
    #[must_use]
    pub fn null() -> Self {
        Self::from_offset(O::SENTINEL)
    }

    /// Wraps a raw stored offset, which may be the sentinel.
    #[must_use]
    pub fn from_offset(offset: O) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::STRIDE_IS_VALID;
        RelPtr {
            offset,
            _marker: PhantomData,
        }
    }

    /// A pointer stored at `self_pos` that resolves to `target`.
    ///
    /// # Panics
    /// If `target` is misaligned relative to `self_pos` or out of the offset's range.
    #[must_use]
    pub fn new(self_pos: usize, target: usize) -> Self {
        Self::from_offset(Self::calculate_offset(self_pos, target))
    }

    /// The raw stored offset.
    #[must_use]
    pub fn offset(&self) -> O {
        self.offset
    }

    /// Returns `true` for the null pointer.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.offset == O::SENTINEL
    }

    /// Re-targets the pointer. `None` stores null.
    ///
    /// # Panics
    /// If `target` is misaligned relative to `self_pos` or out of the offset's range.
    pub fn assign(&mut self, self_pos: usize, target: Option<usize>) {
        self.offset = match target {
            Some(target) => Self::calculate_offset(self_pos, target),
            None => O::SENTINEL,
        };
    }

    /// Stored offset for a pointer at `self_pos` targeting `target`.
    ///
    /// # Panics
    /// If the byte distance is not a multiple of `STRIDE`, or the scaled distance does not
    /// fit the offset type without colliding with the sentinel.
    #[must_use]
    pub fn calculate_offset(self_pos: usize, target: usize) -> O {
        #[allow(clippy::let_unit_value)]
        let () = Self::STRIDE_IS_VALID;
        let delta = byte_delta(self_pos, target);
        let stride = STRIDE as i128;

        binary_assert!(
            delta % stride == 0,
            "Invalid pointer alignment, target {} is not a multiple of {} bytes away from {}",
            target,
            STRIDE,
            self_pos
        );

        let scaled = delta / stride;
        binary_assert!(
            (O::MIN_OFFSET..=O::MAX_OFFSET).contains(&scaled),
            "Offset {} out of range [{}, {}], use a wider offset type or a larger stride",
            scaled,
            O::MIN_OFFSET,
            O::MAX_OFFSET
        );

        match O::from_i128(scaled) {
            Some(offset) => offset,
            None => unreachable!("offset {scaled} was range checked"),
        }
    }

    /// Non-fatal form of [`RelPtr::calculate_offset`].
    ///
    /// A zero stride is rejected when the pointer type is instantiated:
    ///
    /// ```rust,compile_fail
    /// use chunkio::RelPtr;
    ///
    /// let _ = RelPtr::<i32, u8, 0>::checked_offset(0, 4);
    /// ```
    #[must_use]
    pub fn checked_offset(self_pos: usize, target: usize) -> Option<O> {
        #[allow(clippy::let_unit_value)]
        let () = Self::STRIDE_IS_VALID;
        let delta = byte_delta(self_pos, target);
        let stride = STRIDE as i128;
        if delta % stride != 0 {
            return None;
        }

        O::from_i128(delta / stride).filter(|offset| *offset != O::SENTINEL)
    }

    /// Position this pointer resolves to when stored at `self_pos`.
    ///
    /// `None` for null, or when the stored offset points before the start of the address
    /// space (only possible for damaged data).
    #[must_use]
    pub fn get(&self, self_pos: usize) -> Option<usize> {
        if self.is_null() {
            return None;
        }

        let target = self_pos as i128 + self.offset.to_i128() * STRIDE as i128;
        usize::try_from(target).ok()
    }

    /// Reads a pointer serialized at `pos` in `blob`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob is too short.
    pub fn read_from(blob: &[u8], pos: usize) -> Result<Self> {
        let mut cursor = pos;
        Ok(Self::from_offset(read_le_at::<O>(blob, &mut cursor)?))
    }

    /// Serializes the pointer at `pos` in `blob`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob is too short.
    pub fn write_to(&self, blob: &mut [u8], pos: usize) -> Result<()> {
        let mut cursor = pos;
        write_le_at(blob, &mut cursor, self.offset)
    }
}

impl<O: OffsetType, T: bytemuck::Pod, const STRIDE: usize> RelPtr<O, T, STRIDE> {
    /// Copies the referent out of `blob`, for a pointer stored at `self_pos`.
    ///
    /// The copy tolerates any alignment of the target, so blobs can be read straight from
    /// a file buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the referent extends past the blob.
    pub fn load(&self, blob: &[u8], self_pos: usize) -> Result<Option<T>> {
        let Some(target) = self.get(self_pos) else {
            return Ok(None);
        };

        let end = checked!(target.checked_add(size_of::<T>()));
        let bytes = checked!(blob.get(target..end));
        Ok(Some(bytemuck::pod_read_unaligned(bytes)))
    }
}

fn byte_delta(self_pos: usize, target: usize) -> i128 {
    target as i128 - self_pos as i128
}

impl<O: OffsetType, T, const STRIDE: usize> Default for RelPtr<O, T, STRIDE> {
    fn default() -> Self {
        Self::null()
    }
}

impl<O: Copy, T, const STRIDE: usize> Clone for RelPtr<O, T, STRIDE> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O: Copy, T, const STRIDE: usize> Copy for RelPtr<O, T, STRIDE> {}

impl<O: PartialEq, T, const STRIDE: usize> PartialEq for RelPtr<O, T, STRIDE> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<O: Eq, T, const STRIDE: usize> Eq for RelPtr<O, T, STRIDE> {}

impl<O: OffsetType, T, const STRIDE: usize> fmt::Debug for RelPtr<O, T, STRIDE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "RelPtr(null)")
        } else {
            write!(f, "RelPtr({:?} x {})", self.offset, STRIDE)
        }
    }
}

use std::{fmt, iter::FusedIterator, marker::PhantomData, mem::size_of, ops::Range};

use super::{CountType, OffsetType, RelPtr};
use crate::{
    stream::io::{read_le_at, write_le_at},
    Result,
};

/// Relative array with an 8-bit count and offset.
pub type RelArray8<T, const STRIDE: usize = 1> = RelArray<u8, i8, T, STRIDE>;
/// Relative array with a 16-bit count and offset.
pub type RelArray16<T, const STRIDE: usize = 1> = RelArray<u16, i16, T, STRIDE>;
/// Relative array with a 32-bit count and offset.
pub type RelArray32<T, const STRIDE: usize = 1> = RelArray<u32, i32, T, STRIDE>;
/// Relative array with a 64-bit count and offset.
pub type RelArray64<T, const STRIDE: usize = 1> = RelArray<u64, i64, T, STRIDE>;

/// A counted run of `T` located through a [`RelPtr`].
///
/// Serialized packed as `[count: C][offset: O]`, little endian. The pointer's own position
/// is therefore `array_pos + size_of::<C>()`, where `array_pos` is the position of the
/// whole array record.
///
/// The count is trusted: nothing checks it against the run actually laid out, beyond the
/// bounds of the blob being read.
pub struct RelArray<C, O, T, const STRIDE: usize = 1> {
    count: C,
    elements: RelPtr<O, T, STRIDE>,
}

impl<C: CountType, O: OffsetType, T, const STRIDE: usize> RelArray<C, O, T, STRIDE> {
    /// Serialized size in bytes.
    pub const SIZE: usize = size_of::<C>() + size_of::<O>();

    /// An empty array with a null element pointer.
    #[must_use]
    pub fn empty() -> Self {
        RelArray {
            count: C::ZERO,
            elements: RelPtr::null(),
        }
    }

    /// An array record stored at `array_pos` describing `count` elements at `target`.
    ///
    /// # Panics
    /// If `count` does not fit `C`, or the element pointer cannot reach `target`.
    #[must_use]
    pub fn new(array_pos: usize, target: usize, count: usize) -> Self {
        let stored = C::from_usize(count);
        binary_assert!(
            stored.is_some(),
            "Element count {} does not fit a {} byte count field",
            count,
            size_of::<C>()
        );

        let count = match stored {
            Some(count) => count,
            None => unreachable!("count {count} was range checked"),
        };

        RelArray {
            count,
            elements: RelPtr::new(Self::pointer_pos(array_pos), target),
        }
    }

    /// Position of the element pointer for an array record at `array_pos`.
    #[must_use]
    pub fn pointer_pos(array_pos: usize) -> usize {
        array_pos + size_of::<C>()
    }

    /// The raw stored count.
    #[must_use]
    pub fn count(&self) -> C {
        self.count
    }

    /// Number of elements, saturating on counts wider than the address space.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count.to_usize().unwrap_or(usize::MAX)
    }

    /// Returns `true` when the array holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element pointer.
    #[must_use]
    pub fn elements(&self) -> RelPtr<O, T, STRIDE> {
        self.elements
    }

    /// Reads an array record serialized at `array_pos` in `blob`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob is too short.
    pub fn read_from(blob: &[u8], array_pos: usize) -> Result<Self> {
        let mut cursor = array_pos;
        let count = read_le_at::<C>(blob, &mut cursor)?;
        let offset = read_le_at::<O>(blob, &mut cursor)?;

        Ok(RelArray {
            count,
            elements: RelPtr::from_offset(offset),
        })
    }

    /// Serializes the array record at `array_pos` in `blob`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob is too short.
    pub fn write_to(&self, blob: &mut [u8], array_pos: usize) -> Result<()> {
        let mut cursor = array_pos;
        write_le_at(blob, &mut cursor, self.count)?;
        write_le_at(blob, &mut cursor, self.elements.offset())
    }
}

impl<C: CountType, O: OffsetType, T: bytemuck::Pod, const STRIDE: usize> RelArray<C, O, T, STRIDE> {
    /// Byte range `[begin, end)` of the element run, for a record stored at `array_pos`.
    ///
    /// Empty arrays yield an empty range at `0` without resolving the pointer. `None` for a
    /// non-empty array with a null or unresolvable pointer.
    #[must_use]
    pub fn byte_range(&self, array_pos: usize) -> Option<Range<usize>> {
        if self.is_empty() {
            return Some(0..0);
        }

        let begin = self.elements.get(Self::pointer_pos(array_pos))?;
        let end = begin.checked_add(self.len().checked_mul(size_of::<T>())?)?;
        Some(begin..end)
    }

    /// Iterates over the elements, copying each one out of `blob`.
    ///
    /// The whole run is bounds checked up front.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the run does not lie inside the blob, or the
    /// pointer of a non-empty array is null.
    pub fn iter<'b>(&self, blob: &'b [u8], array_pos: usize) -> Result<RelArrayIter<'b, T>> {
        let range = checked!(self.byte_range(array_pos));
        let bytes = checked!(blob.get(range));

        Ok(RelArrayIter {
            bytes,
            remaining: self.len(),
            _marker: PhantomData,
        })
    }

    /// Copies out the element at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the count or the element
    /// lies outside the blob.
    pub fn get(&self, blob: &[u8], array_pos: usize, index: usize) -> Result<T> {
        if index >= self.len() {
            return Err(crate::Error::OutOfBounds);
        }

        let range = checked!(self.byte_range(array_pos));
        let start = checked!(index
            .checked_mul(size_of::<T>())
            .and_then(|offset| range.start.checked_add(offset)));
        let end = checked!(start.checked_add(size_of::<T>()));
        let bytes = checked!(blob.get(start..end));

        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

impl<C: CountType, O: OffsetType, T, const STRIDE: usize> Default for RelArray<C, O, T, STRIDE> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: Copy, O: Copy, T, const STRIDE: usize> Clone for RelArray<C, O, T, STRIDE> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Copy, O: Copy, T, const STRIDE: usize> Copy for RelArray<C, O, T, STRIDE> {}

impl<C: PartialEq, O: PartialEq, T, const STRIDE: usize> PartialEq for RelArray<C, O, T, STRIDE> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.elements == other.elements
    }
}

impl<C: CountType, O: OffsetType, T, const STRIDE: usize> fmt::Debug for RelArray<C, O, T, STRIDE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelArray")
            .field("count", &self.count)
            .field("elements", &self.elements)
            .finish()
    }
}

/// Iterator over the elements of a [`RelArray`].
///
/// Restartable by cloning; each element is copied out unaligned. Driven by the element
/// count, so zero-sized elements are still yielded `len` times.
pub struct RelArrayIter<'b, T> {
    bytes: &'b [u8],
    remaining: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RelArrayIter<'_, T> {
    fn clone(&self) -> Self {
        RelArrayIter {
            bytes: self.bytes,
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

impl<T: bytemuck::Pod> Iterator for RelArrayIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }

        let (head, tail) = self.bytes.split_at(size_of::<T>());
        self.bytes = tail;
        self.remaining -= 1;
        Some(bytemuck::pod_read_unaligned(head))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: bytemuck::Pod> ExactSizeIterator for RelArrayIter<'_, T> {}

impl<T: bytemuck::Pod> FusedIterator for RelArrayIter<'_, T> {}

impl<T> fmt::Debug for RelArrayIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelArrayIter")
            .field("remaining", &self.remaining)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_with_array(values: &[u16]) -> (Vec<u8>, usize) {
        let array_pos = 2;
        let target = 16;
        let mut blob = vec![0u8; target];
        for value in values {
            blob.extend_from_slice(&value.to_ne_bytes());
        }

        RelArray16::<u16>::new(array_pos, target, values.len())
            .write_to(&mut blob, array_pos)
            .unwrap();
        (blob, array_pos)
    }

    #[test]
    fn packed_layout() {
        let (blob, pos) = blob_with_array(&[1, 2, 3]);
        assert_eq!(RelArray16::<u16>::SIZE, 4);
        assert_eq!(&blob[pos..pos + 2], &3u16.to_le_bytes());
        // Pointer at 4 targets 16.
        assert_eq!(&blob[pos + 2..pos + 4], &12i16.to_le_bytes());
    }

    #[test]
    fn iterate_elements() {
        let (blob, pos) = blob_with_array(&[7, 8, 9]);
        let array = RelArray16::<u16>::read_from(&blob, pos).unwrap();
        assert_eq!(array.len(), 3);
        assert!(!array.is_empty());

        let iter = array.iter(&blob, pos).unwrap();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.clone().collect::<Vec<_>>(), [7, 8, 9]);
        assert_eq!(iter.sum::<u16>(), 24);

        assert_eq!(array.get(&blob, pos, 1).unwrap(), 8);
        assert!(array.get(&blob, pos, 3).is_err());
        assert_eq!(array.byte_range(pos), Some(16..22));
    }

    #[test]
    fn empty_array_never_resolves_pointer() {
        let array = RelArray32::<u64>::empty();
        assert!(array.is_empty());
        assert!(array.elements().is_null());
        assert_eq!(array.iter(&[], 0).unwrap().count(), 0);

        let mut blob = [0u8; 8];
        array.write_to(&mut blob, 0).unwrap();
        let back = RelArray32::<u64>::read_from(&blob, 0).unwrap();
        assert_eq!(back, array);
    }

    #[test]
    fn zero_sized_elements_follow_the_count() {
        let mut blob = [0u8; 8];
        RelArray32::<()>::new(0, 8, 3).write_to(&mut blob, 0).unwrap();

        let array = RelArray32::<()>::read_from(&blob, 0).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.byte_range(0), Some(8..8));

        let iter = array.iter(&blob, 0).unwrap();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.count(), 3);
        assert!(array.get(&blob, 0, 2).is_ok());
        assert!(array.get(&blob, 0, 3).is_err());
    }

    #[test]
    fn truncated_run_is_out_of_bounds() {
        let (mut blob, pos) = blob_with_array(&[1, 2, 3]);
        blob.truncate(blob.len() - 1);
        let array = RelArray16::<u16>::read_from(&blob, pos).unwrap();
        assert!(matches!(
            array.iter(&blob, pos),
            Err(crate::Error::OutOfBounds)
        ));
    }

    #[test]
    fn null_pointer_with_count_is_out_of_bounds() {
        let mut blob = [0u8; 8];
        let mut cursor = 0;
        write_le_at(&mut blob, &mut cursor, 2u32).unwrap();
        write_le_at(&mut blob, &mut cursor, i32::MIN).unwrap();

        let array = RelArray32::<u8>::read_from(&blob, 0).unwrap();
        assert!(array.iter(&blob, 0).is_err());
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn count_overflow_is_fatal() {
        let _ = RelArray8::<u8>::new(0, 8, 256);
    }
}

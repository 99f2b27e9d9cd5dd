use std::mem::{align_of, size_of};

use super::{CountType, OffsetType, RelArray, RelArrayIter, RelPtr};
use crate::{
    stream::io::{write_le_at, ByteOrdered},
    utils::{is_power_of_two, padding_for},
    Result,
};

/// Append-only arena for building relocatable blobs.
///
/// Positions handed out are byte indices into the final blob. Records that point at data
/// written later are reserved with [`BlobWriter::alloc`] first and filled in with
/// [`BlobWriter::write_ptr`] or [`BlobWriter::write_array`] once the target is known.
///
/// Offsets and counts are always stored little endian. Values appended with
/// [`BlobWriter::push`] or [`BlobWriter::push_slice`] are copied in host byte order, and
/// [`Blob`] reads them back the same way, so a blob is only portable between hosts of the
/// same endianness.
#[derive(Debug, Clone, Default)]
pub struct BlobWriter {
    bytes: Vec<u8>,
}

impl BlobWriter {
    /// An empty writer.
    #[must_use]
    pub fn new() -> BlobWriter {
        BlobWriter::default()
    }

    /// An empty writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> BlobWriter {
        BlobWriter {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Current length, which is also the position of the next byte written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero-pads up to a multiple of `align` and returns the new length.
    ///
    /// # Panics
    /// If `align` is not a power of two.
    pub fn align(&mut self, align: usize) -> usize {
        binary_assert!(
            is_power_of_two(align).is_some(),
            "Alignment {} is not a power of two",
            align
        );

        let padding = padding_for(self.bytes.len(), align);
        self.bytes.resize(self.bytes.len() + padding, 0);
        self.bytes.len()
    }

    /// Reserves `size` zeroed bytes aligned to `align`, returning their position.
    ///
    /// # Panics
    /// If `align` is not a power of two.
    pub fn alloc(&mut self, size: usize, align: usize) -> usize {
        let start = self.align(align);
        self.bytes.resize(start + size, 0);
        start
    }

    /// Appends `value` at its natural alignment, returning its position.
    pub fn push<T: bytemuck::Pod>(&mut self, value: &T) -> usize {
        let start = self.align(align_of::<T>());
        self.bytes.extend_from_slice(bytemuck::bytes_of(value));
        start
    }

    /// Appends a run of values at their natural alignment, returning the position of the
    /// first one.
    pub fn push_slice<T: bytemuck::Pod>(&mut self, values: &[T]) -> usize {
        let start = self.align(align_of::<T>());
        self.bytes.extend_from_slice(bytemuck::cast_slice(values));
        start
    }

    /// Overwrites an integer at `at`, little endian.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit before the end.
    pub fn patch<V: ByteOrdered>(&mut self, at: usize, value: V) -> Result<()> {
        let mut cursor = at;
        write_le_at(&mut self.bytes, &mut cursor, value)
    }

    /// Stores a pointer at `at` targeting `target` (`None` for null) and returns it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the slot at `at` was never allocated.
    ///
    /// # Panics
    /// If the pointer cannot reach `target`.
    pub fn write_ptr<O: OffsetType, T, const STRIDE: usize>(
        &mut self,
        at: usize,
        target: Option<usize>,
    ) -> Result<RelPtr<O, T, STRIDE>> {
        let mut ptr = RelPtr::null();
        ptr.assign(at, target);
        ptr.write_to(&mut self.bytes, at)?;
        Ok(ptr)
    }

    /// Stores an array record at `at` describing `count` elements at `target` and returns it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record at `at` was never allocated.
    ///
    /// # Panics
    /// If `count` does not fit `C` or the element pointer cannot reach `target`.
    pub fn write_array<C: CountType, O: OffsetType, T, const STRIDE: usize>(
        &mut self,
        at: usize,
        target: usize,
        count: usize,
    ) -> Result<RelArray<C, O, T, STRIDE>> {
        let array = RelArray::new(at, target, count);
        array.write_to(&mut self.bytes, at)?;
        Ok(array)
    }

    /// The bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Finishes the blob.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read-only view over a finished blob, wherever it ended up in memory.
#[derive(Debug, Clone, Copy)]
pub struct Blob<'a> {
    bytes: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wraps `bytes`; position 0 is the first byte.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Blob<'a> {
        Blob { bytes }
    }

    /// The underlying bytes.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copies a value out of the blob at `pos`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the end.
    pub fn read<T: bytemuck::Pod>(&self, pos: usize) -> Result<T> {
        let end = checked!(pos.checked_add(size_of::<T>()));
        let bytes = checked!(self.bytes.get(pos..end));
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads the pointer at `pos` and copies out its referent.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the pointer or its referent lie outside the blob.
    pub fn follow<O: OffsetType, T: bytemuck::Pod, const STRIDE: usize>(&self, pos: usize) -> Result<Option<T>> {
        RelPtr::<O, T, STRIDE>::read_from(self.bytes, pos)?.load(self.bytes, pos)
    }

    /// Reads the array record at `pos` and iterates over its elements.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the record or its elements lie outside the blob.
    pub fn array<C: CountType, O: OffsetType, T: bytemuck::Pod, const STRIDE: usize>(
        &self,
        pos: usize,
    ) -> Result<RelArrayIter<'a, T>> {
        RelArray::<C, O, T, STRIDE>::read_from(self.bytes, pos)?.iter(self.bytes, pos)
    }
}

impl AsRef<[u8]> for Blob<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{RelArray32, RelPtr16, RelPtr32};

    #[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    struct Vertex {
        x: f32,
        y: f32,
    }

    /// root: [name: RelPtr32<u8>][vertices: RelArray32<Vertex>]
    fn build() -> (Vec<u8>, usize) {
        let mut writer = BlobWriter::new();
        writer.push(&0xFFu8);

        let root = writer.alloc(12, 4);
        let name = writer.push_slice(b"mesh");
        let vertices = writer.push_slice(&[
            Vertex { x: 1.0, y: 2.0 },
            Vertex { x: -3.5, y: 0.25 },
        ]);

        let _: RelPtr32<u8> = writer.write_ptr(root, Some(name)).unwrap();
        let _: RelArray32<Vertex> = writer.write_array(root + 4, vertices, 2).unwrap();
        (writer.into_bytes(), root)
    }

    #[test]
    fn alignment_and_positions() {
        let mut writer = BlobWriter::new();
        assert_eq!(writer.push(&1u8), 0);
        assert_eq!(writer.push(&2u32), 4);
        assert_eq!(writer.alloc(3, 8), 8);
        assert_eq!(writer.len(), 11);
        assert_eq!(writer.align(4), 12);
        assert_eq!(writer.align(4), 12);
    }

    #[test]
    fn graph_survives_relocation() {
        let (bytes, root) = build();

        for shift in [0usize, 1, 3, 17] {
            let mut moved = vec![0x55u8; shift];
            moved.extend_from_slice(&bytes);
            let blob = Blob::new(&moved[shift..]);

            assert_eq!(blob.follow::<i32, u8, 1>(root).unwrap(), Some(b'm'));
            let vertices: Vec<Vertex> = blob.array::<u32, i32, Vertex, 1>(root + 4).unwrap().collect();
            assert_eq!(vertices[1], Vertex { x: -3.5, y: 0.25 });
        }
    }

    #[test]
    fn copying_a_single_pointer_retargets_it() {
        let mut writer = BlobWriter::new();
        let slots = writer.alloc(4, 2);
        writer.push_slice(&[10u16, 20, 30]);
        let _: RelPtr16<u16> = writer.write_ptr(slots, Some(4)).unwrap();

        // Copy the pointer bytes two slots later without recomputing them.
        let mut bytes = writer.into_bytes();
        bytes.copy_within(slots..slots + 2, slots + 2);

        let blob = Blob::new(&bytes);
        assert_eq!(blob.follow::<i16, u16, 1>(slots).unwrap(), Some(10));
        assert_eq!(blob.follow::<i16, u16, 1>(slots + 2).unwrap(), Some(20));
    }

    #[test]
    fn null_pointer_and_patch() {
        let mut writer = BlobWriter::new();
        let slot = writer.alloc(4, 4);
        let ptr: RelPtr32<u32> = writer.write_ptr(slot, None).unwrap();
        assert!(ptr.is_null());
        assert_eq!(Blob::new(writer.as_bytes()).follow::<i32, u32, 1>(slot).unwrap(), None);

        writer.patch(slot, 0x0102_0304u32).unwrap();
        assert_eq!(writer.as_bytes(), &[4, 3, 2, 1]);
        assert!(writer.patch(slot + 1, 0u32).is_err());
    }

    #[test]
    fn offsets_little_endian_payload_native() {
        let mut writer = BlobWriter::new();
        let slot = writer.alloc(4, 4);
        let value = writer.push(&0x0102_0304u32);
        let ptr: RelPtr32<u32> = writer.write_ptr(slot, Some(value)).unwrap();

        let bytes = writer.as_bytes();
        assert_eq!(&bytes[slot..slot + 4], &ptr.offset().to_le_bytes());
        assert_eq!(&bytes[value..value + 4], &0x0102_0304u32.to_ne_bytes());
        assert_eq!(Blob::new(bytes).follow::<i32, u32, 1>(slot).unwrap(), Some(0x0102_0304));
    }

    #[test]
    fn unallocated_slot_is_out_of_bounds() {
        let mut writer = BlobWriter::new();
        let result: Result<RelPtr32<u8>> = writer.write_ptr(0, Some(0));
        assert!(matches!(result, Err(crate::Error::OutOfBounds)));
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn bad_alignment_is_fatal() {
        BlobWriter::new().alloc(4, 3);
    }
}

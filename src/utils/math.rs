//! Alignment arithmetic shared by the layout helpers.

/// Checks if a value is a power of two and returns the exponent.
///
/// Returns `Some(n)` if `value == 2^n`, `None` otherwise.
///
/// # Examples
///
/// ```rust,ignore
/// use chunkio::utils::is_power_of_two;
///
/// assert_eq!(is_power_of_two(1), Some(0));
/// assert_eq!(is_power_of_two(8), Some(3));
/// assert_eq!(is_power_of_two(0), None);
/// assert_eq!(is_power_of_two(6), None);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)] // trailing_zeros <= 63 for usize
pub fn is_power_of_two(value: usize) -> Option<u8> {
    if value.is_power_of_two() {
        Some(value.trailing_zeros() as u8)
    } else {
        None
    }
}

/// Number of padding bytes needed to bring `value` to a multiple of `align`.
#[must_use]
pub fn padding_for(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value.wrapping_neg() & (align - 1)
}

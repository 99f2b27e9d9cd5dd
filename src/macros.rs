#![allow(unused_macros)]

/// Fatal-error reporter for programmer errors.
///
/// Invariant violations (misaligned relative pointers, offsets that do not fit the chosen
/// width, a backend breaking the refill protocol) are bugs in the calling code or in a
/// backend, never recoverable data conditions. They are logged with the failed expression
/// and source location and then terminate the current thread via `panic!`.
///
/// ```rust, ignore
///  binary_assert!(offset % stride == 0, "Invalid pointer alignment, decrease alignment");
/// ```
macro_rules! binary_assert {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            log::error!(
                "chunkio[{}:{}] Assertion '{}' failed, {}.",
                file!(),
                line!(),
                stringify!($cond),
                $msg
            );
            panic!(
                "chunkio[{}:{}] Assertion '{}' failed, {}.",
                file!(),
                line!(),
                stringify!($cond),
                $msg
            );
        }
    };

    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        binary_assert!($cond, format!($fmt, $($arg)*))
    };
}

/// Converts an `Option` produced by checked arithmetic into an `OutOfBounds` error.
///
/// ```rust, ignore
///  let end = checked!(offset.checked_add(len));
/// ```
macro_rules! checked {
    ($expr:expr) => {
        match $expr {
            Some(value) => value,
            None => return Err(crate::Error::OutOfBounds),
        }
    };
}

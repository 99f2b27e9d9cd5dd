//! Buffer-centric read window attached to a [`crate::Stream`].
//!
//! A buffered backend exposes its internal buffer directly instead of copying into a
//! caller-provided destination. The stream tracks which part of that buffer is still
//! unread in a [`BufferedIo`] record:
//!
//! ```text
//!   start          cursor                end
//!     |--- consumed ---|---- available ----|
//! ```
//!
//! Invariant between operations: `start <= cursor <= end`.
//!
//! Refill protocol:
//!
//! - Pre-condition: `cursor == end` (the window is exhausted).
//! - Post-condition on success: `cursor == start` and `cursor < end`.
//! - On failure the window is rebound to a small static zero-filled buffer and every
//!   later refill reports the same terminal error without touching the backend again.
//!
//! Based on the ideas in [Buffer-centric IO](https://fgiesen.wordpress.com/2011/11/21/buffer-centric-io/).

use crate::stream::ErrorCode;

/// Zero-filled window served once a buffered stream has failed permanently.
///
/// A size of 1 would also be valid; refill would just be called more often.
pub(crate) static FAILURE_BUFFER: [u8; 16] = [0; 16];

/// View into the unread bytes of a buffered stream.
///
/// Indices refer to the slice returned by [`crate::stream::Backend::window`] while the
/// stream is healthy, and to the static failure buffer once it has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferedIo {
    start: usize,
    cursor: usize,
    end: usize,
    failure: Option<ErrorCode>,
}

impl BufferedIo {
    /// An empty window, positioned so that the first read triggers a refill.
    #[must_use]
    pub fn empty() -> BufferedIo {
        BufferedIo::default()
    }

    /// A window over `[start, end)` with nothing consumed yet.
    #[must_use]
    pub fn over(start: usize, end: usize) -> BufferedIo {
        let mut io = BufferedIo::empty();
        io.set_window(start, end);
        io
    }

    /// Start of the window.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Next unread byte.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// One past the last valid byte.
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Bytes between the cursor and the end of the window.
    #[must_use]
    pub fn available(&self) -> usize {
        self.end - self.cursor
    }

    /// Returns `true` when every byte of the window has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.end
    }

    /// The terminal error, once the window has been rebound to the failure buffer.
    #[must_use]
    pub fn failure(&self) -> Option<ErrorCode> {
        self.failure
    }

    /// Replaces the window with `[start, end)` and rewinds the cursor to `start`.
    ///
    /// Backends call this from their refill and seek implementations.
    pub fn set_window(&mut self, start: usize, end: usize) {
        binary_assert!(start <= end, "window start {} past end {}", start, end);
        self.start = start;
        self.cursor = start;
        self.end = end;
    }

    /// Moves the cursor to an absolute index inside the window.
    pub fn set_cursor(&mut self, cursor: usize) {
        binary_assert!(
            self.start <= cursor && cursor <= self.end,
            "cursor {} outside of window [{}, {}]",
            cursor,
            self.start,
            self.end
        );
        self.cursor = cursor;
    }

    /// Marks `count` bytes at the cursor as consumed.
    pub fn consume(&mut self, count: usize) {
        binary_assert!(
            count <= self.available(),
            "consumed {} bytes with only {} available",
            count,
            self.available()
        );
        self.cursor += count;
    }

    /// Rebinds the window to the static failure buffer.
    ///
    /// The failure is permanent: only the first terminal code is remembered.
    pub(crate) fn fail(&mut self, code: ErrorCode) {
        let code = *self.failure.get_or_insert(code);
        log::trace!("buffered window serving failure stub ({code})");
        self.set_window(0, FAILURE_BUFFER.len());
    }

    /// Marks the whole window consumed so the next read goes through refill.
    pub(crate) fn exhaust(&mut self) {
        self.cursor = self.end;
    }
}

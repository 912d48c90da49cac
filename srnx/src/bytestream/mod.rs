//! Sliding-window byte stream abstraction feeding the RINEX parser and
//! the SRNX container reader.

mod buffered;
mod mmap;
mod stdin;

pub use buffered::BufferedByteStream;
pub use mmap::MmapByteStream;
pub use stdin::StdinByteStream;

use crate::error::ByteStreamError;

/// Extra padding bytes guaranteed readable past the real content of a
/// stream's window, so callers may safely over-read (e.g. vectorized
/// line scans) without bounds-checking every byte.
pub const EXTRA: usize = 31;

/// A sliding window over an input source.
///
/// `window()` always exposes at least [EXTRA] bytes past `len()`,
/// except at true end-of-file where the remaining window may be
/// shorter than requested.
pub trait ByteStream {
    /// Discards `step` bytes from the front of the window and attempts
    /// to grow the window so that `len() >= req_size`. Growing may fall
    /// short only at end-of-file.
    fn advance(&mut self, req_size: usize, step: usize) -> Result<(), ByteStreamError>;

    /// The current window: `len()` real bytes plus at least [EXTRA]
    /// padding bytes (fewer only at end-of-file).
    fn window(&self) -> &[u8];

    /// Number of real (non-padding) bytes currently available.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn check_advance_args(req_size: usize, step: usize) -> Result<(), ByteStreamError> {
    if req_size > i32::MAX as usize || step > i32::MAX as usize {
        return Err(ByteStreamError::InvalidArgument);
    }
    Ok(())
}

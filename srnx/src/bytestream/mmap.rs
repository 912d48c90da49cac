use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::{check_advance_args, ByteStream, EXTRA};
use crate::error::ByteStreamError;

/// A [ByteStream] backed by a whole-file memory map.
///
/// Unlike the Unix-specific `/dev/zero` remap this crate's ancestor
/// used to guarantee [EXTRA] zero bytes past end-of-file, this
/// implementation falls back to a small owned, zero-padded copy of the
/// tail whenever the current window would otherwise run within [EXTRA]
/// bytes of the mapped file's end.
pub struct MmapByteStream {
    mmap: Mmap,
    file_len: usize,
    pos: usize,
    real_len: usize,
    tail: Option<Vec<u8>>,
}

impl MmapByteStream {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ByteStreamError> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len() as usize;
        // SAFETY: the file is opened read-only for the lifetime of this
        // stream and is not expected to be concurrently truncated.
        let mmap = unsafe { Mmap::map(&file)? };
        let mut stream = Self {
            mmap,
            file_len,
            pos: 0,
            real_len: 0,
            tail: None,
        };
        stream.refill(0)?;
        Ok(stream)
    }

    fn refill(&mut self, req_size: usize) -> Result<(), ByteStreamError> {
        let remaining = self.file_len - self.pos;
        self.real_len = req_size.min(remaining);
        if self.pos + self.real_len + EXTRA <= self.file_len {
            self.tail = None;
        } else {
            let mut buf = Vec::with_capacity(self.real_len + EXTRA);
            buf.extend_from_slice(&self.mmap[self.pos..self.pos + self.real_len]);
            buf.resize(self.real_len + EXTRA, 0);
            self.tail = Some(buf);
        }
        Ok(())
    }
}

impl ByteStream for MmapByteStream {
    fn advance(&mut self, req_size: usize, step: usize) -> Result<(), ByteStreamError> {
        check_advance_args(req_size, step)?;
        let remaining = self.file_len - self.pos;
        if step > remaining {
            return Err(ByteStreamError::InvalidArgument);
        }
        self.pos += step;
        self.refill(req_size)
    }

    fn window(&self) -> &[u8] {
        match &self.tail {
            Some(buf) => buf,
            None => &self.mmap[self.pos..self.pos + self.real_len + EXTRA],
        }
    }

    fn len(&self) -> usize {
        self.real_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_whole_small_file_with_padding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let stream = MmapByteStream::open(file.path()).unwrap();
        assert_eq!(stream.len(), 0);

        let mut stream = stream;
        stream.advance(11, 0).unwrap();
        assert_eq!(stream.len(), 11);
        assert_eq!(&stream.window()[..11], b"hello world");
        assert_eq!(stream.window().len(), 11 + EXTRA);
    }

    #[test]
    fn advance_past_end_of_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();

        let mut stream = MmapByteStream::open(file.path()).unwrap();
        assert!(stream.advance(3, 10).is_err());
    }

    #[test]
    fn shrinks_real_len_near_eof() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let mut stream = MmapByteStream::open(file.path()).unwrap();
        stream.advance(100, 0).unwrap();
        assert_eq!(stream.len(), 10);
        assert_eq!(&stream.window()[..10], b"0123456789");
    }
}

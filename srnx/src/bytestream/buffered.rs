use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{check_advance_args, ByteStream, EXTRA};
use crate::error::ByteStreamError;

/// A [ByteStream] backed by ordinary buffered reads, for sources that
/// cannot be memory-mapped (pipes, unseekable descriptors) or where
/// mapping is undesirable.
pub struct BufferedByteStream {
    file: File,
    buf: Vec<u8>,
    real_len: usize,
    eof: bool,
}

impl BufferedByteStream {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ByteStreamError> {
        let file = File::open(path)?;
        let mut stream = Self {
            file,
            buf: Vec::new(),
            real_len: 0,
            eof: false,
        };
        stream.refill(0)?;
        Ok(stream)
    }

    fn refill(&mut self, req_size: usize) -> Result<(), ByteStreamError> {
        while !self.eof && self.real_len < req_size {
            let want = req_size - self.real_len;
            let start = self.buf.len();
            self.buf.resize(start + want, 0);
            let read = self.file.read(&mut self.buf[start..])?;
            self.buf.truncate(start + read);
            self.real_len += read;
            if read == 0 {
                self.eof = true;
            }
        }
        self.buf.resize(self.real_len + EXTRA, 0);
        Ok(())
    }
}

impl ByteStream for BufferedByteStream {
    fn advance(&mut self, req_size: usize, step: usize) -> Result<(), ByteStreamError> {
        check_advance_args(req_size, step)?;
        if step > self.real_len {
            return Err(ByteStreamError::InvalidArgument);
        }
        self.buf.drain(..step);
        self.real_len -= step;
        self.refill(req_size)
    }

    fn window(&self) -> &[u8] {
        &self.buf
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
    fn reads_and_advances() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let mut stream = BufferedByteStream::open(file.path()).unwrap();
        stream.advance(5, 0).unwrap();
        assert_eq!(&stream.window()[..5], b"01234");

        stream.advance(5, 5).unwrap();
        assert_eq!(&stream.window()[..5], b"56789");
    }

    #[test]
    fn advance_step_past_available_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();

        let mut stream = BufferedByteStream::open(file.path()).unwrap();
        stream.advance(3, 0).unwrap();
        assert!(stream.advance(0, 10).is_err());
    }
}

use std::io::{Read, Stdin};

use super::{check_advance_args, ByteStream, EXTRA};
use crate::error::ByteStreamError;

/// A [ByteStream] reading from standard input, for the `-` CLI convention.
pub struct StdinByteStream {
    stdin: Stdin,
    buf: Vec<u8>,
    real_len: usize,
    eof: bool,
}

impl StdinByteStream {
    pub fn new() -> Result<Self, ByteStreamError> {
        let mut stream = Self {
            stdin: std::io::stdin(),
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
            let read = self.stdin.lock().read(&mut self.buf[start..])?;
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

impl Default for StdinByteStream {
    fn default() -> Self {
        Self::new().expect("stdin is always available")
    }
}

impl ByteStream for StdinByteStream {
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

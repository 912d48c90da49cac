//! Run-length codec for the single-byte LLI/SSI indicator streams.
//!
//! Encoded form is a sequence of `(byte, uleb128(count - 1))` pairs,
//! merging maximal runs of identical adjacent bytes.

use super::leb128::{uleb128_decode, uleb128_encode};
use crate::error::CodecError;

/// Default indicator value for positions beyond the encoded entries:
/// the convention throughout this format is that an absent indicator
/// reads as a space.
pub const RLE_FILL: u8 = b' ';

/// Encodes `data` as a sequence of `(byte, count-1)` runs, appended to `out`.
pub fn rle_encode(data: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        let mut run = 1usize;
        while i + run < data.len() && data[i + run] == byte {
            run += 1;
        }
        out.push(byte);
        uleb128_encode((run - 1) as u64, out);
        i += run;
    }
}

/// Decodes an RLE stream into an output buffer of exactly `len` bytes.
/// Any capacity past the last encoded run is filled with [RLE_FILL].
pub fn rle_decode(mut input: &[u8], len: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(len);
    while !input.is_empty() && out.len() < len {
        let byte = input[0];
        input = &input[1..];
        let run = uleb128_decode(&mut input)? + 1;
        let take = (run as usize).min(len - out.len());
        out.resize(out.len() + take, byte);
    }
    out.resize(len, RLE_FILL);
    Ok(out)
}

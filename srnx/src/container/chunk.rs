//! SRNX chunk framing: `tag(4) + uLEB128(length) + payload + digest`.

use crate::codec::leb128::uleb128_decode;
use crate::error::SrnxError;

/// Digest length in bytes for a given digest-id, per the `SRNX` chunk's
/// declared `chunk_digest_id`/`file_digest_id`: 0 means no digest,
/// otherwise `1 << (id & 7)` bytes.
pub fn digest_len(id: u64) -> usize {
    if id == 0 {
        0
    } else {
        1usize << (id & 7)
    }
}

/// Reads one chunk starting at `at`: its 4-byte tag, its payload slice,
/// and the offset of the byte immediately following the payload (where
/// a digest of the caller-known length, if any, would begin).
pub fn read_chunk(data: &[u8], at: usize) -> Result<([u8; 4], &[u8], usize), SrnxError> {
    let tag_bytes = data.get(at..at + 4).ok_or(SrnxError::Corrupt {
        detail: "truncated chunk tag",
    })?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(tag_bytes);

    let mut cursor = &data[at + 4..];
    let remaining_before = cursor.len();
    let len = uleb128_decode(&mut cursor).map_err(|_| SrnxError::Corrupt {
        detail: "truncated chunk length",
    })?;
    let len_width = remaining_before - cursor.len();
    let payload_start = at + 4 + len_width;
    let payload_end = payload_start
        .checked_add(len as usize)
        .ok_or(SrnxError::Corrupt {
            detail: "chunk length overflow",
        })?;
    let payload = data.get(payload_start..payload_end).ok_or(SrnxError::Corrupt {
        detail: "chunk payload runs past end of file",
    })?;
    Ok((tag, payload, payload_end))
}

/// Appends one chunk (tag, uLEB128 length, payload) to `out`. The
/// caller appends any digest bytes separately.
pub fn write_chunk(tag: &[u8; 4], payload: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(tag);
    crate::codec::leb128::uleb128_encode(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_chunk() {
        let mut buf = Vec::new();
        write_chunk(b"RHDR", b"hello", &mut buf);
        let (tag, payload, next) = read_chunk(&buf, 0).unwrap();
        assert_eq!(&tag, b"RHDR");
        assert_eq!(payload, b"hello");
        assert_eq!(next, buf.len());
    }

    #[test]
    fn digest_lengths() {
        assert_eq!(digest_len(0), 0);
        assert_eq!(digest_len(1), 2);
        assert_eq!(digest_len(2), 4);
        assert_eq!(digest_len(3), 8);
    }
}

//! Bit-matrix transposer: packs/unpacks N small signed integers as an
//! N-column x k-row bit matrix.
//!
//! Orientation (derived from the reference implementation's self-test
//! truth table rather than taken at face value from the prose
//! description it was distilled from): N in {8,16,32} is the number of
//! output columns; k in [1,32] is the number of input rows, i.e. the
//! bit depth of each column before sign extension. Row 0 contributes
//! the most significant bit of each column's k-bit value.

use crate::error::CodecError;
use std::sync::OnceLock;

/// Selects which transpose implementation is used. Only `Generic`
/// ships in this crate; the enum and its process-wide cached selection
/// exist so a vectorized implementation could be registered later
/// without changing the call sites in `container::reader` / `::writer`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransposeImpl {
    Generic,
}

static DISPATCH: OnceLock<TransposeImpl> = OnceLock::new();

/// Resolves the transpose implementation to use, consulting
/// `TRANSPOSE_FORCE` on first call and caching the result for the life
/// of the process.
pub fn dispatch() -> TransposeImpl {
    *DISPATCH.get_or_init(|| match std::env::var("TRANSPOSE_FORCE") {
        Ok(name) if name == "generic" => TransposeImpl::Generic,
        Ok(_) => {
            #[cfg(feature = "log")]
            log::warn!("unknown TRANSPOSE_FORCE value, falling back to generic");
            TransposeImpl::Generic
        },
        Err(_) => TransposeImpl::Generic,
    })
}

/// Transposes a row-major packed bit matrix of `count` columns (must be
/// 8, 16, or 32) and `bits` rows (1..=32) into `count` sign-extended
/// 64-bit integers.
///
/// `input` must hold at least `bits * (count / 8)` bytes.
pub fn transpose(input: &[u8], bits: usize, count: usize) -> Result<Vec<i64>, CodecError> {
    if !matches!(count, 8 | 16 | 32) {
        return Err(CodecError::InvalidParameter("count must be 8, 16, or 32"));
    }
    if bits == 0 || bits > 32 {
        return Err(CodecError::InvalidParameter("bits must be in 1..=32"));
    }
    let row_bytes = count / 8;
    if input.len() < bits * row_bytes {
        return Err(CodecError::InvalidParameter("input too short"));
    }

    // Dispatch is a cached no-op today (only Generic exists) but is
    // consulted so the seam is exercised the same way a real
    // vectorized path would be.
    let _ = dispatch();

    let mut out = Vec::with_capacity(count);
    for col in 0..count {
        let byte_in_row = col / 8;
        let bit_in_byte = 7 - (col % 8);
        let mut acc: u64 = 0;
        for row in 0..bits {
            let byte = input[row * row_bytes + byte_in_row];
            let bit = (byte >> bit_in_byte) & 1;
            acc |= (bit as u64) << (bits - 1 - row);
        }
        let shift = 64 - bits;
        let value = ((acc as i64) << shift) >> shift;
        out.push(value);
    }
    Ok(out)
}

/// Packs `values` (each fitting in `bits` signed bits) into a row-major
/// bit matrix of `count` columns and `bits` rows, appending to `out`.
/// Inverse of [transpose].
pub fn transpose_pack(values: &[i64], bits: usize, count: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    if !matches!(count, 8 | 16 | 32) {
        return Err(CodecError::InvalidParameter("count must be 8, 16, or 32"));
    }
    if bits == 0 || bits > 32 {
        return Err(CodecError::InvalidParameter("bits must be in 1..=32"));
    }
    if values.len() != count {
        return Err(CodecError::InvalidParameter("values.len() must equal count"));
    }
    let row_bytes = count / 8;
    let base = out.len();
    out.resize(base + bits * row_bytes, 0);
    for (col, &value) in values.iter().enumerate() {
        let byte_in_row = col / 8;
        let bit_in_byte = 7 - (col % 8);
        let mask = (1u64 << bits) - 1;
        let unsigned = (value as u64) & mask;
        for row in 0..bits {
            let bit = (unsigned >> (bits - 1 - row)) & 1;
            if bit != 0 {
                out[base + row * row_bytes + byte_in_row] |= 1 << bit_in_byte;
            }
        }
    }
    Ok(())
}

/// Minimum bit depth `k` (1..=32) able to hold the signed value `x`
/// (i.e. `x` fits in `k` bits two's-complement).
pub fn min_bits_for(x: i64) -> usize {
    if x == 0 {
        return 1;
    }
    let bits_needed = if x >= 0 {
        64 - x.leading_zeros() as usize + 1
    } else {
        64 - (!x).leading_zeros() as usize + 1
    };
    bits_needed.clamp(1, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Truth table from the reference implementation's self-test: row r's
    // contribution to column j is bit (31-r) of truth[j].
    const TRUTH: [u32; 32] = [
        0x55555555, 0x33333333, 0x0f0f0f0f, 0x00ff00ff, 0x0000ffff, 0xaaaaaaaa, 0xcccccccc,
        0xf0f0f0f0, 0xff00ff00, 0xffff0000, 0x0000ffff, 0x00ffff00, 0x0ff00ff0, 0x3c3c3c3c,
        0x66666666, 0xffffffff, 0x12345678, 0x31415927, 0xcafebabe, 0xcafed00d, 0x47494638,
        0x89504e47, 0x4d546864, 0x2321202f, 0x7f454c46, 0x25504446, 0x19540119, 0x4a6f7921,
        0x49492a00, 0x4d4d002a, 0x57414433, 0xd0cf11e0,
    ];

    fn build_input(count: usize) -> Vec<u8> {
        // 32 rows (bits=32 case), count columns packed per row.
        let row_bytes = count / 8;
        let mut input = vec![0u8; 32 * row_bytes];
        for row in 0..32 {
            for col in 0..count {
                let bit = (TRUTH[col] >> (31 - row)) & 1;
                if bit != 0 {
                    let byte_in_row = col / 8;
                    let bit_in_byte = 7 - (col % 8);
                    input[row * row_bytes + byte_in_row] |= 1 << bit_in_byte;
                }
            }
        }
        input
    }

    #[test]
    fn transpose_matches_truth_table_all_widths() {
        for &count in &[8usize, 16, 32] {
            let input = build_input(count);
            for bits in 1..=32usize {
                let out = transpose(&input, bits, count).unwrap();
                for col in 0..count {
                    let expect = (TRUTH[col] as i32) >> (32 - bits);
                    assert_eq!(
                        out[col], expect as i64,
                        "count={count} bits={bits} col={col}"
                    );
                }
            }
        }
    }

    #[test]
    fn transpose_k4_example() {
        let input = build_input(8);
        let out = transpose(&input, 4, 8).unwrap();
        assert_eq!(&out[0..4], &[0x5, 0x3, 0x0, 0x0]);
    }

    #[test]
    fn transpose_pack_is_inverse_of_transpose() {
        let values: Vec<i64> = vec![3, -4, 0, 7, -8, 1, -1, 2];
        let mut packed = Vec::new();
        transpose_pack(&values, 4, 8, &mut packed).unwrap();
        let out = transpose(&packed, 4, 8).unwrap();
        assert_eq!(out, values);
    }

    #[test]
    fn rejects_bad_count() {
        let input = vec![0u8; 64];
        assert!(transpose(&input, 4, 64).is_err());
    }

    #[test]
    fn min_bits_examples() {
        assert_eq!(min_bits_for(0), 1);
        assert_eq!(min_bits_for(3), 3);
        assert_eq!(min_bits_for(-4), 3);
        assert_eq!(min_bits_for(-1), 1);
    }
}

//! Integer, fixed-field, run-length, and bit-matrix codecs shared by the
//! parser and the SRNX container.

pub mod fixed;
pub mod leb128;
pub mod rle;
pub mod transpose;

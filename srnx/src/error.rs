use thiserror::Error;

/// Errors that may rise while pulling bytes from a [crate::bytestream::ByteStream].
#[derive(Error, Debug)]
pub enum ByteStreamError {
    /// `req_size` or `step` exceeded `i32::MAX`, or `step` asked to skip
    /// past the end of the underlying source.
    #[error("invalid advance argument")]
    InvalidArgument,
    /// Underlying I/O failure (file open, read, or mmap).
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

/// Errors that may rise while pulling records from a [crate::parser::RinexParser].
#[derive(Error, Debug)]
pub enum ParserError {
    /// First header line is not "RINEX VERSION / TYPE".
    #[error("not a RINEX file")]
    NotRinex,
    /// Header declares a file type other than Observation ('O').
    #[error("not an observation RINEX")]
    NotObservation,
    /// Header version prefix is neither "     2." nor "     3.".
    #[error("unsupported RINEX version")]
    UnknownVersion,
    /// A header or body line violated the fixed-column format.
    /// `line` is the 1-based source line at which the violation was detected.
    #[error("bad format at line {line}")]
    BadFormat { line: u64 },
    /// Byte stream failure while reading.
    #[error("stream error")]
    Stream(#[from] ByteStreamError),
}

/// Errors that may rise while resolving content in a [crate::container::SrnxReader]
/// or while building one with [crate::container::SrnxWriter].
#[derive(Error, Debug)]
pub enum SrnxError {
    /// The file does not begin with the `SRNX` chunk tag.
    #[error("not a SRNX file")]
    NotSrnx,
    /// The `SRNX` chunk's major version is not 1.
    #[error("unsupported SRNX major version {found}")]
    BadMajor { found: u64 },
    /// A chunk, offset, or field violated container framing invariants.
    #[error("corrupt SRNX container: {detail}")]
    Corrupt { detail: &'static str },
    /// A SATE/SOCD chunk referenced a satellite system letter absent
    /// from the RINEX header's observation-code table.
    #[error("unknown satellite system {0:?}")]
    UnknownSystem(char),
    /// An observation code was requested that is absent from the
    /// header's observation-code table for its system.
    #[error("unknown observation code {0}")]
    UnknownCode(String),
    /// A satellite name was requested that is absent from the
    /// satellite inventory.
    #[error("unknown satellite {0}")]
    UnknownSatellite(String),
    /// More values were requested from a SOCD stream than it holds.
    #[error("end of observation data")]
    EndOfData,
    /// Underlying I/O failure (file open, read, or mmap).
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

/// Errors that may rise while encoding/decoding a single integer or
/// indicator-run codec value.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A LEB128 sequence ran out of bytes before its continuation bit cleared.
    #[error("truncated LEB128 sequence")]
    Truncated,
    /// A LEB128 sequence used more bytes than can fit in the target width.
    #[error("LEB128 sequence too long")]
    Overlong,
    /// An indicator-run length, or matrix dimension, was out of range.
    #[error("invalid codec parameter: {0}")]
    InvalidParameter(&'static str),
}

/// Crate-wide error, composed from the component error enums above.
#[derive(Error, Debug)]
pub enum Error {
    #[error("parser error")]
    Parser(#[from] ParserError),
    #[error("container error")]
    Srnx(#[from] SrnxError),
    #[error("codec error")]
    Codec(#[from] CodecError),
    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

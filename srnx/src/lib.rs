#![doc(html_logo_url = "https://raw.githubusercontent.com/georust/meta/master/logo/logo.png")]
#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

pub mod bytestream;
pub mod codec;
pub mod container;
pub mod error;
pub mod model;
pub mod parser;

/// Re-exports of the types most callers need: open a file with
/// [RinexParser], or a compressed one with [SrnxReader].
pub mod prelude {
    pub use crate::container::{SatelliteEntry, SocdReader, SpecialEvent, SrnxReader, SrnxWriter};
    pub use crate::error::{ByteStreamError, CodecError, Error, ParserError, SrnxError};
    pub use crate::model::{
        Epoch, EpochFlag, ObservableTable, Observation, SatelliteInventory, SignalId, SignalRun,
        OBS_PARSE_ERROR,
    };
    pub use crate::parser::{ReadOutcome, RinexParser, Version};
}

//! Streaming RINEX observation-file parser.
//!
//! [RinexParser] owns a [ByteStream] and turns it into a sequence of
//! epochs: either an observation [ReadOutcome::Record] (satellites and
//! their decoded signals) or a [ReadOutcome::Event] (raw event text,
//! for flags 2-5).

pub(crate) mod header;
mod v2;
mod v3;

pub use header::Version;

use std::path::Path;

#[cfg(feature = "log")]
use log::{debug, trace};

use crate::bytestream::{BufferedByteStream, ByteStream, MmapByteStream, StdinByteStream};
use crate::error::ParserError;
use crate::model::{Epoch, ObservableTable, Observation, SatelliteInventory, SignalId};

/// Result of one [RinexParser::read] call.
pub enum ReadOutcome {
    /// An observation epoch: satellite/observation-code pairs and their
    /// decoded values, in declaration order.
    Record {
        epoch: Epoch,
        signals: Vec<SignalId>,
        observations: Vec<Observation>,
    },
    /// An event epoch (`HeaderInformationFollows`, `ExternalEvent`, ...):
    /// `epoch.n_sats` lines of raw text rather than observation data.
    Event { epoch: Epoch, text: Vec<String> },
    /// No more epochs; the stream is exhausted.
    Eof,
}

pub struct RinexParser {
    stream: Box<dyn ByteStream>,
    version: Version,
    v2_system: char,
    table: ObservableTable,
    satellites: SatelliteInventory,
    header_lines: Vec<String>,
    line_no: u64,
}

/// Initial growth request used while scanning for the next line break.
/// Doubled on each retry until a full line (or end of stream) is found.
const LINE_GROWTH_START: usize = 256;

impl RinexParser {
    /// Opens a file, memory-mapping it when possible.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ParserError> {
        match MmapByteStream::open(&path) {
            Ok(stream) => Self::from_stream(Box::new(stream)),
            Err(_) => Self::from_stream(Box::new(BufferedByteStream::open(path)?)),
        }
    }

    /// Reads from standard input.
    pub fn open_stdin() -> Result<Self, ParserError> {
        Self::from_stream(Box::new(StdinByteStream::new()?))
    }

    fn from_stream(stream: Box<dyn ByteStream>) -> Result<Self, ParserError> {
        let mut parser = Self {
            stream,
            version: Version::V2,
            v2_system: 'G',
            table: ObservableTable::default(),
            satellites: SatelliteInventory::default(),
            header_lines: Vec::new(),
            line_no: 0,
        };
        parser.parse_header()?;
        Ok(parser)
    }

    fn parse_header(&mut self) -> Result<(), ParserError> {
        let mut lines = Vec::new();
        loop {
            let raw = self.next_line()?.ok_or(ParserError::NotRinex)?;
            self.line_no += 1;
            let normalized = header::normalize_line(&raw, self.line_no)?;
            let is_last = header::label(&normalized) == "END OF HEADER";
            lines.push(normalized);
            if is_last {
                break;
            }
        }
        let (version, _file_type) = header::parse_version_type(&lines[0])?;
        let v2_system = header::v2_system_letter(&lines[0]);
        let table = header::build_observable_table(&lines, version, v2_system)?;

        self.version = version;
        self.v2_system = v2_system;
        self.table = table;
        self.header_lines = lines;

        #[cfg(feature = "log")]
        debug!("header parsed: version={:?} systems={:?}", version, table_systems(&self.table));
        Ok(())
    }

    /// Returns the next epoch, or [ReadOutcome::Eof] once the stream is
    /// exhausted.
    pub fn read(&mut self) -> Result<ReadOutcome, ParserError> {
        let line = match self.next_line()? {
            Some(l) => l,
            None => return Ok(ReadOutcome::Eof),
        };
        self.line_no += 1;

        let epoch = match self.version {
            Version::V2 => v2::parse_epoch_line(&line, self.line_no)?,
            Version::V3 => v3::parse_epoch_line(&line, self.line_no)?,
        };

        #[cfg(feature = "log")]
        trace!("epoch {} flag={:?} n_sats={}", epoch.yyyy_mm_dd, epoch.flag, epoch.n_sats);

        if epoch.flag.is_event() {
            let mut text = Vec::with_capacity(epoch.n_sats as usize);
            for _ in 0..epoch.n_sats {
                let l = self.expect_line()?;
                text.push(l);
            }
            return Ok(ReadOutcome::Event { epoch, text });
        }

        let (signals, observations) = match self.version {
            Version::V2 => self.read_v2_body(&epoch, line)?,
            Version::V3 => self.read_v3_body(&epoch)?,
        };
        Ok(ReadOutcome::Record {
            epoch,
            signals,
            observations,
        })
    }

    /// `epoch_line` is the already-consumed epoch record: for v2 it
    /// doubles as the first satellite-name continuation line (names
    /// start at column 32 of the very same line).
    fn read_v2_body(
        &mut self,
        epoch: &Epoch,
        epoch_line: String,
    ) -> Result<(Vec<SignalId>, Vec<Observation>), ParserError> {
        let n_sats = epoch.n_sats as usize;
        let header_lines_needed = v2::satellite_header_lines(n_sats);
        let mut header_lines = Vec::with_capacity(header_lines_needed);
        header_lines.push(epoch_line);
        for _ in 1..header_lines_needed {
            header_lines.push(self.expect_line()?);
        }
        let sat_names = v2::parse_satellite_names(&header_lines, n_sats);

        let mut signals = Vec::new();
        let mut observations = Vec::new();
        for name in &sat_names {
            let system = name.trim().chars().next().unwrap_or(self.v2_system);
            let codes = self
                .table
                .codes(system)
                .ok_or(ParserError::BadFormat { line: self.line_no })?
                .to_vec();
            let body_lines_needed = v2::body_lines_for(codes.len());
            let mut body_lines = Vec::with_capacity(body_lines_needed);
            for _ in 0..body_lines_needed {
                body_lines.push(self.expect_line()?);
            }
            self.satellites.insert(name.trim());
            v2::parse_satellite_body(
                &body_lines,
                name,
                system,
                &codes,
                &mut signals,
                &mut observations,
            );
        }
        Ok((signals, observations))
    }

    fn read_v3_body(
        &mut self,
        epoch: &Epoch,
    ) -> Result<(Vec<SignalId>, Vec<Observation>), ParserError> {
        let mut signals = Vec::new();
        let mut observations = Vec::new();
        for _ in 0..epoch.n_sats {
            let line = self.expect_line()?;
            let sv_name = line.get(0..3).unwrap_or("   ").trim().to_string();
            let system = sv_name.chars().next().unwrap_or(self.v2_system);
            let codes = self
                .table
                .codes(system)
                .map(|c| c.to_vec())
                .unwrap_or_default();
            self.satellites.insert(&sv_name);
            v3::parse_satellite_body(&line, &codes, &mut signals, &mut observations)?;
        }
        Ok((signals, observations))
    }

    fn expect_line(&mut self) -> Result<String, ParserError> {
        self.line_no += 1;
        self.next_line()?
            .ok_or(ParserError::BadFormat { line: self.line_no })
    }

    /// Pulls the next newline-terminated line from the stream, growing
    /// the window as needed. Returns `None` at true end of stream.
    fn next_line(&mut self) -> Result<Option<String>, ParserError> {
        let mut want = LINE_GROWTH_START;
        loop {
            self.stream.advance(want, 0)?;
            let len = self.stream.len();
            let window = &self.stream.window()[..len];
            if let Some(pos) = window.iter().position(|&b| b == b'\n') {
                let text = std::str::from_utf8(&window[..pos])
                    .map_err(|_| ParserError::BadFormat { line: self.line_no })?;
                let line = text.trim_end_matches('\r').to_string();
                self.stream.advance(0, pos + 1)?;
                return Ok(Some(line));
            }
            if len < want {
                if len == 0 {
                    return Ok(None);
                }
                let text = std::str::from_utf8(window)
                    .map_err(|_| ParserError::BadFormat { line: self.line_no })?;
                let line = text.to_string();
                self.stream.advance(0, len)?;
                return Ok(Some(line));
            }
            want *= 2;
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn observable_table(&self) -> &ObservableTable {
        &self.table
    }

    pub fn satellites(&self) -> &SatelliteInventory {
        &self.satellites
    }

    /// The normalized header lines, in file order, including the
    /// terminating `END OF HEADER` line.
    pub fn header_lines(&self) -> &[String] {
        &self.header_lines
    }
}

#[cfg(feature = "log")]
fn table_systems(table: &ObservableTable) -> Vec<char> {
    table.systems().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_v2() -> String {
        let mut header = String::new();
        header.push_str("     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE\n");
        header.push_str("     3    L1    L2    C1                                    # / TYPES OF OBSERV\n");
        header.push_str("                                                            END OF HEADER\n");
        // Each 16-char slot is a 14-char F14.3 value plus a 1-char LLI/SSI pair.
        let slot0 = "          .3008 "; // L1 = 300, LLI 8
        let slot1 = "         -.3537 "; // L2 = -353, LLI 7
        let slot2 = "    -53875.6328 "; // C1 = -53875632, LLI 8
        let body = format!(" 10  3  1  0  0  0.0000000  0  1G01\n{slot0}{slot1}{slot2}\n");
        header + &body
    }

    #[test]
    fn opens_and_reads_one_v2_epoch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_v2().as_bytes()).unwrap();
        file.flush().unwrap();

        let mut parser = RinexParser::open(file.path()).unwrap();
        assert_eq!(parser.version(), Version::V2);

        match parser.read().unwrap() {
            ReadOutcome::Record {
                epoch,
                signals,
                observations,
            } => {
                assert_eq!(epoch.yyyy_mm_dd, 20_100_301);
                assert_eq!(signals.len(), 3);
                assert_eq!(observations[0].value, 300);
            },
            _ => panic!("expected a record"),
        }

        assert!(matches!(parser.read().unwrap(), ReadOutcome::Eof));
    }
}

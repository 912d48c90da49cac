//! Core data model: epochs, signal identifiers, observations, and the
//! per-file tables that relate them.

use std::fmt;
use std::str::FromStr;

/// Sentinel observation value produced by [crate::codec::fixed::parse_obs]
/// on malformed input.
pub const OBS_PARSE_ERROR: i64 = i64::MIN;

/// Epoch flag, carried verbatim from the RINEX EPOCH/SAT record.
///
/// `Ok`/`PowerFailure` mark ordinary observation epochs; the `*Event*`
/// variants mark epochs whose body is raw event text rather than
/// observation data; `CycleSlip` marks an observation epoch in which a
/// cycle slip was recorded by the receiver.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpochFlag {
    #[default]
    Ok,
    PowerFailure,
    AntennaBeingMoved,
    NewSiteOccupation,
    HeaderInformationFollows,
    ExternalEvent,
    CycleSlip,
}

impl EpochFlag {
    /// True for `Ok` and `PowerFailure`, the two flags that carry plain
    /// observation data rather than event text.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok | Self::PowerFailure)
    }

    /// True for the flags whose epoch body is raw event text
    /// (`'2'..='5'`) rather than satellite observations.
    pub fn is_event(&self) -> bool {
        matches!(
            self,
            Self::AntennaBeingMoved
                | Self::NewSiteOccupation
                | Self::HeaderInformationFollows
                | Self::ExternalEvent
        )
    }
}

impl FromStr for EpochFlag {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Ok),
            "1" => Ok(Self::PowerFailure),
            "2" => Ok(Self::AntennaBeingMoved),
            "3" => Ok(Self::NewSiteOccupation),
            "4" => Ok(Self::HeaderInformationFollows),
            "5" => Ok(Self::ExternalEvent),
            "6" => Ok(Self::CycleSlip),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EpochFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = match self {
            Self::Ok => '0',
            Self::PowerFailure => '1',
            Self::AntennaBeingMoved => '2',
            Self::NewSiteOccupation => '3',
            Self::HeaderInformationFollows => '4',
            Self::ExternalEvent => '5',
            Self::CycleSlip => '6',
        };
        write!(f, "{}", c)
    }
}

/// A single epoch boundary: packed date/time, flag, satellite (or
/// event-line) count, and receiver clock offset.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Epoch {
    /// `year * 10_000 + month * 100 + day`.
    pub yyyy_mm_dd: u32,
    /// `hour * 100 + minute`.
    pub hh_mm: u16,
    /// Seconds of the minute, scaled by 1e7.
    pub sec_e7: u32,
    /// Epoch flag.
    pub flag: EpochFlag,
    /// Satellite count (observation epochs) or event-line count (event epochs).
    pub n_sats: u32,
    /// Receiver clock offset, scaled by 1e12. Zero when absent.
    pub clock_offset: i64,
}

impl Epoch {
    /// Advances `self` by `seconds_e7` (hundred-nanosecond units),
    /// carrying into minutes and hours as needed. Used by
    /// [crate::container::reader] to expand a timestamp span into its
    /// constituent epochs.
    pub fn advance_e7(&mut self, mut seconds_e7: i64) {
        seconds_e7 += self.sec_e7 as i64;
        let mut minute = (self.hh_mm % 100) as i64;
        let mut hour = (self.hh_mm / 100) as i64;
        const MINUTE_E7: i64 = 60 * 10_000_000;
        while seconds_e7 >= MINUTE_E7 {
            seconds_e7 -= MINUTE_E7;
            minute += 1;
            if minute == 60 {
                minute = 0;
                hour += 1;
                if hour == 24 {
                    hour = 0;
                    // Calendar rollover across midnight is not resolved here:
                    // the day field is left untouched, matching the source's
                    // scope (it never spans multi-day timestamp runs).
                }
            }
        }
        self.sec_e7 = seconds_e7 as u32;
        self.hh_mm = (hour * 100 + minute) as u16;
    }
}

/// Satellite + observation-code pair identifying one signal.
///
/// `sv` is the 3-byte satellite name and `code` the 4-byte observation
/// code, both NUL-padded; derived equality/ordering/hashing compare
/// them field-by-field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalId {
    pub sv: [u8; 3],
    pub code: [u8; 4],
}

impl SignalId {
    pub fn new(sv: &str, code: &str) -> Self {
        let mut sv_bytes = [0u8; 3];
        let mut code_bytes = [0u8; 4];
        for (dst, src) in sv_bytes.iter_mut().zip(sv.bytes()) {
            *dst = src;
        }
        for (dst, src) in code_bytes.iter_mut().zip(code.bytes()) {
            *dst = src;
        }
        Self {
            sv: sv_bytes,
            code: code_bytes,
        }
    }

    pub fn sv_str(&self) -> String {
        String::from_utf8_lossy(&self.sv)
            .trim_end_matches('\0')
            .to_string()
    }

    pub fn code_str(&self) -> String {
        String::from_utf8_lossy(&self.code)
            .trim_end_matches('\0')
            .to_string()
    }
}

/// A decoded observation: scaled value plus its two single-byte indicators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Observation {
    /// F14.3 field value times 1000, or [OBS_PARSE_ERROR] on parse failure.
    pub value: i64,
    /// Loss-of-lock indicator; space (0x20) when absent.
    pub lli: u8,
    /// Signal-strength indicator; space (0x20) when absent.
    pub ssi: u8,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            value: OBS_PARSE_ERROR,
            lli: b' ',
            ssi: b' ',
        }
    }
}

/// Per-satellite-system table of observation codes, as declared by the
/// file header (`# / TYPES OF OBSERV` for v2, `SYS / # / OBS TYPES` for v3).
///
/// Indexed by the low five bits of the system letter (32 buckets), as
/// in the original C implementation's table layout.
#[derive(Default, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObservableTable {
    systems: [Option<Vec<String>>; 32],
}

fn bucket(system: char) -> usize {
    (system as usize) & 31
}

impl ObservableTable {
    pub fn set(&mut self, system: char, codes: Vec<String>) {
        self.systems[bucket(system)] = Some(codes);
    }

    pub fn codes(&self, system: char) -> Option<&[String]> {
        self.systems[bucket(system)].as_deref()
    }

    pub fn code_index(&self, system: char, code: &str) -> Option<usize> {
        self.codes(system)?.iter().position(|c| c == code)
    }

    pub fn systems(&self) -> impl Iterator<Item = char> + '_ {
        (0u8..=255)
            .map(|b| b as char)
            .filter(move |c| self.systems[bucket(*c)].is_some())
    }
}

/// The set of satellite names encountered anywhere in a file, in
/// insertion (first-appearance) order.
#[derive(Default, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteInventory {
    order: Vec<String>,
}

impl SatelliteInventory {
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(idx) = self.order.iter().position(|n| n == name) {
            idx
        } else {
            self.order.push(name.to_string());
            self.order.len() - 1
        }
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }
}

/// A maximal contiguous run of epochs during which a single signal
/// (satellite, observation code) was observed.
#[derive(Clone, Debug, Default)]
pub struct SignalRun {
    /// Index of the first epoch in this run.
    pub start_epoch: usize,
    pub values: Vec<i64>,
    pub lli: Vec<u8>,
    pub ssi: Vec<u8>,
}

impl SignalRun {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_flag_roundtrip() {
        for c in '0'..='6' {
            let flag = EpochFlag::from_str(&c.to_string()).unwrap();
            assert_eq!(flag.to_string().chars().next().unwrap(), c);
        }
    }

    #[test]
    fn epoch_flag_semantics() {
        assert!(EpochFlag::Ok.is_ok());
        assert!(EpochFlag::PowerFailure.is_ok());
        assert!(EpochFlag::ExternalEvent.is_event());
        assert!(!EpochFlag::CycleSlip.is_event());
    }

    #[test]
    fn signal_id_round_trips_text() {
        let id = SignalId::new("G01", "L1C");
        assert_eq!(id.sv_str(), "G01");
        assert_eq!(id.code_str(), "L1C");
    }

    #[test]
    fn epoch_minute_rollover() {
        let mut e = Epoch {
            yyyy_mm_dd: 20_100_301,
            hh_mm: 0,
            sec_e7: 0,
            flag: EpochFlag::Ok,
            n_sats: 0,
            clock_offset: 0,
        };
        e.advance_e7(60 * 10_000_000);
        assert_eq!(e.hh_mm, 1);
        assert_eq!(e.sec_e7, 0);
    }

    #[test]
    fn observable_table_lookup() {
        let mut table = ObservableTable::default();
        table.set('G', vec!["L1".into(), "L2".into(), "C1".into()]);
        assert_eq!(table.codes('G').unwrap().len(), 3);
        assert_eq!(table.code_index('G', "C1"), Some(2));
        assert!(table.codes('R').is_none());
    }
}

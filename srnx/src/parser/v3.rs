//! RINEX v3 epoch and observation body parsing.

use crate::codec::fixed::{parse_fixed, parse_obs, parse_uint};
use crate::error::ParserError;
use crate::model::{Epoch, EpochFlag, Observation, ObservableTable, SignalId};
use std::str::FromStr;

// Column layout of a v3 epoch line, 0-indexed. This crate follows the
// reference decoder's column 28 for the flag rather than RINEX 3.04's
// published column 31.
//   0      '>'
//   2..6   year (4)
//   7..9   month (2)
//   10..12 day (2)
//   13..15 hour (2)
//   16..18 minute (2)
//   18..28 seconds, F10.7
//   28     flag
//   29..32 satellite count (3)
//   41..56 clock offset, F15.12 (optional)
const YEAR: usize = 2;
const MONTH: usize = 7;
const DAY: usize = 10;
const HOUR: usize = 13;
const MINUTE: usize = 16;
const SEC: usize = 18;
const SEC_WIDTH: usize = 10;
const FLAG: usize = 28;
const NSATS: usize = 29;
const CLOCK_OFFSET: usize = 41;

/// Parses a v3 epoch record line (`> yyyy mm dd hh mm ss.sssssss  f nnn`).
pub fn parse_epoch_line(line: &str, line_no: u64) -> Result<Epoch, ParserError> {
    let bad = || ParserError::BadFormat { line: line_no };
    if line.as_bytes().first().copied() != Some(b'>') {
        return Err(bad());
    }
    let flag_char = line.as_bytes().get(FLAG).copied().ok_or_else(bad)? as char;
    let flag = EpochFlag::from_str(&flag_char.to_string()).map_err(|_| bad())?;

    let year = parse_uint(&line[YEAR..], 4);
    let month = parse_uint(&line[MONTH..], 2);
    let day = parse_uint(&line[DAY..], 2);
    let hour = parse_uint(&line[HOUR..], 2);
    let minute = parse_uint(&line[MINUTE..], 2);
    let sec_e7 = line.get(SEC..SEC + SEC_WIDTH).and_then(|f| parse_fixed(f, SEC_WIDTH, 7));
    let n_sats = parse_uint(&line[NSATS..], 3);

    // Event records (flags '2'..'5') may carry blank or non-numeric time
    // fields; only a non-event record is required to have them all.
    let any_missing =
        year.is_none() || month.is_none() || day.is_none() || hour.is_none() || minute.is_none() || sec_e7.is_none() || n_sats.is_none();
    if any_missing && !flag.is_event() {
        return Err(bad());
    }

    let year = year.unwrap_or(0);
    let month = month.unwrap_or(0);
    let day = day.unwrap_or(0);
    let hour = hour.unwrap_or(0);
    let minute = minute.unwrap_or(0);
    let sec_e7 = sec_e7.unwrap_or(0);
    let n_sats = n_sats.unwrap_or(0);

    let clock_offset = if line.len() >= CLOCK_OFFSET + 15 {
        parse_fixed(&line[CLOCK_OFFSET..CLOCK_OFFSET + 15], 15, 12).unwrap_or(0)
    } else {
        0
    };

    Ok(Epoch {
        yyyy_mm_dd: (year * 10_000 + month * 100 + day) as u32,
        hh_mm: (hour * 100 + minute) as u16,
        sec_e7: sec_e7.max(0) as u32,
        flag,
        n_sats: n_sats as u32,
        clock_offset,
    })
}

/// Parses one satellite observation body line: a 3-character satellite
/// identifier followed by contiguous 16-character observation slots.
pub fn parse_satellite_body(
    line: &str,
    codes: &[String],
    signals: &mut Vec<SignalId>,
    observations: &mut Vec<Observation>,
) -> Result<(), ParserError> {
    let sv_name = line.get(0..3).ok_or(ParserError::BadFormat { line: 0 })?;
    for (code_idx, code) in codes.iter().enumerate() {
        let start = 3 + code_idx * 16;
        let field = line.get(start..(start + 16).min(line.len())).unwrap_or("");
        let blank = field.trim().is_empty();
        let value = if blank || field.len() < 14 {
            Observation::default().value
        } else {
            parse_obs(&field[..14])
        };
        let lli = field.as_bytes().get(14).copied().unwrap_or(b' ');
        let ssi = field.as_bytes().get(15).copied().unwrap_or(b' ');
        signals.push(SignalId::new(sv_name.trim(), code));
        observations.push(Observation {
            value,
            lli: if blank { b' ' } else { lli },
            ssi: if blank { b' ' } else { ssi },
        });
    }
    Ok(())
}

/// Returns the codes declared for `sv_name`'s satellite system letter
/// (its first character), or `None` if the system was never declared.
pub fn codes_for<'a>(table: &'a ObservableTable, sv_name: &str) -> Option<&'a [String]> {
    let system = sv_name.trim().chars().next()?;
    table.codes(system)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a v3 epoch line field-by-field from the same column
    /// constants the parser uses, so the fixture can't drift out of
    /// sync with a hand-counted string.
    fn build_epoch_line(
        year: u32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        flag: char,
        n_sats: u32,
    ) -> String {
        let mut line = vec![b' '; NSATS + 3];
        line[0] = b'>';
        let put = |line: &mut Vec<u8>, at: usize, text: String| {
            for (i, b) in text.bytes().enumerate() {
                line[at + i] = b;
            }
        };
        put(&mut line, YEAR, format!("{year:4}"));
        put(&mut line, MONTH, format!("{month:2}"));
        put(&mut line, DAY, format!("{day:2}"));
        put(&mut line, HOUR, format!("{hour:2}"));
        put(&mut line, MINUTE, format!("{minute:2}"));
        put(&mut line, SEC, format!("{:10.7}", 0.0_f64));
        line[FLAG] = flag as u8;
        put(&mut line, NSATS, format!("{n_sats:3}"));
        String::from_utf8(line).unwrap()
    }

    #[test]
    fn epoch_line_example() {
        let line = build_epoch_line(2010, 3, 1, 0, 0, '0', 3);
        let epoch = parse_epoch_line(&line, 1).unwrap();
        assert_eq!(epoch.yyyy_mm_dd, 20_100_301);
        assert_eq!(epoch.hh_mm, 0);
        assert_eq!(epoch.sec_e7, 0);
        assert_eq!(epoch.flag, EpochFlag::Ok);
        assert_eq!(epoch.n_sats, 3);
    }

    #[test]
    fn rejects_line_without_marker() {
        let line = build_epoch_line(2010, 3, 1, 0, 0, '0', 3).replacen('>', " ", 1);
        assert!(parse_epoch_line(&line, 1).is_err());
    }

    #[test]
    fn event_flag_tolerates_an_unparseable_time_field() {
        // Flag '4' (HeaderInformationFollows) is an event flag, so a
        // malformed year field must not be rejected.
        let mut line = build_epoch_line(2010, 3, 1, 0, 0, '4', 1).into_bytes();
        line[YEAR] = b'*';
        let line = String::from_utf8(line).unwrap();
        let epoch = parse_epoch_line(&line, 1).unwrap();
        assert_eq!(epoch.flag, EpochFlag::HeaderInformationFollows);
        assert_eq!(epoch.n_sats, 1);
    }

    #[test]
    fn ok_flag_rejects_an_unparseable_time_field() {
        let mut line = build_epoch_line(2010, 3, 1, 0, 0, '0', 1).into_bytes();
        line[YEAR] = b'*';
        let line = String::from_utf8(line).unwrap();
        assert!(parse_epoch_line(&line, 1).is_err());
    }

    #[test]
    fn satellite_body_parses_two_codes() {
        let codes = vec!["C1C".to_string(), "L1C".to_string()];
        // Each 16-char slot is a 14-char F14.3 value plus 1-char LLI/SSI.
        let slot0 = "          .3008 ";
        let slot1 = "         -.3537 ";
        let line = format!("G01{slot0}{slot1}");
        let mut signals = Vec::new();
        let mut observations = Vec::new();
        parse_satellite_body(&line, &codes, &mut signals, &mut observations).unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(observations[0].value, 300);
        assert_eq!(observations[0].lli, b'8');
        assert_eq!(observations[1].value, -353);
        assert_eq!(observations[1].lli, b'7');
    }
}

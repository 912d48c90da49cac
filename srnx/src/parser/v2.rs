//! RINEX v2 epoch and observation body parsing.

use crate::codec::fixed::{parse_fixed, parse_obs, parse_uint};
use crate::error::ParserError;
use crate::model::{Epoch, EpochFlag, Observation, ObservableTable, SignalId};
use std::str::FromStr;

/// Parses a v2 `EPOCH/SAT` or `EVENT FLAG` record line.
///
/// Fields are 3 characters wide (year, month, day, hour, minute), then
/// an 11-character seconds field, a blank pair, a 1-character flag, and
/// a 3-character satellite count — `" yy mm dd hh mm ss.sssssss  f nnn"`.
/// Satellite identifiers follow at column 32, reserving room for 12
/// regardless of `n_sats`, so the clock offset always starts at 68.
pub fn parse_epoch_line(line: &str, line_no: u64) -> Result<Epoch, ParserError> {
    let bad = || ParserError::BadFormat { line: line_no };

    let flag_char = line.as_bytes().get(28).copied().ok_or_else(bad)? as char;
    let flag = EpochFlag::from_str(&flag_char.to_string()).map_err(|_| bad())?;

    let year2 = parse_uint(line, 3);
    let month = parse_uint(&line[3..], 3);
    let day = parse_uint(&line[6..], 3);
    let hour = parse_uint(&line[9..], 3);
    let minute = parse_uint(&line[12..], 3);
    let sec_e7 = line.get(15..26).and_then(|f| parse_fixed(f, 11, 7));
    let n_sats = parse_uint(&line[29..], 3);

    // Event records (flags '2'..'5') may carry blank or non-numeric time
    // fields; only a non-event record is required to have them all.
    let any_missing =
        year2.is_none() || month.is_none() || day.is_none() || hour.is_none() || minute.is_none() || sec_e7.is_none() || n_sats.is_none();
    if any_missing && !flag.is_event() {
        return Err(bad());
    }

    let year2 = year2.unwrap_or(0);
    let year = if year2 < 80 { 2000 + year2 } else { 1900 + year2 };
    let month = month.unwrap_or(0);
    let day = day.unwrap_or(0);
    let hour = hour.unwrap_or(0);
    let minute = minute.unwrap_or(0);
    let sec_e7 = sec_e7.unwrap_or(0);
    let n_sats = n_sats.unwrap_or(0);

    let clock_offset = if line.len() >= 80 {
        parse_fixed(&line[68..80], 12, 9).unwrap_or(0)
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

/// Reads the `n_sats` satellite identifiers from the epoch header's
/// continuation lines (12 satellites per line, 3 characters each
/// starting at column 32).
pub fn parse_satellite_names(lines: &[String], n_sats: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(n_sats);
    let mut remaining = n_sats;
    for line in lines {
        let per_line = 12.min(remaining);
        for i in 0..per_line {
            let start = 32 + 3 * i;
            let name = line.get(start..start + 3).unwrap_or("   ").to_string();
            names.push(name);
        }
        remaining -= per_line;
        if remaining == 0 {
            break;
        }
    }
    names
}

/// Number of epoch-header continuation lines needed to hold `n_sats` names.
pub fn satellite_header_lines(n_sats: usize) -> usize {
    (n_sats + 11) / 12
}

/// Number of 16-character observation slots per body line for a
/// satellite with `n_obs` declared observation codes.
pub fn body_lines_for(n_obs: usize) -> usize {
    (n_obs + 4) / 5
}

/// Parses one satellite's observation body lines (each holding up to 5
/// 16-character slots) into signal identifiers and observations,
/// appending to `signals`/`observations`.
pub fn parse_satellite_body(
    lines: &[String],
    sv_name: &str,
    system: char,
    codes: &[String],
    signals: &mut Vec<SignalId>,
    observations: &mut Vec<Observation>,
) {
    let mut code_idx = 0usize;
    for line in lines {
        if code_idx >= codes.len() {
            break;
        }
        // Each line holds exactly this many slots by position, independent
        // of how much of the line is actually present: a short or
        // unpadded line yields blank trailing slots rather than
        // desynchronizing the remaining codes onto the wrong line.
        let slots_in_line = 5.min(codes.len() - code_idx);
        for slot in 0..slots_in_line {
            let start = slot * 16;
            let field = line.get(start..(start + 16).min(line.len())).unwrap_or("");
            let blank = field.trim().is_empty();
            let value = if blank || field.len() < 14 {
                Observation::default().value
            } else {
                parse_obs(&field[..14])
            };
            let lli = field.as_bytes().get(14).copied().unwrap_or(b' ');
            let ssi = field.as_bytes().get(15).copied().unwrap_or(b' ');
            signals.push(SignalId::new(sv_name.trim(), &codes[code_idx]));
            observations.push(Observation {
                value: if blank { Observation::default().value } else { value },
                lli: if blank { b' ' } else { lli },
                ssi: if blank { b' ' } else { ssi },
            });
            code_idx += 1;
        }
    }
    let _ = system;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_line_example() {
        let line = " 10  3  1  0  0  0.0000000  0  3G01G02G05";
        let epoch = parse_epoch_line(line, 1).unwrap();
        assert_eq!(epoch.yyyy_mm_dd, 20_100_301);
        assert_eq!(epoch.hh_mm, 0);
        assert_eq!(epoch.sec_e7, 0);
        assert_eq!(epoch.flag, EpochFlag::Ok);
        assert_eq!(epoch.n_sats, 3);
    }

    #[test]
    fn satellite_header_line_count() {
        assert_eq!(satellite_header_lines(3), 1);
        assert_eq!(satellite_header_lines(12), 1);
        assert_eq!(satellite_header_lines(13), 2);
    }

    #[test]
    fn event_flag_tolerates_an_unparseable_time_field() {
        // Year field holds a non-digit byte; flag '4' (HeaderInformationFollows)
        // is an event flag, so the malformed time field must not be rejected.
        let line = "  *  3  1  0  0  0.0000000  4  1";
        let epoch = parse_epoch_line(line, 1).unwrap();
        assert_eq!(epoch.flag, EpochFlag::HeaderInformationFollows);
        assert_eq!(epoch.n_sats, 1);
    }

    #[test]
    fn ok_flag_rejects_an_unparseable_time_field() {
        let line = "  *  3  1  0  0  0.0000000  0  1";
        assert!(parse_epoch_line(line, 1).is_err());
    }

    #[test]
    fn short_interior_line_does_not_desync_later_codes() {
        let codes: Vec<String> = (1..=7).map(|i| format!("C{i}")).collect();
        // First body line is short/unpadded: only 2 of its 5 slots are
        // actually present in the text, trailing ones simply absent.
        let line1 = format!("{}{}", "       300.000 7", "       301.000 7");
        let line2 = format!("{}{}", "       306.000 7", "       307.000 7");
        let lines = vec![line1, line2];

        let mut signals = Vec::new();
        let mut observations = Vec::new();
        parse_satellite_body(&lines, "G01", 'G', &codes, &mut signals, &mut observations);

        // Codes 3, 4, 5 fall on the first line's missing slots and must
        // come back blank rather than stealing line 2's values.
        assert_eq!(signals.len(), 7);
        assert_eq!(signals[2], SignalId::new("G01", "C3"));
        assert_eq!(observations[2].value, Observation::default().value);
        assert_eq!(observations[3].value, Observation::default().value);
        assert_eq!(observations[4].value, Observation::default().value);

        // Codes 6 and 7 belong to line 2's two real slots.
        assert_eq!(signals[5], SignalId::new("G01", "C6"));
        assert_eq!(observations[5].value, 306_000);
        assert_eq!(signals[6], SignalId::new("G01", "C7"));
        assert_eq!(observations[6].value, 307_000);
    }
}

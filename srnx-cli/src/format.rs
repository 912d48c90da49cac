//! Renders decoded observation data back into RINEX v2/v3 text, the
//! inverse of `srnx::parser`'s column arithmetic.

use srnx::codec::fixed::{format_fixed, format_obs, format_uint};
use srnx::prelude::{Epoch, EpochFlag};

/// Satellite-name slots per v2 epoch-header continuation line.
const V2_SATS_PER_LINE: usize = 12;
/// Observation slots per v2 body line.
const V2_OBS_PER_LINE: usize = 5;

fn date_parts(epoch: &Epoch) -> (u32, u32, u32) {
    let year = epoch.yyyy_mm_dd / 10_000;
    let month = (epoch.yyyy_mm_dd / 100) % 100;
    let day = epoch.yyyy_mm_dd % 100;
    (year, month, day)
}

fn time_parts(epoch: &Epoch) -> (u32, u32) {
    ((epoch.hh_mm / 100) as u32, (epoch.hh_mm % 100) as u32)
}

/// Renders a v2 epoch record's header line(s): the `EPOCH/SAT` line plus
/// any satellite-name continuation lines it needs.
pub fn epoch_header_v2(epoch: &Epoch, sat_names: &[String]) -> Vec<String> {
    epoch_header_line_v2(epoch, sat_names.len(), sat_names)
}

/// As [epoch_header_v2], but with the "nnn" count field set independently
/// of `sat_names` (used for event epochs, which carry a raw-text line
/// count rather than a satellite list).
fn epoch_header_line_v2(epoch: &Epoch, count: usize, sat_names: &[String]) -> Vec<String> {
    let (year, month, day) = date_parts(epoch);
    let (hour, minute) = time_parts(epoch);
    let year2 = year % 100;

    let mut first = String::new();
    first.push_str(&format_uint(year2 as u64, 3));
    first.push_str(&format_uint(month as u64, 3));
    first.push_str(&format_uint(day as u64, 3));
    first.push_str(&format_uint(hour as u64, 3));
    first.push_str(&format_uint(minute as u64, 3));
    first.push_str(&format_fixed(epoch.sec_e7 as i64, 11, 7));
    first.push_str("  ");
    first.push_str(&epoch.flag.to_string());
    first.push_str(&format_uint(count as u64, 3));

    let mut lines = Vec::new();
    let mut chunks = sat_names.chunks(V2_SATS_PER_LINE);
    if let Some(first_chunk) = chunks.next() {
        for name in first_chunk {
            first.push_str(&format!("{name:<3}"));
        }
    }
    if epoch.clock_offset != 0 {
        while first.len() < 68 {
            first.push(' ');
        }
        first.push_str(&format_fixed(epoch.clock_offset, 12, 9));
    }
    lines.push(first);

    for chunk in chunks {
        let mut cont = " ".repeat(32);
        for name in chunk {
            cont.push_str(&format!("{name:<3}"));
        }
        lines.push(cont);
    }
    lines
}

/// Renders one v2 satellite's observation body: 16-character slots, up
/// to five per line, in declared code order.
pub fn satellite_body_v2(values: &[(i64, u8, u8)]) -> Vec<String> {
    let mut lines = Vec::new();
    for chunk in values.chunks(V2_OBS_PER_LINE) {
        let mut line = String::new();
        for &(value, lli, ssi) in chunk {
            line.push_str(&format_obs(value));
            line.push(if value == srnx::prelude::OBS_PARSE_ERROR {
                ' '
            } else {
                lli as char
            });
            line.push(if value == srnx::prelude::OBS_PARSE_ERROR {
                ' '
            } else {
                ssi as char
            });
        }
        lines.push(line);
    }
    lines
}

/// Renders a v3 epoch record line (`> yyyy mm dd hh mm ss.sssssss  f nnn`).
pub fn epoch_line_v3(epoch: &Epoch, n_sats: usize) -> String {
    let (year, month, day) = date_parts(epoch);
    let (hour, minute) = time_parts(epoch);

    let mut line = String::from(">");
    line.push(' ');
    line.push_str(&format_uint(year as u64, 4));
    line.push(' ');
    line.push_str(&format_uint(month as u64, 2));
    line.push(' ');
    line.push_str(&format_uint(day as u64, 2));
    line.push(' ');
    line.push_str(&format_uint(hour as u64, 2));
    line.push(' ');
    line.push_str(&format_uint(minute as u64, 2));
    line.push_str(&format_fixed(epoch.sec_e7 as i64, 10, 7));
    line.push_str(&epoch.flag.to_string());
    line.push_str(&format_uint(n_sats as u64, 3));
    if epoch.clock_offset != 0 {
        while line.len() < 41 {
            line.push(' ');
        }
        line.push_str(&format_fixed(epoch.clock_offset, 15, 12));
    }
    line
}

/// Renders one v3 satellite observation body line: the 3-character
/// satellite name followed by contiguous 16-character slots.
pub fn satellite_body_v3(sv_name: &str, values: &[(i64, u8, u8)]) -> String {
    let mut line = format!("{sv_name:<3}");
    for &(value, lli, ssi) in values {
        line.push_str(&format_obs(value));
        if value == srnx::prelude::OBS_PARSE_ERROR {
            line.push(' ');
            line.push(' ');
        } else {
            line.push(lli as char);
            line.push(ssi as char);
        }
    }
    line
}

/// Renders a raw event epoch's `EPOCH/SAT` header for a given flag and
/// event-text line count.
pub fn event_header_v2(epoch: &Epoch, n_lines: usize) -> String {
    epoch_header_line_v2(epoch, n_lines, &[]).remove(0)
}

pub fn event_header_v3(epoch: &Epoch, n_lines: usize) -> String {
    epoch_line_v3(epoch, n_lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_epoch() -> Epoch {
        Epoch {
            yyyy_mm_dd: 20_100_301,
            hh_mm: 0,
            sec_e7: 0,
            flag: EpochFlag::Ok,
            n_sats: 0,
            clock_offset: 0,
        }
    }

    #[test]
    fn v2_epoch_header_fits_one_line_under_twelve_sats() {
        let lines = epoch_header_v2(&sample_epoch(), &["G01".into(), "G02".into()]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with(" 10  3  1  0  0  0.0000000  0  2"));
    }

    #[test]
    fn v2_epoch_header_wraps_past_twelve_sats() {
        let sats: Vec<String> = (1..=13).map(|i| format!("G{i:02}")).collect();
        let lines = epoch_header_v2(&sample_epoch(), &sats);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("                                G13"));
    }

    #[test]
    fn v3_epoch_line_has_marker_and_flag() {
        let line = epoch_line_v3(&sample_epoch(), 4);
        assert!(line.starts_with(">"));
        assert_eq!(line.as_bytes()[28], b'0');
    }
}

//! RINEX observation-file header parsing: version/type validation and
//! per-system observation-code table construction.

use crate::codec::fixed::parse_uint;
use crate::error::ParserError;
use crate::model::ObservableTable;

/// RINEX major version family. Only 2.xx and 3.xx are supported.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Version {
    V2,
    V3,
}

const LABEL_COL: usize = 60;

pub(crate) fn label(line: &str) -> &str {
    if line.len() > LABEL_COL {
        line[LABEL_COL..].trim()
    } else {
        ""
    }
}

/// Normalizes a raw header line: trims trailing whitespace and checks
/// it falls within the 61..=80 character range the format requires.
pub fn normalize_line(raw: &str, line_no: u64) -> Result<String, ParserError> {
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    let trimmed = trimmed.trim_end_matches(' ');
    if trimmed.len() < 61 || trimmed.len() > 80 {
        return Err(ParserError::BadFormat { line: line_no });
    }
    Ok(trimmed.to_string())
}

/// Validates the first header line and returns the parsed version and
/// observation-type character.
pub fn parse_version_type(first_line: &str) -> Result<(Version, char), ParserError> {
    if label(first_line) != "RINEX VERSION / TYPE" {
        return Err(ParserError::NotRinex);
    }
    let bytes = first_line.as_bytes();
    if bytes.len() <= 20 {
        return Err(ParserError::BadFormat { line: 1 });
    }
    let file_type = bytes[20] as char;
    let version = if first_line.starts_with("     2.") {
        Version::V2
    } else if first_line.starts_with("     3.") {
        Version::V3
    } else {
        return Err(ParserError::UnknownVersion);
    };
    if file_type != 'O' {
        return Err(ParserError::NotObservation);
    }
    Ok((version, file_type))
}

/// Satellite system letter declared on the `RINEX VERSION / TYPE` line
/// for a v2 file (column 40, 0-indexed). A space means GPS-only; `M`
/// means the observation-code table applies to every known system.
pub fn v2_system_letter(first_line: &str) -> char {
    match first_line.as_bytes().get(40).copied().unwrap_or(b'G') {
        b' ' => 'G',
        b => b as char,
    }
}

const V2_SYSTEMS: &[char] = &['G', 'R', 'S', 'E'];

/// Parses the v2 `# / TYPES OF OBSERV` block (a first line plus zero or
/// more continuation lines) starting at `lines[start]`, returning the
/// codes and the number of lines consumed.
pub fn parse_v2_types_of_observ(
    lines: &[String],
    start: usize,
) -> Result<(Vec<String>, usize), ParserError> {
    let first = &lines[start];
    let count = parse_uint(first, 6).ok_or(ParserError::BadFormat {
        line: (start + 1) as u64,
    })? as usize;

    let mut codes = Vec::with_capacity(count);
    let mut consumed = 0usize;
    let mut remaining = count;
    loop {
        let line = &lines[start + consumed];
        let per_line = 9usize.min(remaining);
        for i in 0..per_line {
            let field_start = 6 + 6 * i;
            let field = line.get(field_start..field_start + 6).ok_or(ParserError::BadFormat {
                line: (start + consumed + 1) as u64,
            })?;
            codes.push(field.trim().to_string());
        }
        remaining -= per_line;
        consumed += 1;
        if remaining == 0 {
            break;
        }
    }
    Ok((codes, consumed))
}

/// Parses a v3 `SYS / # / OBS TYPES` block starting at `lines[start]`,
/// returning the system letter, its codes, and the number of lines consumed.
pub fn parse_v3_obs_types(
    lines: &[String],
    start: usize,
) -> Result<(char, Vec<String>, usize), ParserError> {
    let first = &lines[start];
    let bytes = first.as_bytes();
    let system = *bytes.first().ok_or(ParserError::BadFormat {
        line: (start + 1) as u64,
    })? as char;
    let count = parse_uint(&first[3..], 3).ok_or(ParserError::BadFormat {
        line: (start + 1) as u64,
    })? as usize;

    let mut codes = Vec::with_capacity(count);
    let mut consumed = 0usize;
    let mut remaining = count;
    loop {
        let line = &lines[start + consumed];
        let per_line = 13usize.min(remaining);
        for i in 0..per_line {
            let field_start = 7 + 4 * i;
            let field = line.get(field_start..field_start + 4).ok_or(ParserError::BadFormat {
                line: (start + consumed + 1) as u64,
            })?;
            codes.push(field.trim().to_string());
        }
        remaining -= per_line;
        consumed += 1;
        if remaining == 0 {
            break;
        }
    }
    Ok((codes, consumed))
}

/// Walks the normalized header lines, populating the observation-code
/// table according to the file's version.
pub fn build_observable_table(
    lines: &[String],
    version: Version,
    v2_system: char,
) -> Result<ObservableTable, ParserError> {
    let mut table = ObservableTable::default();
    let mut i = 0;
    while i < lines.len() {
        match label(&lines[i]) {
            "# / TYPES OF OBSERV" if version == Version::V2 => {
                let (codes, consumed) = parse_v2_types_of_observ(lines, i)?;
                if v2_system == 'M' {
                    for sys in V2_SYSTEMS {
                        table.set(*sys, codes.clone());
                    }
                } else {
                    table.set(v2_system, codes);
                }
                i += consumed;
                continue;
            },
            "SYS / # / OBS TYPES" if version == Version::V3 => {
                let (system, codes, consumed) = parse_v3_obs_types(lines, i)?;
                table.set(system, codes);
                i += consumed;
                continue;
            },
            "END OF HEADER" => break,
            _ => {},
        }
        i += 1;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_single_line_table() {
        let line = "     5    L1    L2    C1    P1    P2                        # / TYPES OF OBSERV".to_string();
        let (codes, consumed) = parse_v2_types_of_observ(&[line], 0).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(codes, vec!["L1", "L2", "C1", "P1", "P2"]);
    }

    #[test]
    fn version_type_line_rejects_non_observation() {
        let mut line = String::from("     2.11           NAVIGATION DATA");
        while line.len() < 60 {
            line.push(' ');
        }
        line.push_str("RINEX VERSION / TYPE");
        assert!(matches!(
            parse_version_type(&line),
            Err(ParserError::NotObservation)
        ));
    }

    #[test]
    fn v2_system_letter_blank_column_means_gps() {
        let line = "     2.11           OBSERVATION DATA                        RINEX VERSION / TYPE";
        assert_eq!(v2_system_letter(line), 'G');
    }

    #[test]
    fn v2_system_letter_reads_declared_system() {
        let line = "     2.11           OBSERVATION DATA    R (GLO)             RINEX VERSION / TYPE";
        assert_eq!(v2_system_letter(line), 'R');
    }
}

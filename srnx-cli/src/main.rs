//! Command line tool converting between RINEX observation files and the
//! `SRNX` binary container.
//!
//! Usage: `srnx <input> [output]`. Direction (compress/decompress) is
//! auto-detected from the input's content, not its extension.

mod cli;
mod format;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info};

use srnx::prelude::*;

use cli::Cli;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::new();
    match run(&cli) {
        Ok(output) => {
            if !cli.quiet() {
                println!("{}", output.display());
            }
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("{}: {e}", cli.input_path());
            error!("{}: {e}", cli.input_path());
            ExitCode::FAILURE
        },
    }
}

fn run(cli: &Cli) -> Result<PathBuf, Error> {
    let (input_path, _staging) = materialize_input(cli.input_path())?;
    let is_srnx = sniff_srnx(&input_path)?;
    let output_path = match cli.output_path() {
        Some(p) => PathBuf::from(p),
        None => default_output_path(cli.input_path(), is_srnx),
    };

    if is_srnx {
        info!("decompressing {} -> {}", input_path.display(), output_path.display());
        decompress(&input_path, &output_path)?;
    } else {
        info!("compressing {} -> {}", input_path.display(), output_path.display());
        compress(&input_path, &output_path)?;
    }
    Ok(output_path)
}

/// If `input_path` is `"-"`, drains standard input into a temporary file
/// so the rest of the pipeline can treat every input uniformly as a
/// path on disk. The returned `NamedTempFile` must stay alive as long as
/// the path is in use.
fn materialize_input(input_path: &str) -> std::io::Result<(PathBuf, Option<tempfile::NamedTempFile>)> {
    if input_path == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        let mut staging = tempfile::NamedTempFile::new()?;
        staging.write_all(&buf)?;
        staging.flush()?;
        let path = staging.path().to_path_buf();
        Ok((path, Some(staging)))
    } else {
        Ok((PathBuf::from(input_path), None))
    }
}

/// Reads the first four bytes of `path` and checks for the `SRNX` chunk tag.
fn sniff_srnx(path: &Path) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled == 4 && &buf == b"SRNX")
}

fn default_output_path(input_path: &str, is_srnx: bool) -> PathBuf {
    if input_path == "-" {
        return PathBuf::from(if is_srnx { "output.rnx" } else { "output.srnx" });
    }
    let path = Path::new(input_path);
    if is_srnx {
        path.with_extension("rnx")
    } else {
        path.with_extension("srnx")
    }
}

/// Writes `bytes` to a temporary file in `output_path`'s directory, then
/// renames it into place: no partially-written output is ever left
/// behind on failure.
fn write_atomically(output_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staging = tempfile::NamedTempFile::new_in(dir)?;
    staging.write_all(bytes)?;
    staging
        .persist(output_path)
        .map_err(|persist_err| persist_err.error)?;
    Ok(())
}

/// Parses a RINEX observation file and re-encodes it as a `SRNX` container.
///
/// Every observed `(satellite, code)` pair is collapsed into a single
/// [SignalRun] spanning the whole epoch timeline (the `SOCD` wire format
/// carries a flat value count with no per-run start offset), with
/// [OBS_PARSE_ERROR] filling every epoch where that signal was not read.
fn compress(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut parser = RinexParser::open(input_path)?;

    let mut epochs: Vec<Epoch> = Vec::new();
    let mut events: Vec<SpecialEvent> = Vec::new();
    let mut occurrences: HashMap<SignalId, Vec<(usize, Observation)>> = HashMap::new();

    loop {
        match parser.read()? {
            ReadOutcome::Eof => break,
            ReadOutcome::Record {
                epoch,
                signals,
                observations,
            } => {
                let idx = epochs.len();
                epochs.push(epoch);
                for (signal, observation) in signals.into_iter().zip(observations) {
                    occurrences.entry(signal).or_default().push((idx, observation));
                }
            },
            ReadOutcome::Event { epoch, text } => {
                let idx = epochs.len();
                events.push(SpecialEvent {
                    epoch_index: idx,
                    text: text.join("\n"),
                });
                epochs.push(epoch);
            },
        }
    }

    let total_epochs = epochs.len();
    let satellites = parser.satellites().names().to_vec();
    let table = parser.observable_table().clone();
    let header_text = parser.header_lines().join("\n");

    let mut runs: HashMap<SignalId, SignalRun> = HashMap::with_capacity(occurrences.len());
    for (signal, occurrence) in occurrences {
        let mut run = SignalRun {
            start_epoch: 0,
            values: vec![OBS_PARSE_ERROR; total_epochs],
            lli: vec![b' '; total_epochs],
            ssi: vec![b' '; total_epochs],
        };
        for (idx, observation) in occurrence {
            run.values[idx] = observation.value;
            run.lli[idx] = observation.lli;
            run.ssi[idx] = observation.ssi;
        }
        runs.insert(signal, run);
    }

    let bytes = SrnxWriter::new().write(&header_text, &epochs, &events, &satellites, &table, &runs);
    write_atomically(output_path, &bytes)?;
    Ok(())
}

/// Reads a `SRNX` container and re-renders it as RINEX observation text.
///
/// A satellite is considered present at an epoch when at least one of
/// its observation codes holds a non-sentinel value there: the
/// container has no dedicated per-epoch satellite-presence record, and
/// per-epoch flags other than "event present" are not recoverable (the
/// `EPOC` chunk does not carry them), so event epochs are re-emitted
/// with flag `4` (`HeaderInformationFollows`) regardless of which event
/// flag the source file originally used.
fn decompress(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut reader = SrnxReader::open(input_path)?;
    let version = reader.version();
    let header_text = String::from_utf8_lossy(reader.header()).into_owned();
    let table = reader.observable_table().clone();
    let epochs = reader.epochs()?;
    let satellite_entries = reader.satellites()?;

    let mut socd: HashMap<SignalId, (Vec<i64>, Vec<u8>, Vec<u8>)> = HashMap::new();
    for entry in &satellite_entries {
        let system = entry.name.trim().chars().next().unwrap_or(' ');
        let codes = table.codes(system).map(|c| c.to_vec()).unwrap_or_default();
        for code in &codes {
            if let Ok(mut stream) = reader.find_socd(&entry.name, code) {
                socd.insert(SignalId::new(&entry.name, code), stream.read_all()?);
            }
        }
    }

    let mut event_text: HashMap<usize, String> = HashMap::new();
    let mut after = 0usize;
    while let Some((idx, text, next)) = reader.next_special_event(after)? {
        event_text.insert(idx, text);
        after = next;
    }

    let mut out = String::new();
    out.push_str(&header_text);
    if !header_text.ends_with('\n') {
        out.push('\n');
    }

    for (idx, epoch) in epochs.iter().enumerate() {
        if let Some(text) = event_text.get(&idx) {
            let mut event_epoch = *epoch;
            event_epoch.flag = EpochFlag::HeaderInformationFollows;
            let n_lines = text.lines().count().max(1);
            let header_line = match version {
                Version::V2 => format::event_header_v2(&event_epoch, n_lines),
                Version::V3 => format::event_header_v3(&event_epoch, n_lines),
            };
            out.push_str(&header_line);
            out.push('\n');
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
            continue;
        }

        let present: Vec<&str> = satellite_entries
            .iter()
            .map(|e| e.name.as_str())
            .filter(|name| {
                let system = name.trim().chars().next().unwrap_or(' ');
                table
                    .codes(system)
                    .map(|codes| {
                        codes.iter().any(|code| {
                            socd.get(&SignalId::new(name, code))
                                .map(|(values, ..)| values.get(idx).copied().unwrap_or(OBS_PARSE_ERROR) != OBS_PARSE_ERROR)
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(false)
            })
            .collect();

        match version {
            Version::V2 => {
                let names: Vec<String> = present.iter().map(|s| s.to_string()).collect();
                for line in format::epoch_header_v2(epoch, &names) {
                    out.push_str(&line);
                    out.push('\n');
                }
                for name in &present {
                    let system = name.trim().chars().next().unwrap_or(' ');
                    let codes = table.codes(system).unwrap_or(&[]);
                    let values: Vec<(i64, u8, u8)> = codes
                        .iter()
                        .map(|code| {
                            socd.get(&SignalId::new(name, code))
                                .map(|(values, lli, ssi)| {
                                    (
                                        values.get(idx).copied().unwrap_or(OBS_PARSE_ERROR),
                                        lli.get(idx).copied().unwrap_or(b' '),
                                        ssi.get(idx).copied().unwrap_or(b' '),
                                    )
                                })
                                .unwrap_or((OBS_PARSE_ERROR, b' ', b' '))
                        })
                        .collect();
                    for line in format::satellite_body_v2(&values) {
                        out.push_str(&line);
                        out.push('\n');
                    }
                }
            },
            Version::V3 => {
                out.push_str(&format::epoch_line_v3(epoch, present.len()));
                out.push('\n');
                for name in &present {
                    let system = name.trim().chars().next().unwrap_or(' ');
                    let codes = table.codes(system).unwrap_or(&[]);
                    let values: Vec<(i64, u8, u8)> = codes
                        .iter()
                        .map(|code| {
                            socd.get(&SignalId::new(name, code))
                                .map(|(values, lli, ssi)| {
                                    (
                                        values.get(idx).copied().unwrap_or(OBS_PARSE_ERROR),
                                        lli.get(idx).copied().unwrap_or(b' '),
                                        ssi.get(idx).copied().unwrap_or(b' '),
                                    )
                                })
                                .unwrap_or((OBS_PARSE_ERROR, b' ', b' '))
                        })
                        .collect();
                    out.push_str(&format::satellite_body_v3(name, &values));
                    out.push('\n');
                }
            },
        }
    }

    write_atomically(output_path, out.as_bytes())?;
    Ok(())
}

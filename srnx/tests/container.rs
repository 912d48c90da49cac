use std::collections::HashMap;
use std::io::Write;

use srnx::codec::leb128::{sleb128_encode, uleb128_encode};
use srnx::container::{chunk, SpecialEvent, SrnxReader, SrnxWriter};
use srnx::error::SrnxError;
use srnx::model::{Epoch, EpochFlag, ObservableTable, SignalId, SignalRun};

fn minimal_header() -> &'static str {
    "     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE\n     1    L1                                                # / TYPES OF OBSERV\n                                                            END OF HEADER"
}

fn epoch(hh_mm: u16, sec_e7: u32) -> Epoch {
    Epoch {
        yyyy_mm_dd: 20_100_301,
        hh_mm,
        sec_e7,
        flag: EpochFlag::Ok,
        n_sats: 1,
        clock_offset: 0,
    }
}

#[test]
fn open_rejects_unsupported_major_version() {
    let mut out = Vec::new();
    let mut srnx_payload = Vec::new();
    uleb128_encode(2, &mut srnx_payload); // major = 2, unsupported
    uleb128_encode(0, &mut srnx_payload);
    uleb128_encode(0, &mut srnx_payload);
    uleb128_encode(0, &mut srnx_payload);
    chunk::write_chunk(b"SRNX", &srnx_payload, &mut out);
    chunk::write_chunk(b"RHDR", minimal_header().as_bytes(), &mut out);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&out).unwrap();
    file.flush().unwrap();

    let err = SrnxReader::open(file.path()).unwrap_err();
    assert!(matches!(err, SrnxError::BadMajor { found: 2 }));
}

#[test]
fn epochs_expands_a_timestamp_span_across_a_minute_rollover() {
    let mut out = Vec::new();
    let mut srnx_payload = Vec::new();
    uleb128_encode(1, &mut srnx_payload);
    uleb128_encode(0, &mut srnx_payload);
    uleb128_encode(0, &mut srnx_payload);
    uleb128_encode(0, &mut srnx_payload);
    chunk::write_chunk(b"SRNX", &srnx_payload, &mut out);
    chunk::write_chunk(b"RHDR", minimal_header().as_bytes(), &mut out);

    let mut epoc_payload = Vec::new();
    uleb128_encode(4, &mut epoc_payload); // total epochs
    sleb128_encode(-30 * 10_000_000, &mut epoc_payload); // delta (step stored negated)
    uleb128_encode(4, &mut epoc_payload); // span length
    uleb128_encode(20_100_301, &mut epoc_payload); // date
    uleb128_encode(0, &mut epoc_payload); // packed time: hh_mm=0, sec_e7=0
    chunk::write_chunk(b"EPOC", &epoc_payload, &mut out);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&out).unwrap();
    file.flush().unwrap();

    let mut reader = SrnxReader::open(file.path()).unwrap();
    let epochs = reader.epochs().unwrap();
    assert_eq!(epochs.len(), 4);
    // 0s, 30s, 60s (rolls into minute 1 at 0s), 90s (minute 1 at 30s).
    assert_eq!((epochs[0].hh_mm, epochs[0].sec_e7), (0, 0));
    assert_eq!((epochs[1].hh_mm, epochs[1].sec_e7), (0, 300_000_000));
    assert_eq!((epochs[2].hh_mm, epochs[2].sec_e7), (1, 0));
    assert_eq!((epochs[3].hh_mm, epochs[3].sec_e7), (1, 300_000_000));
    assert!(epochs.iter().all(|e| e.clock_offset == 0));
}

#[test]
fn writer_and_reader_round_trip_a_minimal_file() {
    let mut table = ObservableTable::default();
    table.set('G', vec!["L1".to_string()]);

    let epochs = vec![epoch(0, 0), epoch(0, 10_000_000), epoch(0, 20_000_000)];
    let mut runs = HashMap::new();
    runs.insert(
        SignalId::new("G01", "L1"),
        SignalRun {
            start_epoch: 0,
            values: vec![23_619_095_450, 23_619_096_000, 0],
            lli: vec![b' ', b'4', b' '],
            ssi: vec![b'7', b'7', b'7'],
        },
    );

    let bytes = SrnxWriter::new().write(
        minimal_header(),
        &epochs,
        &[SpecialEvent {
            epoch_index: 1,
            text: "                                                            NOTE".to_string(),
        }],
        &["G01".to_string()],
        &table,
        &runs,
    );

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let mut reader = SrnxReader::open(file.path()).unwrap();
    let decoded_epochs = reader.epochs().unwrap();
    assert_eq!(decoded_epochs.len(), 3);

    let (idx, text, _) = reader.next_special_event(0).unwrap().unwrap();
    assert_eq!(idx, 1);
    assert!(text.contains("NOTE"));

    let satellites = reader.satellites().unwrap();
    assert_eq!(satellites.len(), 1);
    assert_eq!(satellites[0].name, "G01");

    let mut socd = reader.find_socd("G01", "L1").unwrap();
    let (values, lli, ssi) = socd.read_all().unwrap();
    assert_eq!(values, vec![23_619_095_450, 23_619_096_000, 0]);
    assert_eq!(lli, vec![b' ', b'4', b' ']);
    assert_eq!(ssi, vec![b'7', b'7', b'7']);
}

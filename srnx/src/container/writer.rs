//! SRNX compression engine: turns a parsed RINEX file's in-memory model
//! into the chunk sequence described in `container::reader`.

use std::collections::HashMap;

use super::chunk::{digest_len, write_chunk};
use crate::codec::leb128::{sleb128_encode, sleb128_len, uleb128_encode, uleb128_len};
use crate::codec::rle::rle_encode;
use crate::codec::transpose::{min_bits_for, transpose_pack};
use crate::model::{Epoch, ObservableTable, SignalId, SignalRun};

/// One raw event line block, logically preceding the epoch at `epoch_index`.
pub struct SpecialEvent {
    pub epoch_index: usize,
    pub text: String,
}

pub struct SrnxWriter {
    chunk_digest_id: u64,
    file_digest_id: u64,
}

impl Default for SrnxWriter {
    fn default() -> Self {
        Self {
            chunk_digest_id: 0,
            file_digest_id: 0,
        }
    }
}

impl SrnxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the chunk- and file-level digest ids (0 disables digests).
    pub fn with_digest_ids(mut self, chunk_digest_id: u64, file_digest_id: u64) -> Self {
        self.chunk_digest_id = chunk_digest_id;
        self.file_digest_id = file_digest_id;
        self
    }

    /// Serializes a full SRNX file.
    ///
    /// `header_text` is the normalized RINEX header (§4.5's
    /// `header::normalize_line` output joined with `\n`, ending in "END
    /// OF HEADER"). `satellites` is the satellite list in first-seen
    /// order; `runs` holds one [SignalRun] per observed `(sv, code)`.
    pub fn write(
        &self,
        header_text: &str,
        epochs: &[Epoch],
        events: &[SpecialEvent],
        satellites: &[String],
        table: &ObservableTable,
        runs: &HashMap<SignalId, SignalRun>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        write_chunk(
            b"SRNX",
            &self.encode_srnx_payload(),
            &mut out,
        );
        self.push_digest(&mut out);

        write_chunk(b"RHDR", header_text.as_bytes(), &mut out);
        self.push_digest(&mut out);

        let epoc_offset = out.len() as u64;
        write_chunk(b"EPOC", &self.encode_epoc_payload(epochs), &mut out);
        self.push_digest(&mut out);

        let mut evtf_offset = 0u64;
        for (i, event) in events.iter().enumerate() {
            if i == 0 {
                evtf_offset = out.len() as u64;
            }
            write_chunk(b"EVTF", &self.encode_evtf_payload(event), &mut out);
            self.push_digest(&mut out);
        }

        let mut sate_offsets = Vec::with_capacity(satellites.len());
        for name in satellites {
            let system = name.trim().chars().next().unwrap_or(' ');
            let codes = table.codes(system).unwrap_or(&[]);
            let (sate_payload, socd_payloads) =
                self.layout_satellite(name, codes, runs);

            sate_offsets.push((name.clone(), out.len()));
            write_chunk(b"SATE", &sate_payload, &mut out);
            self.push_digest(&mut out);
            for payload in &socd_payloads {
                write_chunk(b"SOCD", payload, &mut out);
                self.push_digest(&mut out);
            }
        }

        write_chunk(
            b"SDIR",
            &self.encode_sdir_payload(epoc_offset, evtf_offset, &sate_offsets),
            &mut out,
        );
        self.push_digest(&mut out);

        if self.file_digest_id != 0 {
            out.resize(out.len() + digest_len(self.file_digest_id), 0);
        }
        out
    }

    fn push_digest(&self, out: &mut Vec<u8>) {
        let len = digest_len(self.chunk_digest_id);
        if len > 0 {
            // Digest computation is out of scope for this version; the
            // slot is reserved so a future pass can fill it without
            // shifting every downstream offset.
            out.resize(out.len() + len, 0);
        }
    }

    fn encode_srnx_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        uleb128_encode(1, &mut out); // major
        uleb128_encode(0, &mut out); // minor
        uleb128_encode(self.chunk_digest_id, &mut out);
        uleb128_encode(self.file_digest_id, &mut out);
        out
    }

    fn encode_evtf_payload(&self, event: &SpecialEvent) -> Vec<u8> {
        let mut out = Vec::new();
        uleb128_encode(event.epoch_index as u64, &mut out);
        out.extend_from_slice(event.text.as_bytes());
        out
    }

    /// Collapses `epochs` into timestamp spans of constant step, then
    /// collapses `clock_offset` into value-run spans over the same epochs.
    fn encode_epoc_payload(&self, epochs: &[Epoch]) -> Vec<u8> {
        let mut out = Vec::new();
        uleb128_encode(epochs.len() as u64, &mut out);

        let mut i = 0;
        while i < epochs.len() {
            if i + 1 == epochs.len() {
                sleb128_encode(0, &mut out);
                uleb128_encode(1, &mut out);
                uleb128_encode(epochs[i].yyyy_mm_dd as u64, &mut out);
                uleb128_encode(packed_time(&epochs[i]), &mut out);
                break;
            }
            let step = epoch_step_e7(&epochs[i], &epochs[i + 1]);
            let mut j = i + 1;
            while j + 1 < epochs.len()
                && epoch_step_e7(&epochs[j], &epochs[j + 1]) == step
                && epochs[j].yyyy_mm_dd == epochs[i].yyyy_mm_dd
            {
                j += 1;
            }
            let span_len = j - i + 1;
            sleb128_encode(-step, &mut out);
            uleb128_encode(span_len as u64, &mut out);
            uleb128_encode(epochs[i].yyyy_mm_dd as u64, &mut out);
            uleb128_encode(packed_time(&epochs[i]), &mut out);
            i = j + 1;
        }

        let mut k = 0;
        while k < epochs.len() {
            let value = epochs[k].clock_offset;
            let mut m = k + 1;
            while m < epochs.len() && epochs[m].clock_offset == value {
                m += 1;
            }
            if value != 0 {
                sleb128_encode(value, &mut out);
                uleb128_encode((m - k) as u64, &mut out);
            }
            k = m;
        }
        out
    }

    fn encode_sdir_payload(
        &self,
        epoc_offset: u64,
        evtf_offset: u64,
        sate_offsets: &[(String, usize)],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        uleb128_encode(epoc_offset, &mut out);
        uleb128_encode(evtf_offset, &mut out);
        for (name, offset) in sate_offsets {
            let mut name_bytes = [0u8; 3];
            for (dst, src) in name_bytes.iter_mut().zip(name.bytes()) {
                *dst = src;
            }
            out.extend_from_slice(&name_bytes);
            uleb128_encode(*offset as u64, &mut out);
        }
        out
    }

    /// Lays out one satellite's `SATE` payload and its `SOCD` children,
    /// resolving the forward sLEB128 offset table by fixed-point
    /// iteration (the `SATE` payload's own size depends on the byte
    /// width of those offsets, which depends on sizes computed after it).
    fn layout_satellite(
        &self,
        name: &str,
        codes: &[String],
        runs: &HashMap<SignalId, SignalRun>,
    ) -> (Vec<u8>, Vec<Vec<u8>>) {
        let socd_payloads: Vec<Option<Vec<u8>>> = codes
            .iter()
            .map(|code| runs.get(&SignalId::new(name, code)).map(|run| encode_socd_payload(name, code, run)))
            .collect();

        let mut offsets = vec![0i64; codes.len()];
        for _ in 0..8 {
            let sate_payload_len =
                3 + offsets.iter().map(|&o| sleb128_len(o)).sum::<usize>();
            let sate_framed = chunk_framed_len(sate_payload_len, self.chunk_digest_id);
            let mut cumulative = sate_framed as i64;
            let mut next_offsets = vec![0i64; codes.len()];
            for (i, payload) in socd_payloads.iter().enumerate() {
                if let Some(p) = payload {
                    next_offsets[i] = cumulative;
                    cumulative += chunk_framed_len(p.len(), self.chunk_digest_id) as i64;
                }
            }
            if next_offsets == offsets {
                break;
            }
            offsets = next_offsets;
        }

        let mut sate_payload = Vec::new();
        let mut name_bytes = [0u8; 3];
        for (dst, src) in name_bytes.iter_mut().zip(name.bytes()) {
            *dst = src;
        }
        sate_payload.extend_from_slice(&name_bytes);
        for &offset in &offsets {
            sleb128_encode(offset, &mut sate_payload);
        }

        let socd_payloads: Vec<Vec<u8>> = socd_payloads.into_iter().flatten().collect();
        (sate_payload, socd_payloads)
    }
}

fn chunk_framed_len(payload_len: usize, digest_id: u64) -> usize {
    4 + uleb128_len(payload_len as u64) + payload_len + digest_len(digest_id)
}

fn packed_time(epoch: &Epoch) -> u64 {
    epoch.hh_mm as u64 * 1_000_000_000 + epoch.sec_e7 as u64
}

fn epoch_step_e7(a: &Epoch, b: &Epoch) -> i64 {
    let a_secs = (a.hh_mm as i64) * 60 * 10_000_000 + a.sec_e7 as i64;
    let b_secs = (b.hh_mm as i64) * 60 * 10_000_000 + b.sec_e7 as i64;
    b_secs - a_secs
}

/// Encodes one `(satellite, code)` signal's `SOCD` payload.
fn encode_socd_payload(name: &str, code: &str, run: &SignalRun) -> Vec<u8> {
    let mut out = Vec::new();
    let mut sv_bytes = [0u8; 3];
    for (dst, src) in sv_bytes.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    let mut code_bytes = [0u8; 4];
    for (dst, src) in code_bytes.iter_mut().zip(code.bytes()) {
        *dst = src;
    }
    out.extend_from_slice(&sv_bytes);
    out.extend_from_slice(&code_bytes);
    uleb128_encode(run.len().saturating_sub(1) as u64, &mut out);

    let mut lli_block = Vec::new();
    rle_encode(&run.lli, &mut lli_block);
    uleb128_encode(lli_block.len() as u64, &mut out);
    out.extend_from_slice(&lli_block);

    let mut ssi_block = Vec::new();
    rle_encode(&run.ssi, &mut ssi_block);
    uleb128_encode(ssi_block.len() as u64, &mut out);
    out.extend_from_slice(&ssi_block);

    let body = encode_value_blocks(&run.values);
    uleb128_encode(body.len() as u64, &mut out);
    out.extend_from_slice(&body);
    out
}

/// Splits `values` into maximal zero-runs and maximal uniform-bit-width
/// runs, encoding each as whichever of (zero-run, sLEB128-run, transposed
/// matrix) is cheapest.
fn encode_value_blocks(values: &[i64]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < values.len() {
        if values[i] == 0 {
            let mut j = i + 1;
            while j < values.len() && values[j] == 0 {
                j += 1;
            }
            out.push(0xFE);
            uleb128_encode((j - i) as u64, &mut out);
            i = j;
            continue;
        }
        let mut width = min_bits_for(values[i]);
        let mut j = i + 1;
        while j < values.len() && values[j] != 0 {
            let next_width = width.max(min_bits_for(values[j]));
            if next_width > 32 {
                break;
            }
            width = next_width;
            j += 1;
        }
        encode_nonzero_run(&values[i..j], width, &mut out);
        i = j;
    }
    out
}

fn encode_nonzero_run(run: &[i64], width: usize, out: &mut Vec<u8>) {
    let sleb_cost: usize = 1
        + uleb128_len(run.len() as u64)
        + run.iter().map(|&v| sleb128_len(v)).sum::<usize>();

    let mut best: Option<(usize, usize, usize)> = None;
    for &n in &[8usize, 16, 32] {
        let row_bytes = n / 8;
        let blocks = run.len().div_ceil(n);
        let cost = blocks * (1 + width * row_bytes);
        if best.map(|(c, ..)| cost < c).unwrap_or(true) {
            best = Some((cost, n, width));
        }
    }
    let (transposed_cost, n, k) = best.expect("width table is non-empty");

    if transposed_cost < sleb_cost {
        let width_sel: u8 = match n {
            8 => 0,
            16 => 1,
            32 => 2,
            _ => unreachable!(),
        };
        let mut pos = 0;
        while pos < run.len() {
            let end = (pos + n).min(run.len());
            let mut chunk: Vec<i64> = run[pos..end].to_vec();
            chunk.resize(n, 0);
            let tag = (width_sel << 5) | (k as u8 - 1);
            out.push(tag);
            transpose_pack(&chunk, k, n, out).expect("k in 1..=32, n in {8,16,32}");
            pos = end;
        }
    } else {
        out.push(0xFF);
        uleb128_encode(run.len() as u64, out);
        for &v in run {
            sleb128_encode(v, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EpochFlag, Observation};

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
    fn encodes_zero_run_as_a_single_block() {
        let values = vec![0i64; 10];
        let body = encode_value_blocks(&values);
        assert_eq!(body[0], 0xFE);
    }

    #[test]
    fn encodes_small_values_more_compactly_than_raw_sleb() {
        let values: Vec<i64> = (0..40).map(|i| (i % 3) - 1).collect();
        let body = encode_value_blocks(&values);
        assert!(body.len() < values.len() * 2);
    }

    #[test]
    fn writes_a_full_minimal_container() {
        let mut table = ObservableTable::default();
        table.set('G', vec!["L1".into()]);
        let mut runs = HashMap::new();
        runs.insert(
            SignalId::new("G01", "L1"),
            SignalRun {
                start_epoch: 0,
                values: vec![100, 101, 0],
                lli: vec![b' '; 3],
                ssi: vec![b' '; 3],
            },
        );
        let epochs = vec![epoch(0, 0), epoch(0, 10_000_000), epoch(0, 20_000_000)];
        let header = "     2.11           OBSERVATION DATA    G (GPS)             RINEX VERSION / TYPE\nEND OF HEADER";
        let out = SrnxWriter::new().write(header, &epochs, &[], &["G01".to_string()], &table, &runs);
        assert_eq!(&out[0..4], b"SRNX");
        assert!(out.windows(4).any(|w| w == b"RHDR"));
        assert!(out.windows(4).any(|w| w == b"SOCD"));
    }

    #[test]
    fn observation_default_is_parse_error_sentinel() {
        assert_eq!(Observation::default().value, crate::model::OBS_PARSE_ERROR);
    }
}

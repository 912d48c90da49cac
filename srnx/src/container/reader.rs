//! Random-access reader over an SRNX container: chunk navigation,
//! epoch-span expansion, and per-signal observation streaming.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use super::chunk;
use crate::codec::leb128::{sleb128_decode, uleb128_decode};
use crate::codec::rle::rle_decode;
use crate::codec::transpose::transpose;
use crate::error::SrnxError;
use crate::model::{Epoch, EpochFlag, ObservableTable, SignalId};
use crate::parser::{header, Version};

pub struct SatelliteEntry {
    pub name: String,
    /// Byte offset of the satellite's `SATE` chunk.
    pub offset: usize,
}

pub struct SrnxReader {
    data: Mmap,
    chunk_digest_id: u64,
    #[allow(dead_code)]
    file_digest_id: u64,
    version: Version,
    table: ObservableTable,
    rhdr_offset: usize,
    body_start: usize,
    epoc_offset: Option<usize>,
    sdir_offset: Option<usize>,
    sdir_scanned: bool,
}

impl SrnxReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SrnxError> {
        let file = File::open(path)?;
        // SAFETY: read-only for the lifetime of this reader; file is
        // not expected to be concurrently truncated.
        let data = unsafe { Mmap::map(&file)? };

        let (tag, payload, next) = chunk::read_chunk(&data, 0)?;
        if &tag != b"SRNX" {
            return Err(SrnxError::NotSrnx);
        }
        let mut cur = payload;
        let major = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
            detail: "truncated SRNX header payload",
        })?;
        if major != 1 {
            return Err(SrnxError::BadMajor { found: major });
        }
        let _minor = uleb128_decode(&mut cur).unwrap_or(0);
        let chunk_digest_id = uleb128_decode(&mut cur).unwrap_or(0);
        let file_digest_id = uleb128_decode(&mut cur).unwrap_or(0);

        let rhdr_pos = next + chunk::digest_len(chunk_digest_id);
        let (rhdr_tag, rhdr_payload, rhdr_next) = chunk::read_chunk(&data, rhdr_pos)?;
        if &rhdr_tag != b"RHDR" {
            return Err(SrnxError::Corrupt {
                detail: "expected RHDR as the second chunk",
            });
        }
        let text = std::str::from_utf8(rhdr_payload).map_err(|_| SrnxError::Corrupt {
            detail: "RHDR payload is not valid UTF-8",
        })?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let first = lines.first().ok_or(SrnxError::Corrupt {
            detail: "RHDR payload is empty",
        })?;
        if header::label(first) != "RINEX VERSION / TYPE" {
            return Err(SrnxError::Corrupt {
                detail: "RHDR payload missing version/type line",
            });
        }
        let (version, _) = header::parse_version_type(first).map_err(|_| SrnxError::Corrupt {
            detail: "RHDR version/type line is malformed",
        })?;
        let v2_system = header::v2_system_letter(first);
        let table = header::build_observable_table(&lines, version, v2_system)
            .map_err(|_| SrnxError::Corrupt {
                detail: "RHDR observation-code table is malformed",
            })?;

        Ok(Self {
            data,
            chunk_digest_id,
            file_digest_id,
            version,
            table,
            rhdr_offset: rhdr_pos,
            body_start: rhdr_next + chunk::digest_len(chunk_digest_id),
            epoc_offset: None,
            sdir_offset: None,
            sdir_scanned: false,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn observable_table(&self) -> &ObservableTable {
        &self.table
    }

    /// The normalized RINEX header text, byte-for-byte as stored.
    pub fn header(&self) -> &[u8] {
        let (_, payload, _) =
            chunk::read_chunk(&self.data, self.rhdr_offset).expect("validated at open()");
        payload
    }

    fn digest_len(&self) -> usize {
        chunk::digest_len(self.chunk_digest_id)
    }

    /// Scans forward from `pos`, chunk by chunk, until `tag` is found or
    /// the file is exhausted.
    fn scan_for(&self, tag: &[u8; 4], mut pos: usize) -> Option<(usize, usize)> {
        loop {
            if pos >= self.data.len() {
                return None;
            }
            let (found, payload, next) = chunk::read_chunk(&self.data, pos).ok()?;
            let advance_to = next + self.digest_len();
            if &found == tag {
                return Some((pos, payload.len()));
            }
            pos = advance_to;
        }
    }

    fn locate_epoc(&mut self) -> Result<usize, SrnxError> {
        if let Some(pos) = self.epoc_offset {
            return Ok(pos);
        }
        #[cfg(feature = "log")]
        log::debug!("EPOC offset unknown, scanning from body start");
        let (pos, _) = self
            .scan_for(b"EPOC", self.body_start)
            .ok_or(SrnxError::Corrupt {
                detail: "no EPOC chunk found",
            })?;
        self.epoc_offset = Some(pos);
        Ok(pos)
    }

    fn locate_sdir(&mut self) -> Option<usize> {
        if self.sdir_scanned {
            return self.sdir_offset;
        }
        self.sdir_scanned = true;
        #[cfg(feature = "log")]
        log::debug!("SDIR offset unknown, scanning from body start");
        self.sdir_offset = self.scan_for(b"SDIR", self.body_start).map(|(pos, _)| pos);
        self.sdir_offset
    }

    /// Decodes the full epoch table: timestamp spans expanded into
    /// individual epochs, then clock-offset spans applied on top.
    pub fn epochs(&mut self) -> Result<Vec<Epoch>, SrnxError> {
        let pos = self.locate_epoc()?;
        let (_, payload, _) = chunk::read_chunk(&self.data, pos)?;
        let mut cur = payload;
        let total = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
            detail: "truncated EPOC total count",
        })? as usize;

        let mut epochs: Vec<Epoch> = Vec::with_capacity(total);
        while epochs.len() < total {
            let delta = sleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                detail: "truncated EPOC timestamp span",
            })?;
            let len = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                detail: "truncated EPOC span length",
            })?;
            let date = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                detail: "truncated EPOC span date",
            })?;
            let packed_time = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                detail: "truncated EPOC span time",
            })?;
            let step_e7 = -delta;

            let mut epoch = Epoch {
                yyyy_mm_dd: date as u32,
                hh_mm: (packed_time / 1_000_000_000) as u16,
                sec_e7: (packed_time % 1_000_000_000) as u32,
                flag: EpochFlag::Ok,
                n_sats: 0,
                clock_offset: 0,
            };
            for i in 0..len {
                if i > 0 {
                    epoch.advance_e7(step_e7);
                }
                epochs.push(epoch);
                if epochs.len() >= total {
                    break;
                }
            }
        }

        let mut idx = 0usize;
        while !cur.is_empty() && idx < epochs.len() {
            let value = match sleb128_decode(&mut cur) {
                Ok(v) => v,
                Err(_) => break,
            };
            let length = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                detail: "truncated EPOC clock-offset span",
            })?;
            for _ in 0..length {
                if idx >= epochs.len() {
                    break;
                }
                epochs[idx].clock_offset = value;
                idx += 1;
            }
        }
        Ok(epochs)
    }

    /// Finds the next `EVTF` chunk at or after `after`, returning the
    /// epoch index it precedes, its raw text, and the offset just past it.
    pub fn next_special_event(
        &self,
        after: usize,
    ) -> Result<Option<(usize, String, usize)>, SrnxError> {
        let mut pos = after.max(self.body_start);
        loop {
            if pos >= self.data.len() {
                return Ok(None);
            }
            let (tag, payload, next) = match chunk::read_chunk(&self.data, pos) {
                Ok(v) => v,
                Err(_) => return Ok(None),
            };
            let advance_to = next + self.digest_len();
            if &tag == b"EVTF" {
                let mut cur = payload;
                let idx = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                    detail: "truncated EVTF epoch index",
                })? as usize;
                let text = String::from_utf8_lossy(cur).to_string();
                return Ok(Some((idx, text, advance_to)));
            }
            pos = advance_to;
        }
    }

    /// Satellite names and their `SATE` chunk offsets, via `SDIR` when
    /// present, otherwise a forward linear scan.
    pub fn satellites(&mut self) -> Result<Vec<SatelliteEntry>, SrnxError> {
        if let Some(sdir_pos) = self.locate_sdir() {
            let (_, payload, _) = chunk::read_chunk(&self.data, sdir_pos)?;
            let mut cur = payload;
            let _epoc = uleb128_decode(&mut cur).unwrap_or(0);
            let _evtf = uleb128_decode(&mut cur).unwrap_or(0);
            let mut out = Vec::new();
            while cur.len() >= 3 {
                let name = String::from_utf8_lossy(&cur[..3]).trim_end_matches('\0').to_string();
                cur = &cur[3..];
                let offset = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                    detail: "truncated SDIR entry",
                })? as usize;
                out.push(SatelliteEntry { name, offset });
            }
            return Ok(out);
        }

        let mut out = Vec::new();
        let mut pos = self.body_start;
        loop {
            let (tag, payload, next) = match chunk::read_chunk(&self.data, pos) {
                Ok(v) => v,
                Err(_) => break,
            };
            if &tag == b"SATE" {
                if payload.len() < 3 {
                    return Err(SrnxError::Corrupt {
                        detail: "SATE payload shorter than a satellite name",
                    });
                }
                let name = String::from_utf8_lossy(&payload[..3]).trim_end_matches('\0').to_string();
                out.push(SatelliteEntry { name, offset: pos });
            }
            pos = next + self.digest_len();
            if pos >= self.data.len() {
                break;
            }
        }
        Ok(out)
    }

    /// Locates and opens the `SOCD` stream for `(name, code)`.
    pub fn find_socd(&mut self, name: &str, code: &str) -> Result<SocdReader<'_>, SrnxError> {
        let system = name.trim().chars().next().unwrap_or('G');
        let codes = self
            .table
            .codes(system)
            .ok_or(SrnxError::UnknownSystem(system))?;
        let code_idx = codes
            .iter()
            .position(|c| c == code)
            .ok_or_else(|| SrnxError::UnknownCode(code.to_string()))?;

        let entry = self
            .satellites()?
            .into_iter()
            .find(|e| e.name == name.trim())
            .ok_or_else(|| SrnxError::UnknownSatellite(name.to_string()))?;

        let (_, sate_payload, _) = chunk::read_chunk(&self.data, entry.offset)?;
        if sate_payload.len() < 3 {
            return Err(SrnxError::Corrupt {
                detail: "SATE payload shorter than a satellite name",
            });
        }
        let mut cur = &sate_payload[3..];
        let mut offset = 0i64;
        for i in 0..=code_idx {
            let decoded = sleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
                detail: "truncated SATE offset table",
            })?;
            if i == code_idx {
                offset = decoded;
            }
        }
        if offset == 0 {
            return Err(SrnxError::UnknownCode(code.to_string()));
        }
        let socd_pos = (entry.offset as i64 + offset) as usize;
        let (tag, payload, _) = chunk::read_chunk(&self.data, socd_pos)?;
        if &tag != b"SOCD" {
            return Err(SrnxError::Corrupt {
                detail: "SATE offset does not address a SOCD chunk",
            });
        }
        let expected = SignalId::new(name, code);
        if payload.len() < 7 || payload[..3] != expected.sv || payload[3..7] != expected.code {
            return Err(SrnxError::Corrupt {
                detail: "SOCD name/code prefix mismatch",
            });
        }
        SocdReader::new(payload)
    }
}

/// Streams decoded values for one `(satellite, observation code)` pair
/// out of a `SOCD` chunk's payload.
pub struct SocdReader<'a> {
    blocks: &'a [u8],
    pub lli: Vec<u8>,
    pub ssi: Vec<u8>,
    count: usize,
    produced: usize,
    pending: VecDeque<i64>,
}

impl<'a> SocdReader<'a> {
    fn new(payload: &'a [u8]) -> Result<Self, SrnxError> {
        let mut cur = &payload[7..];
        let n_minus_1 = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
            detail: "truncated SOCD value count",
        })?;
        let count = n_minus_1 as usize + 1;

        let lli_len = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
            detail: "truncated SOCD LLI block length",
        })? as usize;
        if cur.len() < lli_len {
            return Err(SrnxError::Corrupt {
                detail: "SOCD LLI block runs past payload",
            });
        }
        let (lli_block, rest) = cur.split_at(lli_len);
        let lli = rle_decode(lli_block, count).map_err(|_| SrnxError::Corrupt {
            detail: "malformed SOCD LLI RLE block",
        })?;
        cur = rest;

        let ssi_len = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
            detail: "truncated SOCD SSI block length",
        })? as usize;
        if cur.len() < ssi_len {
            return Err(SrnxError::Corrupt {
                detail: "SOCD SSI block runs past payload",
            });
        }
        let (ssi_block, rest) = cur.split_at(ssi_len);
        let ssi = rle_decode(ssi_block, count).map_err(|_| SrnxError::Corrupt {
            detail: "malformed SOCD SSI RLE block",
        })?;
        cur = rest;

        let body_len = uleb128_decode(&mut cur).map_err(|_| SrnxError::Corrupt {
            detail: "truncated SOCD body length",
        })? as usize;
        if cur.len() < body_len {
            return Err(SrnxError::Corrupt {
                detail: "SOCD body runs past payload",
            });
        }
        let (blocks, _) = cur.split_at(body_len);

        Ok(Self {
            blocks,
            lli,
            ssi,
            count,
            produced: 0,
            pending: VecDeque::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reads the next decoded observation value.
    pub fn read_obs_value(&mut self) -> Result<i64, SrnxError> {
        if self.produced >= self.count {
            return Err(SrnxError::EndOfData);
        }
        if self.pending.is_empty() {
            self.decode_next_block()?;
        }
        let value = self.pending.pop_front().ok_or(SrnxError::Corrupt {
            detail: "SOCD block decoded no values",
        })?;
        self.produced += 1;
        Ok(value)
    }

    /// Reads every remaining value, alongside the already-decoded LLI/SSI arrays.
    pub fn read_all(&mut self) -> Result<(Vec<i64>, Vec<u8>, Vec<u8>), SrnxError> {
        let mut values = Vec::with_capacity(self.count - self.produced);
        while self.produced < self.count {
            values.push(self.read_obs_value()?);
        }
        Ok((values, self.lli.clone(), self.ssi.clone()))
    }

    fn decode_next_block(&mut self) -> Result<(), SrnxError> {
        let tag = *self.blocks.first().ok_or(SrnxError::Corrupt {
            detail: "SOCD body exhausted before all values were produced",
        })?;
        self.blocks = &self.blocks[1..];
        match tag {
            0xFE => {
                let count = uleb128_decode(&mut self.blocks).map_err(|_| SrnxError::Corrupt {
                    detail: "truncated zero-run block",
                })?;
                for _ in 0..count {
                    self.pending.push_back(0);
                }
            },
            0xFF => {
                let count = uleb128_decode(&mut self.blocks).map_err(|_| SrnxError::Corrupt {
                    detail: "truncated sLEB128-run block",
                })?;
                for _ in 0..count {
                    let value = sleb128_decode(&mut self.blocks).map_err(|_| SrnxError::Corrupt {
                        detail: "truncated sLEB128-run value",
                    })?;
                    self.pending.push_back(value);
                }
            },
            _ => {
                let width_sel = tag >> 5;
                if width_sel > 2 {
                    return Err(SrnxError::Corrupt {
                        detail: "transposed block width exceeds 32 columns",
                    });
                }
                let n = 8usize << width_sel;
                let k = (tag & 0x1F) as usize + 1;
                let row_bytes = n / 8;
                let needed = k * row_bytes;
                if self.blocks.len() < needed {
                    return Err(SrnxError::Corrupt {
                        detail: "truncated transposed block",
                    });
                }
                let (matrix, rest) = self.blocks.split_at(needed);
                self.blocks = rest;
                let values = transpose(matrix, k, n).map_err(|_| SrnxError::Corrupt {
                    detail: "malformed transposed block",
                })?;
                self.pending.extend(values);
            },
        }
        Ok(())
    }
}

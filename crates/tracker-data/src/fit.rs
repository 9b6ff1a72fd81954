//! Minimal decoder for binary FIT activity files.
//!
//! Only the messages an activity summary needs are interpreted: `file_id`
//! (creation time), `session` (sport, start time, totals, heart rate) and
//! `record` (timestamped distance / heart-rate samples). Every other message
//! is decoded structurally and discarded. The header and the trailing file
//! CRC are validated.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;
use tracker_core::error::ExtractionError;
use tracker_core::models::ActivityType;
use tracker_core::time_utils::from_fit_timestamp;

use crate::metrics::{PartialMetrics, Sample};

// ── Protocol constants ────────────────────────────────────────────────────────

const SIGNATURE: &[u8; 4] = b".FIT";

const MESG_FILE_ID: u16 = 0;
const MESG_SESSION: u16 = 18;
const MESG_RECORD: u16 = 20;

const FIELD_TIMESTAMP: u8 = 253;

// file_id
const FILE_ID_TIME_CREATED: u8 = 4;

// session
const SESSION_START_TIME: u8 = 2;
const SESSION_SPORT: u8 = 5;
const SESSION_TOTAL_ELAPSED_TIME: u8 = 7;
const SESSION_TOTAL_TIMER_TIME: u8 = 8;
const SESSION_TOTAL_DISTANCE: u8 = 9;
const SESSION_AVG_HEART_RATE: u8 = 16;
const SESSION_MAX_HEART_RATE: u8 = 17;

// record
const RECORD_HEART_RATE: u8 = 3;
const RECORD_DISTANCE: u8 = 5;

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Ways a FIT byte stream can be malformed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FitError {
    #[error("file is too short for a FIT header")]
    TooShort,
    #[error("unsupported header size {0}")]
    BadHeaderSize(u8),
    #[error("missing .FIT signature")]
    BadSignature,
    #[error("data size {declared} exceeds file length {available}")]
    Truncated { declared: usize, available: usize },
    #[error("CRC mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    CrcMismatch { stored: u16, computed: u16 },
    #[error("unexpected end of data at offset {0}")]
    UnexpectedEnd(usize),
    #[error("data message for undefined local type {0}")]
    UndefinedLocalType(u8),
}

/// FIT CRC-16 over `bytes`, starting from `crc`.
pub fn crc16(mut crc: u16, bytes: &[u8]) -> u16 {
    for &byte in bytes {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[(byte & 0xF) as usize];
        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize];
    }
    crc
}

// ── Decoded output ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitSession {
    pub sport: Option<u8>,
    pub start_time: Option<DateTime<Utc>>,
    pub total_elapsed_seconds: Option<f64>,
    pub total_timer_seconds: Option<f64>,
    pub total_distance_meters: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
}

impl FitSession {
    /// Moving time when recorded, elapsed time otherwise.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.total_timer_seconds.or(self.total_elapsed_seconds)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitRecord {
    pub timestamp: Option<u32>,
    pub distance_meters: Option<f64>,
    pub heart_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitActivity {
    pub time_created: Option<DateTime<Utc>>,
    pub sessions: Vec<FitSession>,
    pub records: Vec<FitRecord>,
}

impl FitActivity {
    /// Collapse the decoded messages into activity metrics.
    ///
    /// Multi-session files (e.g. multisport) are summed; heart rate is
    /// averaged weighted by session duration.
    pub fn to_metrics(&self) -> PartialMetrics {
        let mut metrics = PartialMetrics {
            activity_type: self
                .sessions
                .iter()
                .find_map(|s| s.sport)
                .map(ActivityType::from_fit_sport),
            start_time: self.sessions.iter().filter_map(|s| s.start_time).min(),
            ..Default::default()
        };

        if !self.sessions.is_empty() {
            metrics.duration_seconds = sum_present(self.sessions.iter().map(|s| s.duration_seconds()));
            metrics.distance_meters =
                sum_present(self.sessions.iter().map(|s| s.total_distance_meters));

            let weighted: Vec<(f64, f64)> = self
                .sessions
                .iter()
                .filter_map(|s| Some((s.avg_heart_rate?, s.duration_seconds().unwrap_or(0.0))))
                .collect();
            let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
            metrics.average_heart_rate = if weighted.is_empty() {
                None
            } else if total_weight > 0.0 {
                Some(weighted.iter().map(|(hr, w)| hr * w).sum::<f64>() / total_weight)
            } else {
                Some(weighted.iter().map(|(hr, _)| hr).sum::<f64>() / weighted.len() as f64)
            };
            metrics.max_heart_rate = self
                .sessions
                .iter()
                .filter_map(|s| s.max_heart_rate)
                .reduce(f64::max);
        }

        let origin = metrics
            .start_time
            .map(|t| t.timestamp())
            .or_else(|| {
                self.records
                    .iter()
                    .find_map(|r| r.timestamp)
                    .and_then(from_fit_timestamp)
                    .map(|t| t.timestamp())
            });
        metrics.samples = self
            .records
            .iter()
            .map(|r| Sample {
                elapsed_seconds: match (r.timestamp.and_then(from_fit_timestamp), origin) {
                    (Some(t), Some(o)) => Some((t.timestamp() - o) as f64),
                    _ => None,
                },
                distance_meters: r.distance_meters,
                heart_rate: r.heart_rate,
            })
            .collect();

        if metrics.start_time.is_none() {
            metrics.start_time = self
                .records
                .iter()
                .find_map(|r| r.timestamp)
                .and_then(from_fit_timestamp)
                .or(self.time_created);
        }

        metrics.fill_from_samples();
        metrics
    }
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

// ── Decoding ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct FieldDef {
    number: u8,
    size: u8,
    base_type: u8,
}

#[derive(Debug, Clone)]
struct Definition {
    big_endian: bool,
    global: u16,
    fields: Vec<FieldDef>,
    developer_bytes: usize,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Absolute offset of `buf[0]` in the file, for error messages.
    base: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FitError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(FitError::UnexpectedEnd(self.base + self.pos))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, FitError> {
        Ok(self.take(1)?[0])
    }

    fn is_done(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

/// Read an unsigned integer field, mapping the FIT "invalid" sentinel to
/// `None`. Non-integer base types yield `None`.
fn read_unsigned(bytes: &[u8], base_type: u8, big_endian: bool) -> Option<u64> {
    let base = base_type & 0x1F;
    // enum, uint8, uint16, uint32, uint8z, uint16z, uint32z, uint64, uint64z
    if !matches!(base, 0x00 | 0x02 | 0x04 | 0x06 | 0x0A | 0x0B | 0x0C | 0x0F | 0x10) {
        return None;
    }
    if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
        return None;
    }
    let mut value: u64 = 0;
    if big_endian {
        for &b in bytes {
            value = (value << 8) | u64::from(b);
        }
    } else {
        for &b in bytes.iter().rev() {
            value = (value << 8) | u64::from(b);
        }
    }
    let is_z = matches!(base, 0x0A | 0x0B | 0x0C | 0x10);
    let all_ones = if bytes.len() == 8 {
        u64::MAX
    } else {
        (1u64 << (bytes.len() * 8)) - 1
    };
    if (is_z && value == 0) || (!is_z && value == all_ones) {
        None
    } else {
        Some(value)
    }
}

fn as_u32(v: u64) -> Option<u32> {
    u32::try_from(v).ok()
}

/// Decode a complete FIT file held in memory.
pub fn decode(bytes: &[u8]) -> Result<FitActivity, FitError> {
    let header_size = *bytes.first().ok_or(FitError::TooShort)?;
    if header_size != 12 && header_size != 14 {
        return Err(FitError::BadHeaderSize(header_size));
    }
    let header_size = header_size as usize;
    if bytes.len() < header_size {
        return Err(FitError::TooShort);
    }
    if &bytes[8..12] != SIGNATURE {
        return Err(FitError::BadSignature);
    }

    let data_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let data_end = header_size + data_size;
    if data_end + 2 > bytes.len() {
        return Err(FitError::Truncated {
            declared: data_size,
            available: bytes.len().saturating_sub(header_size + 2),
        });
    }

    let stored = u16::from_le_bytes([bytes[data_end], bytes[data_end + 1]]);
    let computed = crc16(0, &bytes[..data_end]);
    if stored != computed {
        return Err(FitError::CrcMismatch { stored, computed });
    }

    decode_records(&bytes[header_size..data_end], header_size)
}

fn decode_records(data: &[u8], base: usize) -> Result<FitActivity, FitError> {
    let mut cursor = Cursor { buf: data, pos: 0, base };
    let mut definitions: [Option<Definition>; 16] = Default::default();
    let mut activity = FitActivity::default();
    let mut last_timestamp: Option<u32> = None;

    while !cursor.is_done() {
        let header = cursor.u8()?;

        let (local, compressed_offset) = if header & 0x80 != 0 {
            ((header >> 5) & 0x03, Some(u32::from(header & 0x1F)))
        } else if header & 0x40 != 0 {
            let local = header & 0x0F;
            let developer = header & 0x20 != 0;
            definitions[local as usize] = Some(read_definition(&mut cursor, developer)?);
            continue;
        } else {
            (header & 0x0F, None)
        };

        let def = definitions[local as usize]
            .as_ref()
            .ok_or(FitError::UndefinedLocalType(local))?;

        let mut values: Vec<(u8, Option<u64>)> = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let raw = cursor.take(field.size as usize)?;
            values.push((field.number, read_unsigned(raw, field.base_type, def.big_endian)));
        }
        cursor.take(def.developer_bytes)?;

        let field = |num: u8| values.iter().find(|(n, _)| *n == num).and_then(|(_, v)| *v);

        let timestamp = match (field(FIELD_TIMESTAMP).and_then(as_u32), compressed_offset) {
            (Some(ts), _) => Some(ts),
            (None, Some(offset)) => last_timestamp.map(|last| {
                let rolled = (offset.wrapping_sub(last)) & 0x1F;
                last.wrapping_add(rolled)
            }),
            (None, None) => None,
        };
        if timestamp.is_some() {
            last_timestamp = timestamp;
        }

        match def.global {
            MESG_FILE_ID => {
                activity.time_created = field(FILE_ID_TIME_CREATED)
                    .and_then(as_u32)
                    .and_then(from_fit_timestamp);
            }
            MESG_SESSION => {
                activity.sessions.push(FitSession {
                    sport: field(SESSION_SPORT).and_then(|v| u8::try_from(v).ok()),
                    start_time: field(SESSION_START_TIME)
                        .and_then(as_u32)
                        .and_then(from_fit_timestamp),
                    total_elapsed_seconds: field(SESSION_TOTAL_ELAPSED_TIME)
                        .map(|v| v as f64 / 1000.0),
                    total_timer_seconds: field(SESSION_TOTAL_TIMER_TIME).map(|v| v as f64 / 1000.0),
                    total_distance_meters: field(SESSION_TOTAL_DISTANCE).map(|v| v as f64 / 100.0),
                    avg_heart_rate: field(SESSION_AVG_HEART_RATE).map(|v| v as f64),
                    max_heart_rate: field(SESSION_MAX_HEART_RATE).map(|v| v as f64),
                });
            }
            MESG_RECORD => {
                activity.records.push(FitRecord {
                    timestamp,
                    distance_meters: field(RECORD_DISTANCE).map(|v| v as f64 / 100.0),
                    heart_rate: field(RECORD_HEART_RATE).map(|v| v as f64),
                });
            }
            _ => {}
        }
    }

    debug!(
        "FIT: {} sessions, {} records",
        activity.sessions.len(),
        activity.records.len()
    );
    Ok(activity)
}

fn read_definition(cursor: &mut Cursor<'_>, developer: bool) -> Result<Definition, FitError> {
    let _reserved = cursor.u8()?;
    let big_endian = cursor.u8()? == 1;
    let global_bytes = cursor.take(2)?;
    let global = if big_endian {
        u16::from_be_bytes([global_bytes[0], global_bytes[1]])
    } else {
        u16::from_le_bytes([global_bytes[0], global_bytes[1]])
    };
    let num_fields = cursor.u8()?;
    let mut fields = Vec::with_capacity(num_fields as usize);
    for _ in 0..num_fields {
        let raw = cursor.take(3)?;
        fields.push(FieldDef {
            number: raw[0],
            size: raw[1],
            base_type: raw[2],
        });
    }
    let mut developer_bytes = 0usize;
    if developer {
        let num_dev = cursor.u8()?;
        for _ in 0..num_dev {
            let raw = cursor.take(3)?;
            developer_bytes += raw[1] as usize;
        }
    }
    Ok(Definition {
        big_endian,
        global,
        fields,
        developer_bytes,
    })
}

/// Read and decode `path` into activity metrics.
///
/// The whole file is read into memory and the handle released before decoding.
pub fn read_fit_file(path: &Path) -> Result<PartialMetrics, ExtractionError> {
    let bytes = std::fs::read(path).map_err(|source| ExtractionError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let activity = decode(&bytes).map_err(|e| ExtractionError::CorruptFit {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(activity.to_metrics())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

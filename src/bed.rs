//! Streaming parser for scored track files (bedGraph-style).
//!
//! Each data line is `chrom\tstart\tend\tvalue`, 0-based half-open.
//! The value column may carry a missing marker (`NA`, `NaN`, `nan`, or
//! `.`), which parses to [`ScoredInterval::missing`].

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use memchr::memchr;
use thiserror::Error;

use crate::track::{Dataset, ScoredInterval};

/// Errors that can occur while reading track or genome files.
#[derive(Error, Debug)]
pub enum BedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid track format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, BedError>;

/// Fast u64 parsing - no allocation, no error formatting.
#[inline(always)]
fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.wrapping_mul(10).wrapping_add(d as u64);
    }
    Some(n)
}

/// Tokens accepted as a missing value in the score column.
#[inline]
fn is_missing_token(bytes: &[u8]) -> bool {
    matches!(bytes, b"NA" | b"NaN" | b"nan" | b".")
}

/// Parse one track line using memchr - zero allocation.
///
/// Returns (chrom_bytes, start, end, value) or None if the line does not
/// have four well-formed fields. Extra trailing fields are ignored.
#[inline(always)]
pub fn parse_track_bytes(line: &[u8]) -> Option<(&[u8], u64, u64, Option<f64>)> {
    let tab1 = memchr(b'\t', line)?;
    let chrom = &line[..tab1];

    let rest1 = &line[tab1 + 1..];
    let tab2 = memchr(b'\t', rest1)?;
    let start = parse_u64_fast(&rest1[..tab2])?;

    let rest2 = &rest1[tab2 + 1..];
    let tab3 = memchr(b'\t', rest2)?;
    let end = parse_u64_fast(&rest2[..tab3])?;

    let rest3 = &rest2[tab3 + 1..];
    let value_len = memchr(b'\t', rest3).unwrap_or(rest3.len());
    let value_bytes = &rest3[..value_len];

    let value = if is_missing_token(value_bytes) {
        None
    } else {
        let s = std::str::from_utf8(value_bytes).ok()?;
        Some(s.parse::<f64>().ok()?)
    };

    Some((chrom, start, end, value))
}

/// A streaming scored-track reader.
pub struct TrackReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl TrackReader<File> {
    /// Open a track file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> TrackReader<R> {
    /// Create a new track reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next scored interval.
    pub fn read_record(&mut self) -> Result<Option<ScoredInterval>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            // Skip empty lines and comments
            let line = self.buffer.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    /// Parse a single track line, with field-level errors on failure.
    fn parse_line(&self, line: &str) -> Result<ScoredInterval> {
        if let Some((chrom, start, end, value)) = parse_track_bytes(line.as_bytes()) {
            if start > end {
                return Err(BedError::Parse {
                    line: self.line_number,
                    message: format!("Start ({}) > end ({})", start, end),
                });
            }
            // Field boundaries are tabs, so the chrom bytes stay valid UTF-8
            let chrom = String::from_utf8_lossy(chrom).into_owned();
            return Ok(ScoredInterval {
                chrom,
                start,
                end,
                value,
            });
        }

        // Slow path: work out which field was bad for the error message.
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(BedError::Parse {
                line: self.line_number,
                message: format!("Expected at least 4 fields, got {}", fields.len()),
            });
        }
        for (field, name) in [(fields[1], "start"), (fields[2], "end")] {
            if field.parse::<u64>().is_err() {
                return Err(BedError::Parse {
                    line: self.line_number,
                    message: format!("Invalid {} position: '{}'", name, field),
                });
            }
        }
        Err(BedError::Parse {
            line: self.line_number,
            message: format!("Invalid value: '{}'", fields[3]),
        })
    }

    /// Get an iterator over all records.
    pub fn records(self) -> TrackRecordIter<R> {
        TrackRecordIter { reader: self }
    }
}

/// Iterator over scored intervals.
pub struct TrackRecordIter<R: Read> {
    reader: TrackReader<R>,
}

impl<R: Read> Iterator for TrackRecordIter<R> {
    type Item = Result<ScoredInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read all scored intervals from a track file.
pub fn read_track<P: AsRef<Path>>(path: P) -> Result<Vec<ScoredInterval>> {
    let reader = TrackReader::from_path(path)?;
    reader.records().collect()
}

/// Read a track file as a named dataset.
pub fn read_dataset<P: AsRef<Path>>(path: P, name: impl Into<String>) -> Result<Dataset> {
    Ok(Dataset::new(name.into(), read_track(path)?))
}

/// Parse scored intervals from a string (useful for testing).
pub fn parse_track(content: &str) -> Result<Vec<ScoredInterval>> {
    let reader = TrackReader::new(content.as_bytes());
    reader.records().collect()
}

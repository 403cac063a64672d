//! Uniform fixed-width bin lattice over a reference genome.
//!
//! The lattice is the aggregation target: every sequence is tiled with
//! bins of one configured width, in the caller-supplied sequence order,
//! and each bin gets a single ascending global index across the whole
//! genome. The final bin of a sequence keeps the full width even when it
//! extends past the sequence end; downstream consumers expect that
//! overflow bin rather than a clipped one.

use std::fmt;
use std::ops::Range;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::bed::BedError;
use crate::genome::{Genome, Sequence};

/// Errors produced by the binning engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("bin width must be positive")]
    InvalidBinWidth,

    #[error("unknown sequence: {0}")]
    UnknownSequence(String),

    #[error("duplicate dataset name: {0}")]
    DuplicateDataset(String),

    #[error("track error: {0}")]
    Track(#[from] BedError),
}

/// One fixed-width bin. 0-based, half-open: covers [start, start + width).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    pub chrom: String,
    pub start: u64,
    pub width: u64,
    /// Global index across the concatenated per-sequence lattices.
    pub index: usize,
}

impl Bin {
    /// Exclusive end coordinate. May exceed the sequence length for the
    /// last bin of a sequence.
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.width
    }

    /// Half-open overlap test against a span on the same chromosome.
    #[inline]
    pub fn overlaps_span(&self, start: u64, end: u64) -> bool {
        start < self.end() && end > self.start
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end())
    }
}

/// The ordered bin lattice for a genome, with per-chromosome spans.
/// Built once per run; immutable afterwards and safe to share across
/// threads.
#[derive(Debug, Clone)]
pub struct BinLattice {
    bins: Vec<Bin>,
    bin_width: u64,
    spans: Vec<(String, Range<usize>)>,
    span_index: FxHashMap<String, usize>,
}

impl BinLattice {
    /// Tile every sequence of the genome, in genome order.
    pub fn generate(genome: &Genome, bin_width: u64) -> Result<Self, EngineError> {
        Self::build(genome.sequences().iter(), bin_width)
    }

    /// Tile an explicit, ordered subset of sequences. The given order
    /// fixes the global bin index order.
    pub fn generate_for<S: AsRef<str>>(
        genome: &Genome,
        names: &[S],
        bin_width: u64,
    ) -> Result<Self, EngineError> {
        let seqs: Vec<&Sequence> = names
            .iter()
            .map(|name| {
                genome
                    .get(name.as_ref())
                    .ok_or_else(|| EngineError::UnknownSequence(name.as_ref().to_string()))
            })
            .collect::<Result<_, _>>()?;
        Self::build(seqs.into_iter(), bin_width)
    }

    fn build<'a, I>(seqs: I, bin_width: u64) -> Result<Self, EngineError>
    where
        I: Iterator<Item = &'a Sequence>,
    {
        if bin_width == 0 {
            return Err(EngineError::InvalidBinWidth);
        }

        let mut bins = Vec::new();
        let mut spans = Vec::new();
        let mut span_index = FxHashMap::default();

        for seq in seqs {
            let span_start = bins.len();
            let mut start = 0;
            while start < seq.length {
                bins.push(Bin {
                    chrom: seq.name.clone(),
                    start,
                    width: bin_width,
                    index: bins.len(),
                });
                start += bin_width;
            }
            span_index.insert(seq.name.clone(), spans.len());
            spans.push((seq.name.clone(), span_start..bins.len()));
        }

        Ok(Self {
            bins,
            bin_width,
            spans,
            span_index,
        })
    }

    /// All bins in global index order.
    #[inline]
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// The configured bin width.
    #[inline]
    pub fn bin_width(&self) -> u64 {
        self.bin_width
    }

    /// Total number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Check if the lattice has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Chromosome names in lattice order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().map(|(name, _)| name.as_str())
    }

    /// Check if a chromosome is part of the lattice.
    #[inline]
    pub fn contains_chrom(&self, chrom: &str) -> bool {
        self.span_index.contains_key(chrom)
    }

    /// Global index range of a chromosome's bins.
    pub fn chrom_span(&self, chrom: &str) -> Option<Range<usize>> {
        self.span_index
            .get(chrom)
            .map(|&i| self.spans[i].1.clone())
    }

    /// A chromosome's bins as a contiguous, start-sorted slice.
    pub fn chrom_bins(&self, chrom: &str) -> Option<&[Bin]> {
        self.chrom_span(chrom).map(|range| &self.bins[range])
    }
}

//! Reference genome model: sequence names and lengths.
//!
//! Parses .genome / chrom.sizes files (tab-delimited: name\tlength)

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::bed::BedError;

/// One reference sequence (chromosome): a name and its length in bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub name: String,
    pub length: u64,
}

impl Sequence {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// Reference genome: ordered sequences with a name index.
/// The sequence order is preserved from the input and fixes the bin
/// lattice order downstream.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    seqs: Vec<Sequence>,
    index: FxHashMap<String, usize>,
}

impl Genome {
    /// Create an empty genome.
    pub fn new() -> Self {
        Self {
            seqs: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Load a genome from a file.
    /// Format: tab-delimited with name\tlength per line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BedError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut genome = Genome::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let name = fields.next().unwrap_or_default();
            let length = fields.next().ok_or_else(|| BedError::Parse {
                line: line_num + 1,
                message: "Genome file requires two columns: name and length".to_string(),
            })?;
            let length: u64 = length.parse().map_err(|_| BedError::Parse {
                line: line_num + 1,
                message: format!("Invalid sequence length: {}", length),
            })?;

            genome.insert(name, length);
        }

        Ok(genome)
    }

    /// Insert a sequence. A repeated name updates the length in place and
    /// keeps the original position in the order.
    pub fn insert(&mut self, name: impl Into<String>, length: u64) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.seqs[i].length = length,
            None => {
                self.index.insert(name.clone(), self.seqs.len());
                self.seqs.push(Sequence { name, length });
            }
        }
    }

    /// Look up a sequence by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.index.get(name).map(|&i| &self.seqs[i])
    }

    /// Get the length of a sequence.
    #[inline]
    pub fn length_of(&self, name: &str) -> Option<u64> {
        self.get(name).map(|s| s.length)
    }

    /// Check if a sequence exists.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All sequences in input order.
    #[inline]
    pub fn sequences(&self) -> &[Sequence] {
        &self.seqs
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }
}

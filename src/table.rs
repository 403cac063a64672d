//! The assembled output: per-bin, per-dataset mean and count tables.
//!
//! Rows follow the global bin index, columns follow the input dataset
//! order. The two tables are column-aligned: `mean` and `count` for a
//! given (bin, dataset) pair always describe the same aggregation.

use std::io::{self, Write};

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::aggregate::{aggregate_dataset, DatasetAggregate};
use crate::lattice::{BinLattice, EngineError};
use crate::parallel::PARALLEL_THRESHOLD;
use crate::track::Dataset;

/// Per-bin mean and count across all datasets, column-major.
#[derive(Debug, Clone)]
pub struct BinnedTable {
    names: Vec<String>,
    col_index: FxHashMap<String, usize>,
    means: Vec<Vec<Option<f64>>>,
    counts: Vec<Vec<u32>>,
    n_bins: usize,
}

impl BinnedTable {
    /// Aggregate every dataset onto the lattice and merge the results.
    ///
    /// Datasets are independent and write disjoint columns, so they are
    /// processed in parallel for large inputs; the merge preserves input
    /// dataset order regardless of completion order.
    pub fn assemble(lattice: &BinLattice, datasets: &[Dataset]) -> Result<Self, EngineError> {
        let mut seen = FxHashSet::default();
        for ds in datasets {
            if !seen.insert(ds.name.as_str()) {
                return Err(EngineError::DuplicateDataset(ds.name.clone()));
            }
        }

        let total: usize = datasets.iter().map(|ds| ds.len()).sum();
        let aggregates: Vec<DatasetAggregate> = if total >= PARALLEL_THRESHOLD && datasets.len() > 1
        {
            datasets
                .par_iter()
                .map(|ds| aggregate_dataset(lattice, ds))
                .collect::<Result<_, _>>()?
        } else {
            datasets
                .iter()
                .map(|ds| aggregate_dataset(lattice, ds))
                .collect::<Result<_, _>>()?
        };

        Ok(Self::from_aggregates(lattice.len(), aggregates))
    }

    /// Merge per-dataset aggregates into the two column-aligned tables.
    pub fn from_aggregates(n_bins: usize, aggregates: Vec<DatasetAggregate>) -> Self {
        let mut names = Vec::with_capacity(aggregates.len());
        let mut col_index = FxHashMap::default();
        let mut means = Vec::with_capacity(aggregates.len());
        let mut counts = Vec::with_capacity(aggregates.len());

        for agg in aggregates {
            debug_assert_eq!(agg.cells.len(), n_bins);
            col_index.insert(agg.name.clone(), names.len());
            names.push(agg.name);
            means.push(agg.cells.iter().map(|c| c.mean).collect());
            counts.push(agg.cells.iter().map(|c| c.count).collect());
        }

        Self {
            names,
            col_index,
            means,
            counts,
            n_bins,
        }
    }

    /// Number of rows (bins).
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Number of columns (datasets).
    pub fn n_datasets(&self) -> usize {
        self.names.len()
    }

    /// Dataset names in column order.
    pub fn dataset_names(&self) -> &[String] {
        &self.names
    }

    /// Mean for one (bin, dataset) cell. `None` when the dataset is
    /// unknown, the bin is out of range, or the cell has no data.
    pub fn mean(&self, bin: usize, dataset: &str) -> Option<f64> {
        let col = *self.col_index.get(dataset)?;
        self.means[col].get(bin).copied().flatten()
    }

    /// Count for one (bin, dataset) cell.
    pub fn count(&self, bin: usize, dataset: &str) -> Option<u32> {
        let col = *self.col_index.get(dataset)?;
        self.counts[col].get(bin).copied()
    }

    /// A dataset's full mean column, row-ordered by bin index.
    pub fn mean_column(&self, dataset: &str) -> Option<&[Option<f64>]> {
        let col = *self.col_index.get(dataset)?;
        Some(&self.means[col])
    }

    /// A dataset's full count column, row-ordered by bin index.
    pub fn count_column(&self, dataset: &str) -> Option<&[u32]> {
        let col = *self.col_index.get(dataset)?;
        Some(&self.counts[col])
    }

    /// Write the table as TSV: one row per bin with its coordinates,
    /// then `<name>.mean` and `<name>.count` per dataset. Missing means
    /// are written as `NA`.
    pub fn write_tsv<W: Write>(&self, lattice: &BinLattice, output: &mut W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(64 * 1024);
        let mut itoa_buf = itoa::Buffer::new();
        let mut ryu_buf = ryu::Buffer::new();

        buf.extend_from_slice(b"chrom\tstart\tend");
        for name in &self.names {
            buf.extend_from_slice(b"\t");
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b".mean\t");
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b".count");
        }
        buf.push(b'\n');

        for bin in lattice.bins() {
            buf.extend_from_slice(bin.chrom.as_bytes());
            buf.push(b'\t');
            buf.extend_from_slice(itoa_buf.format(bin.start).as_bytes());
            buf.push(b'\t');
            buf.extend_from_slice(itoa_buf.format(bin.end()).as_bytes());

            for col in 0..self.names.len() {
                buf.push(b'\t');
                match self.means[col][bin.index] {
                    Some(v) => buf.extend_from_slice(ryu_buf.format(v).as_bytes()),
                    None => buf.extend_from_slice(b"NA"),
                }
                buf.push(b'\t');
                buf.extend_from_slice(itoa_buf.format(self.counts[col][bin.index]).as_bytes());
            }
            buf.push(b'\n');

            if buf.len() >= 48 * 1024 {
                output.write_all(&buf)?;
                buf.clear();
            }
        }

        output.write_all(&buf)
    }
}

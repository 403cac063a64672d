// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! REBIN: uniform re-binning of scored genomic signal tracks.
//!
//! This library re-grids heterogeneous scored intervals onto a
//! fixed-width bin lattice spanning a reference genome, then aggregates
//! per-bin means and counts across any number of named datasets.
//!
//! # Features
//!
//! - **Sort-and-sweep aggregation**: no all-pairs interval comparison
//! - **Parallel processing**: Rayon across datasets and chromosomes
//! - **Missing-data aware**: undefined values stay out of every mean
//!
//! # Example
//!
//! ```rust
//! use rebin_genomics::{BinLattice, BinnedTable, Dataset, Genome, ScoredInterval};
//!
//! let mut genome = Genome::new();
//! genome.insert("chr1", 1500);
//!
//! let lattice = BinLattice::generate(&genome, 500)?;
//! let g1 = Dataset::new(
//!     "G1",
//!     vec![ScoredInterval::new("chr1", 100, 300, 2.0)],
//! );
//!
//! let table = BinnedTable::assemble(&lattice, &[g1])?;
//! assert_eq!(table.mean(0, "G1"), Some(2.0));
//! # Ok::<(), rebin_genomics::EngineError>(())
//! ```

pub mod aggregate;
pub mod bed;
pub mod genome;
pub mod lattice;
pub mod parallel;
pub mod table;
pub mod track;

// Re-export commonly used types
pub use bed::{parse_track, read_dataset, read_track, TrackReader};
pub use genome::{Genome, Sequence};
pub use lattice::{Bin, BinLattice, EngineError};
pub use table::BinnedTable;
pub use track::{Dataset, ScoredInterval};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::aggregate::{aggregate, aggregate_dataset, AggregateCell, DatasetAggregate};
    pub use crate::bed::{parse_track, read_dataset, read_track, TrackReader};
    pub use crate::genome::{Genome, Sequence};
    pub use crate::lattice::{Bin, BinLattice, EngineError};
    pub use crate::table::BinnedTable;
    pub use crate::track::{Dataset, ScoredInterval};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::bed::parse_track;
        use crate::lattice::BinLattice;
        use crate::table::BinnedTable;
        use crate::track::Dataset;
        use crate::Genome;

        let content = "chr1\t100\t300\t2.0\nchr1\t600\t700\t4.0\n";
        let intervals = parse_track(content).unwrap();

        let mut genome = Genome::new();
        genome.insert("chr1", 1500);

        let lattice = BinLattice::generate(&genome, 500).unwrap();
        let table =
            BinnedTable::assemble(&lattice, &[Dataset::new("G1", intervals)]).unwrap();

        assert_eq!(table.n_bins(), 3);
        assert_eq!(table.mean(0, "G1"), Some(2.0));
        assert_eq!(table.mean(1, "G1"), Some(4.0));
        assert_eq!(table.count(2, "G1"), Some(0));
    }
}

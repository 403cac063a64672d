//! Per-dataset overlap aggregation onto the bin lattice.
//!
//! Sort-and-sweep join per chromosome: intervals are sorted by start and
//! swept against the chromosome's contiguous bin slice with a two-pointer
//! scan, so cost is dominated by the sort rather than an all-pairs
//! comparison. An interval spanning several bins contributes its full,
//! unweighted value to each of them; length-weighted averaging is a
//! deliberate non-goal.

use std::ops::Range;

use rayon::prelude::*;

use crate::lattice::{Bin, BinLattice, EngineError};
use crate::parallel::{group_by_chromosome, sort_refs_by_start, PARALLEL_THRESHOLD};
use crate::track::{Dataset, ScoredInterval};

/// Aggregation result for one bin of one dataset.
///
/// `count` is the number of contributing intervals; `mean` is their
/// arithmetic mean. `count == 0` if and only if `mean` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateCell {
    pub bin: usize,
    pub mean: Option<f64>,
    pub count: u32,
}

/// All per-bin cells for one named dataset, in bin index order.
#[derive(Debug, Clone)]
pub struct DatasetAggregate {
    pub name: String,
    pub cells: Vec<AggregateCell>,
}

/// Aggregate one dataset's intervals onto the lattice.
///
/// Returns one cell per bin, in global index order. Intervals with a
/// missing value are excluded from both the sum and the count. An
/// interval on a chromosome outside the lattice is an error: dropping it
/// silently would corrupt the aggregate statistics.
pub fn aggregate(
    lattice: &BinLattice,
    intervals: &[ScoredInterval],
) -> Result<Vec<AggregateCell>, EngineError> {
    for iv in intervals {
        if !lattice.contains_chrom(&iv.chrom) {
            return Err(EngineError::UnknownSequence(iv.chrom.clone()));
        }
    }

    let mut cells: Vec<AggregateCell> = (0..lattice.len())
        .map(|index| AggregateCell {
            bin: index,
            mean: None,
            count: 0,
        })
        .collect();

    // Missing values are structurally absent from the aggregation.
    let scored = intervals.iter().filter(|iv| !iv.is_missing());
    let mut groups = group_by_chromosome(scored);

    // Walk chromosomes in lattice order; spans are disjoint, so the
    // per-chromosome results merge without synchronization.
    let work: Vec<(&[Bin], Range<usize>, Vec<&ScoredInterval>)> = lattice
        .chromosomes()
        .filter_map(|chrom| {
            let ivs = groups.remove(chrom)?;
            let span = lattice.chrom_span(chrom)?;
            let bins = &lattice.bins()[span.clone()];
            Some((bins, span, ivs))
        })
        .collect();

    let total: usize = work.iter().map(|(_, _, ivs)| ivs.len()).sum();

    let partials: Vec<(Range<usize>, Vec<(f64, u32)>)> = if total >= PARALLEL_THRESHOLD {
        work.into_par_iter()
            .map(|(bins, span, mut ivs)| (span, sweep_chromosome(bins, &mut ivs)))
            .collect()
    } else {
        work.into_iter()
            .map(|(bins, span, mut ivs)| (span, sweep_chromosome(bins, &mut ivs)))
            .collect()
    };

    for (span, acc) in partials {
        for (offset, (sum, count)) in acc.into_iter().enumerate() {
            let index = span.start + offset;
            cells[index] = AggregateCell {
                bin: index,
                mean: if count > 0 {
                    Some(sum / count as f64)
                } else {
                    None
                },
                count,
            };
        }
    }

    Ok(cells)
}

/// Aggregate a named dataset.
pub fn aggregate_dataset(
    lattice: &BinLattice,
    dataset: &Dataset,
) -> Result<DatasetAggregate, EngineError> {
    Ok(DatasetAggregate {
        name: dataset.name.clone(),
        cells: aggregate(lattice, &dataset.intervals)?,
    })
}

/// Two-pointer sweep of sorted intervals over one chromosome's bins.
/// Returns (sum, count) per bin.
fn sweep_chromosome(bins: &[Bin], ivs: &mut Vec<&ScoredInterval>) -> Vec<(f64, u32)> {
    sort_refs_by_start(ivs);

    let mut acc = vec![(0.0f64, 0u32); bins.len()];
    let mut ptr = 0;

    for (i, bin) in bins.iter().enumerate() {
        let bin_start = bin.start;
        let bin_end = bin.end();

        // Skip intervals that end at or before this bin; bins are
        // start-ascending, so they cannot overlap anything later either.
        while ptr < ivs.len() && ivs[ptr].end <= bin_start {
            ptr += 1;
        }

        for iv in &ivs[ptr..] {
            if iv.start >= bin_end {
                break; // No more overlaps possible
            }
            if iv.end > bin_start {
                if let Some(v) = iv.value {
                    acc[i].0 += v;
                    acc[i].1 += 1;
                }
            }
        }
    }

    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;

    fn lattice_1500() -> BinLattice {
        let mut g = Genome::new();
        g.insert("chr1", 1500);
        BinLattice::generate(&g, 500).unwrap()
    }

    #[test]
    fn test_disjoint_intervals_land_in_their_bins() {
        let lattice = lattice_1500();
        let intervals = vec![
            ScoredInterval::new("chr1", 100, 300, 2.0),
            ScoredInterval::new("chr1", 600, 700, 4.0),
        ];

        let cells = aggregate(&lattice, &intervals).unwrap();

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].mean, Some(2.0));
        assert_eq!(cells[0].count, 1);
        assert_eq!(cells[1].mean, Some(4.0));
        assert_eq!(cells[1].count, 1);
        assert_eq!(cells[2].mean, None);
        assert_eq!(cells[2].count, 0);
    }

    #[test]
    fn test_spanning_interval_contributes_full_value_to_each_bin() {
        let lattice = lattice_1500();
        let intervals = vec![
            ScoredInterval::new("chr1", 400, 650, 2.0), // bins 0 and 1
            ScoredInterval::new("chr1", 640, 900, 6.0), // bin 1 only
        ];

        let cells = aggregate(&lattice, &intervals).unwrap();

        assert_eq!(cells[0].mean, Some(2.0));
        assert_eq!(cells[0].count, 1);
        assert_eq!(cells[1].mean, Some(4.0)); // (2.0 + 6.0) / 2
        assert_eq!(cells[1].count, 2);
        assert_eq!(cells[2].mean, None);
        assert_eq!(cells[2].count, 0);
    }

    #[test]
    fn test_summed_count_can_exceed_interval_count() {
        let lattice = lattice_1500();
        // One interval spanning all three bins
        let intervals = vec![ScoredInterval::new("chr1", 0, 1500, 1.0)];

        let cells = aggregate(&lattice, &intervals).unwrap();
        let total: u32 = cells.iter().map(|c| c.count).sum();

        assert_eq!(total, 3);
        assert!(cells.iter().all(|c| c.mean == Some(1.0)));
    }

    #[test]
    fn test_missing_values_excluded_from_mean_and_count() {
        let lattice = lattice_1500();
        let intervals = vec![
            ScoredInterval::new("chr1", 0, 100, 3.0),
            ScoredInterval::missing("chr1", 50, 150),
            ScoredInterval::missing("chr1", 600, 700),
        ];

        let cells = aggregate(&lattice, &intervals).unwrap();

        assert_eq!(cells[0].mean, Some(3.0));
        assert_eq!(cells[0].count, 1);
        // A bin touched only by missing intervals stays empty
        assert_eq!(cells[1].mean, None);
        assert_eq!(cells[1].count, 0);
    }

    #[test]
    fn test_empty_interval_set_yields_all_zero() {
        let lattice = lattice_1500();
        let cells = aggregate(&lattice, &[]).unwrap();

        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.count == 0 && c.mean.is_none()));
    }

    #[test]
    fn test_result_invariant_to_interval_order() {
        let lattice = lattice_1500();
        let forward = vec![
            ScoredInterval::new("chr1", 400, 650, 2.0),
            ScoredInterval::new("chr1", 640, 900, 6.0),
            ScoredInterval::new("chr1", 100, 300, 1.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregate(&lattice, &forward).unwrap();
        let b = aggregate(&lattice, &reversed).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_sequence_is_fatal() {
        let lattice = lattice_1500();
        let intervals = vec![
            ScoredInterval::new("chr1", 0, 100, 1.0),
            ScoredInterval::new("chrUn_gl000220", 0, 100, 1.0),
        ];

        let err = aggregate(&lattice, &intervals).unwrap_err();
        assert!(matches!(err, EngineError::UnknownSequence(name) if name == "chrUn_gl000220"));
    }

    #[test]
    fn test_missing_value_on_unknown_sequence_still_fatal() {
        let lattice = lattice_1500();
        let intervals = vec![ScoredInterval::missing("chrZ", 0, 100)];

        assert!(aggregate(&lattice, &intervals).is_err());
    }

    #[test]
    fn test_interval_overlapping_overflow_bin_tail() {
        let mut g = Genome::new();
        g.insert("chr1", 1499);
        let lattice = BinLattice::generate(&g, 500).unwrap();

        // The last bin covers [1000, 1500) even though the sequence ends
        // at 1499; an interval reaching 1499 lands in it.
        let intervals = vec![ScoredInterval::new("chr1", 1450, 1499, 5.0)];
        let cells = aggregate(&lattice, &intervals).unwrap();

        assert_eq!(cells[2].mean, Some(5.0));
        assert_eq!(cells[2].count, 1);
    }

    #[test]
    fn test_multiple_chromosomes_do_not_interact() {
        let mut g = Genome::new();
        g.insert("chr1", 1000);
        g.insert("chr2", 1000);
        let lattice = BinLattice::generate(&g, 500).unwrap();

        let intervals = vec![
            ScoredInterval::new("chr1", 0, 100, 1.0),
            ScoredInterval::new("chr2", 0, 100, 9.0),
        ];

        let cells = aggregate(&lattice, &intervals).unwrap();

        assert_eq!(cells[0].mean, Some(1.0));
        assert_eq!(cells[1].count, 0);
        assert_eq!(cells[2].mean, Some(9.0));
        assert_eq!(cells[3].count, 0);
    }
}

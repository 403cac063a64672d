//! Parallel processing utilities using Rayon.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::track::ScoredInterval;

/// Minimum number of intervals before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Group interval references by chromosome.
pub fn group_by_chromosome<'a, I>(intervals: I) -> FxHashMap<&'a str, Vec<&'a ScoredInterval>>
where
    I: IntoIterator<Item = &'a ScoredInterval>,
{
    let mut groups: FxHashMap<&str, Vec<&ScoredInterval>> = FxHashMap::default();

    for interval in intervals {
        groups
            .entry(interval.chrom.as_str())
            .or_default()
            .push(interval);
    }

    groups
}

/// Sort interval references by (start, end), in parallel for large inputs.
pub fn sort_refs_by_start(intervals: &mut [&ScoredInterval]) {
    if intervals.len() >= PARALLEL_THRESHOLD {
        intervals
            .par_sort_unstable_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    } else {
        intervals.sort_unstable_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_chromosome() {
        let intervals = vec![
            ScoredInterval::new("chr1", 100, 200, 1.0),
            ScoredInterval::new("chr2", 100, 200, 2.0),
            ScoredInterval::new("chr1", 300, 400, 3.0),
        ];

        let groups = group_by_chromosome(&intervals);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("chr1").unwrap().len(), 2);
        assert_eq!(groups.get("chr2").unwrap().len(), 1);
    }

    #[test]
    fn test_sort_refs_by_start() {
        let intervals = vec![
            ScoredInterval::new("chr1", 300, 400, 1.0),
            ScoredInterval::new("chr1", 100, 250, 2.0),
            ScoredInterval::new("chr1", 100, 200, 3.0),
        ];

        let mut refs: Vec<&ScoredInterval> = intervals.iter().collect();
        sort_refs_by_start(&mut refs);

        assert_eq!(refs[0].end, 200);
        assert_eq!(refs[1].end, 250);
        assert_eq!(refs[2].start, 300);
    }
}

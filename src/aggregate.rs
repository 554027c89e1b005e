//! C7: folds a run of points at a finer precision into a single value for
//! the coarser bucket that covers them. The input run includes empty
//! slots (`interval == 0`) exactly as read off disk -- see spec §4.7.

use crate::file::header::AggregationType;
use crate::point::Point;

impl AggregationType {
    pub fn aggregate(&self, points: &[Point]) -> f64 {
        match self {
            AggregationType::Average => average(points),
            AggregationType::Sum => sum(points),
            AggregationType::Last => last(points),
            AggregationType::Max => extremum(points, f64::max),
            AggregationType::Min => extremum(points, f64::min),
        }
    }
}

fn sum(points: &[Point]) -> f64 {
    points.iter().map(|p| p.value).sum()
}

fn average(points: &[Point]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    sum(points) / points.len() as f64
}

/// The slot whose decoded `interval` is greatest; ties go to the earliest
/// index (spec §9: the reference source has a bug here -- it compares the
/// loop index instead of the decoded interval -- this is the corrected
/// semantics named as the open question).
fn last(points: &[Point]) -> f64 {
    points
        .iter()
        .enumerate()
        .max_by(|(ai, a), (bi, b)| a.interval.cmp(&b.interval).then(bi.cmp(ai)))
        .map(|(_, p)| p.value)
        .unwrap_or(0.0)
}

fn extremum(points: &[Point], pick: fn(f64, f64) -> f64) -> f64 {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    iter.fold(first.value, |acc, p| pick(acc, p.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(pairs: &[(u64, f64)]) -> Vec<Point> {
        pairs.iter().map(|&(i, v)| Point::new(i, v)).collect()
    }

    #[test]
    fn average_includes_empty_slots() {
        let points = pts(&[(1000, 100.0), (0, 0.0), (0, 0.0), (0, 0.0), (0, 0.0), (0, 0.0)]);
        let avg = AggregationType::Average.aggregate(&points);
        assert!((avg - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn sum_across_six_slots() {
        let points = pts(&[
            (1000, 100.0),
            (990, 200.0),
            (980, 300.0),
            (970, 400.0),
            (960, 500.0),
            (950, 600.0),
        ]);
        assert_eq!(AggregationType::Sum.aggregate(&points), 2100.0);
        assert_eq!(AggregationType::Average.aggregate(&points), 350.0);
    }

    #[test]
    fn last_picks_greatest_interval_not_loop_index() {
        // Out-of-order run: the greatest interval is at index 0, not the
        // last element -- this is exactly the case the teacher's bug gets
        // wrong (it would return the value at the highest loop index).
        let points = pts(&[(1000, 42.0), (980, 7.0), (990, 9.0)]);
        assert_eq!(AggregationType::Last.aggregate(&points), 42.0);
    }

    #[test]
    fn last_ties_go_to_earliest_index() {
        let points = pts(&[(1000, 1.0), (1000, 2.0)]);
        assert_eq!(AggregationType::Last.aggregate(&points), 1.0);
    }

    #[test]
    fn max_and_min_are_elementwise() {
        let points = pts(&[(1, 3.0), (2, 1.0), (3, 9.0)]);
        assert_eq!(AggregationType::Max.aggregate(&points), 9.0);
        assert_eq!(AggregationType::Min.aggregate(&points), 1.0);
    }

    #[test]
    fn empty_run_aggregates_to_zero() {
        assert_eq!(AggregationType::Average.aggregate(&[]), 0.0);
        assert_eq!(AggregationType::Max.aggregate(&[]), 0.0);
    }
}

//! The disjoint-interval engine (spec §4.2): values are merged into sets
//! over automatically-split, pairwise-disjoint buckets.
//!
//! Modeled on the grounding source's `IntervalSet::add`/
//! `subtract_from_interval` merge-and-split walk (an ordered map from
//! interval to payload, rebuilt by splicing in the new interval's
//! edges), generalized from "interval -> ()" membership to "interval ->
//! set of values".

use std::{
    collections::HashSet,
    hash::Hash,
};

use crate::{
    adaptor::{
        self,
        ValueInterval,
    },
    domain::{
        BoundedDomain,
        DomainPoint,
    },
    engine::{
        BoundConvention,
        Engine,
    },
    interval::Interval,
};

/// Buckets in ascending interval order, pairwise non-overlapping
/// (invariant 3). Touching buckets are not required to coalesce even
/// when their value sets match.
#[derive(Clone, Debug)]
pub struct DisjointEngine<V, D> {
    buckets: Vec<(Interval<D>, HashSet<V>)>,
    bound_convention: BoundConvention,
}

impl<V, D> Default for DisjointEngine<V, D> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            bound_convention: BoundConvention::default(),
        }
    }
}

impl<V, D> DisjointEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn exploded_records(&self) -> impl Iterator<Item = ValueInterval<V, D>> + '_ {
        self.buckets.iter().flat_map(|(interval, values)| {
            values
                .iter()
                .map(move |v| ValueInterval::new(v.clone(), interval.clone()))
        })
    }
}

impl<V, D> Engine<V, D> for DisjointEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn insert(&mut self, value: V, interval: Interval<D>) {
        self.bound_convention.observe(&interval);
        if interval.is_empty() {
            return;
        }
        let mut result = Vec::with_capacity(self.buckets.len() + 2);
        let mut remaining = interval;
        for (bucket_interval, bucket_values) in self.buckets.drain(..) {
            if remaining.is_empty() || bucket_interval.exclusive_less(&remaining) {
                result.push((bucket_interval, bucket_values));
                continue;
            }
            if remaining.exclusive_less(&bucket_interval) {
                result.push((remaining.clone(), HashSet::from_iter([value.clone()])));
                remaining = Interval::empty();
                result.push((bucket_interval, bucket_values));
                continue;
            }
            let left_gap = remaining.left_subtract(&bucket_interval);
            if !left_gap.is_empty() {
                result.push((left_gap, HashSet::from_iter([value.clone()])));
            }
            let outside_left = bucket_interval.left_subtract(&remaining);
            if !outside_left.is_empty() {
                result.push((outside_left, bucket_values.clone()));
            }
            let overlap = bucket_interval.intersect(&remaining);
            let mut overlap_values = bucket_values.clone();
            overlap_values.insert(value.clone());
            result.push((overlap, overlap_values));
            let outside_right = bucket_interval.right_subtract(&remaining);
            if !outside_right.is_empty() {
                result.push((outside_right, bucket_values));
            }
            remaining = remaining.right_subtract(&bucket_interval);
        }
        if !remaining.is_empty() {
            result.push((remaining, HashSet::from_iter([value])));
        }
        result.sort_by(|a, b| a.0.cmp_by_bounds(&b.0));
        self.buckets = result;
    }

    fn erase_value(&mut self, value: &V, interval: &Interval<D>) {
        self.bound_convention.observe(interval);
        if interval.is_empty() {
            return;
        }
        let mut result = Vec::with_capacity(self.buckets.len() + 1);
        for (bucket_interval, bucket_values) in self.buckets.drain(..) {
            if !bucket_interval.intersects(interval) {
                result.push((bucket_interval, bucket_values));
                continue;
            }
            let outside_left = bucket_interval.left_subtract(interval);
            if !outside_left.is_empty() {
                result.push((outside_left, bucket_values.clone()));
            }
            let overlap = bucket_interval.intersect(interval);
            let mut overlap_values = bucket_values.clone();
            overlap_values.remove(value);
            if !overlap_values.is_empty() {
                result.push((overlap, overlap_values));
            }
            let outside_right = bucket_interval.right_subtract(interval);
            if !outside_right.is_empty() {
                result.push((outside_right, bucket_values));
            }
        }
        self.buckets = result;
    }

    fn erase_all(&mut self, interval: &Interval<D>) {
        self.bound_convention.observe(interval);
        if interval.is_empty() {
            return;
        }
        let mut result = Vec::with_capacity(self.buckets.len());
        for (bucket_interval, bucket_values) in self.buckets.drain(..) {
            if !bucket_interval.intersects(interval) {
                result.push((bucket_interval, bucket_values));
                continue;
            }
            let outside_left = bucket_interval.left_subtract(interval);
            if !outside_left.is_empty() {
                result.push((outside_left, bucket_values.clone()));
            }
            let outside_right = bucket_interval.right_subtract(interval);
            if !outside_right.is_empty() {
                result.push((outside_right, bucket_values));
            }
        }
        self.buckets = result;
    }

    fn intervals(&self, query: &Interval<D>) -> Vec<ValueInterval<V, D>> {
        let mut out: Vec<ValueInterval<V, D>> = self
            .buckets
            .iter()
            .filter_map(|(interval, values)| {
                let clipped = interval.intersect(query);
                (!clipped.is_empty()).then_some((clipped, values))
            })
            .flat_map(|(clipped, values)| {
                values
                    .iter()
                    .map(move |v| ValueInterval::new(v.clone(), clipped.clone()))
            })
            .collect();
        out.sort_by(|a, b| a.interval.cmp_by_bounds(&b.interval).then_with(|| a.value.cmp(&b.value)));
        out
    }

    fn disjoint_intervals(&self, query: &Interval<D>) -> Vec<(HashSet<V>, Interval<D>)> {
        adaptor::disjoint_intervals(self.exploded_records(), query).collect()
    }

    fn gaps(&self) -> Vec<Interval<D>> {
        adaptor::gaps(self.exploded_records()).collect()
    }

    fn sandwiched_gaps(&self) -> Vec<(HashSet<V>, Interval<D>, HashSet<V>)> {
        adaptor::sandwiched_gaps(self.exploded_records()).collect()
    }

    fn initial_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        adaptor::initial_values(self.exploded_records())
    }

    fn final_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        adaptor::final_values(self.exploded_records())
    }

    fn merged_with(&mut self, other: &Self) {
        for (interval, values) in &other.buckets {
            for value in values {
                self.insert(value.clone(), interval.clone());
            }
        }
    }

    fn subtract_by(&mut self, other: &Self) {
        for (interval, values) in &other.buckets {
            for value in values {
                self.erase_value(value, interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(lo: i64, hi: i64) -> Interval<i64> {
        Interval::half_open(lo, hi)
    }

    #[test]
    fn insert_splits_at_overlap_edges() {
        let mut e = DisjointEngine::<i32, i64>::default();
        e.insert(1, iv(0, 10));
        e.insert(2, iv(5, 15));
        assert_eq!(
            e.buckets,
            vec![
                (iv(0, 5), HashSet::from_iter([1])),
                (iv(5, 10), HashSet::from_iter([1, 2])),
                (iv(10, 15), HashSet::from_iter([2])),
            ]
        );
    }

    #[test]
    fn erase_value_splits_residuals() {
        let mut e = DisjointEngine::<i32, i64>::default();
        e.insert(1, iv(0, 10));
        e.erase_value(&1, &iv(3, 7));
        assert_eq!(
            e.buckets,
            vec![(iv(0, 3), HashSet::from_iter([1])), (iv(7, 10), HashSet::from_iter([1]))]
        );
    }

    #[test]
    fn gaps_between_non_touching_buckets() {
        let mut e = DisjointEngine::<i32, i64>::default();
        e.insert(1, iv(0, 5));
        e.insert(1, iv(10, 15));
        assert_eq!(e.gaps(), vec![iv(5, 10)]);
    }
}

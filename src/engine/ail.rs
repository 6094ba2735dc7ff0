//! The augmented-interval-list engine (spec §4.4): a flat array of
//! `(value, interval)` entries partitioned into sorted *runs*, each
//! carrying a prefix-max of right edges for pruning.
//!
//! No direct teacher analog exists for this engine (the grounding
//! source has no AIL structure); it's grounded on the same arena/index
//! discipline the teacher uses for the tree engine (plain `Vec` indices
//! rather than a `Slab`, since entries here don't need parent/child
//! links) and on the teacher's sort-and-merge batch style
//! (`common::interval::interval_set`'s overlap-merge walk).

use std::{
    cmp::Ordering,
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
    interval::{
        Edge,
        Interval,
    },
};

/// Tuning parameters for run decomposition (spec §4.4), with the
/// documented defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AilConfig {
    pub max_overlapping_neighbours: usize,
    pub min_run_length: usize,
    pub max_runs_count: usize,
    pub max_fraction_promoted_per_run: f64,
}

impl Default for AilConfig {
    fn default() -> Self {
        Self {
            max_overlapping_neighbours: 20,
            min_run_length: 256,
            max_runs_count: 30,
            max_fraction_promoted_per_run: 0.20,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AilEngine<V, D> {
    intervals: Vec<ValueInterval<V, D>>,
    max_right_edges: Vec<Edge<D>>,
    runs: Vec<(usize, usize)>,
    config: AilConfig,
    bound_convention: BoundConvention,
}

impl<V, D> Default for AilEngine<V, D> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
            max_right_edges: Vec::new(),
            runs: Vec::new(),
            config: AilConfig::default(),
            bound_convention: BoundConvention::default(),
        }
    }
}

impl<V, D> AilEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    pub fn with_config(config: AilConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// For each sorted-by-lower-edge item, how many *later* items its
    /// interval overlaps (spec §4.4.1). Implemented via binary search on
    /// the sorted prefix rather than the edge-tagged sweep the source
    /// describes: both compute the same count, and sortedness already
    /// makes the per-item overlap run contiguous.
    fn overlap_counts(items: &[ValueInterval<V, D>]) -> Vec<usize> {
        let n = items.len();
        let mut counts = vec![0usize; n];
        for i in 0..n {
            let upper = items[i].interval.upper_edge().clone();
            let tail = &items[i + 1..];
            let reach = tail.partition_point(|item| {
                !(Interval {
                    lower: item.interval.lower_edge().clone(),
                    upper: upper.clone(),
                })
                .is_empty()
            });
            counts[i] = reach;
        }
        counts
    }

    /// Rebuilds `runs`/`max_right_edges` from scratch, dropping
    /// tombstoned (empty-interval) entries. Called after every mutating
    /// operation: spec.md's 20%-of-array trigger is a lazy-rebuild
    /// optimization, and always rebuilding is the eager limit of the
    /// same rule, so invariant 13 holds unconditionally rather than only
    /// between rebuilds.
    fn decompose(&mut self) {
        let mut live: Vec<ValueInterval<V, D>> =
            std::mem::take(&mut self.intervals).into_iter().filter(|r| !r.interval.is_empty()).collect();
        live.sort_by(|a, b| a.interval.cmp_by_bounds(&b.interval).then_with(|| a.value.cmp(&b.value)));

        let mut runs_out: Vec<Vec<ValueInterval<V, D>>> = Vec::new();
        let mut pending = live;
        while !pending.is_empty() {
            if pending.len() < self.config.min_run_length
                || runs_out.len() + 1 >= self.config.max_runs_count
            {
                runs_out.push(pending);
                break;
            }
            let counts = Self::overlap_counts(&pending);
            let mut sorted_counts = counts.clone();
            sorted_counts.sort_unstable();
            let quantile_idx = (((1.0 - self.config.max_fraction_promoted_per_run)
                * sorted_counts.len() as f64)
                .floor() as usize)
                .min(sorted_counts.len() - 1);
            let threshold = sorted_counts[quantile_idx].max(self.config.max_overlapping_neighbours);

            let mut current_run = Vec::new();
            let mut carry = Vec::new();
            for (item, count) in pending.into_iter().zip(counts) {
                if count > threshold {
                    carry.push(item);
                } else {
                    current_run.push(item);
                }
            }
            if carry.len() == current_run.len() + carry.len() {
                // No item fell under the threshold (can happen only when
                // every remaining item overlaps more than `threshold`
                // neighbours); emit what we have verbatim to guarantee
                // forward progress.
                runs_out.push(carry);
                break;
            }
            runs_out.push(current_run);
            pending = carry;
        }

        let mut flat = Vec::with_capacity(self.intervals.len());
        let mut runs = Vec::new();
        let mut max_right_edges = Vec::with_capacity(flat.capacity());
        for run in runs_out {
            let begin = flat.len();
            let mut running_max: Option<Edge<D>> = None;
            for item in run {
                let edge = item.interval.upper_edge().clone();
                running_max = Some(match running_max {
                    None => edge,
                    Some(prev) => {
                        if Edge::cmp_as_upper(&edge, &prev) == Ordering::Greater {
                            edge
                        } else {
                            prev
                        }
                    },
                });
                max_right_edges.push(running_max.clone().expect("just set"));
                flat.push(item);
            }
            let end = flat.len();
            if end > begin {
                runs.push((begin, end));
            }
        }
        self.intervals = flat;
        self.max_right_edges = max_right_edges;
        self.runs = runs;
    }

    fn query_run(&self, begin: usize, end: usize, query: &Interval<D>, out: &mut Vec<ValueInterval<V, D>>) {
        let len = end - begin;
        if len <= 15 {
            for idx in begin..end {
                if self.intervals[idx].interval.intersects(query) {
                    out.push(self.intervals[idx].clone());
                }
            }
            return;
        }
        let reach = self.intervals[begin..end].partition_point(|item| !query.exclusive_less(&item.interval));
        if reach == 0 {
            return;
        }
        let mut idx = begin + reach - 1;
        loop {
            let reaches_query = !(Interval {
                lower: query.lower_edge().clone(),
                upper: self.max_right_edges[idx].clone(),
            })
            .is_empty();
            if !reaches_query {
                break;
            }
            if self.intervals[idx].interval.intersects(query) {
                out.push(self.intervals[idx].clone());
            }
            if idx == begin {
                break;
            }
            idx -= 1;
        }
    }

    fn in_order(&self) -> Vec<ValueInterval<V, D>> {
        let mut cursors: Vec<usize> = self.runs.iter().map(|&(begin, _)| begin).collect();
        let mut out = Vec::with_capacity(self.intervals.len());
        loop {
            let mut best: Option<usize> = None;
            for (run_idx, &cursor) in cursors.iter().enumerate() {
                let (_, end) = self.runs[run_idx];
                if cursor >= end {
                    continue;
                }
                let take = match best {
                    None => true,
                    Some(current_best) => {
                        self.intervals[cursor]
                            .interval
                            .cmp_by_bounds(&self.intervals[cursors[current_best]].interval)
                            == Ordering::Less
                    },
                };
                if take {
                    best = Some(run_idx);
                }
            }
            let Some(run_idx) = best else {
                break;
            };
            let idx = cursors[run_idx];
            out.push(self.intervals[idx].clone());
            cursors[run_idx] += 1;
        }
        out
    }
}

impl<V, D> Engine<V, D> for AilEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn is_empty(&self) -> bool {
        self.intervals.iter().all(|r| r.interval.is_empty())
    }

    fn insert(&mut self, value: V, interval: Interval<D>) {
        self.bound_convention.observe(&interval);
        if interval.is_empty() {
            return;
        }
        let mut hull = interval;
        for item in self.intervals.iter_mut() {
            if item.value == value && item.interval.touches(&hull) {
                hull = hull.hull(&item.interval);
                item.interval = Interval::empty();
            }
        }
        self.intervals.push(ValueInterval::new(value, hull));
        self.decompose();
    }

    fn erase_value(&mut self, value: &V, interval: &Interval<D>) {
        self.bound_convention.observe(interval);
        if interval.is_empty() {
            return;
        }
        let mut residuals = Vec::new();
        for item in self.intervals.iter_mut() {
            if item.value == *value && item.interval.intersects(interval) {
                let stored = item.interval.clone();
                item.interval = Interval::empty();
                let left = stored.left_subtract(interval);
                let right = stored.right_subtract(interval);
                if !left.is_empty() {
                    residuals.push(ValueInterval::new(value.clone(), left));
                }
                if !right.is_empty() {
                    residuals.push(ValueInterval::new(value.clone(), right));
                }
            }
        }
        self.intervals.extend(residuals);
        self.decompose();
    }

    fn erase_all(&mut self, interval: &Interval<D>) {
        self.bound_convention.observe(interval);
        if interval.is_empty() {
            return;
        }
        let mut residuals = Vec::new();
        for item in self.intervals.iter_mut() {
            if item.interval.intersects(interval) {
                let stored = item.interval.clone();
                item.interval = Interval::empty();
                let left = stored.left_subtract(interval);
                let right = stored.right_subtract(interval);
                if !left.is_empty() {
                    residuals.push(ValueInterval::new(item.value.clone(), left));
                }
                if !right.is_empty() {
                    residuals.push(ValueInterval::new(item.value.clone(), right));
                }
            }
        }
        self.intervals.extend(residuals);
        self.decompose();
    }

    fn intervals(&self, query: &Interval<D>) -> Vec<ValueInterval<V, D>> {
        let mut matches = Vec::new();
        for &(begin, end) in &self.runs {
            self.query_run(begin, end, query, &mut matches);
        }
        let mut out: Vec<ValueInterval<V, D>> = matches
            .into_iter()
            .map(|mut r| {
                r.interval = r.interval.intersect(query);
                r
            })
            .filter(|r| !r.interval.is_empty())
            .collect();
        out.sort_by(|a, b| a.interval.cmp_by_bounds(&b.interval).then_with(|| a.value.cmp(&b.value)));
        out
    }

    fn disjoint_intervals(&self, query: &Interval<D>) -> Vec<(HashSet<V>, Interval<D>)> {
        adaptor::disjoint_intervals(self.in_order().into_iter(), query).collect()
    }

    fn gaps(&self) -> Vec<Interval<D>> {
        adaptor::gaps(self.in_order().into_iter()).collect()
    }

    fn sandwiched_gaps(&self) -> Vec<(HashSet<V>, Interval<D>, HashSet<V>)> {
        adaptor::sandwiched_gaps(self.in_order().into_iter()).collect()
    }

    fn initial_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        adaptor::initial_values(self.in_order())
    }

    fn final_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        adaptor::final_values(self.in_order())
    }

    fn merged_with(&mut self, other: &Self) {
        for record in other.in_order() {
            self.insert(record.value, record.interval);
        }
    }

    fn subtract_by(&mut self, other: &Self) {
        for record in other.in_order() {
            self.erase_value(&record.value, &record.interval);
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
    fn max_right_edges_invariant_holds() {
        let mut e = AilEngine::<i32, i64>::with_config(AilConfig {
            min_run_length: 4,
            ..AilConfig::default()
        });
        for i in 0..20 {
            e.insert(i, iv(i as i64, i as i64 + 5));
        }
        for &(begin, end) in &e.runs {
            let mut running = e.intervals[begin].interval.upper_edge().clone();
            for j in begin..end {
                let edge = e.intervals[j].interval.upper_edge().clone();
                if Edge::cmp_as_upper(&edge, &running) == Ordering::Greater {
                    running = edge;
                }
                assert_eq!(Edge::cmp_as_upper(&e.max_right_edges[j], &running), Ordering::Equal);
            }
        }
    }

    #[test]
    fn query_matches_overlap() {
        let mut e = AilEngine::<i32, i64>::default();
        e.insert(1, iv(0, 10));
        e.insert(2, iv(5, 15));
        let mut values: Vec<i32> = e.intervals(&iv(7, 8)).into_iter().map(|r| r.value).collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn insert_merges_touching_same_value() {
        let mut e = AilEngine::<i32, i64>::default();
        e.insert(1, iv(0, 5));
        e.insert(1, iv(5, 10));
        let all = e.intervals(&Interval::unbounded());
        assert_eq!(all, vec![ValueInterval::new(1, iv(0, 10))]);
    }
}

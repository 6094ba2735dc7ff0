//! The non-disjoint adaptor (spec §4.5): lazy producers of `gaps`,
//! `sandwiched_gaps`, `disjoint_intervals` and `initial_values` /
//! `final_values` over any sequence of `(value, interval)` records
//! sorted in interval order. Shared by the interval-tree and AIL
//! engines, the two non-disjoint storage engines.
//!
//! Each producer is an explicit iterator struct holding its own walk
//! state, per the "no coroutines in the target language" guidance: a
//! producer is single-pass and is not restartable once dropped.

use std::{
    collections::HashSet,
    hash::Hash,
};

use crate::{
    domain::{
        BoundedDomain,
        DomainPoint,
    },
    interval::Interval,
};

/// The atomic unit held by non-disjoint engines: a value bound to the
/// interval it's valid over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueInterval<V, D> {
    pub value: V,
    pub interval: Interval<D>,
}

impl<V, D> ValueInterval<V, D> {
    pub fn new(value: V, interval: Interval<D>) -> Self {
        Self { value, interval }
    }
}

/// Builds the lazy `gaps()` iterator over a sorted record sequence: emits
/// the open gap between each consecutive pair of non-touching groups.
/// Input must be sorted in interval order (`Interval::cmp_by_bounds`).
pub fn gaps<V, D, I>(records: I) -> impl Iterator<Item = Interval<D>>
where
    I: Iterator<Item = ValueInterval<V, D>>,
    D: DomainPoint + BoundedDomain,
{
    GapsWalk {
        inner: records,
        hull: None,
    }
}

struct GapsWalk<I, D> {
    inner: I,
    hull: Option<Interval<D>>,
}

impl<V, D, I> Iterator for GapsWalk<I, D>
where
    I: Iterator<Item = ValueInterval<V, D>>,
    D: DomainPoint + BoundedDomain,
{
    type Item = Interval<D>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.inner.next()?;
            match self.hull.take() {
                None => {
                    self.hull = Some(record.interval);
                },
                Some(hull) => {
                    if hull.touches(&record.interval) {
                        self.hull = Some(hull.hull(&record.interval));
                    } else {
                        let gap = hull.inner_complement(&record.interval);
                        self.hull = Some(record.interval);
                        if !gap.is_empty() {
                            return Some(gap);
                        }
                    }
                },
            }
        }
    }
}

/// Builds the lazy `sandwiched_gaps()` iterator: each gap plus the value
/// sets of the maximal touching groups immediately before and after it.
pub fn sandwiched_gaps<V, D, I>(
    records: I,
) -> impl Iterator<Item = (HashSet<V>, Interval<D>, HashSet<V>)>
where
    I: Iterator<Item = ValueInterval<V, D>>,
    V: Clone + Eq + Hash,
    D: DomainPoint + BoundedDomain,
{
    SandwichedGapsWalk {
        inner: records,
        prev: None,
        current: None,
        finished: false,
    }
}

struct SandwichedGapsWalk<I, V, D> {
    inner: I,
    prev: Option<(Interval<D>, HashSet<V>)>,
    current: Option<(Interval<D>, HashSet<V>)>,
    finished: bool,
}

impl<V, D, I> Iterator for SandwichedGapsWalk<I, V, D>
where
    I: Iterator<Item = ValueInterval<V, D>>,
    V: Clone + Eq + Hash,
    D: DomainPoint + BoundedDomain,
{
    type Item = (HashSet<V>, Interval<D>, HashSet<V>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.inner.next() {
                Some(record) => {
                    let starts_new_group = match &self.current {
                        None => true,
                        Some((hull, _)) => !hull.touches(&record.interval),
                    };
                    if !starts_new_group {
                        let (hull, values) = self.current.as_mut().expect("checked above");
                        *hull = hull.hull(&record.interval);
                        values.insert(record.value);
                        continue;
                    }
                    let fresh = (record.interval, HashSet::from_iter([record.value]));
                    let Some(closed_current) = self.current.replace(fresh) else {
                        // First record ever seen; nothing to close yet.
                        continue;
                    };
                    let previous = self.prev.replace(closed_current.clone());
                    if let Some(prev) = previous {
                        let gap = prev.0.inner_complement(&closed_current.0);
                        return Some((prev.1, gap, closed_current.1));
                    }
                },
                None => {
                    self.finished = true;
                    if let (Some(prev), Some(current)) = (self.prev.take(), self.current.take()) {
                        let gap = prev.0.inner_complement(&current.0);
                        return Some((prev.1, gap, current.1));
                    }
                    return None;
                },
            }
        }
    }
}

/// Resolves the overlapping records into the maximal disjoint segments
/// they cover, clipped to `query`, each tagged with the set of values
/// active over it. Implemented as an eager boundary sweep (rather than
/// the incrementally-maintained active-edge heap spec.md sketches) for
/// straightforward correctness: this is a performance difference only,
/// per spec.md §5's framing of allocation/algorithmic shortcuts as
/// non-observable.
pub fn disjoint_intervals<V, D, I>(
    records: I,
    query: &Interval<D>,
) -> impl Iterator<Item = (HashSet<V>, Interval<D>)>
where
    I: Iterator<Item = ValueInterval<V, D>>,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    let clipped: Vec<ValueInterval<V, D>> = records
        .filter_map(|r| {
            let clipped = r.interval.intersect(query);
            (!clipped.is_empty()).then_some(ValueInterval::new(r.value, clipped))
        })
        .collect();
    sweep_disjoint(clipped).into_iter()
}

/// Sweep-line boundary event: an interval opening or closing at a point,
/// tagged with which record it belongs to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Open,
    Close,
}

/// Sortable rank for a boundary coordinate: an `Unbounded` lower edge is
/// -infinity (sorts first), an `Unbounded` upper edge is +infinity (sorts
/// last), and any bounded coordinate sorts by its value in between.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum BoundRank<D> {
    UnboundedLow,
    Bounded(D),
    UnboundedHigh,
}

fn sweep_disjoint<V, D>(mut records: Vec<ValueInterval<V, D>>) -> Vec<(HashSet<V>, Interval<D>)>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    records.sort_by(|a, b| a.interval.cmp_by_bounds(&b.interval));

    let mut boundaries: Vec<(crate::interval::Edge<D>, Kind, usize)> =
        Vec::with_capacity(records.len() * 2);
    for (idx, r) in records.iter().enumerate() {
        boundaries.push((r.interval.lower_edge().clone(), Kind::Open, idx));
        boundaries.push((r.interval.upper_edge().clone(), Kind::Close, idx));
    }
    // Opens sort before closes at the same coordinate so that touching
    // intervals merge into one segment instead of producing a
    // zero-width gap between them.
    boundaries.sort_by(|(edge_a, kind_a, _), (edge_b, kind_b, _)| {
        edge_coordinate_order(edge_a, *kind_a)
            .cmp(&edge_coordinate_order(edge_b, *kind_b))
            .then_with(|| kind_a.cmp(kind_b))
    });

    let mut result = Vec::new();
    let mut active: HashSet<usize> = HashSet::new();
    let mut segment_start: Option<crate::interval::Edge<D>> = None;

    let mut i = 0;
    while i < boundaries.len() {
        let (point_edge, point_kind, _) = boundaries[i].clone();
        let point_rank = edge_coordinate_order(&point_edge, point_kind);
        let mut j = i;
        while j < boundaries.len() && edge_coordinate_order(&boundaries[j].0, boundaries[j].1) == point_rank {
            j += 1;
        }
        // Close the pending segment up to (but not including) this point,
        // using the currently-active set, before applying this point's
        // events.
        if let Some(start) = segment_start.take() {
            if !active.is_empty() {
                let seg = Interval {
                    lower: start,
                    upper: complement_open_lower(&point_edge),
                };
                if !seg.is_empty() {
                    let values: HashSet<V> =
                        active.iter().map(|&idx| records[idx].value.clone()).collect();
                    result.push((values, seg));
                }
            }
        }
        for (_, kind, idx) in &boundaries[i..j] {
            match kind {
                Kind::Open => {
                    active.insert(*idx);
                },
                Kind::Close => {
                    active.remove(idx);
                },
            }
        }
        if !active.is_empty() {
            segment_start = Some(complement_open_lower(&point_edge));
        }
        i = j;
    }

    merge_adjacent_equal(result)
}

/// Orders edges by coordinate alone, ignoring inclusive/exclusive, since
/// the sweep only needs to group boundaries at the same point before
/// applying open/close order. `kind` disambiguates which infinity an
/// `Unbounded` edge denotes.
fn edge_coordinate_order<D: DomainPoint>(edge: &crate::interval::Edge<D>, kind: Kind) -> BoundRank<D> {
    match edge.value() {
        Some(v) => BoundRank::Bounded(v.clone()),
        None => match kind {
            Kind::Open => BoundRank::UnboundedLow,
            Kind::Close => BoundRank::UnboundedHigh,
        },
    }
}

/// Turns a boundary point into the lower edge of "at or after this
/// point", matching whichever interval(s) are open there.
fn complement_open_lower<D: DomainPoint>(edge: &crate::interval::Edge<D>) -> crate::interval::Edge<D> {
    match edge {
        crate::interval::Edge::Unbounded => crate::interval::Edge::Unbounded,
        crate::interval::Edge::Inclusive(v) => crate::interval::Edge::Inclusive(v.clone()),
        crate::interval::Edge::Exclusive(v) => crate::interval::Edge::Inclusive(v.clone()),
    }
}

/// Coalesce consecutive segments with identical value sets (can happen
/// when a boundary point has both opens and closes that leave the active
/// set through-composition unchanged in membership but not in interval
/// shape).
fn merge_adjacent_equal<V, D>(
    segments: Vec<(HashSet<V>, Interval<D>)>,
) -> Vec<(HashSet<V>, Interval<D>)>
where
    V: Clone + Eq + Hash,
    D: DomainPoint + BoundedDomain,
{
    let mut merged: Vec<(HashSet<V>, Interval<D>)> = Vec::with_capacity(segments.len());
    for (values, interval) in segments {
        if let Some((last_values, last_interval)) = merged.last_mut() {
            if *last_values == values && last_interval.touches(&interval) {
                *last_interval = last_interval.hull(&interval);
                continue;
            }
        }
        merged.push((values, interval));
    }
    merged
}

/// Collects all records sharing the smallest lower edge (input must be
/// sorted in interval order), intersects their intervals, and returns the
/// union of their values.
pub fn initial_values<V, D, I>(records: I) -> Option<(Interval<D>, HashSet<V>)>
where
    I: IntoIterator<Item = ValueInterval<V, D>>,
    V: Eq + Hash,
    D: DomainPoint + BoundedDomain,
{
    let mut iter = records.into_iter();
    let first = iter.next()?;
    let min_edge = first.interval.lower_edge().clone();
    let mut intersection = first.interval.clone();
    let mut values = HashSet::new();
    values.insert(first.value);
    for record in iter {
        if *record.interval.lower_edge() != min_edge {
            break;
        }
        intersection = intersection.intersect(&record.interval);
        values.insert(record.value);
    }
    Some((intersection, values))
}

/// Collects all records sharing the largest upper edge, intersects their
/// intervals, and returns the union of their values. Unlike
/// `initial_values`, this needs a full scan: being sorted by lower edge
/// doesn't put the maximal-upper-edge records next to each other.
pub fn final_values<V, D, I>(records: I) -> Option<(Interval<D>, HashSet<V>)>
where
    I: IntoIterator<Item = ValueInterval<V, D>>,
    V: Eq + Hash,
    D: DomainPoint + BoundedDomain,
{
    let mut best: Option<(crate::interval::Edge<D>, Interval<D>, HashSet<V>)> = None;
    for record in records {
        let edge = record.interval.upper_edge().clone();
        match &mut best {
            None => best = Some((edge, record.interval, HashSet::from_iter([record.value]))),
            Some((best_edge, intersection, values)) => {
                match crate::interval::Edge::cmp_as_upper(&edge, best_edge) {
                    std::cmp::Ordering::Greater => {
                        *best_edge = edge;
                        *intersection = record.interval;
                        values.clear();
                        values.insert(record.value);
                    },
                    std::cmp::Ordering::Equal => {
                        *intersection = intersection.intersect(&record.interval);
                        values.insert(record.value);
                    },
                    std::cmp::Ordering::Less => {},
                }
            },
        }
    }
    best.map(|(_, interval, values)| (interval, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval as Iv;

    fn vi(v: i32, lo: i64, hi: i64) -> ValueInterval<i32, i64> {
        ValueInterval::new(v, Iv::half_open(lo, hi))
    }

    #[test]
    fn gaps_skip_touching_and_overlapping() {
        let records = vec![vi(1, 0, 10), vi(2, 5, 15), vi(3, 30, 40)];
        let found: Vec<_> = gaps(records.into_iter()).collect();
        assert_eq!(found, vec![Iv::half_open(15, 30)]);
    }

    #[test]
    fn sandwiched_gaps_report_value_sets() {
        let records = vec![vi(1, 0, 10), vi(2, 0, 10), vi(1, 20, 30), vi(3, 20, 30)];
        let found: Vec<_> = sandwiched_gaps(records.into_iter()).collect();
        assert_eq!(found.len(), 1);
        let (before, gap, after) = &found[0];
        assert_eq!(*before, HashSet::from_iter([1, 2]));
        assert_eq!(*gap, Iv::half_open(10, 20));
        assert_eq!(*after, HashSet::from_iter([1, 3]));
    }

    #[test]
    fn disjoint_intervals_partitions_overlap() {
        let records = vec![vi(1, 0, 10), vi(2, 5, 15)];
        let found: Vec<_> = disjoint_intervals(records.into_iter(), &Iv::unbounded()).collect();
        assert_eq!(
            found,
            vec![
                (HashSet::from_iter([1]), Iv::half_open(0, 5)),
                (HashSet::from_iter([1, 2]), Iv::half_open(5, 10)),
                (HashSet::from_iter([2]), Iv::half_open(10, 15)),
            ]
        );
    }

    #[test]
    fn initial_and_final_values() {
        let records = vec![vi(1, 0, 20), vi(2, 0, 10)];
        let (interval, values) = initial_values(records.clone()).unwrap();
        assert_eq!(interval, Iv::half_open(0, 10));
        assert_eq!(values, HashSet::from_iter([1, 2]));

        let (interval, values) = final_values(records).unwrap();
        assert_eq!(interval, Iv::half_open(0, 20));
        assert_eq!(values, HashSet::from_iter([1]));
    }
}

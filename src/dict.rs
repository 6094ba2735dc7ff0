//! The interval-keyed associative dictionary (spec §4.6): one storage
//! engine per key, all of the same [`EngineKind`], exclusively owned.

use std::{
    collections::{
        HashMap,
        HashSet,
    },
    fmt::Write as _,
    hash::Hash,
    ops::{
        Add,
        AddAssign,
        Sub,
        SubAssign,
    },
};

use crate::{
    adaptor::ValueInterval,
    domain::{
        BoundedDomain,
        DomainPoint,
        StepDomain,
    },
    engine::{
        AnyEngine,
        EngineKind,
    },
    flatten::FlattenPolicy,
    interval::Interval,
};

/// Which side of a gap to extend values from when filling unconditionally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillDirection {
    /// Extend the values active immediately before a gap forward into it.
    Forwards,
    /// Extend the values active immediately after a gap backward into it.
    Backwards,
    Both,
}

#[derive(Clone, Debug)]
pub struct Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    engines: HashMap<K, AnyEngine<V, D>>,
    kind: EngineKind,
}

impl<K, V, D> Default for Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn default() -> Self {
        Self::new(EngineKind::default())
    }
}

impl<K, V, D> Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    pub fn new(kind: EngineKind) -> Self {
        Self {
            engines: HashMap::new(),
            kind,
        }
    }

    pub fn from_triples(kind: EngineKind, triples: impl IntoIterator<Item = (K, V, Interval<D>)>) -> Self {
        let mut dict = Self::new(kind);
        for (key, value, interval) in triples {
            dict.insert(key, value, interval);
        }
        dict
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    fn prune(&mut self, key: &K) {
        if self.engines.get(key).is_some_and(|engine| engine.is_empty()) {
            self.engines.remove(key);
        }
    }

    pub fn insert(&mut self, key: K, value: V, interval: Interval<D>) {
        if interval.is_empty() {
            return;
        }
        let kind = self.kind;
        self.engines
            .entry(key)
            .or_insert_with(|| AnyEngine::new(kind))
            .insert(value, interval);
    }

    /// Inserts `(key, value, interval)` from a caller holding the triple as
    /// `(value, key, interval)` — the shape produced when walking an
    /// already-inverted relation, so the caller doesn't have to reorder
    /// arguments at every call site. Used by [`Dict::invert`] and by
    /// `BiDict`.
    pub fn inverse_insert(&mut self, value: V, key: K, interval: Interval<D>) {
        self.insert(key, value, interval);
    }

    pub fn erase_value(&mut self, key: &K, value: &V, interval: &Interval<D>) {
        if interval.is_empty() {
            return;
        }
        if let Some(engine) = self.engines.get_mut(key) {
            engine.erase_value(value, interval);
            self.prune(key);
        }
    }

    pub fn erase_interval(&mut self, key: &K, interval: &Interval<D>) {
        if interval.is_empty() {
            return;
        }
        if let Some(engine) = self.engines.get_mut(key) {
            engine.erase_all(interval);
            self.prune(key);
        }
    }

    pub fn erase_key(&mut self, key: &K) {
        self.engines.remove(key);
    }

    pub fn find(&self, key: &K, query: &Interval<D>) -> Vec<V> {
        let Some(engine) = self.engines.get(key) else {
            return Vec::new();
        };
        let mut values: Vec<V> = engine.intervals(query).into_iter().map(|r| r.value).collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn find_point(&self, key: &K, point: D) -> Vec<V> {
        self.find(key, &Interval::single(point))
    }

    pub fn find_keys(&self, keys: &[K], query: &Interval<D>) -> Vec<V> {
        let mut values: Vec<V> = keys.iter().flat_map(|key| self.find(key, query)).collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.engines.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn values(&self) -> Vec<V> {
        let mut values: Vec<V> = self
            .engines
            .values()
            .flat_map(|engine| engine.intervals(&Interval::unbounded()))
            .map(|r| r.value)
            .collect();
        values.sort();
        values.dedup();
        values
    }

    pub fn size(&self) -> usize {
        self.engines.len()
    }

    pub fn count(&self, key: &K) -> usize {
        self.engines
            .get(key)
            .map(|engine| engine.intervals(&Interval::unbounded()).len())
            .unwrap_or(0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.engines.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn clear(&mut self) {
        self.engines.clear();
    }

    pub fn all_intervals(&self) -> Vec<(K, ValueInterval<V, D>)> {
        let mut out = Vec::new();
        for key in self.keys() {
            if let Some(engine) = self.engines.get(&key) {
                for record in engine.intervals(&Interval::unbounded()) {
                    out.push((key.clone(), record));
                }
            }
        }
        out
    }

    pub fn subset(&self, keys: &[K], query: &Interval<D>) -> Self {
        let mut out = Self::new(self.kind);
        for key in keys {
            if let Some(engine) = self.engines.get(key) {
                for record in engine.intervals(query) {
                    out.insert(key.clone(), record.value, record.interval);
                }
            }
        }
        out
    }

    pub fn subset_with_values(&self, keys: &[K], values: &HashSet<V>, query: &Interval<D>) -> Self {
        let mut out = Self::new(self.kind);
        for key in keys {
            if let Some(engine) = self.engines.get(key) {
                for record in engine.intervals(query) {
                    if values.contains(&record.value) {
                        out.insert(key.clone(), record.value, record.interval);
                    }
                }
            }
        }
        out
    }

    pub fn subset_values(&self, values: &HashSet<V>, query: &Interval<D>) -> Self {
        let keys = self.keys();
        self.subset_with_values(&keys, values, query)
    }

    /// Swaps `(key, value, interval)` into `(value, key, interval)` for
    /// every stored triple.
    pub fn invert(&self) -> Dict<V, K, D> {
        let mut out = Dict::new(self.kind);
        for (key, engine) in &self.engines {
            for record in engine.intervals(&Interval::unbounded()) {
                out.inverse_insert(key.clone(), record.value, record.interval);
            }
        }
        out
    }

    /// `self` maps `K -> V`, `next` maps `V -> C`; the result maps
    /// `K -> C` over the intersection of each pair's intervals.
    pub fn joined_to<C>(&self, next: &Dict<V, C, D>) -> Dict<K, C, D>
    where
        C: Clone + Eq + Hash + Ord,
    {
        let mut out = Dict::new(self.kind);
        for (key, engine) in &self.engines {
            for ab in engine.intervals(&Interval::unbounded()) {
                if let Some(bc_engine) = next.engines.get(&ab.value) {
                    for bc in bc_engine.intervals(&ab.interval) {
                        out.insert(key.clone(), bc.value, ab.interval.intersect(&bc.interval));
                    }
                }
            }
        }
        out
    }

    pub fn merge(&mut self, other: &Self) {
        for (key, engine) in &other.engines {
            self.engines
                .entry(key.clone())
                .or_insert_with(|| AnyEngine::new(self.kind))
                .merged_with(engine);
        }
    }

    pub fn subtract(&mut self, other: &Self) {
        for (key, engine) in &other.engines {
            if let Some(mine) = self.engines.get_mut(key) {
                mine.subtract_by(engine);
                self.prune(key);
            }
        }
    }

    pub fn flatten<P: FlattenPolicy<V>>(&mut self, policy: &P) {
        for key in self.keys() {
            let Some(engine) = self.engines.get(&key) else {
                continue;
            };
            let slots = engine.disjoint_intervals(&Interval::unbounded());

            let mut erasures: Vec<(V, Interval<D>)> = Vec::new();
            let mut insertions: Vec<(V, Interval<D>)> = Vec::new();
            let mut status_quo: Option<V> = None;
            let mut status_quo_interval: Option<Interval<D>> = None;

            for (value_set, interval) in slots {
                let mut candidates: Vec<V> = value_set.into_iter().collect();
                candidates.sort();

                if candidates.len() == 1 {
                    status_quo = Some(candidates[0].clone());
                    status_quo_interval = Some(interval);
                    continue;
                }

                if let Some(prev_interval) = &status_quo_interval {
                    if !prev_interval.touches(&interval) {
                        status_quo = None;
                        status_quo_interval = None;
                    }
                }

                let winner = policy.resolve(status_quo.as_ref(), &candidates);
                match &winner {
                    None => {
                        for value in &candidates {
                            erasures.push((value.clone(), interval.clone()));
                        }
                    },
                    Some(chosen) => {
                        for value in &candidates {
                            if value != chosen {
                                erasures.push((value.clone(), interval.clone()));
                            }
                        }
                        if !candidates.contains(chosen) {
                            insertions.push((chosen.clone(), interval.clone()));
                        }
                    },
                }
                status_quo_interval = winner.as_ref().map(|_| interval);
                status_quo = winner;
            }

            for (value, interval) in erasures {
                self.erase_value(&key, &value, &interval);
            }
            for (value, interval) in insertions {
                self.insert(key.clone(), value, interval);
            }
        }
    }

    /// Inserts `other`'s coverage of `key` into `self`'s gaps for that key;
    /// copies a key wholesale when `self` doesn't have it yet.
    pub fn fill_gaps_with(&mut self, other: &Self) {
        for key in other.keys() {
            let Some(other_engine) = other.engines.get(&key) else {
                continue;
            };
            if !self.engines.contains_key(&key) {
                for record in other_engine.intervals(&Interval::unbounded()) {
                    self.insert(key.clone(), record.value, record.interval);
                }
                continue;
            }
            let gaps = self.engines.get(&key).expect("checked above").gaps();
            let mut to_insert = Vec::new();
            for gap in &gaps {
                for record in other_engine.intervals(gap) {
                    to_insert.push((record.value, record.interval));
                }
            }
            for (value, interval) in to_insert {
                self.insert(key.clone(), value, interval);
            }
        }
    }

    /// Renders every key's disjoint coverage as `key: [lo,hi)[v1,v2] ...`,
    /// one line per key. Meant for equality assertions in tests, not for
    /// production output.
    pub fn dump(&self) -> String
    where
        K: std::fmt::Debug,
        V: std::fmt::Debug,
        D: std::fmt::Debug,
    {
        let mut out = String::new();
        for key in self.keys() {
            let engine = self.engines.get(&key).expect("from keys()");
            write!(out, "{key:?}:").unwrap();
            for (values, interval) in engine.disjoint_intervals(&Interval::unbounded()) {
                let mut values: Vec<&V> = values.iter().collect();
                values.sort();
                write!(out, " {interval:?}[").unwrap();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(out, ",").unwrap();
                    }
                    write!(out, "{value:?}").unwrap();
                }
                write!(out, "]").unwrap();
            }
            out.push('\n');
        }
        out
    }
}

impl<K, V, D> Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain + StepDomain,
{
    fn forward_fill_region(gap: &Interval<D>, delta: &D::Delta) -> Interval<D> {
        match gap.lower_edge().value() {
            Some(point) => Interval::single(point.clone()).right_extend(delta).intersect(gap),
            None => Interval::empty(),
        }
    }

    fn backward_fill_region(gap: &Interval<D>, delta: &D::Delta) -> Interval<D> {
        match gap.upper_edge().value() {
            Some(point) => Interval::single(point.clone()).left_extend(delta).intersect(gap),
            None => Interval::empty(),
        }
    }

    /// Extends the value set active over the earliest known interval
    /// backward toward (and no further than) `point`.
    pub fn fill_to_start(&mut self, key: &K, point: D, max_extension: D::Delta) {
        let Some(engine) = self.engines.get(key) else {
            return;
        };
        let Some((initial_interval, values)) = engine.initial_values() else {
            return;
        };
        let Some(anchor) = initial_interval.lower_edge().value().cloned() else {
            return;
        };
        let region = Interval::single(anchor)
            .left_extend(&max_extension)
            .intersect(&Interval::at_least(point))
            .left_subtract(&initial_interval);
        if region.is_empty() {
            return;
        }
        for value in values {
            self.insert(key.clone(), value, region.clone());
        }
    }

    /// Extends the value set active over the latest known interval forward
    /// toward (and no further than) `point`.
    pub fn fill_to_end(&mut self, key: &K, point: D, max_extension: D::Delta) {
        let Some(engine) = self.engines.get(key) else {
            return;
        };
        let Some((final_interval, values)) = engine.final_values() else {
            return;
        };
        let Some(anchor) = final_interval.upper_edge().value().cloned() else {
            return;
        };
        let region = Interval::single(anchor)
            .right_extend(&max_extension)
            .intersect(&Interval::at_most(point))
            .right_subtract(&final_interval);
        if region.is_empty() {
            return;
        }
        for value in values {
            self.insert(key.clone(), value, region.clone());
        }
    }

    /// Fills sandwiched gaps from both ends with values common to the
    /// groups before and after, up to `max_extension` each way; a gap
    /// short enough for both extensions to meet ends up filled entirely.
    pub fn fill_gaps(&mut self, max_extension: D::Delta) {
        for key in self.keys() {
            let Some(engine) = self.engines.get(&key) else {
                continue;
            };
            let mut to_insert = Vec::new();
            for (before, gap, after) in engine.sandwiched_gaps() {
                let common: Vec<V> = before.intersection(&after).cloned().collect();
                if common.is_empty() {
                    continue;
                }
                let prefix = Self::forward_fill_region(&gap, &max_extension);
                let suffix = Self::backward_fill_region(&gap, &max_extension);
                for value in &common {
                    if !prefix.is_empty() {
                        to_insert.push((value.clone(), prefix.clone()));
                    }
                    if !suffix.is_empty() {
                        to_insert.push((value.clone(), suffix.clone()));
                    }
                }
            }
            for (value, interval) in to_insert {
                self.insert(key.clone(), value, interval);
            }
        }
    }

    /// Fills every sandwiched gap unconditionally from the requested
    /// direction(s), without requiring shared values on both sides.
    pub fn extend_into_gaps(&mut self, direction: FillDirection, max_extension: D::Delta) {
        for key in self.keys() {
            let Some(engine) = self.engines.get(&key) else {
                continue;
            };
            let mut to_insert = Vec::new();
            for (before, gap, after) in engine.sandwiched_gaps() {
                if matches!(direction, FillDirection::Forwards | FillDirection::Both) {
                    let region = Self::forward_fill_region(&gap, &max_extension);
                    if !region.is_empty() {
                        for value in &before {
                            to_insert.push((value.clone(), region.clone()));
                        }
                    }
                }
                if matches!(direction, FillDirection::Backwards | FillDirection::Both) {
                    let region = Self::backward_fill_region(&gap, &max_extension);
                    if !region.is_empty() {
                        for value in &after {
                            to_insert.push((value.clone(), region.clone()));
                        }
                    }
                }
            }
            for (value, interval) in to_insert {
                self.insert(key.clone(), value, interval);
            }
        }
    }
}

impl<K, V, D> AddAssign<&Dict<K, V, D>> for Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn add_assign(&mut self, rhs: &Dict<K, V, D>) {
        self.merge(rhs);
    }
}

impl<K, V, D> SubAssign<&Dict<K, V, D>> for Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn sub_assign(&mut self, rhs: &Dict<K, V, D>) {
        self.subtract(rhs);
    }
}

impl<K, V, D> Add<&Dict<K, V, D>> for Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    type Output = Dict<K, V, D>;

    fn add(mut self, rhs: &Dict<K, V, D>) -> Self::Output {
        self += rhs;
        self
    }
}

impl<K, V, D> Sub<&Dict<K, V, D>> for Dict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    type Output = Dict<K, V, D>;

    fn sub(mut self, rhs: &Dict<K, V, D>) -> Self::Output {
        self -= rhs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::{
        Discard,
        PreferStatusQuo,
    };

    fn iv(lo: i64, hi: i64) -> Interval<i64> {
        Interval::half_open(lo, hi)
    }

    #[test]
    fn insert_and_find_roundtrip() {
        let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
        d.insert("a", 1, iv(0, 10));
        d.insert("a", 2, iv(5, 15));
        assert_eq!(d.find(&"a", &iv(7, 8)), vec![1, 2]);
        assert_eq!(d.find(&"a", &iv(11, 15)), vec![2]);
        assert!(d.find(&"missing", &iv(0, 1)).is_empty());
    }

    #[test]
    fn erase_drops_empty_keys() {
        let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Disjoint);
        d.insert("a", 1, iv(0, 10));
        assert!(d.contains(&"a"));
        d.erase_value(&"a", &1, &iv(0, 10));
        assert!(!d.contains(&"a"));
    }

    #[test]
    fn invert_swaps_roles() {
        let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
        d.insert("a", 1, iv(0, 10));
        let inverted = d.invert();
        assert_eq!(inverted.find(&1, &iv(0, 10)), vec!["a"]);
    }

    #[test]
    fn joined_to_composes_through_shared_intervals() {
        let mut ab: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
        ab.insert("a", 1, iv(0, 10));
        let mut bc: Dict<i32, &str, i64> = Dict::new(EngineKind::Tree);
        bc.insert(1, "x", iv(5, 20));
        let ac = ab.joined_to(&bc);
        assert_eq!(ac.find(&"a", &iv(5, 10)), vec!["x"]);
        assert!(ac.find(&"a", &iv(0, 5)).is_empty());
    }

    #[test]
    fn fill_gaps_uses_common_values_from_both_sides() {
        let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
        d.insert("a", 1, iv(0, 5));
        d.insert("a", 1, iv(10, 15));
        d.fill_gaps(3);
        assert_eq!(d.find(&"a", &iv(5, 10)), vec![1]);
    }

    #[test]
    fn flatten_discard_leaves_overlaps_empty() {
        let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
        d.insert("a", 1, iv(0, 10));
        d.insert("a", 2, iv(5, 15));
        d.flatten(&Discard);
        assert!(d.find(&"a", &iv(5, 10)).is_empty());
        assert_eq!(d.find(&"a", &iv(0, 5)), vec![1]);
        assert_eq!(d.find(&"a", &iv(10, 15)), vec![2]);
    }

    #[test]
    fn flatten_prefer_status_quo_keeps_earlier_value() {
        let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
        d.insert("a", 1, iv(0, 10));
        d.insert("a", 2, iv(5, 15));
        d.flatten(&PreferStatusQuo::new(Discard));
        assert_eq!(d.find(&"a", &iv(5, 10)), vec![1]);
        assert_eq!(d.find(&"a", &iv(10, 15)), vec![2]);
    }
}

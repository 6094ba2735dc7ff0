//! A bidirectional `Dict` (spec §4.7): a forward and an inverse direction
//! kept in lockstep, so lookups work from either side without maintaining
//! two independent structures by hand.

use std::hash::Hash;

use crate::{
    dict::Dict,
    domain::{
        BoundedDomain,
        DomainPoint,
    },
    engine::EngineKind,
    interval::Interval,
};

#[derive(Clone, Debug)]
pub struct BiDict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    forward: Dict<K, V, D>,
    inverse: Dict<V, K, D>,
}

impl<K, V, D> Default for BiDict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn default() -> Self {
        Self::new(EngineKind::default())
    }
}

impl<K, V, D> BiDict<K, V, D>
where
    K: Clone + Eq + Hash + Ord,
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    pub fn new(kind: EngineKind) -> Self {
        Self {
            forward: Dict::new(kind),
            inverse: Dict::new(kind),
        }
    }

    pub fn from_triples(kind: EngineKind, triples: impl IntoIterator<Item = (K, V, Interval<D>)>) -> Self {
        let mut bidict = Self::new(kind);
        for (key, value, interval) in triples {
            bidict.insert(key, value, interval);
        }
        bidict
    }

    pub fn forward(&self) -> &Dict<K, V, D> {
        &self.forward
    }

    pub fn inverse(&self) -> &Dict<V, K, D> {
        &self.inverse
    }

    pub fn insert(&mut self, key: K, value: V, interval: Interval<D>) {
        self.forward.insert(key.clone(), value.clone(), interval.clone());
        self.inverse.inverse_insert(key, value, interval);
    }

    pub fn erase_value(&mut self, key: &K, value: &V, interval: &Interval<D>) {
        self.forward.erase_value(key, value, interval);
        self.inverse.erase_value(value, key, interval);
    }

    pub fn erase_interval(&mut self, key: &K, interval: &Interval<D>) {
        for value in self.forward.find(key, interval) {
            self.inverse.erase_value(&value, key, interval);
        }
        self.forward.erase_interval(key, interval);
    }

    pub fn erase_key(&mut self, key: &K) {
        for value in self.forward.find(key, &Interval::unbounded()) {
            self.inverse.erase_value(&value, key, &Interval::unbounded());
        }
        self.forward.erase_key(key);
    }

    pub fn find(&self, key: &K, query: &Interval<D>) -> Vec<V> {
        self.forward.find(key, query)
    }

    pub fn inverse_find(&self, value: &V, query: &Interval<D>) -> Vec<K> {
        self.inverse.find(value, query)
    }

    pub fn keys(&self) -> Vec<K> {
        self.forward.keys()
    }

    pub fn values(&self) -> Vec<V> {
        self.inverse.keys()
    }

    pub fn size(&self) -> usize {
        self.forward.size()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.inverse.clear();
    }

    /// Swaps which side is "forward". Cheap: both directions already
    /// exist, so this just exchanges them.
    pub fn invert(self) -> BiDict<V, K, D> {
        BiDict {
            forward: self.inverse,
            inverse: self.forward,
        }
    }

    /// Joins the forward direction through `next`, then rebuilds the
    /// inverse side by inverting the forward result rather than composing
    /// `next`'s inverse with `self`'s inverse — no slower, and it avoids
    /// keeping two join implementations in sync.
    pub fn joined_to<C>(&self, next: &BiDict<V, C, D>) -> BiDict<K, C, D>
    where
        C: Clone + Eq + Hash + Ord,
    {
        let forward = self.forward.joined_to(next.forward());
        let inverse = forward.invert();
        BiDict { forward, inverse }
    }

    pub fn merge(&mut self, other: &Self) {
        self.forward.merge(&other.forward);
        self.inverse.merge(&other.inverse);
    }

    pub fn subtract(&mut self, other: &Self) {
        self.forward.subtract(&other.forward);
        self.inverse.subtract(&other.inverse);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(lo: i64, hi: i64) -> Interval<i64> {
        Interval::half_open(lo, hi)
    }

    #[test]
    fn forward_and_inverse_stay_consistent() {
        let mut bd: BiDict<&str, i32, i64> = BiDict::new(EngineKind::Tree);
        bd.insert("a", 1, iv(0, 10));
        bd.insert("b", 1, iv(5, 15));
        assert_eq!(bd.find(&"a", &iv(0, 10)), vec![1]);
        let mut owners = bd.inverse_find(&1, &iv(7, 8));
        owners.sort_unstable();
        assert_eq!(owners, vec!["a", "b"]);
    }

    #[test]
    fn erase_value_removes_both_directions() {
        let mut bd: BiDict<&str, i32, i64> = BiDict::new(EngineKind::Disjoint);
        bd.insert("a", 1, iv(0, 10));
        bd.erase_value(&"a", &1, &iv(0, 10));
        assert!(bd.find(&"a", &iv(0, 10)).is_empty());
        assert!(bd.inverse_find(&1, &iv(0, 10)).is_empty());
    }

    #[test]
    fn invert_swaps_direction_labels() {
        let mut bd: BiDict<&str, i32, i64> = BiDict::new(EngineKind::Tree);
        bd.insert("a", 1, iv(0, 10));
        let inverted = bd.invert();
        assert_eq!(inverted.find(&1, &iv(0, 10)), vec!["a"]);
    }
}

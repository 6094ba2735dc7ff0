//! The interval-tree engine (spec §4.3): a treap of `(value, interval)`
//! nodes ordered by `(lower_edge, upper_edge)`, augmented with a
//! `max_upper` annotation per subtree for overlap pruning.
//!
//! Node storage is an arena (`slab::Slab`) indexed by a `NonZeroU32`
//! handle rather than owning pointers, so parent/child/next links don't
//! need `Rc`/unsafe to form a cyclic graph — the same layout as the
//! grounding source's `IntervalMap`, generalized from a single
//! byte-string key and `SubscriberId` value to any `Interval<D>` and any
//! `V`.
//!
//! The grounding source calls this structure an augmented red-black
//! tree in prose but implements it as a treap (randomized priorities via
//! `fastrand`, split/merge instead of rotations). This engine keeps the
//! treap: it gives the same expected `O(log n)` bounds, and its
//! split/merge callback shape maps onto the rotation/swap/delete
//! contract one for one.

use std::{
    collections::{
        HashMap,
        HashSet,
    },
    hash::Hash,
    num::NonZeroU32,
    ops::{
        Index,
        IndexMut,
    },
};

use fastrand::Rng;
use slab::Slab;

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

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeKey(NonZeroU32);

impl NodeKey {
    fn new(index: usize) -> Self {
        let inner = u32::try_from(index + 1)
            .ok()
            .and_then(NonZeroU32::new)
            .expect("interval tree exceeded u32::MAX nodes");
        Self(inner)
    }

    fn slot(self) -> usize {
        self.0.get() as usize - 1
    }
}

struct Node<V, D> {
    weight: u32,
    value: V,
    interval: Interval<D>,
    parent: Option<NodeKey>,
    child: [Option<NodeKey>; 2],
    max_upper_bound: NodeKey,
    next: Option<NodeKey>,
}

impl<V, D> Node<V, D> {
    fn replace_child(&mut self, from: NodeKey, to: Option<NodeKey>) {
        if self.child[0] == Some(from) {
            self.child[0] = to;
        } else {
            assert_eq!(self.child[1], Some(from));
            self.child[1] = to;
        }
    }
}

impl<V, D> Index<NodeKey> for Slab<Node<V, D>> {
    type Output = Node<V, D>;

    fn index(&self, index: NodeKey) -> &Self::Output {
        &self[index.slot()]
    }
}

impl<V, D> IndexMut<NodeKey> for Slab<Node<V, D>> {
    fn index_mut(&mut self, index: NodeKey) -> &mut Self::Output {
        &mut self[index.slot()]
    }
}

/// A treap of `(value, interval)` nodes, augmented by `max_upper` for
/// overlap pruning, plus a value-keyed intrusive linked list for the
/// per-value lookups `insert`/`erase_value` need.
pub struct TreeEngine<V, D> {
    nodes: Slab<Node<V, D>>,
    root: Option<NodeKey>,
    values: HashMap<V, Option<NodeKey>>,
    rng: Rng,
    bound_convention: BoundConvention,
}

impl<V, D> Clone for TreeEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn clone(&self) -> Self {
        // Rebuilding from the observable content is simpler, and just as
        // correct, as deep-cloning the arena with its internal handles.
        let mut fresh = Self::default();
        for n in self.nodes.iter().map(|(_, n)| n) {
            fresh.insert_fresh(n.value.clone(), n.interval.clone());
        }
        fresh.bound_convention = self.bound_convention;
        fresh
    }
}

impl<V: std::fmt::Debug, D: std::fmt::Debug> std::fmt::Debug for TreeEngine<V, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEngine")
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

impl<V, D> Default for TreeEngine<V, D> {
    fn default() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
            values: HashMap::new(),
            rng: Rng::new(),
            bound_convention: BoundConvention::default(),
        }
    }
}

impl<V, D> TreeEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn collect_value_nodes(&self, value: &V) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut cur = self.values.get(value).copied().flatten();
        while let Some(n) = cur {
            out.push(n);
            cur = self.nodes[n].next;
        }
        out
    }

    fn relink_value_nodes(&mut self, value: &V, nodes: &[NodeKey]) {
        for pair in nodes.windows(2) {
            self.nodes[pair[0]].next = Some(pair[1]);
        }
        if let Some(&last) = nodes.last() {
            self.nodes[last].next = None;
        }
        if nodes.is_empty() {
            self.values.remove(value);
        } else {
            self.values.insert(value.clone(), Some(nodes[0]));
        }
    }

    fn detach_from_value_list(&mut self, n: NodeKey) {
        let value = self.nodes[n].value.clone();
        let remaining: Vec<NodeKey> = self
            .collect_value_nodes(&value)
            .into_iter()
            .filter(|&k| k != n)
            .collect();
        self.relink_value_nodes(&value, &remaining);
    }

    /// Inserts a brand-new node, bypassing the per-value merge logic in
    /// [`Engine::insert`]. Used both by `insert` (after computing the
    /// merged hull) and by erase's residual re-insertion.
    fn insert_fresh(&mut self, value: V, interval: Interval<D>) {
        if interval.is_empty() {
            return;
        }
        let entry = self.nodes.vacant_entry();
        let key = NodeKey::new(entry.key());
        let next = self.values.get_mut(&value).and_then(|slot| slot.take());
        entry.insert(Node {
            weight: self.rng.u32(..),
            value: value.clone(),
            interval: interval.clone(),
            parent: None,
            child: [None; 2],
            max_upper_bound: key,
            next,
        });
        self.values.insert(value, Some(key));
        match self.root {
            None => self.root = Some(key),
            Some(root) => self.root = Some(self.insert_node(root, &interval, key)),
        }
    }

    fn insert_node(&mut self, parent: NodeKey, interval: &Interval<D>, node: NodeKey) -> NodeKey {
        if self.nodes[node].weight < self.nodes[parent].weight {
            let (l, r) = self.split(parent, interval);
            self.nodes[node].child = [l, r];
            if let Some(l) = l {
                self.nodes[l].parent = Some(node);
            }
            if let Some(r) = r {
                self.nodes[r].parent = Some(node);
            }
            self.recalculate_annotation(node);
            return node;
        }
        let side = match interval.cmp_by_bounds(&self.nodes[parent].interval) {
            std::cmp::Ordering::Less => 0,
            _ => 1,
        };
        let inserted = if let Some(child) = self.nodes[parent].child[side] {
            self.insert_node(child, interval, node)
        } else {
            node
        };
        self.nodes[parent].child[side] = Some(inserted);
        self.nodes[inserted].parent = Some(parent);
        self.recalculate_annotation(parent);
        parent
    }

    /// Splits the subtree at `node` into `(<= interval, > interval)` by
    /// bound ordering.
    fn split(&mut self, node: NodeKey, interval: &Interval<D>) -> (Option<NodeKey>, Option<NodeKey>) {
        if self.nodes[node].interval.cmp_by_bounds(interval) != std::cmp::Ordering::Greater {
            if let Some(child) = self.nodes[node].child[1] {
                let (r0, r1) = self.split(child, interval);
                self.nodes[node].child[1] = r0;
                if let Some(r0) = r0 {
                    self.nodes[r0].parent = Some(node);
                }
                self.recalculate_annotation(node);
                (Some(node), r1)
            } else {
                (Some(node), None)
            }
        } else {
            if let Some(child) = self.nodes[node].child[0] {
                let (l0, l1) = self.split(child, interval);
                self.nodes[node].child[0] = l1;
                if let Some(l1) = l1 {
                    self.nodes[l1].parent = Some(node);
                }
                self.recalculate_annotation(node);
                (l0, Some(node))
            } else {
                (None, Some(node))
            }
        }
    }

    fn remove_tree_node(&mut self, n: NodeKey) {
        self.detach_from_value_list(n);
        let new_child = self.merge(self.nodes[n].child[0], self.nodes[n].child[1]);
        let parent = self.nodes[n].parent;
        if let Some(c) = new_child {
            self.nodes[c].parent = parent;
        }
        if let Some(p) = parent {
            self.nodes[p].replace_child(n, new_child);
            self.recalculate_annotations_to_root(p);
        } else {
            self.root = new_child;
        }
        self.nodes.remove(n.slot());
    }

    fn merge(&mut self, n: Option<NodeKey>, m: Option<NodeKey>) -> Option<NodeKey> {
        let Some(n) = n else {
            return m;
        };
        let Some(m) = m else {
            return Some(n);
        };
        if self.nodes[n].weight <= self.nodes[m].weight {
            let right = self.merge(self.nodes[n].child[1], Some(m));
            self.nodes[n].child[1] = right;
            if let Some(r) = right {
                self.nodes[r].parent = Some(n);
            }
            self.recalculate_annotation(n);
            Some(n)
        } else {
            let left = self.merge(Some(n), self.nodes[m].child[0]);
            self.nodes[m].child[0] = left;
            if let Some(l) = left {
                self.nodes[l].parent = Some(m);
            }
            self.recalculate_annotation(m);
            Some(m)
        }
    }

    fn recalculate_annotation(&mut self, node: NodeKey) {
        let mut best = node;
        for child in self.nodes[node].child {
            if let Some(c) = child {
                let candidate = self.nodes[c].max_upper_bound;
                if self.nodes[candidate]
                    .interval
                    .cmp_upper_to(&self.nodes[best].interval)
                    == std::cmp::Ordering::Greater
                {
                    best = candidate;
                }
            }
        }
        self.nodes[node].max_upper_bound = best;
    }

    fn recalculate_annotations_to_root(&mut self, node: NodeKey) {
        let mut cur = Some(node);
        while let Some(n) = cur {
            self.recalculate_annotation(n);
            cur = self.nodes[n].parent;
        }
    }

    /// Can a point in `[lower, upper]` (by bound semantics) exist at all?
    /// Reuses `Interval::is_empty` rather than re-deriving edge-comparison
    /// rules for pruning.
    fn range_nonempty(lower: &crate::interval::Edge<D>, upper: &crate::interval::Edge<D>) -> bool {
        !Interval {
            lower: lower.clone(),
            upper: upper.clone(),
        }
        .is_empty()
    }

    fn query_overlap(&self, query: &Interval<D>, out: &mut Vec<NodeKey>) {
        self.query_overlap_subtree(self.root, query, out);
    }

    fn query_overlap_subtree(&self, node: Option<NodeKey>, query: &Interval<D>, out: &mut Vec<NodeKey>) {
        let Some(node) = node else {
            return;
        };
        let subtree_max_upper = self.nodes[self.nodes[node].max_upper_bound]
            .interval
            .upper_edge();
        if !Self::range_nonempty(query.lower_edge(), subtree_max_upper) {
            return;
        }
        self.query_overlap_subtree(self.nodes[node].child[0], query, out);
        if self.nodes[node].interval.intersects(query) {
            out.push(node);
        }
        if Self::range_nonempty(self.nodes[node].interval.lower_edge(), query.upper_edge()) {
            self.query_overlap_subtree(self.nodes[node].child[1], query, out);
        }
    }

    fn in_order(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.in_order_subtree(self.root, &mut out);
        out
    }

    fn in_order_subtree(&self, node: Option<NodeKey>, out: &mut Vec<NodeKey>) {
        let Some(node) = node else {
            return;
        };
        self.in_order_subtree(self.nodes[node].child[0], out);
        out.push(node);
        self.in_order_subtree(self.nodes[node].child[1], out);
    }

    fn record_of(&self, n: NodeKey) -> ValueInterval<V, D> {
        ValueInterval::new(self.nodes[n].value.clone(), self.nodes[n].interval.clone())
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        if let Some(root) = self.root {
            assert_eq!(self.nodes[root].parent, None);
            let (_, size) = self.check_invariants_at(root);
            assert_eq!(size, self.nodes.len());
        } else {
            assert_eq!(self.nodes.len(), 0);
        }
    }

    #[cfg(test)]
    fn check_invariants_at(&self, n: NodeKey) -> (NodeKey, usize) {
        let mut max_ub = n;
        let mut size = 1;
        for child in self.nodes[n].child {
            if let Some(c) = child {
                assert_eq!(self.nodes[c].parent, Some(n));
                let (next, sub_size) = self.check_invariants_at(c);
                size += sub_size;
                if self.nodes[next]
                    .interval
                    .cmp_upper_to(&self.nodes[max_ub].interval)
                    == std::cmp::Ordering::Greater
                {
                    max_ub = next;
                }
            }
        }
        assert_eq!(
            self.nodes[self.nodes[n].max_upper_bound]
                .interval
                .cmp_upper_to(&self.nodes[max_ub].interval),
            std::cmp::Ordering::Equal
        );
        (max_ub, size)
    }
}

impl<V, D> Engine<V, D> for TreeEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, value: V, interval: Interval<D>) {
        self.bound_convention.observe(&interval);
        if interval.is_empty() {
            return;
        }
        let mut hull = interval;
        let mut touching = Vec::new();
        for n in self.collect_value_nodes(&value) {
            if self.nodes[n].interval.touches(&hull) {
                hull = hull.hull(&self.nodes[n].interval);
                touching.push(n);
            }
        }
        for n in touching {
            self.remove_tree_node(n);
        }
        self.insert_fresh(value, hull);
    }

    fn erase_value(&mut self, value: &V, interval: &Interval<D>) {
        self.bound_convention.observe(interval);
        if interval.is_empty() {
            return;
        }
        let overlapping: Vec<NodeKey> = self
            .collect_value_nodes(value)
            .into_iter()
            .filter(|&n| self.nodes[n].interval.intersects(interval))
            .collect();
        for n in overlapping {
            let stored = self.nodes[n].interval.clone();
            self.remove_tree_node(n);
            let left = stored.left_subtract(interval);
            let right = stored.right_subtract(interval);
            if !left.is_empty() {
                self.insert_fresh(value.clone(), left);
            }
            if !right.is_empty() {
                self.insert_fresh(value.clone(), right);
            }
        }
    }

    fn erase_all(&mut self, interval: &Interval<D>) {
        self.bound_convention.observe(interval);
        if interval.is_empty() {
            return;
        }
        let mut overlapping = Vec::new();
        self.query_overlap(interval, &mut overlapping);
        for n in overlapping {
            let value = self.nodes[n].value.clone();
            let stored = self.nodes[n].interval.clone();
            self.remove_tree_node(n);
            let left = stored.left_subtract(interval);
            let right = stored.right_subtract(interval);
            if !left.is_empty() {
                self.insert_fresh(value.clone(), left);
            }
            if !right.is_empty() {
                self.insert_fresh(value, right);
            }
        }
    }

    fn intervals(&self, query: &Interval<D>) -> Vec<ValueInterval<V, D>> {
        let mut overlapping = Vec::new();
        self.query_overlap(query, &mut overlapping);
        let mut out: Vec<ValueInterval<V, D>> = overlapping
            .into_iter()
            .map(|n| {
                let mut record = self.record_of(n);
                record.interval = record.interval.intersect(query);
                record
            })
            .filter(|r| !r.interval.is_empty())
            .collect();
        out.sort_by(|a, b| a.interval.cmp_by_bounds(&b.interval).then_with(|| a.value.cmp(&b.value)));
        out
    }

    fn disjoint_intervals(&self, query: &Interval<D>) -> Vec<(HashSet<V>, Interval<D>)> {
        let records = self.in_order().into_iter().map(|n| self.record_of(n));
        adaptor::disjoint_intervals(records, query).collect()
    }

    fn gaps(&self) -> Vec<Interval<D>> {
        let records = self.in_order().into_iter().map(|n| self.record_of(n));
        adaptor::gaps(records).collect()
    }

    fn sandwiched_gaps(&self) -> Vec<(HashSet<V>, Interval<D>, HashSet<V>)> {
        let records = self.in_order().into_iter().map(|n| self.record_of(n));
        adaptor::sandwiched_gaps(records).collect()
    }

    fn initial_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        let records = self.in_order().into_iter().map(|n| self.record_of(n));
        adaptor::initial_values(records)
    }

    fn final_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        let records: Vec<_> = self.in_order().into_iter().map(|n| self.record_of(n)).collect();
        adaptor::final_values(records)
    }

    fn merged_with(&mut self, other: &Self) {
        for n in other.in_order() {
            let record = other.record_of(n);
            self.insert(record.value, record.interval);
        }
    }

    fn subtract_by(&mut self, other: &Self) {
        for n in other.in_order() {
            let record = other.record_of(n);
            self.erase_value(&record.value, &record.interval);
        }
    }
}

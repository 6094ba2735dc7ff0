//! The storage engine contract (spec §4.2–§4.4) and the runtime-selectable
//! enum of the three concrete engines.
//!
//! `Dict` is written only against [`Engine`]; it never reaches into a
//! concrete engine's internals. Keeping the three engines behind one
//! trait, dispatched through [`AnyEngine`] rather than a trait object, is
//! the same trade spec.md §9 calls out: "avoid virtual-call hot paths
//! inside iteration; prefer monomorphisation... an enum-of-engines is
//! acceptable when dynamic selection is required at runtime."

pub mod ail;
pub mod disjoint;
pub mod tree;

use std::{
    collections::HashSet,
    hash::Hash,
};

use crate::{
    adaptor::ValueInterval,
    domain::{
        BoundedDomain,
        DomainPoint,
    },
    interval::{
        EdgeKind,
        Interval,
    },
};

/// Tracks the openness convention each side of an engine's intervals has
/// settled on, and flags the programmer error of mixing conventions within
/// one engine (spec §3's invariant 2, §7's detectable error list). `Unbounded`
/// edges carry no convention and are ignored on whichever side they appear.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundConvention {
    lower: Option<EdgeKind>,
    upper: Option<EdgeKind>,
}

impl BoundConvention {
    /// Call on every `insert`/`erase` with the interval being applied.
    pub fn observe<D: DomainPoint>(&mut self, interval: &Interval<D>) {
        Self::observe_side(&mut self.lower, interval.lower_edge().kind(), "lower");
        Self::observe_side(&mut self.upper, interval.upper_edge().kind(), "upper");
    }

    fn observe_side(slot: &mut Option<EdgeKind>, kind: EdgeKind, side: &'static str) {
        if kind == EdgeKind::Unbounded {
            return;
        }
        match slot {
            None => *slot = Some(kind),
            Some(prev) if *prev != kind => {
                debug_assert!(
                    false,
                    "mixed bound conventions on {side} edge: expected {prev:?}, got {kind:?}"
                );
                tracing::warn!(
                    side,
                    expected = ?prev,
                    got = ?kind,
                    "mixed bound conventions within one engine"
                );
            },
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Interval;

    #[test]
    fn bound_convention_accepts_consistent_openness() {
        let mut convention = BoundConvention::default();
        convention.observe(&Interval::half_open(0i64, 5));
        convention.observe(&Interval::half_open(5i64, 10));
        convention.observe(&Interval::at_least(10i64));
    }

    #[test]
    #[should_panic(expected = "mixed bound conventions")]
    fn bound_convention_flags_mismatched_openness() {
        let mut convention = BoundConvention::default();
        convention.observe(&Interval::half_open(0i64, 5));
        convention.observe(&Interval::closed(10i64, 15));
    }
}

/// The operation vocabulary every storage engine must provide (spec §1's
/// "operation vocabulary" list: `insert`, `erase`, `intervals`,
/// `disjoint_intervals`, `gaps`, `sandwiched_gaps`, `initial_values`,
/// `final_values`, `merged_with`, `subtract_by`, `empty`).
pub trait Engine<V, D>: Default
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    fn is_empty(&self) -> bool;

    /// Adds `value` over `interval`. Empty intervals are ignored (spec §7).
    fn insert(&mut self, value: V, interval: Interval<D>);

    /// Removes `value` from every stored extent overlapping `interval`,
    /// leaving behind the `left_subtract`/`right_subtract` residuals
    /// (invariant 4). A value absent from the engine is a no-op.
    fn erase_value(&mut self, value: &V, interval: &Interval<D>);

    /// Removes every value's extent overlapping `interval`.
    fn erase_all(&mut self, interval: &Interval<D>);

    /// `(value, interval ∩ query)` for every overlap, sorted by
    /// `(lower_edge, upper_edge, value)`.
    fn intervals(&self, query: &Interval<D>) -> Vec<ValueInterval<V, D>>;

    /// The maximal disjoint segments of `query`, each tagged with the
    /// value set active over it, in interval order.
    fn disjoint_intervals(&self, query: &Interval<D>) -> Vec<(HashSet<V>, Interval<D>)>;

    /// The open gaps between consecutive touching groups, over the whole
    /// domain.
    fn gaps(&self) -> Vec<Interval<D>>;

    /// As `gaps`, plus the value sets immediately before/after each gap.
    fn sandwiched_gaps(&self) -> Vec<(HashSet<V>, Interval<D>, HashSet<V>)>;

    /// The intersection and union-of-values over the smallest lower edge
    /// stored, or `None` if the engine is empty.
    fn initial_values(&self) -> Option<(Interval<D>, HashSet<V>)>;

    /// As `initial_values`, over the largest upper edge.
    fn final_values(&self) -> Option<(Interval<D>, HashSet<V>)>;

    /// `self += other`.
    fn merged_with(&mut self, other: &Self);

    /// `self -= other`.
    fn subtract_by(&mut self, other: &Self);
}

/// A key's storage engine, chosen at construction time.
#[derive(Clone, Debug)]
pub enum AnyEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    Disjoint(disjoint::DisjointEngine<V, D>),
    Tree(tree::TreeEngine<V, D>),
    Ail(ail::AilEngine<V, D>),
}

/// Which concrete engine a `Dict` key should be backed by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineKind {
    Disjoint,
    #[default]
    Tree,
    Ail,
}

impl<V, D> AnyEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    pub fn new(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Disjoint => Self::Disjoint(Default::default()),
            EngineKind::Tree => Self::Tree(Default::default()),
            EngineKind::Ail => Self::Ail(Default::default()),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Disjoint(_) => EngineKind::Disjoint,
            Self::Tree(_) => EngineKind::Tree,
            Self::Ail(_) => EngineKind::Ail,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::Disjoint(e) => e.$method($($arg),*),
            Self::Tree(e) => e.$method($($arg),*),
            Self::Ail(e) => e.$method($($arg),*),
        }
    };
}

impl<V, D> AnyEngine<V, D>
where
    V: Clone + Eq + Hash + Ord,
    D: DomainPoint + BoundedDomain,
{
    pub fn is_empty(&self) -> bool {
        dispatch!(self, is_empty)
    }

    pub fn insert(&mut self, value: V, interval: Interval<D>) {
        dispatch!(self, insert, value, interval)
    }

    pub fn erase_value(&mut self, value: &V, interval: &Interval<D>) {
        dispatch!(self, erase_value, value, interval)
    }

    pub fn erase_all(&mut self, interval: &Interval<D>) {
        dispatch!(self, erase_all, interval)
    }

    pub fn intervals(&self, query: &Interval<D>) -> Vec<ValueInterval<V, D>> {
        dispatch!(self, intervals, query)
    }

    pub fn disjoint_intervals(&self, query: &Interval<D>) -> Vec<(HashSet<V>, Interval<D>)> {
        dispatch!(self, disjoint_intervals, query)
    }

    pub fn gaps(&self) -> Vec<Interval<D>> {
        dispatch!(self, gaps)
    }

    pub fn sandwiched_gaps(&self) -> Vec<(HashSet<V>, Interval<D>, HashSet<V>)> {
        dispatch!(self, sandwiched_gaps)
    }

    pub fn initial_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        dispatch!(self, initial_values)
    }

    pub fn final_values(&self) -> Option<(Interval<D>, HashSet<V>)> {
        dispatch!(self, final_values)
    }

    /// `self += other`. Panics (via the `expect` below) if the two
    /// engines are different kinds; `Dict` only ever merges same-kind
    /// engines since every key in one `Dict` shares its `EngineKind`.
    pub fn merged_with(&mut self, other: &Self) {
        match (self, other) {
            (Self::Disjoint(a), Self::Disjoint(b)) => a.merged_with(b),
            (Self::Tree(a), Self::Tree(b)) => a.merged_with(b),
            (Self::Ail(a), Self::Ail(b)) => a.merged_with(b),
            _ => panic!("merged_with: mismatched engine kinds"),
        }
    }

    pub fn subtract_by(&mut self, other: &Self) {
        match (self, other) {
            (Self::Disjoint(a), Self::Disjoint(b)) => a.subtract_by(b),
            (Self::Tree(a), Self::Tree(b)) => a.subtract_by(b),
            (Self::Ail(a), Self::Ail(b)) => a.subtract_by(b),
            _ => panic!("subtract_by: mismatched engine kinds"),
        }
    }
}

//! A generic interval over an ordered [`DomainPoint`], plus the fixed
//! operation vocabulary (`lower`, `upper`, `hull`, `intersect`, ...) that
//! the rest of the crate is written against.
//!
//! This module is the concrete stand-in for what the specification calls
//! an external collaborator: the interval algebra itself. It is modeled
//! on the bound/edge split used by the grounding source's own interval
//! representation (one edge per side, each independently open or
//! closed), generalized from byte-string keys to any ordered domain.

use std::cmp::Ordering;

use crate::domain::{
    BoundedDomain,
    DomainPoint,
    StepDomain,
};

/// One side of an interval: how far it reaches, and whether that point is
/// itself included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edge<D> {
    /// Extends to -infinity (as a lower edge) or +infinity (as an upper
    /// edge).
    Unbounded,
    Inclusive(D),
    Exclusive(D),
}

/// The openness of an [`Edge`], with its coordinate stripped off. Used to
/// check that every interval fed to one engine agrees on which sides are
/// inclusive and which are exclusive (spec §7's "bound semantics" programmer
/// error).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    Unbounded,
    Inclusive,
    Exclusive,
}

impl<D> Edge<D> {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Edge::Unbounded => EdgeKind::Unbounded,
            Edge::Inclusive(_) => EdgeKind::Inclusive,
            Edge::Exclusive(_) => EdgeKind::Exclusive,
        }
    }
}

impl<D: DomainPoint> Edge<D> {
    pub fn value(&self) -> Option<&D> {
        match self {
            Edge::Unbounded => None,
            Edge::Inclusive(v) | Edge::Exclusive(v) => Some(v),
        }
    }

    pub fn is_inclusive(&self) -> bool {
        matches!(self, Edge::Inclusive(_))
    }

    /// Treating `self` as a lower edge, does `point` satisfy it?
    fn admits_at_or_after(&self, point: &D) -> bool {
        match self {
            Edge::Unbounded => true,
            Edge::Inclusive(v) => point >= v,
            Edge::Exclusive(v) => point > v,
        }
    }

    /// Treating `self` as an upper edge, does `point` satisfy it?
    fn admits_at_or_before(&self, point: &D) -> bool {
        match self {
            Edge::Unbounded => true,
            Edge::Inclusive(v) => point <= v,
            Edge::Exclusive(v) => point < v,
        }
    }

    /// The complementary upper edge of "everything before this lower
    /// edge". `None` if this lower edge is unbounded (nothing is before
    /// -infinity).
    fn complement_as_upper(&self) -> Option<Edge<D>> {
        match self {
            Edge::Unbounded => None,
            Edge::Inclusive(v) => Some(Edge::Exclusive(v.clone())),
            Edge::Exclusive(v) => Some(Edge::Inclusive(v.clone())),
        }
    }

    /// The complementary lower edge of "everything after this upper
    /// edge". `None` if this upper edge is unbounded.
    fn complement_as_lower(&self) -> Option<Edge<D>> {
        match self {
            Edge::Unbounded => None,
            Edge::Inclusive(v) => Some(Edge::Exclusive(v.clone())),
            Edge::Exclusive(v) => Some(Edge::Inclusive(v.clone())),
        }
    }

    pub(crate) fn cmp_as_lower(a: &Self, b: &Self) -> Ordering {
        match (a, b) {
            (Edge::Unbounded, Edge::Unbounded) => Ordering::Equal,
            (Edge::Unbounded, _) => Ordering::Less,
            (_, Edge::Unbounded) => Ordering::Greater,
            (Edge::Inclusive(x), Edge::Inclusive(y)) => x.cmp(y),
            (Edge::Exclusive(x), Edge::Exclusive(y)) => x.cmp(y),
            (Edge::Inclusive(x), Edge::Exclusive(y)) => match x.cmp(y) {
                Ordering::Equal => Ordering::Less,
                o => o,
            },
            (Edge::Exclusive(x), Edge::Inclusive(y)) => match x.cmp(y) {
                Ordering::Equal => Ordering::Greater,
                o => o,
            },
        }
    }

    pub(crate) fn cmp_as_upper(a: &Self, b: &Self) -> Ordering {
        match (a, b) {
            (Edge::Unbounded, Edge::Unbounded) => Ordering::Equal,
            (Edge::Unbounded, _) => Ordering::Greater,
            (_, Edge::Unbounded) => Ordering::Less,
            (Edge::Inclusive(x), Edge::Inclusive(y)) => x.cmp(y),
            (Edge::Exclusive(x), Edge::Exclusive(y)) => x.cmp(y),
            (Edge::Inclusive(x), Edge::Exclusive(y)) => match x.cmp(y) {
                Ordering::Equal => Ordering::Greater,
                o => o,
            },
            (Edge::Exclusive(x), Edge::Inclusive(y)) => match x.cmp(y) {
                Ordering::Equal => Ordering::Less,
                o => o,
            },
        }
    }
}

/// A contiguous range `[lower, upper]`-ish over `D`, with each side
/// independently open, closed, or unbounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval<D> {
    pub lower: Edge<D>,
    pub upper: Edge<D>,
}

impl<D: DomainPoint> Interval<D> {
    pub fn closed(lo: D, hi: D) -> Self {
        Self {
            lower: Edge::Inclusive(lo),
            upper: Edge::Inclusive(hi),
        }
    }

    /// `[lo, hi)`.
    pub fn half_open(lo: D, hi: D) -> Self {
        Self {
            lower: Edge::Inclusive(lo),
            upper: Edge::Exclusive(hi),
        }
    }

    /// `(lo, hi]`.
    pub fn half_open_left(lo: D, hi: D) -> Self {
        Self {
            lower: Edge::Exclusive(lo),
            upper: Edge::Inclusive(hi),
        }
    }

    pub fn open(lo: D, hi: D) -> Self {
        Self {
            lower: Edge::Exclusive(lo),
            upper: Edge::Exclusive(hi),
        }
    }

    pub fn at_least(lo: D) -> Self {
        Self {
            lower: Edge::Inclusive(lo),
            upper: Edge::Unbounded,
        }
    }

    pub fn at_most(hi: D) -> Self {
        Self {
            lower: Edge::Unbounded,
            upper: Edge::Inclusive(hi),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            lower: Edge::Unbounded,
            upper: Edge::Unbounded,
        }
    }

    pub fn empty() -> Self
    where
        D: BoundedDomain,
    {
        Self {
            lower: Edge::Inclusive(D::MIN),
            upper: Edge::Exclusive(D::MIN),
        }
    }

    pub fn single(point: D) -> Self {
        Self::closed(point.clone(), point)
    }

    pub fn lower_edge(&self) -> &Edge<D> {
        &self.lower
    }

    pub fn upper_edge(&self) -> &Edge<D> {
        &self.upper
    }

    pub fn lower(&self) -> Option<&D> {
        self.lower.value()
    }

    pub fn upper(&self) -> Option<&D> {
        self.upper.value()
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Edge::Unbounded, _) | (_, Edge::Unbounded) => false,
            (Edge::Inclusive(l), Edge::Inclusive(u)) => l > u,
            (Edge::Inclusive(l), Edge::Exclusive(u)) => l >= u,
            (Edge::Exclusive(l), Edge::Inclusive(u)) => l >= u,
            (Edge::Exclusive(l), Edge::Exclusive(u)) => l >= u,
        }
    }

    pub fn contains(&self, point: &D) -> bool {
        self.lower.admits_at_or_after(point) && self.upper.admits_at_or_before(point)
    }

    /// `self` lies entirely at-or-before `other` with no shared point,
    /// i.e. there is no `p` with `p` in both. Touching boundaries (no gap,
    /// no overlap) count as exclusive-less.
    pub fn exclusive_less(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        match (&self.upper, &other.lower) {
            (Edge::Unbounded, _) | (_, Edge::Unbounded) => false,
            (Edge::Inclusive(u), Edge::Inclusive(l)) => u < l,
            (Edge::Inclusive(u), Edge::Exclusive(l))
            | (Edge::Exclusive(u), Edge::Inclusive(l))
            | (Edge::Exclusive(u), Edge::Exclusive(l)) => u <= l,
        }
    }

    /// `!self.exclusive_less(other)`: `self` reaches into, or touches,
    /// `other`. Named for the pruning walks (tree/AIL) that ask "is it
    /// worth looking at this subtree/run for `other`", where the
    /// affirmative case is exactly this.
    pub fn more_or_touches(&self, other: &Self) -> bool {
        !self.exclusive_less(other)
    }

    fn is_adjacent_one_way(&self, other: &Self) -> bool {
        matches!(
            (&self.upper, &other.lower),
            (Edge::Exclusive(u), Edge::Inclusive(l)) if u == l
        ) || matches!(
            (&self.upper, &other.lower),
            (Edge::Inclusive(u), Edge::Exclusive(l)) if u == l
        )
    }

    pub fn is_adjacent(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.is_adjacent_one_way(other) || other.is_adjacent_one_way(self)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && !self.exclusive_less(other) && !other.exclusive_less(self)
    }

    pub fn touches(&self, other: &Self) -> bool {
        self.intersects(other) || self.is_adjacent(other)
    }

    /// The smallest interval containing both `self` and `other`.
    pub fn hull(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let lower = match Edge::cmp_as_lower(&self.lower, &other.lower) {
            Ordering::Greater => other.lower.clone(),
            _ => self.lower.clone(),
        };
        let upper = match Edge::cmp_as_upper(&self.upper, &other.upper) {
            Ordering::Less => other.upper.clone(),
            _ => self.upper.clone(),
        };
        Self { lower, upper }
    }

    /// The overlap of `self` and `other` (empty if they don't overlap).
    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        if other.is_empty() {
            return other.clone();
        }
        let lower = match Edge::cmp_as_lower(&self.lower, &other.lower) {
            Ordering::Less => other.lower.clone(),
            _ => self.lower.clone(),
        };
        let upper = match Edge::cmp_as_upper(&self.upper, &other.upper) {
            Ordering::Greater => other.upper.clone(),
            _ => self.upper.clone(),
        };
        Self { lower, upper }
    }

    /// The open gap strictly between `self` and `other`, assuming `self`
    /// is ordered before `other` (i.e. `self.exclusive_less(other)`).
    /// Empty if either side is unbounded in the relevant direction, or if
    /// there is no gap (they touch or overlap).
    pub fn inner_complement(&self, other: &Self) -> Self
    where
        D: BoundedDomain,
    {
        let (Some(lower), Some(upper)) = (
            self.upper.complement_as_lower(),
            other.lower.complement_as_upper(),
        ) else {
            return Self::empty();
        };
        let gap = Self { lower, upper };
        if gap.is_empty() {
            Self::empty()
        } else {
            gap
        }
    }

    /// The portion of `self` ordered strictly before `other`'s lower edge.
    pub fn left_subtract(&self, other: &Self) -> Self
    where
        D: BoundedDomain,
    {
        let Some(upper) = other.lower.complement_as_upper() else {
            return Self::empty();
        };
        let before_other = Self {
            lower: Edge::Unbounded,
            upper,
        };
        self.intersect(&before_other)
    }

    /// The portion of `self` ordered strictly after `other`'s upper edge.
    pub fn right_subtract(&self, other: &Self) -> Self
    where
        D: BoundedDomain,
    {
        let Some(lower) = other.upper.complement_as_lower() else {
            return Self::empty();
        };
        let after_other = Self {
            lower,
            upper: Edge::Unbounded,
        };
        self.intersect(&after_other)
    }

    /// Extend the upper bound forward by `delta` (saturating at the
    /// domain's maximum); the lower bound is unchanged.
    pub fn right_extend(&self, delta: &D::Delta) -> Self
    where
        D: StepDomain,
    {
        let upper = match &self.upper {
            Edge::Unbounded => Edge::Unbounded,
            Edge::Inclusive(v) => Edge::Inclusive(v.step_forward(delta)),
            Edge::Exclusive(v) => Edge::Exclusive(v.step_forward(delta)),
        };
        Self {
            lower: self.lower.clone(),
            upper,
        }
    }

    /// Extend the lower bound backward by `delta` (saturating at the
    /// domain's minimum); the upper bound is unchanged.
    pub fn left_extend(&self, delta: &D::Delta) -> Self
    where
        D: StepDomain,
    {
        let lower = match &self.lower {
            Edge::Unbounded => Edge::Unbounded,
            Edge::Inclusive(v) => Edge::Inclusive(v.step_backward(delta)),
            Edge::Exclusive(v) => Edge::Exclusive(v.step_backward(delta)),
        };
        Self {
            lower,
            upper: self.upper.clone(),
        }
    }

    /// Ordering by `(lower_edge, upper_edge)`, used wherever the spec
    /// calls for intervals sorted by `(lower, upper)` (AIL runs, tree tie
    /// breaks, `intervals()` output order).
    pub fn cmp_by_bounds(&self, other: &Self) -> Ordering {
        Edge::cmp_as_lower(&self.lower, &other.lower)
            .then_with(|| Edge::cmp_as_upper(&self.upper, &other.upper))
    }

    pub fn cmp_lower_to(&self, other: &Self) -> Ordering {
        Edge::cmp_as_lower(&self.lower, &other.lower)
    }

    pub fn cmp_upper_to(&self, other: &Self) -> Ordering {
        Edge::cmp_as_upper(&self.upper, &other.upper)
    }
}

impl<D: DomainPoint> std::ops::BitAnd for &Interval<D> {
    type Output = Interval<D>;

    fn bitand(self, rhs: Self) -> Interval<D> {
        self.intersect(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_overlap() {
        let a = Interval::half_open(0i64, 10);
        let b = Interval::half_open(5i64, 15);
        assert!(a.intersects(&b));
        assert_eq!(a.intersect(&b), Interval::half_open(5, 10));
        assert_eq!(a.hull(&b), Interval::half_open(0, 15));
    }

    #[test]
    fn touching_half_open_intervals() {
        let a = Interval::half_open(0i64, 5);
        let b = Interval::half_open(5i64, 10);
        assert!(!a.intersects(&b));
        assert!(a.is_adjacent(&b));
        assert!(a.touches(&b));
        assert!(a.exclusive_less(&b));
    }

    #[test]
    fn gap_between_disjoint_intervals() {
        let a = Interval::half_open(0i64, 5);
        let b = Interval::half_open(10i64, 15);
        assert!(a.exclusive_less(&b));
        assert_eq!(a.inner_complement(&b), Interval::half_open(5, 10));
    }

    #[test]
    fn subtract_overlap() {
        let a = Interval::half_open(0i64, 10);
        let b = Interval::half_open(3i64, 7);
        assert_eq!(a.left_subtract(&b), Interval::half_open(0, 3));
        assert_eq!(a.right_subtract(&b), Interval::half_open(7, 10));
    }

    #[test]
    fn closed_vs_half_open_single_point_gap() {
        // (0, 5] and (5, 10): these touch at 5 (5 not in either set).
        let a = Interval::half_open_left(0i64, 5);
        let b = Interval::open(5i64, 10);
        assert!(a.is_adjacent(&b));
        assert!(!a.intersects(&b));
    }

    #[test]
    fn extend_saturates() {
        let a = Interval::half_open(0i64, 10);
        assert_eq!(a.right_extend(&3), Interval::half_open(0, 13));
        assert_eq!(a.left_extend(&3), Interval::half_open(-3, 10));
        assert_eq!(a.right_extend(&i64::MAX), Interval::half_open(0, i64::MAX));
    }

    #[test]
    fn unbounded_edges() {
        let a = Interval::at_least(0i64);
        let b = Interval::at_most(10i64);
        assert!(a.intersects(&b));
        assert_eq!(a.intersect(&b), Interval::closed(0, 10));
        assert_eq!(a.hull(&b), Interval::unbounded());
    }

    #[test]
    fn empty_interval_is_empty() {
        assert!(Interval::<i64>::empty().is_empty());
        assert!(!Interval::half_open(0i64, 1).is_empty());
        assert!(Interval::half_open(5i64, 5).is_empty());
        assert!(Interval::open(5i64, 5).is_empty());
        assert!(!Interval::closed(5i64, 5).is_empty());
    }
}

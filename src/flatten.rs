//! Flatten policies (spec §4.6.1): how a key's overlapping values collapse
//! into at most one value per point.

/// Decides the surviving value for one maximal touching slot during
/// `Dict::flatten`.
///
/// `status_quo` is the value chosen for the immediately preceding slot (if
/// it touches this one and is still among `candidates`); `candidates` is
/// the value set active over the slot's interval, already sorted.
pub trait FlattenPolicy<V> {
    fn resolve(&self, status_quo: Option<&V>, candidates: &[V]) -> Option<V>;
}

/// Always discards: every slot collapses to no value.
#[derive(Clone, Copy, Debug, Default)]
pub struct Discard;

impl<V> FlattenPolicy<V> for Discard {
    fn resolve(&self, _status_quo: Option<&V>, _candidates: &[V]) -> Option<V> {
        None
    }
}

/// Keeps the running status quo when it's still a candidate; otherwise
/// delegates to a fallback policy.
pub struct PreferStatusQuo<F> {
    fallback: F,
}

impl<F> PreferStatusQuo<F> {
    pub fn new(fallback: F) -> Self {
        Self { fallback }
    }
}

impl<V, F> FlattenPolicy<V> for PreferStatusQuo<F>
where
    V: Clone + PartialEq,
    F: FlattenPolicy<V>,
{
    fn resolve(&self, status_quo: Option<&V>, candidates: &[V]) -> Option<V> {
        if let Some(current) = status_quo {
            if candidates.contains(current) {
                return Some(current.clone());
            }
        }
        self.fallback.resolve(status_quo, candidates)
    }
}

/// Picks the candidate a caller-supplied ranking function scores highest;
/// ties keep the earlier candidate in `candidates`' order.
pub struct PreferRanked<F> {
    rank: F,
}

impl<F> PreferRanked<F> {
    pub fn new(rank: F) -> Self {
        Self { rank }
    }
}

impl<V, F, R> FlattenPolicy<V> for PreferRanked<F>
where
    V: Clone,
    F: Fn(&V) -> R,
    R: PartialOrd,
{
    fn resolve(&self, _status_quo: Option<&V>, candidates: &[V]) -> Option<V> {
        candidates
            .iter()
            .fold(None::<&V>, |best, candidate| match best {
                None => Some(candidate),
                Some(current) => {
                    if (self.rank)(candidate) > (self.rank)(current) {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                },
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_always_none() {
        assert_eq!(Discard.resolve(Some(&1), &[1, 2]), None);
        assert_eq!(Discard.resolve(None::<&i32>, &[]), None);
    }

    #[test]
    fn prefer_status_quo_keeps_surviving_value() {
        let policy = PreferStatusQuo::new(Discard);
        assert_eq!(policy.resolve(Some(&2), &[1, 2, 3]), Some(2));
        assert_eq!(policy.resolve(Some(&9), &[1, 2, 3]), None);
        assert_eq!(policy.resolve(None, &[1, 2, 3]), None);
    }

    #[test]
    fn prefer_ranked_picks_max() {
        let policy = PreferRanked::new(|v: &i32| *v);
        assert_eq!(policy.resolve(None, &[3, 1, 2]), Some(3));
    }
}

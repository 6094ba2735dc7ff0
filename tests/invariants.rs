//! Universal invariants (see the worked-example scenarios in
//! `scenarios.rs`), checked against randomly generated batches of
//! `(key, value, interval)` triples via `proptest`.

use std::{
    collections::HashSet,
    env,
    fmt::Debug,
    str::FromStr,
};

use interval_dict::{
    engine::{
        tree::TreeEngine,
        Engine,
    },
    flatten::Discard,
    Dict,
    EngineKind,
    Interval,
};
use proptest::prelude::*;

/// Reads `name` from the environment and parses it as `T`, falling back to
/// `default` if unset or unparsable. A trimmed-down stand-in for
/// `cmd_util::env::env_config` (the full crate pulls in `tracing-subscriber`
/// for a test binary that doesn't need it) so the case count stays tunable
/// the same way, e.g. `INTERVAL_DICT_PROPTEST_MULTIPLIER=8 cargo test`.
fn env_config<T: Debug + FromStr>(name: &str, default: T) -> T {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn iv(lo: i64, hi: i64) -> Interval<i64> {
    Interval::half_open(lo, hi)
}

fn triple() -> impl Strategy<Value = (char, i32, i64, i64)> {
    (
        prop::sample::select(vec!['a', 'b', 'c']),
        0..4i32,
        0..40i64,
        1..10i64,
    )
        .prop_map(|(k, v, lo, span)| (k, v, lo, lo + span))
}

fn triples() -> impl Strategy<Value = Vec<(char, i32, i64, i64)>> {
    prop::collection::vec(triple(), 0..20)
}

fn build(ops: &[(char, i32, i64, i64)]) -> Dict<char, i32, i64> {
    let mut d = Dict::new(EngineKind::Tree);
    for &(k, v, lo, hi) in ops {
        d.insert(k, v, iv(lo, hi));
    }
    d
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32 * env_config("INTERVAL_DICT_PROPTEST_MULTIPLIER", 1),
        .. ProptestConfig::default()
    })]

    #[test]
    fn insert_then_erase_is_identity(ops in triples()) {
        let mut d = build(&[]);
        let before = d.dump();
        for &(k, v, lo, hi) in &ops {
            d.insert(k, v, iv(lo, hi));
        }
        for &(k, v, lo, hi) in &ops {
            d.erase_value(&k, &v, &iv(lo, hi));
        }
        prop_assert_eq!(d.dump(), before);
    }

    #[test]
    fn self_subtraction_is_empty(ops in triples()) {
        let d = build(&ops);
        let mut diff = d.clone();
        diff.subtract(&d);
        prop_assert!(diff.is_empty());
    }

    #[test]
    fn union_and_difference_with_empty_are_identity(ops in triples()) {
        let d = build(&ops);
        let empty: Dict<char, i32, i64> = Dict::new(EngineKind::Tree);

        let mut plus_empty = d.clone();
        plus_empty.merge(&empty);
        prop_assert_eq!(plus_empty.dump(), d.dump());

        let mut minus_empty = d.clone();
        minus_empty.subtract(&empty);
        prop_assert_eq!(minus_empty.dump(), d.dump());
    }

    #[test]
    fn invert_is_involutive(ops in triples()) {
        let d = build(&ops);
        prop_assert_eq!(d.invert().invert().dump(), d.dump());
    }

    #[test]
    fn all_intervals_is_sorted_by_key_then_bounds(ops in triples()) {
        let d = build(&ops);
        let entries = d.all_intervals();
        for pair in entries.windows(2) {
            let (k0, r0) = &pair[0];
            let (k1, r1) = &pair[1];
            prop_assert!(
                k0 < k1 || (k0 == k1 && r0.interval.cmp_by_bounds(&r1.interval) != std::cmp::Ordering::Greater)
            );
        }
    }

    #[test]
    fn find_is_monotonic_under_query_containment(ops in triples(), q1_lo in 0..40i64, q1_span in 1..5i64, pad in 0..5i64) {
        let d = build(&ops);
        let q1 = iv(q1_lo, q1_lo + q1_span);
        let q2 = iv(q1_lo.saturating_sub(pad), q1_lo + q1_span + pad);
        for key in d.keys() {
            let narrow: HashSet<i32> = d.find(&key, &q1).into_iter().collect();
            let wide: HashSet<i32> = d.find(&key, &q2).into_iter().collect();
            prop_assert!(narrow.is_subset(&wide));
        }
    }

    #[test]
    fn flatten_discard_yields_at_most_one_value_per_point(ops in triples()) {
        let mut d = build(&ops);
        d.flatten(&Discard);
        for key in d.keys() {
            for point in 0..40i64 {
                prop_assert!(d.find_point(&key, point).len() <= 1);
            }
        }
    }

    #[test]
    fn fill_gaps_is_idempotent(ops in triples()) {
        let mut once = build(&ops);
        once.fill_gaps(5);
        let mut twice = once.clone();
        twice.fill_gaps(5);
        prop_assert_eq!(once.dump(), twice.dump());
    }

    #[test]
    fn bidict_forward_and_inverse_agree_pointwise(ops in triples()) {
        let mut bidict: interval_dict::BiDict<char, i32, i64> = interval_dict::BiDict::new(EngineKind::Tree);
        for &(k, v, lo, hi) in &ops {
            bidict.insert(k, v, iv(lo, hi));
        }
        for point in 0..40i64 {
            for key in bidict.keys() {
                for value in bidict.find(&key, &iv(point, point + 1)) {
                    prop_assert!(bidict.inverse_find(&value, &iv(point, point + 1)).contains(&key));
                }
            }
        }
    }
}

#[test]
fn disjoint_intervals_never_overlap_within_one_key() {
    let mut e: TreeEngine<i32, i64> = TreeEngine::default();
    for (v, lo, hi) in [(1, 0, 10), (2, 5, 15), (3, 8, 20), (1, 25, 30)] {
        e.insert(v, iv(lo, hi));
    }
    let segments = e.disjoint_intervals(&Interval::unbounded());
    for pair in segments.windows(2) {
        assert_no_overlap(&pair[0].1, &pair[1].1);
    }
}

fn assert_no_overlap(a: &Interval<i64>, b: &Interval<i64>) {
    assert!(!a.intersects(b), "{a:?} and {b:?} should not overlap");
}

//! End-to-end scenarios transcribed from the system's worked examples:
//! literal half-open integer intervals `[a, b)`, exact expected output.

use interval_dict::{
    dict::FillDirection,
    flatten::{
        Discard,
        PreferStatusQuo,
    },
    Dict,
    EngineKind,
};

fn iv(lo: i64, hi: i64) -> interval_dict::Interval<i64> {
    interval_dict::Interval::half_open(lo, hi)
}

#[test]
fn s1_basic_insert_and_find() {
    let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    d.insert("a", 1, iv(0, 10));
    d.insert("a", 2, iv(5, 15));

    assert_eq!(d.find(&"a", &iv(2, 3)), vec![1]);
    assert_eq!(d.find(&"a", &iv(7, 8)), vec![1, 2]);
    assert_eq!(d.find(&"a", &iv(12, 13)), vec![2]);
    assert!(d.find(&"a", &iv(20, 21)).is_empty());
}

#[test]
fn s2_fill_gaps_common_value() {
    let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    d.insert("k", 1, iv(0, 10));
    d.insert("k", 2, iv(0, 10));
    d.insert("k", 1, iv(20, 30));
    d.insert("k", 3, iv(20, 30));

    // The gap [10, 20) is well under `2 * max_extension`, so it's filled
    // entirely by the value common to both sides.
    d.fill_gaps(100);

    assert_eq!(d.find(&"k", &iv(12, 13)), vec![1]);
    assert_eq!(d.find(&"k", &iv(2, 3)), vec![1, 2]);
    assert_eq!(d.find(&"k", &iv(22, 23)), vec![1, 3]);
}

#[test]
fn s3_extend_into_gaps_both() {
    let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    d.insert("k", 1, iv(0, 10));
    d.insert("k", 2, iv(0, 10));
    d.insert("k", 1, iv(20, 30));
    d.insert("k", 3, iv(20, 30));

    d.extend_into_gaps(FillDirection::Both, 3);

    // The before-group {1, 2} extends forward up to 3 past 10, the
    // after-group {1, 3} extends backward up to 3 before 20; the two
    // windows don't overlap (gap width 10 > 2 * 3), so both survive whole.
    assert_eq!(d.find(&"k", &iv(10, 11)), vec![1, 2]);
    assert_eq!(d.find(&"k", &iv(17, 18)), vec![1, 3]);
    // The untouched middle of the gap stays empty.
    assert!(d.find(&"k", &iv(14, 15)).is_empty());
}

#[test]
fn s4_invert_and_join() {
    let mut a: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    a.insert("x", 1, iv(0, 10));
    let mut b: Dict<i32, &str, i64> = Dict::new(EngineKind::Tree);
    b.insert(1, "P", iv(5, 20));

    let joined = a.joined_to(&b);
    assert_eq!(joined.find(&"x", &iv(5, 10)), vec!["P"]);
    assert!(joined.find(&"x", &iv(0, 5)).is_empty());
}

#[test]
fn s5_flatten_prefer_status_quo() {
    let mut d: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    d.insert("k", 1, iv(0, 20));
    d.insert("k", 1, iv(20, 30));
    d.insert("k", 2, iv(20, 30));
    d.insert("k", 1, iv(30, 40));

    d.flatten(&PreferStatusQuo::new(Discard));

    assert_eq!(d.find(&"k", &iv(20, 30)), vec![1]);
    assert_eq!(d.find(&"k", &iv(0, 20)), vec![1]);
    assert_eq!(d.find(&"k", &iv(30, 40)), vec![1]);
}

#[test]
fn s6_subtract_overlap() {
    let mut a: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    a.insert("k", 1, iv(0, 10));
    let mut b: Dict<&str, i32, i64> = Dict::new(EngineKind::Tree);
    b.insert("k", 1, iv(3, 7));

    let result = a - &b;

    assert_eq!(result.find(&"k", &iv(0, 3)), vec![1]);
    assert_eq!(result.find(&"k", &iv(7, 10)), vec![1]);
    assert!(result.find(&"k", &iv(3, 7)).is_empty());
}

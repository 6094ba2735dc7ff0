use interval_dict::{
    Dict,
    EngineKind,
    Interval,
};
use tikv_jemallocator::Jemalloc;

#[global_allocator]
static ALLOC: Jemalloc = Jemalloc;

fn main() {
    divan::main();
}

fn iv(lo: i64, hi: i64) -> Interval<i64> {
    Interval::half_open(lo, hi)
}

#[divan::bench(args = [10, 100, 1000, 10000])]
fn insert_disjoint_tree(n: usize) -> Dict<u32, u32, i64> {
    let mut dict = Dict::new(EngineKind::Tree);
    for i in 0..n as i64 {
        dict.insert(0, i as u32, iv(i * 2, i * 2 + 1));
    }
    dict
}

#[divan::bench(args = [10, 100, 1000, 10000])]
fn insert_disjoint_ail(n: usize) -> Dict<u32, u32, i64> {
    let mut dict = Dict::new(EngineKind::Ail);
    for i in 0..n as i64 {
        dict.insert(0, i as u32, iv(i * 2, i * 2 + 1));
    }
    dict
}

#[divan::bench(args = [10, 100, 1000, 10000])]
fn insert_overlapping_tree(n: usize) -> Dict<u32, u32, i64> {
    let mut dict = Dict::new(EngineKind::Tree);
    for i in 0..n as i64 {
        dict.insert(0, i as u32, iv(0, i + 1));
    }
    dict
}

#[divan::bench(args = [100, 1000, 10000])]
fn query_point_tree(n: usize) -> Vec<u32> {
    let mut dict = Dict::new(EngineKind::Tree);
    for i in 0..n as i64 {
        dict.insert(0u32, i as u32, iv(i, i + 2));
    }
    dict.find_point(&0, n as i64 / 2)
}

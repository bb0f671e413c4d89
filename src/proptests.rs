use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, HashMap as StdHashMap, HashSet as StdHashSet};

fn validate_table<K, V, S: HashStrategy<K>>(t: &hash::RawTable<K, V, S>) {
    t.validate();
}

fn validate_tree<K: std::fmt::Debug, V, C: Comparator<K>>(t: &BPlusTreeMap<K, V, C>) {
    t.validate();
}

/// Exactly the entries of `[lo, hi)` (or `[lo, hi]`) under natural order.
fn in_range<K: Ord>(k: &K, lo: &K, hi: &K, inclusive: bool) -> bool {
    k >= lo && if inclusive { k <= hi } else { k < hi }
}

// =============================================================================
// Operation alphabets
// =============================================================================

#[derive(Clone, Debug, Arbitrary)]
enum HashOp {
    #[proptest(weight = 8)]
    Insert(#[proptest(strategy = "0u16..512")] u16, u32),
    #[proptest(weight = 4)]
    Remove(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 4)]
    Get(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 2)]
    PutIfAbsent(#[proptest(strategy = "0u16..512")] u16, u32),
    #[proptest(weight = 2)]
    AddTo(#[proptest(strategy = "0u16..512")] u16, u16),
    RemoveMultiplesOf(#[proptest(strategy = "2u16..16")] u16),
    Clear,
}

#[derive(Clone, Debug, Arbitrary)]
enum SetOp {
    #[proptest(weight = 8)]
    Add(#[proptest(strategy = "0u32..1024")] u32),
    #[proptest(weight = 4)]
    Remove(#[proptest(strategy = "0u32..1024")] u32),
    #[proptest(weight = 4)]
    Contains(#[proptest(strategy = "0u32..1024")] u32),
    RemoveBelow(#[proptest(strategy = "0u32..1024")] u32),
}

#[derive(Clone, Debug, Arbitrary)]
enum TreeOp {
    #[proptest(weight = 10)]
    Insert(#[proptest(strategy = "0u64..2048")] u64, u32),
    #[proptest(weight = 5)]
    Remove(#[proptest(strategy = "0u64..2048")] u64),
    #[proptest(weight = 3)]
    Get(#[proptest(strategy = "0u64..2048")] u64),
    #[proptest(weight = 2)]
    CountRange(
        #[proptest(strategy = "0u64..2048")] u64,
        #[proptest(strategy = "0u64..2048")] u64,
        bool,
    ),
    RemoveRange(
        #[proptest(strategy = "0u64..2048")] u64,
        #[proptest(strategy = "0u64..2048")] u64,
        bool,
    ),
    RemoveOddValues,
}

// =============================================================================
// Model equivalence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_hash_map_equivalence(
        robin_hood in any::<bool>(),
        ops in prop::collection::vec(any::<HashOp>(), 0..=2000)
    ) {
        let config = HashConfig::default().with_robin_hood(robin_hood);
        let mut t: HashMap<u16, u32> = HashMap::with_config(config).unwrap();
        let mut m: StdHashMap<u16, u32> = StdHashMap::new();

        for op in ops {
            match op {
                HashOp::Insert(k, v) => {
                    prop_assert_eq!(t.insert(k, v), m.insert(k, v));
                }
                HashOp::Remove(k) => {
                    prop_assert_eq!(t.remove(&k), m.remove(&k));
                }
                HashOp::Get(k) => {
                    prop_assert_eq!(t.get(&k), m.get(&k));
                }
                HashOp::PutIfAbsent(k, v) => {
                    let absent = !m.contains_key(&k);
                    m.entry(k).or_insert(v);
                    prop_assert_eq!(t.put_if_absent(k, v), absent);
                }
                HashOp::AddTo(k, inc) => {
                    let current = m.get(&k).copied().unwrap_or(0);
                    // `add_to` uses plain `+=`; skip sums that would overflow.
                    if let Some(sum) = current.checked_add(u32::from(inc)) {
                        m.insert(k, sum);
                        prop_assert_eq!(t.add_to(k, u32::from(inc)), sum);
                    }
                }
                HashOp::RemoveMultiplesOf(d) => {
                    let before = m.len();
                    m.retain(|k, _| k % d != 0);
                    prop_assert_eq!(t.remove_if(|k, _| k % d == 0), before - m.len());
                }
                HashOp::Clear => {
                    t.clear();
                    m.clear();
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_table(&t.table);
        let mut got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let mut expected: Vec<(u16, u32)> = m.into_iter().collect();
        got.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_hash_set_equivalence(
        robin_hood in any::<bool>(),
        ops in prop::collection::vec(any::<SetOp>(), 0..=2000)
    ) {
        let config = HashConfig::default().with_robin_hood(robin_hood).with_load_factor(0.9);
        let mut t: HashSet<u32> = HashSet::with_config(config).unwrap();
        let mut m: StdHashSet<u32> = StdHashSet::new();

        for op in ops {
            match op {
                SetOp::Add(k) => prop_assert_eq!(t.add(k), m.insert(k)),
                SetOp::Remove(k) => prop_assert_eq!(t.remove(&k), m.remove(&k)),
                SetOp::Contains(k) => prop_assert_eq!(t.contains(&k), m.contains(&k)),
                SetOp::RemoveBelow(bound) => {
                    let before = m.len();
                    m.retain(|k| *k >= bound);
                    prop_assert_eq!(t.remove_if(|k| *k < bound), before - m.len());
                }
            }
        }

        validate_table(&t.table);
        prop_assert_eq!(t.len(), m.len());
        prop_assert!(t.iter().all(|k| m.contains(k)));
    }

    #[test]
    fn prop_tree_equivalence(ops in prop::collection::vec(any::<TreeOp>(), 0..=2000)) {
        let mut t: BPlusTreeMap<u64, u32> = BPlusTreeMap::new();
        let mut m: BTreeMap<u64, u32> = BTreeMap::new();

        for op in ops {
            match op {
                TreeOp::Insert(k, v) => prop_assert_eq!(t.insert(k, v), m.insert(k, v)),
                TreeOp::Remove(k) => prop_assert_eq!(t.remove(&k), m.remove(&k)),
                TreeOp::Get(k) => prop_assert_eq!(t.get(&k), m.get(&k)),
                TreeOp::CountRange(lo, hi, inclusive) => {
                    let expected = m.keys().filter(|k| in_range(*k, &lo, &hi, inclusive)).count();
                    prop_assert_eq!(t.count_range(&lo, &hi, inclusive), expected);
                }
                TreeOp::RemoveRange(lo, hi, inclusive) => {
                    let before = m.len();
                    m.retain(|k, _| !in_range(k, &lo, &hi, inclusive));
                    prop_assert_eq!(t.remove_in_range(&lo, &hi, inclusive), before - m.len());
                    validate_tree(&t);
                }
                TreeOp::RemoveOddValues => {
                    let before = m.len();
                    m.retain(|_, v| *v % 2 == 0);
                    prop_assert_eq!(t.remove_if(|_, v| *v % 2 == 1), before - m.len());
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        prop_assert!(t.iter().eq(m.iter()));
        prop_assert!(t.reversed_iter().eq(m.iter().rev()));
        prop_assert_eq!(t.min_key(), m.keys().next());
        prop_assert_eq!(t.max_key(), m.keys().next_back());
    }

    #[test]
    fn prop_multimap_equivalence(ops in prop::collection::vec(any::<TreeOp>(), 0..=2000)) {
        let mut t: BPlusTreeMap<u64, u32> = BPlusTreeMap::new_multimap();
        // Sorted by key; equal keys newest-first.
        let mut m: Vec<(u64, u32)> = Vec::new();

        for op in ops {
            match op {
                TreeOp::Insert(k, v) => {
                    // Narrow keys so duplicates pile up.
                    let k = k % 64;
                    let pos = m.partition_point(|(mk, _)| *mk < k);
                    m.insert(pos, (k, v));
                    prop_assert_eq!(t.insert(k, v), None);
                }
                TreeOp::Remove(k) => {
                    let k = k % 64;
                    let pos = m.partition_point(|(mk, _)| *mk < k);
                    let expected = if m.get(pos).map_or(false, |(mk, _)| *mk == k) {
                        Some(m.remove(pos).1)
                    } else {
                        None
                    };
                    prop_assert_eq!(t.remove(&k), expected);
                }
                TreeOp::Get(k) => {
                    let k = k % 64;
                    let expected = m.iter().find(|(mk, _)| *mk == k).map(|(_, v)| v);
                    prop_assert_eq!(t.get(&k), expected);
                    prop_assert_eq!(t.count(&k), m.iter().filter(|(mk, _)| *mk == k).count());
                }
                TreeOp::CountRange(lo, hi, inclusive) => {
                    let (lo, hi) = (lo % 64, hi % 64);
                    let expected = m.iter().filter(|(k, _)| in_range(k, &lo, &hi, inclusive)).count();
                    prop_assert_eq!(t.count_range(&lo, &hi, inclusive), expected);
                }
                TreeOp::RemoveRange(lo, hi, inclusive) => {
                    let (lo, hi) = (lo % 64, hi % 64);
                    let before = m.len();
                    m.retain(|(k, _)| !in_range(k, &lo, &hi, inclusive));
                    prop_assert_eq!(t.remove_in_range(&lo, &hi, inclusive), before - m.len());
                    validate_tree(&t);
                }
                TreeOp::RemoveOddValues => {
                    let before = m.len();
                    m.retain(|(_, v)| *v % 2 == 0);
                    prop_assert_eq!(t.remove_if(|_, v| *v % 2 == 1), before - m.len());
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<(u64, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, m);
    }
}

// =============================================================================
// Exhaustive orderings
// =============================================================================

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

/// 64-byte key: the tree gives it the minimum node capacity of 8, so a few
/// dozen entries already span several levels.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct WideKey(u32, [u8; 60]);

fn wide(k: u32) -> WideKey {
    WideKey(k, [0; 60])
}

#[test]
fn exhaustive_tree_insert_order() {
    let base: Vec<u32> = (0..80).map(|k| k * 10).collect();
    let extra: Vec<u32> = vec![5, 15, 16, 17, 205, 395, 800];

    let mut base_tree: BPlusTreeMap<WideKey, u32> = BPlusTreeMap::new();
    for &k in &base {
        base_tree.insert(wide(k), k);
    }
    assert!(base_tree.height() >= 3);

    for_each_permutation(&extra, |perm| {
        let mut t = base_tree.clone();
        for k in perm {
            assert_eq!(t.insert(wide(k), k), None);
        }
        validate_tree(&t);
        let keys: Vec<u32> = t.keys().map(|k| k.0).collect();
        let mut expected: Vec<u32> = base.iter().chain(&extra).copied().collect();
        expected.sort_unstable();
        assert_eq!(keys, expected);
    });
}

#[test]
fn exhaustive_tree_remove_order() {
    let mut base_tree: BPlusTreeMap<WideKey, u32> = BPlusTreeMap::new();
    let mut base_map: BTreeMap<u32, u32> = BTreeMap::new();
    for k in 0..80u32 {
        base_tree.insert(wide(k), k);
        base_map.insert(k, k);
    }
    let doomed: Vec<u32> = vec![0, 3, 8, 9, 40, 41, 79];

    for_each_permutation(&doomed, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();
        for k in perm {
            assert_eq!(t.remove(&wide(k)), m.remove(&k));
            assert_eq!(t.len(), m.len());
        }
        validate_tree(&t);
        assert!(t.iter().map(|(k, v)| (k.0, *v)).eq(m.into_iter()));
    });
}

#[test]
fn exhaustive_hash_remove_order() {
    let keys: Vec<u64> = vec![0, 8, 16, 24, 32, 1, 9];

    for robin_hood in [false, true] {
        let config = HashConfig::default().with_robin_hood(robin_hood);
        let mut base: HashMap<u64, u64> = HashMap::with_config(config).unwrap();
        for &k in &keys {
            base.insert(k, k * 7);
        }

        for_each_permutation(&keys, |perm| {
            let mut t = base.clone();
            let mut remaining: StdHashSet<u64> = keys.iter().copied().collect();
            for k in perm {
                assert_eq!(t.remove(&k), Some(k * 7));
                remaining.remove(&k);
                validate_table(&t.table);
                for r in &remaining {
                    assert_eq!(t.get(r), Some(&(r * 7)));
                }
            }
            assert!(t.is_empty());
        });
    }
}

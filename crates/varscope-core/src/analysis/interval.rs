//! Interval map over closed address ranges.
//!
//! Values are sets of (variable, function) keys. Inserting a range that
//! overlaps stored entries splits them at the overlap boundaries and
//! unions the value sets, so the value stored for any single address is
//! exactly the union of every inserted set whose range covers it.
//! Adjacent entries with equal sets coalesce, keeping the stored
//! intervals non-overlapping and maximal.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::types::{Address, VarKey};

#[derive(Debug, Clone)]
struct Entry
{
    high: u64,
    vars: BTreeSet<VarKey>,
}

/// One merged interval, borrowed from the map.
#[derive(Debug)]
pub struct Interval<'a>
{
    pub low: Address,
    pub high: Address,
    pub vars: &'a BTreeSet<VarKey>,
}

/// Map from disjoint closed address ranges to sets of [`VarKey`].
#[derive(Debug, Default)]
pub struct IntervalMap
{
    // keyed by interval low endpoint
    entries: BTreeMap<u64, Entry>,
}

impl IntervalMap
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Union `[low, high] -> {key}` into the map.
    pub fn insert_pair(&mut self, low: Address, high: Address, key: VarKey)
    {
        self.add(low, high, BTreeSet::from([key]));
    }

    /// Union `[low, high] -> vars` into the map, splitting and merging
    /// overlapped entries.
    pub fn add(&mut self, low: Address, high: Address, vars: BTreeSet<VarKey>)
    {
        let (lo, hi) = (low.value(), high.value());
        if lo > hi || vars.is_empty() {
            return;
        }

        let mut overlapping: Vec<(u64, Entry)> = Vec::new();
        if let Some(key) = self.entries.range(..lo).next_back().map(|(&k, _)| k) {
            if self.entries[&key].high >= lo {
                let entry = self.entries.remove(&key).unwrap_or_else(|| unreachable!());
                overlapping.push((key, entry));
            }
        }
        let covered: Vec<u64> = self.entries.range(lo..=hi).map(|(&k, _)| k).collect();
        for key in covered {
            let entry = self.entries.remove(&key).unwrap_or_else(|| unreachable!());
            overlapping.push((key, entry));
        }

        let mut cursor = lo;
        let mut exhausted = false;
        for (old_lo, old) in overlapping {
            if old_lo < lo {
                // leading slice of the old entry keeps only its own set
                self.entries.insert(
                    old_lo,
                    Entry {
                        high: lo - 1,
                        vars: old.vars.clone(),
                    },
                );
            }
            let mid_lo = old_lo.max(lo);
            if mid_lo > cursor {
                // gap covered only by the new range
                self.entries.insert(
                    cursor,
                    Entry {
                        high: mid_lo - 1,
                        vars: vars.clone(),
                    },
                );
            }
            let mid_hi = old.high.min(hi);
            let mut merged = old.vars.clone();
            merged.extend(vars.iter().copied());
            self.entries.insert(mid_lo, Entry { high: mid_hi, vars: merged });
            if old.high > hi {
                // trailing slice of the old entry keeps only its own set
                self.entries.insert(hi + 1, Entry { high: old.high, vars: old.vars });
            }
            match mid_hi.checked_add(1) {
                Some(next) => cursor = next,
                None => {
                    exhausted = true;
                    break;
                }
            }
        }
        if !exhausted && cursor <= hi {
            self.entries.insert(cursor, Entry { high: hi, vars });
        }

        self.coalesce_around(lo, hi);
    }

    /// Merge runs of adjacent entries with identical sets near `[lo, hi]`.
    fn coalesce_around(&mut self, lo: u64, hi: u64)
    {
        let start = self.entries.range(..lo).next_back().map_or(lo, |(&k, _)| k);
        let mut keys: Vec<u64> = self.entries.range(start..=hi).map(|(&k, _)| k).collect();
        if let Some((&k, _)) = self.entries.range((Bound::Excluded(hi), Bound::Unbounded)).next() {
            keys.push(k);
        }

        let mut prev: Option<u64> = None;
        for key in keys {
            if let Some(prev_key) = prev {
                let joinable = {
                    let before = &self.entries[&prev_key];
                    let after = &self.entries[&key];
                    before.high.checked_add(1) == Some(key) && before.vars == after.vars
                };
                if joinable {
                    let after = self.entries.remove(&key).unwrap_or_else(|| unreachable!());
                    if let Some(before) = self.entries.get_mut(&prev_key) {
                        before.high = after.high;
                    }
                    continue;
                }
            }
            prev = Some(key);
        }
    }

    /// The stored set covering `address`, if any.
    pub fn vars_at(&self, address: Address) -> Option<&BTreeSet<VarKey>>
    {
        let addr = address.value();
        let (_, entry) = self.entries.range(..=addr).next_back()?;
        (entry.high >= addr).then_some(&entry.vars)
    }

    /// Iterate merged intervals in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = Interval<'_>>
    {
        self.entries.iter().map(|(&lo, entry)| Interval {
            low: Address::new(lo),
            high: Address::new(entry.high),
            vars: &entry.vars,
        })
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn key(function: usize, variable: usize) -> VarKey
    {
        VarKey { function, variable }
    }

    fn ranges(map: &IntervalMap) -> Vec<(u64, u64, Vec<VarKey>)>
    {
        map.iter()
            .map(|iv| (iv.low.value(), iv.high.value(), iv.vars.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_single_insert()
    {
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(10), Address::new(20), key(0, 0));
        assert_eq!(ranges(&map), vec![(10, 20, vec![key(0, 0)])]);
    }

    #[test]
    fn test_overlap_splits_into_three_subranges()
    {
        let a = key(0, 0);
        let b = key(1, 0);
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(10), Address::new(20), a);
        map.insert_pair(Address::new(15), Address::new(25), b);

        assert_eq!(
            ranges(&map),
            vec![
                (10, 14, vec![a]),
                (15, 20, vec![a, b]),
                (21, 25, vec![b]),
            ]
        );
    }

    #[test]
    fn test_union_at_every_address_matches_covering_inserts()
    {
        let a = key(0, 0);
        let b = key(1, 1);
        let c = key(2, 2);
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(5), Address::new(30), a);
        map.insert_pair(Address::new(10), Address::new(12), b);
        map.insert_pair(Address::new(12), Address::new(40), c);

        for addr in 0u64..50 {
            let mut expected = BTreeSet::new();
            if (5..=30).contains(&addr) {
                expected.insert(a);
            }
            if (10..=12).contains(&addr) {
                expected.insert(b);
            }
            if (12..=40).contains(&addr) {
                expected.insert(c);
            }
            let got = map.vars_at(Address::new(addr)).cloned().unwrap_or_default();
            assert_eq!(got, expected, "at address {addr}");
        }
    }

    #[test]
    fn test_adjacent_equal_sets_coalesce()
    {
        let a = key(0, 0);
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(10), Address::new(20), a);
        map.insert_pair(Address::new(21), Address::new(30), a);
        assert_eq!(ranges(&map), vec![(10, 30, vec![a])]);
    }

    #[test]
    fn test_adjacent_different_sets_stay_split()
    {
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(10), Address::new(20), key(0, 0));
        map.insert_pair(Address::new(21), Address::new(30), key(1, 0));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_adversarial_overlaps_match_reference_model()
    {
        // worst-case mix: nesting, chains, point ranges, exact abutment
        let inserts: [(u64, u64, usize); 10] = [
            (10, 40, 0),
            (5, 12, 1),
            (39, 60, 2),
            (60, 60, 3),
            (0, 100, 4),
            (41, 41, 5),
            (99, 120, 6),
            (13, 38, 7),
            (61, 98, 8),
            (20, 20, 9),
        ];
        let mut map = IntervalMap::new();
        for &(lo, hi, func) in &inserts {
            map.insert_pair(Address::new(lo), Address::new(hi), key(func, 0));
        }

        // the stored set at every address is exactly the union of the
        // inserts covering it
        for addr in 0u64..=130 {
            let expected: BTreeSet<VarKey> = inserts
                .iter()
                .filter(|&&(lo, hi, _)| (lo..=hi).contains(&addr))
                .map(|&(_, _, func)| key(func, 0))
                .collect();
            let got = map.vars_at(Address::new(addr)).cloned().unwrap_or_default();
            assert_eq!(got, expected, "at address {addr}");
        }

        // stored intervals are disjoint, sorted, and maximal
        let stored = ranges(&map);
        for pair in stored.windows(2) {
            assert!(pair[0].1 < pair[1].0);
            let adjacent = pair[0].1 + 1 == pair[1].0;
            assert!(!adjacent || pair[0].2 != pair[1].2, "uncoalesced neighbors at {}", pair[1].0);
        }
    }

    #[test]
    fn test_ranges_reaching_the_maximum_address()
    {
        let a = key(0, 0);
        let b = key(1, 0);
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(u64::MAX - 10), Address::MAX, a);
        map.insert_pair(Address::new(u64::MAX - 5), Address::MAX, b);

        assert_eq!(map.vars_at(Address::MAX), Some(&BTreeSet::from([a, b])));
        assert_eq!(map.vars_at(Address::new(u64::MAX - 10)), Some(&BTreeSet::from([a])));
        assert_eq!(map.vars_at(Address::new(u64::MAX - 11)), None);
    }

    #[test]
    fn test_inverted_range_is_ignored()
    {
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(20), Address::new(10), key(0, 0));
        assert!(map.is_empty());
    }

    #[test]
    fn test_identical_reinsert_is_idempotent()
    {
        let a = key(0, 0);
        let mut map = IntervalMap::new();
        map.insert_pair(Address::new(10), Address::new(20), a);
        map.insert_pair(Address::new(10), Address::new(20), a);
        assert_eq!(ranges(&map), vec![(10, 20, vec![a])]);
    }
}

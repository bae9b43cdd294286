//  Copyright 2024 Warren Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! The Set Algebra Engine (component D): multi-key intersection, union
//! and difference over already-resolved `Set` references.
//!
//! Missing-source handling (§4.D "Missing sources") and destination
//! install discipline are deliberately *not* done here: this module only
//! ever sees sets that exist. The command glue in the `warren` crate is
//! what resolves keys to `Option<&Set>`, decides what a missing source
//! means for each operator, and only calls into here with the sources
//! that are actually present. That division keeps the "defer the
//! destination install until after iteration" contract (§9, Open
//! Question a) structural: these functions never see a destination key at
//! all, only source sets, so there is nothing to get the ordering of
//! wrong.

use itertools::Itertools;
use warren_common::config::EngineConfig;

use crate::set::Set;

/// Sort sources by ascending cardinality and intersect, probing the
/// remaining (sorted) sources for each element of the smallest one and
/// bailing on the first miss. `O(n_smallest * sum(log n_i))`-ish,
/// dominated by `Set::contains` on each probed source.
pub fn intersect(config: &EngineConfig, sets: &[&Set]) -> Set {
    if sets.is_empty() {
        return Set::empty_int();
    }
    let order = (0..sets.len()).sorted_by_key(|&i| sets[i].len()).collect_vec();

    let smallest = sets[order[0]];
    let rest = &order[1..];

    let mut result = Set::empty_int();
    'elems: for elem in smallest.iter() {
        for &i in rest {
            if !sets[i].contains(&elem) {
                continue 'elems;
            }
        }
        result.add(config, elem);
    }
    result
}

/// Accumulate every source's elements into a fresh set (starts `Int`,
/// auto-promotes like any other set).
pub fn union(config: &EngineConfig, sets: &[&Set]) -> Set {
    let mut result = Set::empty_int();
    for s in sets {
        for elem in s.iter() {
            result.add(config, elem);
        }
    }
    result
}

/// Seed the accumulator with the first source, then remove every element
/// of each subsequent source. Bails as soon as the accumulator is empty.
pub fn difference(config: &EngineConfig, sets: &[&Set]) -> Set {
    let Some((first, rest)) = sets.split_first() else {
        return Set::empty_int();
    };
    let mut result = seed(config, first);
    for s in rest {
        if result.is_empty() {
            break;
        }
        for elem in s.iter() {
            result.remove(&elem);
        }
    }
    result
}

fn seed(config: &EngineConfig, set: &Set) -> Set {
    let mut result = Set::empty_int();
    for elem in set.iter() {
        result.add(config, elem);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elem::Elem;

    fn set_of(config: &EngineConfig, items: &[i64]) -> Set {
        let mut s = Set::empty_int();
        for &i in items {
            s.add(config, Elem::from_integer(i));
        }
        s
    }

    fn members(s: &Set) -> Vec<i64> {
        let mut v: Vec<i64> = s.iter().map(|e| e.as_integer().unwrap()).collect();
        v.sort();
        v
    }

    #[test]
    fn intersect_is_commutative_and_idempotent() {
        let c = EngineConfig::default();
        let a = set_of(&c, &[1, 2, 3]);
        let b = set_of(&c, &[2, 3, 4]);

        assert_eq!(members(&intersect(&c, &[&a, &b])), vec![2, 3]);
        assert_eq!(members(&intersect(&c, &[&b, &a])), vec![2, 3]);
        assert_eq!(members(&intersect(&c, &[&a, &a])), members(&a));
    }

    #[test]
    fn union_is_commutative_and_idempotent() {
        let c = EngineConfig::default();
        let a = set_of(&c, &[1, 2]);
        let b = set_of(&c, &[2, 3]);

        assert_eq!(members(&union(&c, &[&a, &b])), vec![1, 2, 3]);
        assert_eq!(members(&union(&c, &[&b, &a])), vec![1, 2, 3]);
        assert_eq!(members(&union(&c, &[&a, &a])), members(&a));
    }

    #[test]
    fn difference_of_a_set_with_itself_is_empty() {
        let c = EngineConfig::default();
        let a = set_of(&c, &[1, 2, 3]);
        assert!(members(&difference(&c, &[&a, &a])).is_empty());
    }

    #[test]
    fn difference_removes_subsequent_sources() {
        let c = EngineConfig::default();
        let a = set_of(&c, &[1, 2, 3, 4]);
        let b = set_of(&c, &[2]);
        let d = set_of(&c, &[3]);
        assert_eq!(members(&difference(&c, &[&a, &b, &d])), vec![1, 4]);
    }

    #[test]
    fn empty_sources_list_yields_empty_set() {
        let c = EngineConfig::default();
        assert!(members(&intersect(&c, &[])).is_empty());
        assert!(members(&union(&c, &[])).is_empty());
        assert!(members(&difference(&c, &[])).is_empty());
    }
}

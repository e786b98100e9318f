// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Quota allocation: decides how many and which files each admitted category contributes to a
//! pack.
//!
//! A flat `budget / categories` split leaves files on the table whenever a category has fewer
//! candidates than its share. Instead the allocator runs in rounds. Each round recomputes the
//! fair share of what is left over the categories that still have supply, divides it by the
//! round number, and draws that many files from every category at random. Categories that ran
//! dry drop out, and the ones with deep pools soak up the slack in later rounds. The budget is
//! never exceeded.

use std::collections::HashSet;
use std::path::PathBuf;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::pool::{FileRef, Pools};

/// The files chosen for one pack, by category. Categories that received nothing are not stored.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AllocationPlan {
    slots: Vec<Slot>,
    rounds: usize,
}

/// The files chosen for one category.
#[derive(Clone, Debug, Serialize)]
pub struct Slot {
    category: String,
    files: Vec<FileRef>,
}

impl Slot {
    /// Gets the category of this slot.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Gets the files chosen for this category.
    pub fn files(&self) -> &[FileRef] {
        &self.files
    }
}

impl AllocationPlan {
    /// Iterates over the non-empty slots in admission order.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Gets the files chosen for the given category.
    pub fn get(&self, category: &str) -> Option<&[FileRef]> {
        self.slots
            .iter()
            .find(|slot| slot.category == category)
            .map(|slot| slot.files.as_slice())
    }

    /// The number of folders this plan needs.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The total number of files across all categories.
    pub fn total_files(&self) -> usize {
        self.slots.iter().map(|slot| slot.files.len()).sum()
    }

    /// The total size of the chosen source files in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.slots
            .iter()
            .flat_map(|slot| slot.files.iter())
            .map(|file| file.size())
            .sum()
    }

    /// The number of rounds that drew at least one file.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

/// Allocates up to `total_budget` files across the admitted categories.
///
/// The pools themselves are not modified; each admitted category gets a private copy that
/// shrinks as files are drawn. A file is never chosen twice in one plan, even when two
/// categories share a source directory. Unknown or repeated category names are ignored.
pub fn allocate<R: Rng + ?Sized>(
    admitted: &[String],
    pools: &Pools,
    total_budget: usize,
    rng: &mut R,
) -> AllocationPlan {
    let mut remaining: Vec<(&str, Vec<FileRef>)> = Vec::with_capacity(admitted.len());
    for category in admitted {
        if remaining.iter().any(|(name, _)| name == category) {
            continue;
        }
        if let Some(pool) = pools.get(category) {
            remaining.push((category.as_str(), pool.files().to_vec()));
        }
    }

    let mut chosen: Vec<Vec<FileRef>> = vec![Vec::new(); remaining.len()];
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut budget = total_budget;
    let mut rounds = 0;

    loop {
        let with_supply = remaining.iter().filter(|(_, files)| !files.is_empty()).count();
        if with_supply == 0 || budget == 0 {
            break;
        }

        let round = rounds + 1;
        let base_quota = budget / with_supply;
        // Once the fair share floors to zero, top up one file at a time so the leftover budget
        // still gets spent.
        let round_quota = (base_quota / round).max(1);

        let mut drawn_this_round = 0;
        for ((category, files), slot) in remaining.iter_mut().zip(chosen.iter_mut()) {
            if budget == 0 {
                break;
            }

            let draw = round_quota.min(files.len()).min(budget);
            let drawn = draw_without_replacement(files, draw, &mut taken, slot, rng);
            budget -= drawn;
            drawn_this_round += drawn;

            if drawn > 0 {
                debug!(
                    category = *category,
                    round,
                    round_quota,
                    drawn,
                    left_in_pool = files.len(),
                    "Drew files"
                );
            }
        }

        // Progress guard: a round that draws nothing would repeat forever.
        if drawn_this_round == 0 {
            break;
        }
        rounds = round;
    }

    let slots = remaining
        .into_iter()
        .zip(chosen)
        .filter(|(_, files)| !files.is_empty())
        .map(|((category, _), files)| Slot {
            category: category.to_string(),
            files,
        })
        .collect();

    AllocationPlan { slots, rounds }
}

/// Moves up to `count` random files out of `files` and into `slot`, skipping files some other
/// category already took. Returns how many files were added to the slot.
fn draw_without_replacement<R: Rng + ?Sized>(
    files: &mut Vec<FileRef>,
    count: usize,
    taken: &mut HashSet<PathBuf>,
    slot: &mut Vec<FileRef>,
    rng: &mut R,
) -> usize {
    let mut drawn = 0;
    while drawn < count && !files.is_empty() {
        let index = rng.gen_range(0..files.len());
        let file = files.swap_remove(index);
        if taken.insert(file.path().to_path_buf()) {
            slot.push(file);
            drawn += 1;
        }
    }
    drawn
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::pool::{CandidatePool, FileRef, Pools};
    use crate::select::select;

    fn pools(sizes: &[usize]) -> (Vec<String>, Pools) {
        let names: Vec<String> = (0..sizes.len()).map(|i| format!("C{i}")).collect();
        let pools = names
            .iter()
            .zip(sizes)
            .map(|(name, size)| {
                CandidatePool::new(
                    name,
                    (0..*size)
                        .map(|i| FileRef::new(PathBuf::from(format!("/{name}/{i}.wav")), 100))
                        .collect(),
                )
            })
            .collect();
        (names, Pools::new(pools))
    }

    fn check_invariants(plan: &AllocationPlan, pools: &Pools, budget: usize) {
        assert!(plan.total_files() <= budget);

        let mut seen = HashSet::new();
        for slot in plan.slots() {
            let pool = pools.get(slot.category()).expect("slot without pool");
            assert!(!slot.files().is_empty());
            assert!(slot.files().len() <= pool.len());
            for file in slot.files() {
                assert!(pool.files().contains(file));
                assert!(seen.insert(file.path().to_path_buf()), "duplicate file");
            }
        }
    }

    #[test]
    fn test_exhaustive_supply_uses_whole_budget() {
        let (names, pools) = pools(&[10, 10, 10]);
        let mut rng = StdRng::seed_from_u64(7);
        let admitted = select(&pools, 20, &[]);
        assert_eq!(admitted, names);

        let plan = allocate(&admitted, &pools, 25, &mut rng);
        check_invariants(&plan, &pools, 25);
        assert_eq!(plan.total_files(), 25);
        for slot in plan.slots() {
            assert!((1..=10).contains(&slot.files().len()));
        }
    }

    #[test]
    fn test_scarce_supply_uses_everything() {
        let (names, pools) = pools(&[2, 3]);
        let mut rng = StdRng::seed_from_u64(7);

        let plan = allocate(&names, &pools, 100, &mut rng);
        check_invariants(&plan, &pools, 100);
        assert_eq!(plan.total_files(), 5);
        assert_eq!(plan.get("C0").map(|f| f.len()), Some(2));
        assert_eq!(plan.get("C1").map(|f| f.len()), Some(3));
    }

    #[test]
    fn test_quota_below_one_still_terminates() {
        // 21 categories compete for 20 folders and 255 files.
        let (_, pools) = pools(&[30; 21]);
        let mut rng = StdRng::seed_from_u64(1);
        let admitted = select(&pools, 20, &[]);
        assert_eq!(admitted.len(), 20);

        let plan = allocate(&admitted, &pools, 255, &mut rng);
        check_invariants(&plan, &pools, 255);
        assert!(!plan.is_empty());
        assert_eq!(plan.len(), 20);
        assert_eq!(plan.total_files(), 255);
        assert_eq!(plan.rounds(), 2);
    }

    #[test]
    fn test_small_pools_give_everything_once() {
        let (names, pools) = pools(&[1, 200]);
        let mut rng = StdRng::seed_from_u64(3);

        let plan = allocate(&names, &pools, 100, &mut rng);
        check_invariants(&plan, &pools, 100);
        assert_eq!(plan.get("C0").map(|f| f.len()), Some(1));
        assert_eq!(plan.get("C1").map(|f| f.len()), Some(99));
    }

    #[test]
    fn test_no_categories() {
        let (_, pools) = pools(&[5]);
        let mut rng = StdRng::seed_from_u64(3);

        let plan = allocate(&[], &pools, 255, &mut rng);
        assert!(plan.is_empty());
        assert_eq!(plan.total_files(), 0);
        assert_eq!(plan.rounds(), 0);

        let plan = allocate(&["Missing".to_string()], &pools, 255, &mut rng);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_zero_budget() {
        let (names, pools) = pools(&[5, 5]);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = allocate(&names, &pools, 0, &mut rng);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_empty_pool_gets_no_slot() {
        let (names, pools) = pools(&[0, 4]);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = allocate(&names, &pools, 10, &mut rng);
        assert_eq!(plan.len(), 1);
        assert!(plan.get("C0").is_none());
        assert_eq!(plan.total_bytes(), 400);
    }

    #[test]
    fn test_shared_files_are_not_duplicated() {
        // Synth and Bass share a source directory.
        let shared: Vec<FileRef> = (0..6)
            .map(|i| FileRef::new(PathBuf::from(format!("/synths/{i}.wav")), 1))
            .collect();
        let pools = Pools::new(vec![
            CandidatePool::new("Synth", shared.clone()),
            CandidatePool::new("Bass", shared),
        ]);
        let admitted = vec!["Synth".to_string(), "Bass".to_string()];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = allocate(&admitted, &pools, 255, &mut rng);
            check_invariants(&plan, &pools, 255);
            assert_eq!(plan.total_files(), 6);
        }
    }

    #[test]
    fn test_seeded_allocation_is_reproducible() {
        let (names, pools) = pools(&[50, 50, 50]);
        let first = allocate(&names, &pools, 40, &mut StdRng::seed_from_u64(99));
        let second = allocate(&names, &pools, 40, &mut StdRng::seed_from_u64(99));

        let paths = |plan: &AllocationPlan| -> Vec<PathBuf> {
            plan.slots()
                .flat_map(|slot| slot.files().iter().map(|f| f.path().to_path_buf()))
                .collect()
        };
        assert_eq!(paths(&first), paths(&second));
    }

    fn ceil_log2(n: usize) -> usize {
        (usize::BITS - n.saturating_sub(1).leading_zeros()) as usize
    }

    proptest! {
        #[test]
        fn never_exceeds_budget(
            sizes in proptest::collection::vec(0usize..300, 1..50),
            budget in 0usize..600,
            seed in any::<u64>(),
        ) {
            let (names, pools) = pools(&sizes);
            let mut rng = StdRng::seed_from_u64(seed);

            let plan = allocate(&names, &pools, budget, &mut rng);
            check_invariants(&plan, &pools, budget);

            let supply: usize = sizes.iter().sum();
            prop_assert_eq!(plan.total_files(), supply.min(budget));
            prop_assert!(plan.rounds() <= budget);
        }

        #[test]
        fn unlimited_pools_converge_quickly(
            count in 1usize..50,
            budget in 1usize..600,
            seed in any::<u64>(),
        ) {
            let (names, pools) = pools(&vec![budget; count]);
            let mut rng = StdRng::seed_from_u64(seed);

            let plan = allocate(&names, &pools, budget, &mut rng);
            prop_assert_eq!(plan.total_files(), budget);
            prop_assert!(plan.rounds() <= ceil_log2(budget) + count);
            prop_assert!(plan.rounds() <= 2);
        }
    }
}

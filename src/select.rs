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
use tracing::info;

use crate::pool::Pools;

/// Chooses which categories get a folder in a pack.
///
/// Empty pools never get a folder. If the rest fit under `max_categories` they are all admitted
/// in pool order. Otherwise the categories named in `priority` are admitted first, in priority
/// order, and whatever room is left goes to the remaining categories in pool order.
pub fn select(pools: &Pools, max_categories: usize, priority: &[String]) -> Vec<String> {
    select_tiered(pools, max_categories, &[priority])
}

/// Like [select], but with several priority tiers. Each tier is admitted in order before the
/// next one is looked at, so later tiers only get the room the earlier ones left.
pub fn select_tiered(pools: &Pools, max_categories: usize, tiers: &[&[String]]) -> Vec<String> {
    let available: Vec<&str> = pools
        .iter()
        .filter(|pool| !pool.is_empty())
        .map(|pool| pool.category())
        .collect();

    if available.len() <= max_categories {
        return available.into_iter().map(String::from).collect();
    }

    let mut selected: Vec<String> = Vec::with_capacity(max_categories);
    let tiered = tiers.iter().flat_map(|tier| tier.iter().map(String::as_str));
    for category in tiered.chain(available.iter().copied()) {
        if selected.len() >= max_categories {
            break;
        }
        if available.contains(&category) && !selected.iter().any(|s| s == category) {
            selected.push(category.to_string());
        }
    }

    info!(
        available = available.len(),
        selected = selected.len(),
        "Too many categories for one pack, dropped the lowest priority ones"
    );

    selected
}

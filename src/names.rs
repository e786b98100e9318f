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
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

const ADJECTIVES: &[&str] = &[
    "Amber", "Ancient", "Blue", "Bold", "Brave", "Bright", "Broken", "Calm", "Crimson", "Crooked",
    "Dark", "Dusty", "Electric", "Empty", "Fading", "Fancy", "Fierce", "Frozen", "Gentle",
    "Golden", "Green", "Hidden", "Hollow", "Humble", "Iron", "Lazy", "Lucky", "Lunar", "Mellow",
    "Misty", "Neon", "Noisy", "Pale", "Proud", "Quiet", "Rapid", "Restless", "Rusty", "Secret",
    "Silent", "Silver", "Sleepy", "Solar", "Stormy", "Strange", "Velvet", "Wild", "Wooden",
];

const NOUNS: &[&str] = &[
    "Anchor", "Badger", "Beacon", "Canyon", "Castle", "Cloud", "Comet", "Coyote", "Crow",
    "Desert", "Engine", "Falcon", "Forest", "Fox", "Garden", "Ghost", "Harbor", "Hawk", "Horse",
    "Island", "Jaguar", "Lantern", "Lion", "Machine", "Meadow", "Mirror", "Moon", "Mountain",
    "Ocean", "Orchard", "Otter", "Panther", "Planet", "Raven", "River", "Rocket", "Shadow",
    "Signal", "Spider", "Storm", "Temple", "Thunder", "Tiger", "Valley", "Voyage", "Whale", "Wolf",
];

/// Generates `count` unique two-word pack names that don't collide with `existing`.
///
/// Word pairs are drawn in random order. Once every pair is used up the names get a numeric
/// suffix ("Blue Horse 2"), so any count can be satisfied.
pub fn generate_names<R: Rng + ?Sized>(
    count: usize,
    existing: &BTreeSet<String>,
    rng: &mut R,
) -> BTreeSet<String> {
    let mut pairs: Vec<(&str, &str)> = ADJECTIVES
        .iter()
        .flat_map(|adjective| NOUNS.iter().map(move |noun| (*adjective, *noun)))
        .collect();
    pairs.shuffle(rng);

    let mut names = BTreeSet::new();
    let mut suffix = 1;
    while names.len() < count {
        for (adjective, noun) in pairs.iter() {
            if names.len() >= count {
                break;
            }

            let name = if suffix == 1 {
                format!("{} {}", adjective, noun)
            } else {
                format!("{} {} {}", adjective, noun, suffix)
            };
            if !existing.contains(&name) {
                names.insert(name);
            }
        }
        suffix += 1;
    }

    debug!(count, suffix = suffix - 1, "Generated pack names");
    names
}

/// Lists the names already taken in the output directory. A missing directory has no names.
pub fn existing_names(output_dir: &Path) -> io::Result<BTreeSet<String>> {
    let entries = match fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };

    let mut names = BTreeSet::new();
    for entry in entries {
        names.insert(entry?.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}

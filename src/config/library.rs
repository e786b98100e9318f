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
use std::path::PathBuf;

use serde::Deserialize;

use crate::classify;

/// A YAML representation of a sample library whose files are sorted into categories by rules
/// rather than by explicit source directories.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Library {
    /// Library roots to scan.
    #[serde(default)]
    roots: Vec<PathBuf>,

    /// Files matching this are never classified.
    ignore: Option<Matcher>,

    /// Classification rules, first match wins. The built-in rules are used when unset.
    rules: Option<Vec<Rule>>,

    /// Libraries to build packs from. Every library is used when unset.
    packs: Option<Vec<String>>,

    /// Categories kept ahead of the rest when a library has more categories than folders.
    keepers: Option<Vec<String>>,

    /// Categories converted to mono. Everything else is stereo.
    mono: Option<Vec<String>>,
}

/// Categories kept ahead of the rest when a library pack has to drop folders.
const DEFAULT_KEEPERS: &[&str] = &[
    "Kick",
    "Snare",
    "HiHat",
    "Synth",
    "Bass",
    "Percussion",
    "Tom",
    "Cymbal",
    "Metal",
    "Blip",
    "Vocal",
    "Hand Drum",
    "Mallet Drum",
    "Noise",
    "Chord",
    "Stab & Hit",
];

/// Drum categories, converted to mono in library packs.
const DEFAULT_MONO: &[&str] = &[
    "Kick",
    "Snare",
    "HiHat",
    "Percussion",
    "Tom",
    "Cymbal",
    "Metal",
    "Hand Drum",
    "Mallet Drum",
];

impl Library {
    /// Gets the library roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Builds the classifier described by this configuration.
    pub fn classifier(&self) -> classify::Classifier {
        let default = classify::Classifier::default();
        let ignore = match &self.ignore {
            Some(ignore) => ignore.to_matcher(),
            None => default.ignore().clone(),
        };
        let rules = match &self.rules {
            Some(rules) => rules.iter().map(|rule| rule.to_rule()).collect(),
            None => default.rules().to_vec(),
        };

        classify::Classifier::new(ignore, rules)
    }

    /// Whether packs should be built from the given library.
    pub fn builds(&self, library: &str) -> bool {
        match &self.packs {
            Some(packs) => packs.iter().any(|pack| pack == library),
            None => true,
        }
    }

    /// Gets the categories kept ahead of the rest when folders run out.
    pub fn keepers(&self) -> Vec<String> {
        match &self.keepers {
            Some(keepers) => keepers.clone(),
            None => DEFAULT_KEEPERS.iter().map(|kind| kind.to_string()).collect(),
        }
    }

    /// Whether the given category is converted to mono.
    pub fn is_mono(&self, category: &str) -> bool {
        match &self.mono {
            Some(mono) => mono.iter().any(|kind| kind == category),
            None => DEFAULT_MONO.contains(&category),
        }
    }
}

#[cfg(test)]
impl Library {
    /// Creates a library configuration using the built-in rules (test only).
    pub fn new(roots: Vec<PathBuf>) -> Library {
        Library {
            roots,
            ignore: None,
            rules: None,
            packs: None,
            keepers: None,
            mono: None,
        }
    }

    /// Sets the libraries to build packs from (test only).
    pub fn with_packs(mut self, packs: &[&str]) -> Library {
        self.packs = Some(packs.iter().map(|pack| pack.to_string()).collect());
        self
    }

    /// Sets the keeper categories (test only).
    pub fn with_keepers(mut self, keepers: &[&str]) -> Library {
        self.keepers = Some(keepers.iter().map(|kind| kind.to_string()).collect());
        self
    }
}

/// Conditions on a library file. Any single condition matching is a match.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Matcher {
    /// The parent directory name equals one of these.
    #[serde(default)]
    kind_is: Vec<String>,

    /// The parent directory name contains one of these.
    #[serde(default)]
    kind_contains: Vec<String>,

    /// The file name contains one of these.
    #[serde(default)]
    file_contains: Vec<String>,

    /// The full path contains one of these.
    #[serde(default)]
    path_contains: Vec<String>,
}

impl Matcher {
    fn to_matcher(&self) -> classify::Matcher {
        classify::Matcher::default()
            .kind_is(&self.kind_is)
            .kind_contains(&self.kind_contains)
            .file_contains(&self.file_contains)
            .path_contains(&self.path_contains)
    }
}

/// A single classification rule.
#[derive(Deserialize, Clone, Debug)]
pub struct Rule {
    /// The category assigned to matching files.
    category: String,

    /// When this rule applies.
    when: Matcher,
}

impl Rule {
    fn to_rule(&self) -> classify::Rule {
        classify::Rule::new(&self.category, self.when.to_matcher())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_library_custom_rules() {
        let yaml = r#"
            roots:
              - /samples/Maschine
            ignore:
              kind_is: [Loops]
            rules:
              - category: Snare
                when:
                  kind_is: [Clap, Rim]
              - category: Kick
                when:
                  file_contains: [kick]
            packs: [Lofi Dreams]
            mono: [Snare]
        "#;

        let library: Library = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(library.roots(), &[PathBuf::from("/samples/Maschine")]);

        let classifier = library.classifier();
        assert_eq!(classifier.rules().len(), 2);
        assert_eq!(
            classifier.classify(Path::new("/samples/Maschine/Drums/Rim/Rim 1.wav")),
            Some("Snare")
        );
        assert_eq!(
            classifier.classify(Path::new("/samples/Maschine/Drums/Misc/big kick.wav")),
            Some("Kick")
        );
        assert_eq!(
            classifier.classify(Path::new("/samples/Maschine/Loops/kick loop.wav")),
            None
        );

        assert!(library.builds("Lofi Dreams"));
        assert!(!library.builds("Higher Place"));
        assert!(library.is_mono("Snare"));
        assert!(!library.is_mono("Kick"));
    }

    #[test]
    fn test_library_default_rules() {
        let library = Library::new(vec![]);
        let classifier = library.classifier();
        assert_eq!(
            classifier.rules().len(),
            classify::Classifier::default().rules().len()
        );
        assert!(library.builds("Anything"));
        assert!(library.is_mono("Kick"));
        assert!(!library.is_mono("Synth"));
        assert_eq!(library.keepers().len(), DEFAULT_KEEPERS.len());
    }
}

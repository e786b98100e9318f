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
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use super::audio::Audio;
use super::category::Category;
use super::error::ConfigError;
use super::library::Library;
use super::limits::Limits;

/// The reserved fill keys on the Play. These survive the folder cap before anything else.
pub const DEFAULT_PRIORITY: &[&str] = &["Kick", "Snare", "HiHat", "Synth", "Bass"];

/// The top level configuration for the pack factory.
#[derive(Deserialize, Clone, Debug)]
pub struct PackFactory {
    /// Where new packs are written. Each pack gets its own directory here.
    output_dir: PathBuf,

    /// Device limits.
    #[serde(default)]
    limits: Limits,

    /// Categories admitted first when there are more categories than folders.
    priority: Option<Vec<String>>,

    /// Audio normalization settings.
    #[serde(default)]
    audio: Audio,

    /// Number of worker threads used to materialize packs.
    workers: Option<usize>,

    /// Seed for reproducible packs. A fresh seed is used when unset.
    seed: Option<u64>,

    /// The categories (pack folders) to fill.
    #[serde(default)]
    categories: Vec<Category>,

    /// An optional rule-classified sample library.
    library: Option<Library>,
}

impl PackFactory {
    /// Parse the factory configuration from a YAML or TOML file. Scalar settings can be
    /// overridden with PACKFACTORY_ prefixed environment variables.
    pub fn deserialize(path: &Path) -> Result<PackFactory, ConfigError> {
        let factory = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("PACKFACTORY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<PackFactory>()?;
        factory.validate()?;
        Ok(factory)
    }

    /// Gets the output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Gets the device limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Gets the category priority order.
    pub fn priority(&self) -> Vec<String> {
        match &self.priority {
            Some(priority) => priority.clone(),
            None => DEFAULT_PRIORITY.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Gets the audio normalization settings.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Gets the number of materialization workers (default: number of CPUs).
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Gets the configured seed.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Gets the categories in configuration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Gets the library configuration.
    pub fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.audio.validate()?;

        let mut seen = HashSet::new();
        for category in self.categories.iter() {
            if !seen.insert(category.name()) {
                return Err(ConfigError::DuplicateCategory(category.name().to_string()));
            }
            category.validate()?;
        }

        Ok(())
    }
}

#[cfg(test)]
impl PackFactory {
    /// Creates a new factory configuration (test only).
    pub fn new(output_dir: &Path, limits: Limits, categories: Vec<Category>) -> PackFactory {
        PackFactory {
            output_dir: output_dir.to_path_buf(),
            limits,
            priority: None,
            audio: Audio::default(),
            workers: None,
            seed: None,
            categories,
            library: None,
        }
    }

    /// Sets the library (test only).
    pub fn with_library(mut self, library: Library) -> PackFactory {
        self.library = Some(library);
        self
    }

    /// Sets the priority order (test only).
    pub fn with_priority(mut self, priority: &[&str]) -> PackFactory {
        self.priority = Some(priority.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fs;

    use super::*;

    #[test]
    fn test_deserialize_yaml() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("factory.yaml");
        fs::write(
            &path,
            r#"
output_dir: /packs
limits:
  max_files: 128
priority: [Kick, Snare]
workers: 3
seed: 42
categories:
  - name: Kick
    channels: 1
    source_dirs: [/samples/kicks]
  - name: Synth
    source_dirs: [/samples/synths]
    pattern: "C[3-6]"
"#,
        )?;

        let factory = PackFactory::deserialize(&path)?;
        assert_eq!(factory.output_dir(), Path::new("/packs"));
        assert_eq!(factory.limits().max_files(), 128);
        assert_eq!(factory.limits().max_folders(), 20);
        assert_eq!(factory.priority(), vec!["Kick", "Snare"]);
        assert_eq!(factory.workers(), 3);
        assert_eq!(factory.seed(), Some(42));
        assert_eq!(factory.categories().len(), 2);
        assert_eq!(factory.categories()[0].channels(), 1);
        assert_eq!(factory.categories()[1].channels(), 2);
        assert!(factory.library().is_none());
        Ok(())
    }

    #[test]
    fn test_deserialize_toml() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("factory.toml");
        fs::write(
            &path,
            r#"
output_dir = "/packs"

[[categories]]
name = "Kick"
channels = 1
source_dirs = ["/samples/kicks"]
"#,
        )?;

        let factory = PackFactory::deserialize(&path)?;
        assert_eq!(factory.categories()[0].name(), "Kick");
        assert_eq!(
            factory.priority(),
            vec!["Kick", "Snare", "HiHat", "Synth", "Bass"]
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_category() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("factory.yaml");
        fs::write(
            &path,
            r#"
output_dir: /packs
categories:
  - name: Kick
  - name: Kick
"#,
        )?;

        assert!(matches!(
            PackFactory::deserialize(&path),
            Err(ConfigError::DuplicateCategory(name)) if name == "Kick"
        ));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PackFactory::deserialize(Path::new("/does/not/exist.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}

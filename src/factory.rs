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
use std::fmt;
use std::io;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, span, warn, Level};

use crate::allocate::allocate;
use crate::classify::index_library;
use crate::config;
use crate::names::{existing_names, generate_names};
use crate::normalize::{Normalizer, WavNormalizer};
use crate::pack::{Failure, MaterializeError, MaterializeReport, Materializer, Pack};
use crate::pool::{self, CategoryDefinition, Pools};
use crate::select::{select, select_tiered};
use crate::util::size_display;

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Unable to read output directory {0}: {1}")]
    OutputDir(String, io::Error),

    #[error("No library configured")]
    NoLibrary,

    #[error(transparent)]
    Materialize(#[from] MaterializeError),
}

/// Builds batches of packs from a factory configuration.
pub struct Factory {
    config: config::PackFactory,
    definitions: Vec<CategoryDefinition>,
}

/// Packs planned from a sample library, one per library.
pub struct LibraryBatch {
    definitions: Vec<CategoryDefinition>,
    jobs: Vec<(Pools, Pack)>,
}

impl LibraryBatch {
    /// Gets the planned packs.
    pub fn packs(&self) -> Vec<&Pack> {
        self.jobs.iter().map(|(_, pack)| pack).collect()
    }

    /// Whether no library needs a pack.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// The outcome of materializing one pack.
#[derive(Debug)]
pub struct PackSummary {
    name: String,
    inserted: usize,
    budget: usize,
    folders: usize,
    bytes: u64,
    failed: Vec<Failure>,
    unsatisfied: Vec<String>,
}

impl PackSummary {
    fn new(pack: &Pack, report: MaterializeReport, budget: usize, unsatisfied: &[String]) -> Self {
        PackSummary {
            name: pack.name().to_string(),
            inserted: report.materialized().len(),
            budget,
            folders: pack.plan().len(),
            bytes: pack.plan().total_bytes(),
            failed: report.into_failed(),
            unsatisfied: unsatisfied.to_vec(),
        }
    }

    /// Gets the pack name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of files that made it into the pack.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// The files that were planned but failed.
    pub fn failed(&self) -> &[Failure] {
        &self.failed
    }
}

impl fmt::Display for PackSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: inserted {}/{} files in {} folders ({} of source audio)",
            self.name,
            self.inserted,
            self.budget,
            self.folders,
            size_display(self.bytes)
        )?;
        for failure in self.failed.iter() {
            write!(
                f,
                "\n  failed {} ({}): {}",
                failure.source().display(),
                failure.category(),
                failure.reason()
            )?;
        }
        if !self.unsatisfied.is_empty() {
            write!(f, "\n  unsatisfied: {}", self.unsatisfied.join(", "))?;
        }
        Ok(())
    }
}

impl Factory {
    /// Creates a new factory.
    pub fn new(config: config::PackFactory) -> Factory {
        let definitions = config
            .categories()
            .iter()
            .map(|category| category.to_definition(config.limits()))
            .collect();
        Factory {
            config,
            definitions,
        }
    }

    /// Builds the candidate pools for every category, including classified library files.
    pub fn pools(&self) -> Pools {
        let library = self.config.library().map(|library| {
            let index = index_library(library.roots(), &library.classifier());
            info!(
                roots = library.roots().len(),
                dropped = index.dropped(),
                "Indexed sample library"
            );
            index
        });
        pool::build_all(&self.definitions, library.as_ref())
    }

    /// Plans `count` packs without touching the output directory. Each pack gets a fresh name
    /// and its own random draw.
    pub fn plan(
        &self,
        pools: &Pools,
        count: usize,
        seed: Option<u64>,
    ) -> Result<Vec<Pack>, FactoryError> {
        let seed = self.seed(seed);
        info!(seed, count, "Planning packs");
        let mut rng = StdRng::seed_from_u64(seed);

        let output_dir = self.config.output_dir();
        let existing = self.existing_names()?;
        let names = generate_names(count, &existing, &mut rng);

        let limits = self.config.limits();
        let admitted = select(pools, limits.max_folders(), &self.config.priority());

        let packs = names
            .into_iter()
            .map(|name| {
                let mut pack_rng = StdRng::seed_from_u64(rng.gen());
                let plan = allocate(&admitted, pools, limits.max_files(), &mut pack_rng);
                debug_assert!(plan.total_files() <= limits.max_files());
                debug_assert!(plan.len() <= limits.max_folders());
                if plan.is_empty() {
                    warn!(pack = %name, "No candidate files for any category, pack will be empty");
                }
                info!(
                    pack = %name,
                    files = plan.total_files(),
                    folders = plan.len(),
                    rounds = plan.rounds(),
                    "Planned pack"
                );
                Pack::new(&name, output_dir, plan)
            })
            .collect();
        Ok(packs)
    }

    /// Plans one pack per library, named after the library. Libraries that aren't listed for
    /// packs, or that already have a pack in the output directory, are skipped. Categories come
    /// from classification, so a library pack holds every category its library has, up to the
    /// folder limit.
    pub fn plan_libraries(&self, seed: Option<u64>) -> Result<LibraryBatch, FactoryError> {
        let library = self.config.library().ok_or(FactoryError::NoLibrary)?;
        let seed = self.seed(seed);
        info!(seed, "Planning library packs");
        let mut rng = StdRng::seed_from_u64(seed);

        let index = index_library(library.roots(), &library.classifier());
        let existing = self.existing_names()?;
        let limits = self.config.limits();
        let definitions: Vec<CategoryDefinition> = index
            .categories()
            .into_iter()
            .map(|category| {
                let channels = if library.is_mono(category) { 1 } else { 2 };
                CategoryDefinition::new(
                    category.to_string(),
                    Vec::new(),
                    None,
                    Vec::new(),
                    Vec::new(),
                    channels,
                    limits.max_file_size(),
                )
            })
            .collect();

        let priority = self.config.priority();
        let keepers = library.keepers();
        let mut jobs = Vec::new();
        for name in index.libraries() {
            if !library.builds(name) {
                debug!(library = name, "Library not listed for packs, skipping");
                continue;
            }
            if existing.contains(name) {
                info!(library = name, "Pack already exists, skipping");
                continue;
            }
            let Some(sub_index) = index.library(name) else {
                continue;
            };

            let present: Vec<CategoryDefinition> = definitions
                .iter()
                .filter(|definition| sub_index.has_category(definition.name()))
                .cloned()
                .collect();
            let pools = pool::build_all(&present, Some(&sub_index));
            let tiers = [priority.as_slice(), keepers.as_slice()];
            let admitted = select_tiered(&pools, limits.max_folders(), &tiers);

            let mut pack_rng = StdRng::seed_from_u64(rng.gen());
            let plan = allocate(&admitted, &pools, limits.max_files(), &mut pack_rng);
            if plan.is_empty() {
                warn!(library = name, "No candidate files for any category, skipping");
                continue;
            }
            info!(
                library = name,
                files = plan.total_files(),
                folders = plan.len(),
                rounds = plan.rounds(),
                "Planned library pack"
            );
            let pack = Pack::new(name, self.config.output_dir(), plan);
            jobs.push((pools, pack));
        }

        Ok(LibraryBatch { definitions, jobs })
    }

    /// Writes the planned packs to disk with the configured normalizer.
    pub fn materialize(
        &self,
        pools: &Pools,
        packs: &[Pack],
    ) -> Result<Vec<PackSummary>, FactoryError> {
        let normalizer = WavNormalizer::new(self.config.audio());
        let jobs = packs.iter().map(|pack| (pools, pack));
        self.materialize_with(&self.definitions, jobs, Box::new(normalizer))
    }

    /// Writes the planned library packs to disk with the configured normalizer.
    pub fn materialize_libraries(
        &self,
        batch: &LibraryBatch,
    ) -> Result<Vec<PackSummary>, FactoryError> {
        let normalizer = WavNormalizer::new(self.config.audio());
        let jobs = batch.jobs.iter().map(|(pools, pack)| (pools, pack));
        self.materialize_with(&batch.definitions, jobs, Box::new(normalizer))
    }

    fn materialize_with<'a>(
        &self,
        definitions: &[CategoryDefinition],
        jobs: impl IntoIterator<Item = (&'a Pools, &'a Pack)>,
        normalizer: Box<dyn Normalizer>,
    ) -> Result<Vec<PackSummary>, FactoryError> {
        let materializer = Materializer::new(normalizer, self.config.workers())?;
        let budget = self.config.limits().max_files();

        let mut summaries = Vec::new();
        for (pools, pack) in jobs {
            let span = span!(Level::INFO, "pack", name = pack.name());
            let _enter = span.enter();

            let report = materializer.materialize(pack, definitions)?;
            if !report.failed().is_empty() {
                warn!(
                    failed = report.failed().len(),
                    materialized = report.materialized().len(),
                    "Some files could not be added to the pack"
                );
            }
            let unsatisfied = unsatisfied(pools, pack);
            summaries.push(PackSummary::new(pack, report, budget, &unsatisfied));
        }
        Ok(summaries)
    }

    /// The seed on the command line wins over the configured one. Without either the batch is
    /// seeded randomly.
    fn seed(&self, seed: Option<u64>) -> u64 {
        seed.or(self.config.seed()).unwrap_or_else(rand::random)
    }

    fn existing_names(&self) -> Result<BTreeSet<String>, FactoryError> {
        let output_dir = self.config.output_dir();
        existing_names(output_dir)
            .map_err(|e| FactoryError::OutputDir(output_dir.display().to_string(), e))
    }
}

/// Categories with a pool that ended up without a folder in the pack, either because the pool
/// was empty or because the folder cap dropped them.
fn unsatisfied(pools: &Pools, pack: &Pack) -> Vec<String> {
    pools
        .iter()
        .filter(|pool| pack.plan().get(pool.category()).is_none())
        .map(|pool| {
            if pool.is_empty() {
                format!("{} (no candidates)", pool.category())
            } else {
                format!("{} (folder limit)", pool.category())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::error::Error;
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::config::{Category, Library, Limits, PackFactory};
    use crate::normalize::NormalizeError;
    use crate::testutil::{read_wav, write_sample};

    struct PassThrough;

    impl Normalizer for PassThrough {
        fn normalize(&self, _path: &Path, _channels: u16) -> Result<(), NormalizeError> {
            Ok(())
        }
    }

    fn write_files(dir: &Path, count: usize) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(dir)?;
        for i in 0..count {
            fs::write(dir.join(format!("{i}.wav")), b"RIFF")?;
        }
        Ok(())
    }

    fn factory(source: &Path, output: &Path, limits: Limits) -> Factory {
        let categories = ["Kick", "Snare", "Tom", "Vocal", "Noise"]
            .iter()
            .map(|name| Category::new(name, vec![source.join(name)], 1))
            .collect();
        Factory::new(PackFactory::new(output, limits, categories).with_priority(&["Snare"]))
    }

    #[test]
    fn test_plan_respects_limits() -> Result<(), Box<dyn Error>> {
        let source = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_files(&source.path().join("Kick"), 10)?;
        write_files(&source.path().join("Snare"), 10)?;
        write_files(&source.path().join("Tom"), 10)?;
        write_files(&source.path().join("Vocal"), 10)?;
        fs::create_dir(output.path().join("Blue Horse"))?;

        let factory = factory(source.path(), output.path(), Limits::new(3, 25, 400));
        let pools = factory.pools();
        let packs = factory.plan(&pools, 4, Some(9))?;

        assert_eq!(packs.len(), 4);
        let names: HashSet<&str> = packs.iter().map(|pack| pack.name()).collect();
        assert_eq!(names.len(), 4);
        assert!(!names.contains("Blue Horse"));

        for pack in packs.iter() {
            assert_eq!(pack.plan().total_files(), 25);
            assert_eq!(pack.plan().len(), 3);
            assert!(pack.plan().get("Snare").is_some());
            assert!(pack.plan().get("Noise").is_none());
            assert!(pack.root().starts_with(output.path()));
        }

        // Planning alone writes nothing.
        assert_eq!(fs::read_dir(output.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_pools_include_library() -> Result<(), Box<dyn Error>> {
        let source = tempfile::tempdir()?;
        let library = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_files(&source.path().join("Kick"), 2)?;
        write_files(&library.path().join("Drums").join("Kick Layer"), 3)?;
        write_files(&library.path().join("Drums").join("Clap"), 4)?;
        write_files(&library.path().join("Loops").join("Scratch"), 5)?;

        let categories = vec![
            Category::new("Kick", vec![source.path().join("Kick")], 1),
            Category::new("Snare", vec![], 1),
        ];
        let config = PackFactory::new(output.path(), Limits::default(), categories)
            .with_library(Library::new(vec![library.path().to_path_buf()]));
        let pools = Factory::new(config).pools();

        assert_eq!(pools.get("Kick").map(|pool| pool.len()), Some(5));
        assert_eq!(pools.get("Snare").map(|pool| pool.len()), Some(4));
        Ok(())
    }

    #[test]
    fn test_plan_is_reproducible() -> Result<(), Box<dyn Error>> {
        let source = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_files(&source.path().join("Kick"), 40)?;
        write_files(&source.path().join("Snare"), 40)?;

        let factory = factory(source.path(), output.path(), Limits::default());
        let pools = factory.pools();
        let first = serde_yml::to_string(&factory.plan(&pools, 2, Some(3))?)?;
        let second = serde_yml::to_string(&factory.plan(&pools, 2, Some(3))?)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_materialize_summary() -> Result<(), Box<dyn Error>> {
        let source = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_files(&source.path().join("Kick"), 3)?;
        write_files(&source.path().join("Snare"), 2)?;
        write_files(&source.path().join("Tom"), 1)?;

        let factory = factory(source.path(), output.path(), Limits::new(2, 255, 400));
        let pools = factory.pools();
        let packs = factory.plan(&pools, 1, Some(1))?;
        let jobs = packs.iter().map(|pack| (&pools, pack));
        let summaries =
            factory.materialize_with(&factory.definitions, jobs, Box::new(PassThrough))?;

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.name(), packs[0].name());
        // Snare is the priority category, Kick fills the second folder.
        assert_eq!(summary.inserted(), 5);
        assert!(summary.failed().is_empty());
        assert_eq!(
            summary.unsatisfied,
            vec![
                "Tom (folder limit)".to_string(),
                "Vocal (no candidates)".to_string(),
                "Noise (no candidates)".to_string(),
            ]
        );

        let pack_dir = output.path().join(summary.name());
        assert_eq!(fs::read_dir(pack_dir.join("Kick"))?.count(), 3);
        assert_eq!(fs::read_dir(pack_dir.join("Snare"))?.count(), 2);
        assert!(!pack_dir.join("Tom").exists());

        let text = summary.to_string();
        assert!(text.contains("inserted 5/255 files in 2 folders"));
        assert!(text.contains("unsatisfied: Tom (folder limit)"));
        Ok(())
    }

    #[test]
    fn test_materialize_normalizes_audio() -> Result<(), Box<dyn Error>> {
        let source = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_sample(&source.path().join("Kick/kick 1.wav"), 4410)?;
        write_sample(&source.path().join("Kick/kick 2.wav"), 4410)?;
        write_sample(&source.path().join("Snare/snare.wav"), 4410)?;
        fs::write(source.path().join("Snare/broken.wav"), b"not audio")?;

        let categories = vec![
            Category::new("Kick", vec![source.path().join("Kick")], 1),
            Category::new("Snare", vec![source.path().join("Snare")], 2),
        ];
        let factory = Factory::new(PackFactory::new(
            output.path(),
            Limits::default(),
            categories,
        ));
        let pools = factory.pools();
        let packs = factory.plan(&pools, 1, Some(5))?;
        let summaries = factory.materialize(&pools, &packs)?;

        let summary = &summaries[0];
        assert_eq!(summary.inserted(), 3);
        assert_eq!(summary.failed().len(), 1);
        assert_eq!(summary.failed()[0].category(), "Snare");

        let pack_dir = output.path().join(summary.name());
        assert!(!pack_dir.join("Snare/broken.wav").exists());

        let (spec, samples) = read_wav(&pack_dir.join("Snare/snare.wav"))?;
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(samples.len(), 8820);

        let (spec, _) = read_wav(&pack_dir.join("Kick/kick 1.wav"))?;
        assert_eq!(spec.channels, 1);
        Ok(())
    }

    fn library_factory(library: Library, output: &Path, limits: Limits) -> Factory {
        Factory::new(PackFactory::new(output, limits, vec![]).with_library(library))
    }

    #[test]
    fn test_plan_libraries() -> Result<(), Box<dyn Error>> {
        let root = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        let escape = root.path().join("Infinite Escape");
        write_files(&escape.join("Drums/Kick"), 3)?;
        write_files(&escape.join("Drums/Tom"), 2)?;
        write_files(&escape.join("Drums/Cymbal"), 2)?;
        write_files(&escape.join("One Shots/Noise"), 2)?;
        write_files(&root.path().join("Higher Place/Drums/Clap"), 2)?;

        let library =
            Library::new(vec![root.path().to_path_buf()]).with_keepers(&["Tom", "Cymbal"]);
        let factory = library_factory(library, output.path(), Limits::new(3, 255, 400));
        let batch = factory.plan_libraries(Some(4))?;

        let packs = batch.packs();
        let names: Vec<&str> = packs.iter().map(|pack| pack.name()).collect();
        assert_eq!(names, vec!["Higher Place", "Infinite Escape"]);

        let higher = packs[0].plan();
        assert_eq!(higher.len(), 1);
        assert_eq!(higher.get("Snare").map(|slot| slot.len()), Some(2));

        // Kick is a fill category, then the keepers take the rest of the folders.
        let escape_plan = packs[1].plan();
        assert_eq!(escape_plan.len(), 3);
        assert!(escape_plan.get("Kick").is_some());
        assert!(escape_plan.get("Tom").is_some());
        assert!(escape_plan.get("Cymbal").is_some());
        assert!(escape_plan.get("Noise").is_none());
        assert_eq!(escape_plan.total_files(), 7);
        assert_eq!(packs[1].root(), output.path().join("Infinite Escape"));

        let summaries = factory.materialize_with(
            &batch.definitions,
            batch.jobs.iter().map(|(pools, pack)| (pools, pack)),
            Box::new(PassThrough),
        )?;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].inserted(), 7);
        assert_eq!(
            summaries[1].unsatisfied,
            vec!["Noise (folder limit)".to_string()]
        );
        let escape_dir = output.path().join("Infinite Escape");
        assert_eq!(fs::read_dir(escape_dir.join("Kick"))?.count(), 3);
        assert!(!escape_dir.join("Noise").exists());
        Ok(())
    }

    #[test]
    fn test_plan_libraries_skips_unlisted_and_existing() -> Result<(), Box<dyn Error>> {
        let root = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        for name in ["Lofi Dreams", "Higher Place", "Infinite Escape"] {
            write_files(&root.path().join(name).join("Drums/Kick"), 2)?;
        }
        fs::create_dir(output.path().join("Higher Place"))?;

        let library = Library::new(vec![root.path().to_path_buf()])
            .with_packs(&["Higher Place", "Infinite Escape"]);
        let factory = library_factory(library, output.path(), Limits::default());
        let batch = factory.plan_libraries(None)?;

        let names: Vec<&str> = batch.packs().iter().map(|pack| pack.name()).collect();
        assert_eq!(names, vec!["Infinite Escape"]);
        Ok(())
    }

    #[test]
    fn test_plan_libraries_channels() -> Result<(), Box<dyn Error>> {
        let root = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_files(&root.path().join("Lofi/Drums/Kick"), 1)?;
        write_files(&root.path().join("Lofi/Instruments/Synth Lead"), 1)?;

        let library = Library::new(vec![root.path().to_path_buf()]);
        let factory = library_factory(library, output.path(), Limits::default());
        let batch = factory.plan_libraries(None)?;

        let channels: Vec<(&str, u16)> = batch
            .definitions
            .iter()
            .map(|definition| (definition.name(), definition.channels()))
            .collect();
        assert_eq!(channels, vec![("Kick", 1), ("Synth", 2)]);
        Ok(())
    }

    #[test]
    fn test_plan_libraries_needs_library() -> Result<(), Box<dyn Error>> {
        let output = tempfile::tempdir()?;
        let factory = Factory::new(PackFactory::new(output.path(), Limits::default(), vec![]));
        assert!(matches!(
            factory.plan_libraries(None),
            Err(FactoryError::NoLibrary)
        ));
        Ok(())
    }
}

//! # Export
//!
//! Walks the favourite tracks of a library and copies each one not exported
//! before into the staging directory.
//!
//! Per track:
//!
//! - source missing: warn and skip, nothing is registered
//! - hash already in the registry, or already handled earlier in the run: skip
//! - otherwise: copy to `<staging>/<artist> - <title><ext>`, then register
//!
//! Copy and registry failures abort the run.

use crate::config::Config;
use crate::hashing;
use crate::library::{Library, Track};
use crate::registry::Registry;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use path_absolutize::Absolutize;
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, FileTimes};
use std::path::{Path, PathBuf};

/// What an export run selects and where it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub staging_dir: PathBuf,
    pub play_count: i64,
    pub rating: f64,
    /// Log what would be copied without touching the staging directory or
    /// the registry.
    pub dry_run: bool,
}

impl ExportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            staging_dir: config.staging_dir.clone(),
            play_count: config.play_count,
            rating: config.rating,
            dry_run: false,
        }
    }
}

/// Counters of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Tracks matching the thresholds.
    pub matched: usize,
    /// Tracks copied (or that would be, on a dry run).
    pub copied: usize,
    /// Tracks whose content was exported before, in an earlier run or earlier
    /// in this one.
    pub skipped_seen: usize,
    /// Tracks whose source file does not exist.
    pub skipped_missing: usize,
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matching, {} copied, {} already exported, {} missing",
            self.matched, self.copied, self.skipped_seen, self.skipped_missing
        )
    }
}

/// Result of exporting a single track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Copied(PathBuf),
    AlreadyExported,
    MissingSource,
}

/// `"{artist} - {title}{ext}"`, with `ext` taken from the source path.
///
/// Path separators inside the tags become `_` so the name never escapes the
/// staging directory.
pub fn normalized_filename(track: &Track) -> String {
    let extension = track
        .path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    format!(
        "{} - {}{}",
        strip_separators(&track.artist),
        strip_separators(&track.title),
        extension
    )
}

fn strip_separators(tag: &str) -> String {
    tag.replace(['/', '\\'], "_")
}

/// Copies favourites of one library, keyed on one registry.
pub struct Exporter {
    library: Library,
    registry: Registry,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(library: Library, registry: Registry, options: ExportOptions) -> Self {
        Self {
            library,
            registry,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export every matching track once.
    ///
    /// The number of matching tracks is counted during the pass instead of
    /// re-running the query.
    pub fn run(&mut self) -> Result<ExportSummary> {
        let ExportOptions {
            play_count, rating, ..
        } = self.options;
        info!(
            "Exporting tracks played more than {play_count} times and rated at least {rating} from {}",
            self.library.path().display()
        );
        if self.options.dry_run {
            info!("Dry run: nothing will be copied or registered");
        }

        let mut summary = ExportSummary::default();
        // Hashes a dry run would have registered.
        let mut planned = HashSet::new();
        let mut favourites = self.library.favourites(play_count, rating)?;

        for track in favourites.tracks()? {
            let track = track.context("Failed to read track from library")?;
            summary.matched += 1;

            match export_track(&mut self.registry, &mut planned, &self.options, &track)? {
                Outcome::Copied(_) => summary.copied += 1,
                Outcome::AlreadyExported => summary.skipped_seen += 1,
                Outcome::MissingSource => summary.skipped_missing += 1,
            }
        }

        info!("Total rated & played tracks: {}", summary.matched);
        Ok(summary)
    }
}

/// Export one track.
///
/// `planned` collects the hashes a dry run would register, so duplicates
/// within one dry run are reported the way a real run handles them.
fn export_track(
    registry: &mut Registry,
    planned: &mut HashSet<String>,
    options: &ExportOptions,
    track: &Track,
) -> Result<Outcome> {
    let Some(hash) = hashing::hash_file(&track.path)? else {
        warn!("Skipping {track}: {} does not exist", track.path.display());
        return Ok(Outcome::MissingSource);
    };

    if registry.contains(&hash) || planned.contains(&hash) {
        info!("Skipping {track}: already exported");
        return Ok(Outcome::AlreadyExported);
    }

    let target = options.staging_dir.join(normalized_filename(track));
    if options.dry_run {
        info!("Would copy {} to {}", track.path.display(), target.display());
        planned.insert(hash);
        return Ok(Outcome::Copied(target));
    }

    copy_preserving_times(&track.path, &options.staging_dir, &target)?;
    registry.add(&hash)?;
    info!("Copied {track} to {}", target.display());

    Ok(Outcome::Copied(target))
}

/// Copy `source` to `target` inside `staging_dir`, creating the directory if
/// needed and carrying over modification and access times.
fn copy_preserving_times(source: &Path, staging_dir: &Path, target: &Path) -> Result<()> {
    if !staging_dir.is_dir() {
        let shown = staging_dir.absolutize().map(|p| p.into_owned());
        info!(
            "Creating staging directory {}",
            shown.as_deref().unwrap_or(staging_dir).display()
        );
        fs::create_dir_all(staging_dir).with_context(|| {
            format!("Failed to create staging directory {}", staging_dir.display())
        })?;
    }

    fs::copy(source, target).with_context(|| {
        format!("Failed to copy {} to {}", source.display(), target.display())
    })?;

    let metadata = fs::metadata(source)
        .with_context(|| format!("Failed to read metadata of {}", source.display()))?;
    let mut times = FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }

    fs::File::options()
        .write(true)
        .open(target)
        .and_then(|file| file.set_times(times))
        .with_context(|| format!("Failed to preserve timestamps on {}", target.display()))?;
    debug!("Preserved timestamps of {}", source.display());

    Ok(())
}

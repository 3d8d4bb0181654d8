//! # Command-Line Interface Module
//!
//! Clap definitions for the `fav` binary.
//!
//! ## Commands
//!
//! - `export`: Copy new favourites into the staging directory
//! - `list`: Show the tracks that currently qualify
//! - `count`: Print how many tracks qualify
//! - `completion`: Print a shell completion script
//!
//! ## Examples
//!
//! ```bash
//! fav export
//! PROD=1 fav export --dry-run
//! fav --play-count 20 --rating 0.8 list --json
//! ```

use crate::config::Overrides;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// The profile (`DEV`, `TEST`, `STAGE`, `PROD`) picks the defaults; the
/// options below override single values of it.
#[derive(Parser, Debug)]
#[command(name = "fav")]
#[command(about = "Fav: export your most played, best rated tracks from a music player library")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub options: GlobalOptions,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Default, Clone, PartialEq)]
pub struct GlobalOptions {
    /// Music player database to read (never written)
    #[arg(long, global = true, env = "FAV_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Directory exported files are copied to
    #[arg(long, global = true, env = "FAV_STAGING_DIR", value_hint = clap::ValueHint::DirPath)]
    pub staging_dir: Option<PathBuf>,

    /// File listing the content hashes already exported
    #[arg(long, global = true, env = "FAV_REGISTRY", value_hint = clap::ValueHint::FilePath)]
    pub registry: Option<PathBuf>,

    /// Directory receiving one log file per run
    #[arg(long, global = true, env = "FAV_LOG_DIR", value_hint = clap::ValueHint::DirPath)]
    pub log_dir: Option<PathBuf>,

    /// Only tracks played strictly more often than this
    #[arg(long, global = true, env = "FAV_PLAY_COUNT")]
    pub play_count: Option<i64>,

    /// Only tracks rated at least this (0.0 to 1.0)
    #[arg(long, global = true, env = "FAV_RATING")]
    pub rating: Option<f64>,
}

impl From<GlobalOptions> for Overrides {
    fn from(options: GlobalOptions) -> Self {
        Self {
            db_path: options.db,
            staging_dir: options.staging_dir,
            registry_path: options.registry,
            log_dir: options.log_dir,
            play_count: options.play_count,
            rating: options.rating,
        }
    }
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Copy favourites not exported before into the staging directory
    ///
    /// Each file is identified by the SHA-256 of its content, so a track is
    /// copied once even if it is renamed or retagged later. Copies are named
    /// "<artist> - <title><ext>".
    Export {
        /// Only log what would be copied
        #[arg(long)]
        dry_run: bool,
    },

    /// List the tracks matching the thresholds
    List {
        /// Print one JSON object per track, with every database column
        #[arg(long)]
        json: bool,

        /// Stop after this many tracks
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the number of tracks matching the thresholds
    Count,

    /// Generate shell completions
    ///
    /// Usage: fav completion bash > ~/.local/share/bash-completion/completions/fav
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = Args::try_parse_from([
            "fav", "export", "--dry-run", "--play-count", "20", "--rating", "0.8",
        ])
        .unwrap();

        assert_eq!(args.command, Command::Export { dry_run: true });
        assert_eq!(args.options.play_count, Some(20));
        assert_eq!(args.options.rating, Some(0.8));
    }

    #[test]
    fn test_options_become_overrides() {
        let options = GlobalOptions {
            db: Some(PathBuf::from("/tmp/clementine.db")),
            registry: Some(PathBuf::from("seen.txt")),
            ..Default::default()
        };
        let overrides = Overrides::from(options);

        assert_eq!(overrides.db_path, Some(PathBuf::from("/tmp/clementine.db")));
        assert_eq!(overrides.registry_path, Some(PathBuf::from("seen.txt")));
        assert_eq!(overrides.staging_dir, None);
    }

    #[test]
    fn test_completion_takes_a_shell() {
        let args = Args::try_parse_from(["fav", "completion", "fish"]).unwrap();
        assert_eq!(args.command, Command::Completion { shell: Shell::Fish });
    }
}

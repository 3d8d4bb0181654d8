//! # Fav - Favourite Track Exporter
//!
//! ## Usage
//!
//! ```bash
//! # Copy new favourites to the staging directory
//! fav export
//!
//! # See what qualifies
//! fav list
//! fav count
//!
//! # Production profile, stricter thresholds
//! PROD=1 fav --play-count 25 --rating 0.8 export
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use fav::cli::{self, Command, GlobalOptions, Shell};
use fav::config::{Config, Overrides};
use fav::export::{ExportOptions, Exporter};
use fav::library::Library;
use fav::registry::Registry;
use fav::logging::{self, Console};
use fav::completion;
use log::{debug, info};
use path_absolutize::Absolutize;
use std::io::{self, Write};

/// Main entry point.
///
/// Routes each subcommand. Everything but `completion` resolves the
/// configuration first, so an ambiguous environment stops the process before
/// the log file or the library are opened.
fn main() -> Result<()> {
    let args = cli::Args::parse();

    match args.command {
        Command::Completion { shell } => {
            print_completions(shell);
        }
        Command::Export { dry_run } => {
            let (config, library) = start(args.options, Console::Stdout)?;
            let registry = Registry::open(&config.registry_path)?;
            info!(
                "Registry {} holds {} hashes",
                registry.path().absolutize()?.display(),
                registry.len()
            );

            let options = ExportOptions {
                dry_run,
                ..ExportOptions::from_config(&config)
            };
            let mut exporter = Exporter::new(library, registry, options);
            let summary = exporter.run()?;
            info!("Export finished: {summary}");
            info!("Registry now holds {} hashes", exporter.registry().len());
        }
        Command::List { json, limit } => {
            let (config, library) = start(args.options, Console::Stderr)?;
            list_tracks(&library, &config, json, limit)?;
        }
        Command::Count => {
            let (config, library) = start(args.options, Console::Stderr)?;
            let count = library.count_favourites(config.play_count, config.rating)?;
            println!("{count}");
        }
    }

    Ok(())
}

/// Resolve the configuration, start the run log and open the library.
///
/// `list` and `count` print their result on stdout, so they log to stderr.
fn start(options: GlobalOptions, console: Console) -> Result<(Config, Library)> {
    let config = Config::resolve(Overrides::from(options))?;
    let run_log = logging::init(&config.log_dir, console)?;
    info!("Considered {} environment", config.profile);
    debug!(
        "Logging to {} since {}",
        run_log.path().display(),
        run_log.started().to_rfc3339()
    );
    debug!("Resolved configuration: {config:?}");

    let library = Library::open(&config.db_path)?;
    Ok((config, library))
}

fn print_completions(shell: Shell) {
    let mut cmd = cli::Args::command();
    completion::generate_completions(
        completion::shell_to_completion_shell(shell),
        &mut cmd,
        &mut io::stdout(),
    );
}

fn list_tracks(library: &Library, config: &Config, json: bool, limit: Option<usize>) -> Result<()> {
    let mut favourites = library.favourites(config.play_count, config.rating)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for track in favourites.tracks()?.take(limit.unwrap_or(usize::MAX)) {
        let track = track?;
        if json {
            serde_json::to_writer(&mut out, &track)?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{track}\n\t{}\n\tplayed {} times, rated {:.2}",
                track.path().display(),
                track.playcount(),
                track.rating()
            )?;
        }
    }

    Ok(())
}

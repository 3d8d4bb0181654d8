//! Export the tracks you love from your music player's library.
//!
//! `fav` reads a Clementine-style SQLite library, picks every track played
//! more than a threshold and rated at least another one, and copies the audio
//! files into a staging directory as `"<artist> - <title><ext>"`. A registry
//! of content hashes makes later runs copy only what is new.
//!
//! Core modules:
//! - [`library`] - Read-only queries over the player database
//! - [`hashing`] - SHA-256 content digests
//! - [`registry`] - Persisted set of exported hashes
//! - [`export`] - The copy pass tying the above together
//!
//! ### Supporting Modules
//!
//! - [`config`] - Profile detection and option resolution
//! - [`logging`] - Per-run log file mirrored to stdout
//! - [`error`] - Typed errors for configuration and library access
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use fav::config::{Config, Overrides};
//! use fav::export::{ExportOptions, Exporter};
//! use fav::library::Library;
//! use fav::registry::Registry;
//!
//! let config = Config::resolve(Overrides::default())?;
//! let library = Library::open(&config.db_path)?;
//! let registry = Registry::open(&config.registry_path)?;
//!
//! let mut exporter = Exporter::new(library, registry, ExportOptions::from_config(&config));
//! let summary = exporter.run()?;
//! println!("{summary}");
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Configuration and library access return the typed errors of [`error`];
//! everything else returns `anyhow::Result` with context attached. Nothing is
//! retried: a run either finishes or stops at the first fatal error.

pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod export;
pub mod hashing;
pub mod library;
pub mod logging;
pub mod registry;

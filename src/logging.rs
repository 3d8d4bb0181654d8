//! Per-run logging.
//!
//! Every record goes to the console and to a fresh file named after the
//! moment the run started, e.g. `logs/fav-20240131-201502.log`. The level
//! defaults to `info` and follows `RUST_LOG` when set.
//!
//! Commands whose stdout is their result log to stderr instead, see
//! [`Console`].

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use env_logger::{Builder, Env, Target, WriteStyle};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Console stream that receives log records next to the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Console {
    #[default]
    Stdout,
    Stderr,
}

impl Console {
    fn writer(self) -> Box<dyn Write + Send> {
        match self {
            Console::Stdout => Box::new(io::stdout()),
            Console::Stderr => Box::new(io::stderr()),
        }
    }
}

/// Handle on the log of the current run.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
    started: DateTime<Local>,
}

impl RunLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }
}

/// Install the global logger. Must be called once, before anything logs.
pub fn init(log_dir: &Path, console: Console) -> Result<RunLog> {
    let started = Local::now();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let path = log_dir.join(log_file_name(started));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(Tee::new(file, console.writer()))))
        .write_style(WriteStyle::Never)
        .format_timestamp_secs()
        .try_init()
        .context("Logger was already initialized")?;

    Ok(RunLog { path, started })
}

pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("fav-{}.log", started.format("%Y%m%d-%H%M%S"))
}

/// Writes everything to both sinks.
struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

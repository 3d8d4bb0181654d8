//! # Configuration Module
//!
//! Resolves the options of a run once, before anything else is constructed.
//!
//! ## Profiles
//!
//! A run belongs to exactly one profile, picked by an environment indicator:
//!
//! | Indicator | Profile       |
//! |-----------|---------------|
//! | `DEV`     | `development` |
//! | `TEST`    | `test`        |
//! | `STAGE`   | `stage`       |
//! | `PROD`    | `production`  |
//!
//! An indicator counts as set when its value is non-empty. No indicator means
//! `development`; more than one is a fatal [`ConfigError::AmbiguousProfile`].
//!
//! ## Precedence
//!
//! 1. Profile defaults ([`Profile::defaults`])
//! 2. Optional JSON override file at `<config_dir>/fav/<profile>.json`
//! 3. Command-line flags (which also read their `FAV_*` environment variables)

use crate::error::ConfigError;
use crate::registry::DEFAULT_REGISTRY_PATH;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Environment indicators, in the order they are reported.
pub const PROFILE_INDICATORS: [(&str, Profile); 4] = [
    ("PROD", Profile::Production),
    ("DEV", Profile::Development),
    ("TEST", Profile::Test),
    ("STAGE", Profile::Stage),
];

/// Named set of defaults a run starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Test,
    Stage,
    Production,
}

impl Profile {
    /// Detect the profile from the process environment.
    pub fn detect() -> Result<Self, ConfigError> {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    /// Detect the profile through an arbitrary variable lookup.
    ///
    /// Split out from [`Profile::detect`] so it can be driven without touching
    /// the real environment.
    pub fn detect_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let detected: Vec<(&'static str, Profile)> = PROFILE_INDICATORS
            .iter()
            .copied()
            .filter(|&(key, _)| lookup(key).is_some_and(|value| !value.is_empty()))
            .collect();

        match detected.as_slice() {
            [] => Ok(Profile::Development),
            [(_, profile)] => Ok(*profile),
            _ => Err(ConfigError::AmbiguousProfile(
                detected.iter().map(|(key, _)| *key).collect(),
            )),
        }
    }

    /// Lowercase name, also used for the override file name.
    pub fn name(self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Test => "test",
            Profile::Stage => "stage",
            Profile::Production => "production",
        }
    }

    /// Built-in option values for this profile.
    pub fn defaults(self) -> Config {
        match self {
            Profile::Development => Config {
                profile: self,
                db_path: clementine_db_path(),
                staging_dir: PathBuf::from("staging"),
                registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
                log_dir: PathBuf::from("logs"),
                play_count: 10,
                rating: 0.6,
            },
            Profile::Test => Config {
                profile: self,
                db_path: PathBuf::from("clementine.db"),
                staging_dir: PathBuf::from("test_staging"),
                registry_path: PathBuf::from("test_hashes.txt"),
                log_dir: PathBuf::from("logs"),
                play_count: 10,
                rating: 0.6,
            },
            Profile::Stage => Config {
                profile: self,
                db_path: clementine_db_path(),
                staging_dir: get_data_dir().join("stage"),
                registry_path: get_data_dir().join("stage-hashes.txt"),
                log_dir: get_data_dir().join("logs"),
                play_count: 10,
                rating: 0.6,
            },
            Profile::Production => Config {
                profile: self,
                db_path: clementine_db_path(),
                staging_dir: dirs::audio_dir()
                    .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("Favourites"),
                registry_path: get_data_dir().join(DEFAULT_REGISTRY_PATH),
                log_dir: get_data_dir().join("logs"),
                play_count: 10,
                rating: 0.6,
            },
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fully resolved options of one run. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub profile: Profile,
    /// Music player database, opened read-only.
    pub db_path: PathBuf,
    /// Where exported files are copied to.
    pub staging_dir: PathBuf,
    /// Line-delimited file of exported content hashes.
    pub registry_path: PathBuf,
    /// Directory receiving one log file per run.
    pub log_dir: PathBuf,
    /// Tracks must be played strictly more often than this.
    pub play_count: i64,
    /// Tracks must be rated at least this (0.0 to 1.0).
    pub rating: f64,
}

/// Partial set of options layered over profile defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub registry_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub play_count: Option<i64>,
    pub rating: Option<f64>,
}

impl Overrides {
    /// Read overrides from a JSON file. A missing file yields `None`.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| ConfigError::OverrideFile {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Overwrite every option of `config` that is set here.
    pub fn apply(self, config: &mut Config) {
        if let Some(db_path) = self.db_path {
            config.db_path = db_path;
        }
        if let Some(staging_dir) = self.staging_dir {
            config.staging_dir = staging_dir;
        }
        if let Some(registry_path) = self.registry_path {
            config.registry_path = registry_path;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(play_count) = self.play_count {
            config.play_count = play_count;
        }
        if let Some(rating) = self.rating {
            config.rating = rating;
        }
    }
}

impl Config {
    /// Resolve the configuration of this process.
    ///
    /// Detects the profile from the environment, layers the profile's
    /// override file (if any) and then `cli` on top, and validates the result.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::AmbiguousProfile`] if several indicators are set
    /// - [`ConfigError::OverrideFile`] if the override file is not valid JSON
    /// - [`ConfigError::InvalidRating`] if the final rating is out of range
    pub fn resolve(cli: Overrides) -> Result<Self, ConfigError> {
        let profile = Profile::detect()?;
        let override_file = get_config_dir().map(|dir| dir.join(format!("{profile}.json")));
        Self::resolve_for(profile, override_file.as_deref(), cli)
    }

    /// Same as [`Config::resolve`] with the profile and override file given.
    pub fn resolve_for(
        profile: Profile,
        override_file: Option<&Path>,
        cli: Overrides,
    ) -> Result<Self, ConfigError> {
        let mut config = profile.defaults();

        if let Some(path) = override_file {
            if let Some(file_overrides) = Overrides::from_file(path)? {
                debug!("Applying overrides from {}", path.display());
                file_overrides.apply(&mut config);
            }
        }
        cli.apply(&mut config);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.rating) {
            return Err(ConfigError::InvalidRating(self.rating));
        }
        Ok(())
    }
}

/// Directory holding the per-profile override files, if the platform has one.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fav"))
}

/// Platform data directory for fav. Not created here.
///
/// - **Linux**: `~/.local/share/fav/`
/// - **macOS**: `~/Library/Application Support/fav/`
/// - **Windows**: `%APPDATA%\fav\`
///
/// Falls back to the working directory when the platform has none.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("fav"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where Clementine keeps its library on this platform.
fn clementine_db_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("Clementine").join("clementine.db"))
        .unwrap_or_else(|| PathBuf::from("clementine.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_no_indicator_defaults_to_development() {
        let profile = Profile::detect_with(lookup_from(&[])).unwrap();
        assert_eq!(profile, Profile::Development);
    }

    #[test]
    fn test_single_indicator_selects_profile() {
        for (key, expected) in PROFILE_INDICATORS {
            let profile = Profile::detect_with(lookup_from(&[(key, "1")])).unwrap();
            assert_eq!(profile, expected, "indicator {key}");
        }
    }

    #[test]
    fn test_empty_indicator_is_ignored() {
        let profile = Profile::detect_with(lookup_from(&[("PROD", ""), ("TEST", "yes")])).unwrap();
        assert_eq!(profile, Profile::Test);
    }

    #[test]
    fn test_two_indicators_are_ambiguous() {
        let err = Profile::detect_with(lookup_from(&[("DEV", "1"), ("STAGE", "1")])).unwrap_err();
        match err {
            ConfigError::AmbiguousProfile(keys) => assert_eq!(keys, vec!["DEV", "STAGE"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_profile_defaults_share_thresholds() {
        for (_, profile) in PROFILE_INDICATORS {
            let config = profile.defaults();
            assert_eq!(config.profile, profile);
            assert_eq!(config.play_count, 10);
            assert!((config.rating - 0.6).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_development_writes_next_to_the_working_directory() {
        let config = Profile::Development.defaults();
        assert_eq!(config.registry_path, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert_eq!(config.staging_dir, PathBuf::from("staging"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_cli_overrides_win_over_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("test.json");
        fs::write(&file, r#"{ "play_count": 3, "staging_dir": "/from/file" }"#)?;

        let cli = Overrides {
            play_count: Some(20),
            ..Default::default()
        };
        let config = Config::resolve_for(Profile::Test, Some(&file), cli)?;

        assert_eq!(config.play_count, 20);
        assert_eq!(config.staging_dir, PathBuf::from("/from/file"));
        assert_eq!(config.registry_path, PathBuf::from("test_hashes.txt"));
        Ok(())
    }

    #[test]
    fn test_missing_override_file_is_fine() {
        let config = Config::resolve_for(
            Profile::Test,
            Some(Path::new("/definitely/not/here.json")),
            Overrides::default(),
        )
        .unwrap();
        assert_eq!(config, Profile::Test.defaults());
    }

    #[test]
    fn test_malformed_override_file_is_rejected() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("test.json");
        fs::write(&file, r#"{ "ratting": 0.5 }"#)?;

        let err = Config::resolve_for(Profile::Test, Some(&file), Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::OverrideFile { .. }));
        Ok(())
    }

    #[test]
    fn test_rating_out_of_range_is_rejected() {
        let cli = Overrides {
            rating: Some(1.5),
            ..Default::default()
        };
        let err = Config::resolve_for(Profile::Test, None, cli).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRating(r) if r == 1.5));
    }
}

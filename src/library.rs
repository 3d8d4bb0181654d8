//! # Library Reader
//!
//! Read-only access to a music player's SQLite library (Clementine's schema:
//! one `songs` table, file locations stored as `file://` URIs).
//!
//! The schema belongs to the player. Only `artist`, `title`, `filename`,
//! `playcount` and `rating` are interpreted; every other column is carried
//! along untouched and reachable through [`Track::column`].
//!
//! ```no_run
//! use fav::library::Library;
//!
//! let library = Library::open("clementine.db")?;
//! let mut favourites = library.favourites(10, 0.6)?;
//! for track in favourites.tracks()? {
//!     let track = track?;
//!     println!("{track}: {}", track.path().display());
//! }
//! # Ok::<(), fav::error::LibraryError>(())
//! ```

use crate::error::LibraryError;
use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, MappedRows, OpenFlags, Row, Statement};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

const FAVOURITES_QUERY: &str = "SELECT * FROM songs WHERE playcount > ?1 AND rating >= ?2";
const COUNT_QUERY: &str = "SELECT COUNT(*) FROM songs WHERE playcount > ?1 AND rating >= ?2";

/// Clementine stores unrated songs with a negative rating.
const UNRATED: f64 = -1.0;

/// One row of the `songs` table. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub(crate) artist: String,
    pub(crate) title: String,
    /// Location as stored by the player, usually a `file://` URI.
    pub(crate) filename: String,
    pub(crate) playcount: i64,
    /// 0.0 to 1.0, negative when unrated.
    pub(crate) rating: f64,
    /// Local filesystem path decoded from `filename`.
    pub(crate) path: PathBuf,
    /// Every other column of the row, keyed by column name.
    #[serde(flatten)]
    pub(crate) extra: BTreeMap<String, serde_json::Value>,
}

impl Track {
    /// Build a track from a `SELECT *` row.
    ///
    /// Fails with `InvalidColumnName` when the row has no `filename` column,
    /// as there would be nothing to export.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stmt: &Statement<'_> = row.as_ref();

        let mut artist = String::new();
        let mut title = String::new();
        let mut filename = None;
        let mut playcount = 0;
        let mut rating = UNRATED;
        let mut extra = BTreeMap::new();

        for (idx, name) in stmt.column_names().into_iter().enumerate() {
            let value = row.get_ref(idx)?;
            match name {
                "artist" => artist = as_text(value),
                "title" => title = as_text(value),
                "filename" => filename = Some(as_text(value)),
                "playcount" => playcount = as_integer(value),
                "rating" => rating = as_real(value),
                _ => {
                    extra.insert(name.to_string(), as_json(value));
                }
            }
        }

        let filename =
            filename.ok_or_else(|| rusqlite::Error::InvalidColumnName("filename".to_string()))?;
        let path = decode_location(&filename);

        Ok(Self {
            artist,
            title,
            filename,
            playcount,
            rating,
            path,
            extra,
        })
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn playcount(&self) -> i64 {
        self.playcount
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up one of the uninterpreted columns.
    pub fn column(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// Turn a stored location into a local path.
///
/// `file` URIs are percent-decoded and lose their scheme and host (a remote
/// host is ignored, the path is still used locally). Anything that does not
/// parse as a URI is taken as a plain path.
pub fn decode_location(location: &str) -> PathBuf {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => file_url_path(&url),
        _ => PathBuf::from(location),
    }
}

fn file_url_path(url: &Url) -> PathBuf {
    if let Ok(path) = url.to_file_path() {
        return path;
    }

    // `to_file_path` refuses hosts other than localhost; re-root the path.
    Url::parse(&format!("file://{}", url.path()))
        .ok()
        .and_then(|local| local.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(url.path()))
}

fn as_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn as_integer(value: ValueRef<'_>) -> i64 {
    match value {
        ValueRef::Integer(i) => i,
        ValueRef::Real(f) => f as i64,
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).trim().parse().unwrap_or(0),
        ValueRef::Null | ValueRef::Blob(_) => 0,
    }
}

fn as_real(value: ValueRef<'_>) -> f64 {
    match value {
        ValueRef::Real(f) => f,
        ValueRef::Integer(i) => i as f64,
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).trim().parse().unwrap_or(UNRATED),
        ValueRef::Null | ValueRef::Blob(_) => UNRATED,
    }
}

fn as_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        ValueRef::Blob(bytes) => hex::encode(bytes).into(),
    }
}

fn check_rating(rating: f64) -> Result<(), LibraryError> {
    if (0.0..=1.0).contains(&rating) {
        Ok(())
    } else {
        Err(LibraryError::InvalidRating(rating))
    }
}

/// Read-only handle on a player library.
#[derive(Debug)]
pub struct Library {
    conn: Connection,
    path: PathBuf,
}

impl Library {
    /// Open the library at `path` without ever creating or writing it.
    ///
    /// # Errors
    ///
    /// - [`LibraryError::NotFound`] if `path` does not exist
    /// - [`LibraryError::Sqlite`] if the file cannot be opened as a database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LibraryError::NotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened music library {} read-only", path.display());

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Prepare the query for tracks played more than `play_count` times and
    /// rated at least `rating`.
    ///
    /// `rating` must lie in `0.0..=1.0`.
    pub fn favourites(&self, play_count: i64, rating: f64) -> Result<Favourites<'_>, LibraryError> {
        check_rating(rating)?;
        let stmt = self.conn.prepare(FAVOURITES_QUERY)?;

        Ok(Favourites {
            stmt,
            play_count,
            rating,
        })
    }

    /// Number of tracks [`Library::favourites`] would yield.
    pub fn count_favourites(&self, play_count: i64, rating: f64) -> Result<u64, LibraryError> {
        check_rating(rating)?;
        let count: i64 = self
            .conn
            .query_row(COUNT_QUERY, (play_count, rating), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// A prepared favourites query.
pub struct Favourites<'conn> {
    stmt: Statement<'conn>,
    play_count: i64,
    rating: f64,
}

type RowMapper = fn(&Row<'_>) -> rusqlite::Result<Track>;

impl Favourites<'_> {
    /// Run the query. Rows are fetched lazily as the iterator advances.
    pub fn tracks(&mut self) -> Result<Tracks<'_>, LibraryError> {
        let params = (self.play_count, self.rating);
        let rows = self.stmt.query_map(params, Track::from_row as RowMapper)?;
        Ok(Tracks { rows })
    }
}

/// Single-pass iterator over matching tracks.
pub struct Tracks<'stmt> {
    rows: MappedRows<'stmt, RowMapper>,
}

impl Iterator for Tracks<'_> {
    type Item = Result<Track, LibraryError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| row.map_err(LibraryError::from))
    }
}

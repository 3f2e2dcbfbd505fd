//! # Snapshot Persistence
//!
//! Weather and transit data are persisted between render cycles as JSON
//! documents (`last_updated` plus the records). Files are always written and
//! read wholesale.
//!
//! ## Storage
//! - **Location**: `<data_dir>/weather_<lat>_<lon>.json` and
//!   `<data_dir>/transit_<station>.json`, so a config change never serves data
//!   fetched for another place
//! - **Writes**: serialised to a sibling `.tmp` file, then renamed into place so
//!   a reader never sees a half-written snapshot
//! - **Staleness**: judged from `last_updated`, not file modification time
//!
//! ## Refresh Policy
//! [`refresh_or_stale`] tries the collaborator once. On success the new snapshot
//! replaces the old one on disk; on failure the previous snapshot (if any) is
//! returned and the failure logged. Nothing retries.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::http::FetchError;
use crate::{TransitSnapshot, WeatherSnapshot};

/// Errors that can occur while reading or writing snapshots.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot IO: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A persisted, wholesale-replaced record of fetched data.
pub trait Snapshot: Serialize + DeserializeOwned {
    /// File name stem inside the data directory.
    const FILE_STEM: &'static str;

    fn last_updated(&self) -> DateTime<Utc>;

    /// True once `max_age` has passed since the snapshot was taken.
    fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.last_updated() >= max_age
    }
}

impl Snapshot for WeatherSnapshot {
    const FILE_STEM: &'static str = "weather";

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

impl Snapshot for TransitSnapshot {
    const FILE_STEM: &'static str = "transit";

    fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

/// Directory of persisted snapshots.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    key: Option<String>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            key: None,
        }
    }

    /// Same directory, with `key` (a station code, a location) added to every
    /// file name. Characters other than ASCII alphanumerics, `-` and `.`
    /// become `_`.
    pub fn keyed(mut self, key: &str) -> Self {
        let key = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.key = Some(key);
        self
    }

    pub fn path<S: Snapshot>(&self) -> PathBuf {
        match &self.key {
            Some(key) => self.dir.join(format!("{}_{key}.json", S::FILE_STEM)),
            None => self.dir.join(format!("{}.json", S::FILE_STEM)),
        }
    }

    /// Read a snapshot. A missing file is `Ok(None)`, not an error.
    pub fn load<S: Snapshot>(&self) -> Result<Option<S>, SnapshotError> {
        let path = self.path::<S>();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    pub fn save<S: Snapshot>(&self, snapshot: &S) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path::<S>();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Return an up-to-date snapshot, fetching only when the stored one is stale.
///
/// - fresh stored snapshot: returned without calling `fetch`
/// - stale or missing: `fetch` is tried once; success is persisted and returned
/// - fetch failure: the stale snapshot is returned (possibly `None`)
///
/// Persistence failures are logged and never hide freshly fetched data.
pub fn refresh_or_stale<S, F>(
    store: &SnapshotStore,
    now: DateTime<Utc>,
    max_age: Duration,
    fetch: F,
) -> Option<S>
where
    S: Snapshot,
    F: FnOnce() -> Result<S, FetchError>,
{
    let stored = match store.load::<S>() {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(file = S::FILE_STEM, error = %e, "ignoring unreadable snapshot");
            None
        }
    };

    if let Some(snapshot) = &stored {
        if !snapshot.is_stale(now, max_age) {
            return stored;
        }
    }

    match fetch() {
        Ok(fresh) => {
            if let Err(e) = store.save(&fresh) {
                tracing::warn!(file = S::FILE_STEM, error = %e, "could not persist snapshot");
            }
            tracing::info!(file = S::FILE_STEM, "snapshot refreshed");
            Some(fresh)
        }
        Err(e) => {
            tracing::warn!(
                file = S::FILE_STEM,
                error = %e,
                have_stale = stored.is_some(),
                "refresh failed, keeping previous snapshot"
            );
            stored
        }
    }
}

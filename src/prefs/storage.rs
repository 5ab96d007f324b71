use crate::prefs::{PrefSource, Prefs, PrefsError};
use std::env;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Modification time and length of the prefs file, `None` when it is missing.
type FileStamp = Option<(SystemTime, u64)>;

/// Preferences persisted as TOML on disk.
///
/// [`PrefSource::current`] keeps the last parsed prefs and only re-reads the
/// file when its modification time or length changes, so edits made by
/// another process are still picked up on the next sync decision.
/// Environment references are resolved when the file is read.
pub struct PrefStore {
    path: PathBuf,
    cached: Mutex<Option<(FileStamp, Prefs)>>,
}

impl PrefStore {
    /// Uses the prefs file at `path`. The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PrefStore {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Uses `{config_dir}/wotero/prefs.toml`.
    ///
    /// Returns `PrefsError::NoConfigDir` if the platform config directory
    /// cannot be determined.
    pub fn open_default() -> Result<Self, PrefsError> {
        let dir = dirs::config_dir().ok_or(PrefsError::NoConfigDir)?;
        Ok(PrefStore::new(dir.join("wotero").join("prefs.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads preferences, returning defaults when the file is missing.
    ///
    /// `$VAR` and `${VAR}` references in the token and database ID are
    /// resolved from the environment.
    pub fn load(&self) -> Result<Prefs, PrefsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "prefs file not found, using defaults");
                return Ok(Prefs::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut prefs: Prefs = toml::from_str(&contents)?;
        resolve_env_ref(&mut prefs.wolai_token);
        resolve_env_ref(&mut prefs.wolai_database_id);
        Ok(prefs)
    }

    /// Saves preferences, creating the parent directory if needed.
    ///
    /// Uses an atomic write (tempfile + rename) so readers never observe a
    /// partially written file.
    pub fn save(&self, prefs: &Prefs) -> Result<(), PrefsError> {
        let data = toml::to_string_pretty(prefs)?;
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| PrefsError::Io(e.error))?;

        // Saved values are re-read so environment references resolve
        let saved = self.load()?;
        self.store_cached(self.stamp(), saved);
        Ok(())
    }

    fn stamp(&self) -> FileStamp {
        let meta = fs::metadata(&self.path).ok()?;
        Some((meta.modified().ok()?, meta.len()))
    }

    fn store_cached(&self, stamp: FileStamp, prefs: Prefs) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some((stamp, prefs));
    }
}

impl PrefSource for PrefStore {
    fn current(&self) -> Prefs {
        let stamp = self.stamp();
        if let Some((cached_stamp, prefs)) =
            &*self.cached.lock().unwrap_or_else(PoisonError::into_inner)
        {
            if *cached_stamp == stamp {
                return prefs.clone();
            }
        }

        let prefs = self.load().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to load prefs, using defaults");
            Prefs::default()
        });
        self.store_cached(stamp, prefs.clone());
        prefs
    }
}

/// Replaces a `$VAR` or `${VAR}` value with the variable's contents.
///
/// Unset variables resolve to `None`, which later surfaces as a missing
/// preference.
fn resolve_env_ref(value: &mut Option<String>) {
    let Some(raw) = value.as_deref() else {
        return;
    };

    let name = raw
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .or_else(|| raw.strip_prefix('$'));

    if let Some(name) = name {
        *value = env::var(name).ok();
    }
}

use crate::error::{AccountingError, Result};
use crate::state::TrafficState;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

pub const STATE_FILE_NAME: &str = "traffic_stats.json";

/// Whole-file JSON snapshot of [`TrafficState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self::new(data_dir.as_ref().join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no state has been written yet. A file that exists but
    /// does not parse is an error: prior totals cannot be guessed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<TrafficState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state =
            serde_json::from_str(&content).map_err(|source| AccountingError::MalformedState {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(state))
    }

    /// Rewrites the whole file. The snapshot is written beside the target and
    /// renamed over it so a crash never leaves a half-written file. On failure
    /// the temporary file is removed and the previous snapshot stays as it was.
    pub fn save(&self, state: &TrafficState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let written =
            fs::write(&tmp_path, content).and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), "Saved traffic state");
        Ok(())
    }
}

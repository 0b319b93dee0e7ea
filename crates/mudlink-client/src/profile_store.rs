//! JSON file persistence for worlds, characters, and highlight rules.
//!
//! Stored at `~/.mudlink/profile.json` by default. Loading never fails: a
//! missing or unreadable file is an empty profile, and each collection
//! decodes independently.

use std::fs;
use std::path::{Path, PathBuf};

use mudlink_core::error::{MudError, MudResult};
use mudlink_core::model::Profile;
use mudlink_core::store::{decode_profile, ProfileStore};

/// Profile stored as a pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (`~/.mudlink/profile.json`).
    pub fn default_location() -> MudResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| MudError::Other("cannot determine home directory".into()))?;
        Ok(Self::new(home.join(".mudlink").join("profile.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> Profile {
        match fs::read_to_string(&self.path) {
            Ok(content) => decode_profile(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Profile::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read profile, starting empty");
                Profile::default()
            }
        }
    }

    fn save(&self, profile: &Profile) -> MudResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut json = serde_json::to_string_pretty(profile)?;
        json.push('\n');

        // Write beside the target, then rename over it.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| MudError::Persistence(format!("{}: {e}", self.path.display())))?;

        tracing::debug!(path = %self.path.display(), "profile saved");
        Ok(())
    }
}

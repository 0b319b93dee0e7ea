//! File-based secret storage.
//!
//! Secrets are stored at `~/.mudlink/secrets/` by default, one file per
//! character id. The directory is created `0700` and each file `0600` on
//! unix.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use mudlink_core::error::{MudError, MudResult};
use mudlink_core::model::CharacterId;
use mudlink_core::store::CredentialStore;

/// One-file-per-character credential store.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Store at the default location (`~/.mudlink/secrets/`).
    pub fn default_location() -> MudResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| MudError::Other("cannot determine home directory".into()))?;
        Ok(Self::new(home.join(".mudlink").join("secrets")))
    }

    fn ensure_dir(&self) -> MudResult<()> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&self.base_dir, fs::Permissions::from_mode(0o700))?;
            }
        }
        Ok(())
    }

    /// Ids are generated hex, but legacy or hand-edited ids may not be; keep
    /// the file name inside the store directory either way.
    fn secret_path(&self, character: &CharacterId) -> PathBuf {
        let name: String = character
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{name}.secret"))
    }
}

impl CredentialStore for FileCredentialStore {
    fn save_password(&self, secret: &str, character: &CharacterId) -> MudResult<()> {
        self.ensure_dir()
            .map_err(|e| MudError::Credential(format!("secrets directory: {e}")))?;
        let path = self.secret_path(character);
        fs::write(&path, secret)
            .map_err(|e| MudError::Credential(format!("{}: {e}", path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(character = %character, "secret saved");
        Ok(())
    }

    fn get_password(&self, character: &CharacterId) -> MudResult<Option<String>> {
        match fs::read_to_string(self.secret_path(character)) {
            Ok(secret) => Ok(Some(secret)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MudError::Credential(e.to_string())),
        }
    }

    fn delete_password(&self, character: &CharacterId) -> MudResult<bool> {
        match fs::remove_file(self.secret_path(character)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MudError::Credential(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().join("secrets"));
        let id = CharacterId::from("abc123");

        assert_eq!(store.get_password(&id).unwrap(), None);
        store.save_password("hunter2", &id).unwrap();
        assert_eq!(store.get_password(&id).unwrap().as_deref(), Some("hunter2"));

        store.save_password("swordfish", &id).unwrap();
        assert_eq!(store.get_password(&id).unwrap().as_deref(), Some("swordfish"));

        assert!(store.delete_password(&id).unwrap());
        assert!(!store.delete_password(&id).unwrap());
        assert_eq!(store.get_password(&id).unwrap(), None);
    }

    #[test]
    fn hostile_ids_stay_inside_the_store() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("secrets");
        let store = FileCredentialStore::new(&base);
        let id = CharacterId::from("../../etc/passwd");

        store.save_password("x", &id).unwrap();
        let entries: Vec<_> = fs::read_dir(&base).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.get_password(&id).unwrap().as_deref(), Some("x"));
    }

    #[cfg(unix)]
    #[test]
    fn permissions_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let base = dir.path().join("secrets");
        let store = FileCredentialStore::new(&base);
        let id = CharacterId::from("c1");
        store.save_password("pw", &id).unwrap();

        let dir_mode = fs::metadata(&base).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        let file_mode = fs::metadata(store.secret_path(&id)).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
    }
}

//! Storage seams for secrets and persisted entities.
//!
//! The engine never writes secrets itself: it asks a `CredentialStore` at
//! session creation time and hands new secrets to it on save. Entities go
//! through a `ProfileStore`, which must never fail a load.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::MudResult;
use crate::model::{CharacterId, Profile};

/// Secret storage keyed by character.
pub trait CredentialStore: Send + Sync {
    fn save_password(&self, secret: &str, character: &CharacterId) -> MudResult<()>;

    fn get_password(&self, character: &CharacterId) -> MudResult<Option<String>>;

    /// Returns true if a secret existed.
    fn delete_password(&self, character: &CharacterId) -> MudResult<bool>;
}

/// Entity storage. `load` degrades to defaults instead of failing.
pub trait ProfileStore: Send + Sync {
    fn load(&self) -> Profile;

    fn save(&self, profile: &Profile) -> MudResult<()>;
}

/// Credential store held in memory (tests, ephemeral sessions).
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    secrets: Mutex<HashMap<CharacterId, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save_password(&self, secret: &str, character: &CharacterId) -> MudResult<()> {
        let mut secrets = self.secrets.lock().unwrap_or_else(|p| p.into_inner());
        secrets.insert(character.clone(), secret.to_string());
        Ok(())
    }

    fn get_password(&self, character: &CharacterId) -> MudResult<Option<String>> {
        let secrets = self.secrets.lock().unwrap_or_else(|p| p.into_inner());
        Ok(secrets.get(character).cloned())
    }

    fn delete_password(&self, character: &CharacterId) -> MudResult<bool> {
        let mut secrets = self.secrets.lock().unwrap_or_else(|p| p.into_inner());
        Ok(secrets.remove(character).is_some())
    }
}

/// Profile store held in memory. Counts saves so callers can check persistence.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: Mutex<Profile>,
    saves: Mutex<usize>,
}

impl MemoryProfileStore {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile: Mutex::new(profile),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed saves.
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The last saved profile.
    pub fn snapshot(&self) -> Profile {
        self.profile.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Profile {
        self.snapshot()
    }

    fn save(&self, profile: &Profile) -> MudResult<()> {
        *self.profile.lock().unwrap_or_else(|p| p.into_inner()) = profile.clone();
        *self.saves.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}

/// Decode a profile document collection by collection.
///
/// A collection that fails to decode loads empty; the others are kept.
/// Anything that is not a JSON object yields an empty profile.
pub fn decode_profile(json: &str) -> Profile {
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "profile is not valid JSON, starting empty");
            return Profile::default();
        }
    };

    let Some(map) = value.as_object() else {
        warn!("profile is not a JSON object, starting empty");
        return Profile::default();
    };

    Profile {
        worlds: field(map, "worlds"),
        characters: field(map, "characters"),
        highlights: field(map, "highlights"),
        auto_connect: field(map, "auto_connect"),
        default_world: field(map, "default_world"),
    }
}

fn field<T: DeserializeOwned + Default>(
    map: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> T {
    match map.get(key) {
        None => T::default(),
        Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
            warn!(collection = key, error = %e, "dropping undecodable collection");
            T::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{World, WorldId};

    #[test]
    fn memory_credentials_round_trip() {
        let store = MemoryCredentialStore::new();
        let id = CharacterId::from("c1");
        assert_eq!(store.get_password(&id).unwrap(), None);
        store.save_password("hunter2", &id).unwrap();
        assert_eq!(store.get_password(&id).unwrap().as_deref(), Some("hunter2"));
        assert!(store.delete_password(&id).unwrap());
        assert!(!store.delete_password(&id).unwrap());
    }

    #[test]
    fn memory_profile_counts_saves() {
        let store = MemoryProfileStore::default();
        let mut profile = store.load();
        profile.worlds.push(World::new("Aardwolf", "aardmud.org", 4000));
        store.save(&profile).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().worlds.len(), 1);
    }

    #[test]
    fn corrupt_collection_loads_empty_others_survive() {
        let json = r#"{
            "worlds": [{"id": "w1", "name": "Achaea", "hostname": "achaea.com"}],
            "characters": "this is not a list",
            "default_world": "w1"
        }"#;
        let p = decode_profile(json);
        assert_eq!(p.worlds.len(), 1);
        assert!(p.characters.is_empty());
        assert_eq!(p.default_world, Some(WorldId::from("w1")));
    }

    #[test]
    fn garbage_loads_empty_profile() {
        assert_eq!(decode_profile("not json"), Profile::default());
        assert_eq!(decode_profile("[1, 2, 3]"), Profile::default());
    }
}

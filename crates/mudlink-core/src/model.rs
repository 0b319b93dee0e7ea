//! Persisted entities and identifiers.
//!
//! Worlds, characters and highlight rules are loaded at startup and saved on
//! every mutation. Every optional field has a serde default so profiles
//! written by older versions still load.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default TCP port for a world.
pub const DEFAULT_PORT: u16 = 7007;

/// Generate a random 128-bit identifier as lowercase hex.
pub fn generate_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    hex::encode(bytes)
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// A fresh random identifier.
            pub fn generate() -> Self {
                Self(generate_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identity of a configured world.
    WorldId
);
opaque_id!(
    /// Identity of a character.
    CharacterId
);
opaque_id!(
    /// Identity of a live session, generated once when the session is created.
    SessionId
);

/// Published connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// A remote world (host) the client can connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub description: String,
}

impl World {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>, port: u16) -> Self {
        Self {
            id: WorldId::generate(),
            name: name.into(),
            hostname: hostname.into(),
            port,
            description: String::new(),
        }
    }

    /// `host:port` as used for resolution.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// A character on a world. The secret lives in the credential store, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub world_id: WorldId,
    #[serde(default)]
    pub favorite: bool,
}

impl Character {
    pub fn new(name: impl Into<String>, world_id: WorldId) -> Self {
        Self {
            id: CharacterId::generate(),
            name: name.into(),
            world_id,
            favorite: false,
        }
    }
}

/// A text highlighting rule. Opaque to the engine; carried for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub pattern: String,
    /// Named color, `#rrggbb`, or `rgb(r, g, b)`.
    pub color: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub is_regex: bool,
}

impl HighlightRule {
    pub fn new(pattern: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            color: color.into(),
            enabled: true,
            is_regex: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Everything persisted between runs (secrets excluded).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub worlds: Vec<World>,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub highlights: Vec<HighlightRule>,
    /// Characters to connect on startup.
    #[serde(default)]
    pub auto_connect: Vec<CharacterId>,
    #[serde(default)]
    pub default_world: Option<WorldId>,
}

impl Profile {
    pub fn world(&self, id: &WorldId) -> Option<&World> {
        self.worlds.iter().find(|w| &w.id == id)
    }

    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| &c.id == id)
    }

    /// Look up a world by id, falling back to an exact name match.
    pub fn world_by_key(&self, key: &str) -> Option<&World> {
        self.worlds
            .iter()
            .find(|w| w.id.as_str() == key)
            .or_else(|| self.worlds.iter().find(|w| w.name == key))
    }

    /// Look up a character by id, falling back to an exact name match.
    pub fn character_by_key(&self, key: &str) -> Option<&Character> {
        self.characters
            .iter()
            .find(|c| c.id.as_str() == key)
            .or_else(|| self.characters.iter().find(|c| c.name == key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_hex() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn world_defaults_on_missing_fields() {
        let w: World =
            serde_json::from_str(r#"{"id":"w1","name":"Lusternia","hostname":"example.org"}"#)
                .unwrap();
        assert_eq!(w.port, DEFAULT_PORT);
        assert!(w.description.is_empty());
        assert_eq!(w.address(), "example.org:7007");
    }

    #[test]
    fn character_favorite_defaults_false() {
        let c: Character =
            serde_json::from_str(r#"{"id":"c1","name":"Ayla","world_id":"w1"}"#).unwrap();
        assert!(!c.favorite);
        assert_eq!(c.world_id, WorldId::from("w1"));
    }

    #[test]
    fn highlight_enabled_defaults_true() {
        let h: HighlightRule =
            serde_json::from_str(r##"{"pattern":"tells you","color":"#ff8800"}"##).unwrap();
        assert!(h.enabled);
        assert!(!h.is_regex);
    }

    #[test]
    fn empty_object_is_empty_profile() {
        let p: Profile = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Profile::default());
    }

    #[test]
    fn lookup_by_id_then_name() {
        let mut p = Profile::default();
        let w = World::new("Achaea", "achaea.com", 23);
        let id = w.id.clone();
        p.worlds.push(w);
        assert_eq!(p.world_by_key(id.as_str()).map(|w| w.port), Some(23));
        assert_eq!(p.world_by_key("Achaea").map(|w| w.id.clone()), Some(id));
        assert!(p.world_by_key("nope").is_none());
    }
}

//! The set of live sessions and the persisted entities they are built from.
//!
//! `SessionRegistry` is the single owner of session state. It holds the
//! receiving end of the engine inbox; callers pump it with `next_dispatch`
//! (or `drain_pending`) and every transport event is applied here, on the
//! caller's task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mudlink_core::error::{MudError, MudResult};
use mudlink_core::events::EventBus;
use mudlink_core::model::{Character, CharacterId, HighlightRule, Profile, SessionId, World, WorldId};
use mudlink_core::store::{CredentialStore, ProfileStore};

use crate::session::{EngineContext, SessionConnection};
use crate::settings::EngineSettings;
use crate::transport::{Dialer, Dispatch};

/// Owns sessions, the active-session pointer, and the profile.
pub struct SessionRegistry {
    ctx: EngineContext,
    inbox: mpsc::UnboundedReceiver<Dispatch>,
    sessions: Vec<SessionConnection>,
    active: Option<SessionId>,
    profile: Profile,
    profiles: Arc<dyn ProfileStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("active", &self.active)
            .field("worlds", &self.profile.worlds.len())
            .field("characters", &self.profile.characters.len())
            .finish()
    }
}

impl SessionRegistry {
    /// Build a registry and load the profile from `profiles`.
    pub fn new(
        settings: EngineSettings,
        dialer: Arc<dyn Dialer>,
        bus: EventBus,
        profiles: Arc<dyn ProfileStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let (ctx, inbox) = EngineContext::new(settings, dialer, bus);
        let profile = profiles.load();
        debug!(
            worlds = profile.worlds.len(),
            characters = profile.characters.len(),
            "profile loaded"
        );
        Self {
            ctx,
            inbox,
            sessions: Vec::new(),
            active: None,
            profile,
            profiles,
            credentials,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.ctx.bus
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.ctx.settings
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    // ── Sessions ─────────────────────────────────────────────────────

    /// Open a session for `character` on `world`.
    pub fn add_connection(&mut self, character: &Character, world: &World) -> SessionId {
        let secret = match self.credentials.get_password(&character.id) {
            Ok(secret) => secret,
            Err(e) => {
                warn!(character = %character.name, error = %e, "cannot read secret");
                None
            }
        };
        let session = SessionConnection::for_character(
            self.ctx.clone(),
            character.clone(),
            world.clone(),
            secret,
        );
        self.install(session)
    }

    pub fn add_guest_connection(&mut self, world: World) -> SessionId {
        let session = SessionConnection::guest(self.ctx.clone(), world);
        self.install(session)
    }

    pub fn add_connection_without_character(&mut self, world: World) -> SessionId {
        let session = SessionConnection::without_character(self.ctx.clone(), world);
        self.install(session)
    }

    /// Open a session for a stored character, resolving its world the same
    /// way auto-connect does.
    pub fn connect_character(&mut self, character_id: &CharacterId) -> MudResult<SessionId> {
        let character = self
            .profile
            .character(character_id)
            .cloned()
            .ok_or_else(|| MudError::NotFound(format!("character {character_id}")))?;
        let world = self.resolve_world(&character).ok_or_else(|| {
            MudError::NotFound(format!("world for character {}", character.name))
        })?;
        Ok(self.add_connection(&character, &world))
    }

    fn install(&mut self, mut session: SessionConnection) -> SessionId {
        let id = session.id().clone();
        info!(session = %id, label = %session.display_label(), "session added");
        session.connect();
        self.sessions.push(session);
        self.active = Some(id.clone());
        id
    }

    /// Disconnect and drop a session. Activity falls to the first remaining
    /// session, if any.
    pub fn remove_connection(&mut self, id: &SessionId) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.id() == id) else {
            return false;
        };
        let mut session = self.sessions.remove(index);
        session.disconnect();
        info!(session = %id, "session removed");

        if self.active.as_ref() == Some(id) {
            self.active = self.sessions.first().map(|s| s.id().clone());
        }
        true
    }

    pub fn sessions(&self) -> &[SessionConnection] {
        &self.sessions
    }

    pub fn session(&self, id: &SessionId) -> Option<&SessionConnection> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn session_mut(&mut self, id: &SessionId) -> Option<&mut SessionConnection> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    pub fn find_session(
        &self,
        character_id: &CharacterId,
        world_id: &WorldId,
    ) -> Option<&SessionConnection> {
        self.sessions.iter().find(|s| {
            &s.world().id == world_id && s.character().is_some_and(|c| &c.id == character_id)
        })
    }

    pub fn active(&self) -> Option<&SessionConnection> {
        self.active.as_ref().and_then(|id| self.session(id))
    }

    pub fn active_mut(&mut self) -> Option<&mut SessionConnection> {
        let id = self.active.clone()?;
        self.session_mut(&id)
    }

    pub fn set_active(&mut self, id: &SessionId) -> bool {
        if self.session(id).is_none() {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    /// Wait for the next transport event that changes a session, apply it,
    /// and return that session's id. Cancel-safe.
    pub async fn next_dispatch(&mut self) -> Option<SessionId> {
        loop {
            let dispatch = self.inbox.recv().await?;
            if let Some(id) = self.route(dispatch) {
                return Some(id);
            }
        }
    }

    /// Apply everything already queued, without waiting.
    pub fn drain_pending(&mut self) -> Vec<SessionId> {
        let mut changed = Vec::new();
        while let Ok(dispatch) = self.inbox.try_recv() {
            if let Some(id) = self.route(dispatch) {
                if !changed.contains(&id) {
                    changed.push(id);
                }
            }
        }
        changed
    }

    fn route(&mut self, dispatch: Dispatch) -> Option<SessionId> {
        let id = dispatch.session.clone();
        match self.session_mut(&id) {
            Some(session) => session.handle_dispatch(dispatch).then_some(id),
            None => {
                // Removed session; dropping the event closes any transport in it.
                debug!(session = %id, "event for unknown session dropped");
                None
            }
        }
    }

    /// Disconnect every session.
    pub fn shutdown(&mut self) {
        for session in &mut self.sessions {
            session.disconnect();
        }
        info!(sessions = self.sessions.len(), "all sessions disconnected");
    }

    // ── Startup ──────────────────────────────────────────────────────

    /// Open a session for every character flagged for auto-connect.
    pub fn auto_connect_characters(&mut self) -> Vec<SessionId> {
        let mut opened = Vec::new();
        for character_id in self.profile.auto_connect.clone() {
            let Some(character) = self.profile.character(&character_id).cloned() else {
                warn!(character = %character_id, "auto-connect entry has no character, skipping");
                continue;
            };
            let Some(world) = self.resolve_world(&character) else {
                warn!(
                    character = %character.name,
                    world = %character.world_id,
                    "cannot resolve world for auto-connect, skipping"
                );
                continue;
            };
            if self.find_session(&character.id, &world.id).is_some() {
                debug!(character = %character.name, "already connected, skipping");
                continue;
            }
            opened.push(self.add_connection(&character, &world));
        }
        opened
    }

    /// The character's world by id, or the only configured world when the
    /// id does not resolve.
    fn resolve_world(&self, character: &Character) -> Option<World> {
        if let Some(world) = self.profile.world(&character.world_id) {
            return Some(world.clone());
        }
        match self.profile.worlds.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Characters on `world_id`.
    ///
    /// Legacy profiles can hold characters pointing at a stale copy of a
    /// world with the same name. When nothing matches by id, those are
    /// matched by world name and repointed at `world_id`. This is a
    /// compatibility repair only; with duplicate world names it can pick
    /// the wrong world.
    pub fn characters_for_world(&mut self, world_id: &WorldId) -> Vec<Character> {
        let direct: Vec<Character> = self
            .profile
            .characters
            .iter()
            .filter(|c| &c.world_id == world_id)
            .cloned()
            .collect();
        if !direct.is_empty() {
            return direct;
        }

        let Some(name) = self.profile.world(world_id).map(|w| w.name.clone()) else {
            return Vec::new();
        };
        let namesakes: Vec<WorldId> = self
            .profile
            .worlds
            .iter()
            .filter(|w| w.name == name && &w.id != world_id)
            .map(|w| w.id.clone())
            .collect();

        let mut repaired = Vec::new();
        for character in &mut self.profile.characters {
            if namesakes.contains(&character.world_id) {
                warn!(
                    character = %character.name,
                    from = %character.world_id,
                    to = %world_id,
                    "repairing character world reference by name"
                );
                character.world_id = world_id.clone();
                repaired.push(character.clone());
            }
        }

        if !repaired.is_empty() {
            if let Err(e) = self.persist() {
                warn!(error = %e, "failed to save repaired characters");
            }
        }
        repaired
    }

    pub fn add_world(&mut self, world: World) -> MudResult<WorldId> {
        if world.name.trim().is_empty() || world.hostname.trim().is_empty() {
            return Err(MudError::InvalidInput("world needs a name and a hostname".into()));
        }
        let id = world.id.clone();
        self.profile.worlds.push(world);
        self.persist()?;
        Ok(id)
    }

    pub fn update_world(&mut self, world: World) -> MudResult<()> {
        let slot = self
            .profile
            .worlds
            .iter_mut()
            .find(|w| w.id == world.id)
            .ok_or_else(|| MudError::NotFound(format!("world {}", world.id)))?;
        *slot = world;
        self.persist()
    }

    /// Remove a world with its characters, their secrets, and their
    /// auto-connect entries. Live sessions are left alone.
    pub fn remove_world(&mut self, world_id: &WorldId) -> MudResult<World> {
        let index = self
            .profile
            .worlds
            .iter()
            .position(|w| &w.id == world_id)
            .ok_or_else(|| MudError::NotFound(format!("world {world_id}")))?;
        let world = self.profile.worlds.remove(index);

        let (gone, kept): (Vec<Character>, Vec<Character>) = self
            .profile
            .characters
            .drain(..)
            .partition(|c| &c.world_id == world_id);
        self.profile.characters = kept;

        for character in &gone {
            self.forget_secret(&character.id);
            self.profile.auto_connect.retain(|id| id != &character.id);
        }
        if self.profile.default_world.as_ref() == Some(world_id) {
            self.profile.default_world = None;
        }

        self.persist()?;
        Ok(world)
    }

    /// Store a character; a non-empty `secret` goes to the credential store.
    pub fn add_character(
        &mut self,
        character: Character,
        secret: Option<&str>,
    ) -> MudResult<CharacterId> {
        if character.name.trim().is_empty() {
            return Err(MudError::InvalidInput("character needs a name".into()));
        }
        if self.profile.world(&character.world_id).is_none() {
            return Err(MudError::NotFound(format!("world {}", character.world_id)));
        }
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.credentials.save_password(secret, &character.id)?;
        }
        let id = character.id.clone();
        self.profile.characters.push(character);
        self.persist()?;
        Ok(id)
    }

    pub fn remove_character(&mut self, character_id: &CharacterId) -> MudResult<Character> {
        let index = self
            .profile
            .characters
            .iter()
            .position(|c| &c.id == character_id)
            .ok_or_else(|| MudError::NotFound(format!("character {character_id}")))?;
        let character = self.profile.characters.remove(index);
        self.profile.auto_connect.retain(|id| id != character_id);
        self.forget_secret(character_id);
        self.persist()?;
        Ok(character)
    }

    pub fn set_favorite(&mut self, character_id: &CharacterId, favorite: bool) -> MudResult<()> {
        self.character_mut(character_id)?.favorite = favorite;
        self.persist()
    }

    pub fn set_auto_connect(&mut self, character_id: &CharacterId, enabled: bool) -> MudResult<()> {
        self.character_mut(character_id)?;
        let listed = self.profile.auto_connect.contains(character_id);
        match (enabled, listed) {
            (true, false) => self.profile.auto_connect.push(character_id.clone()),
            (false, true) => self.profile.auto_connect.retain(|id| id != character_id),
            _ => return Ok(()),
        }
        self.persist()
    }

    pub fn set_default_world(&mut self, world_id: Option<WorldId>) -> MudResult<()> {
        if let Some(id) = &world_id {
            if self.profile.world(id).is_none() {
                return Err(MudError::NotFound(format!("world {id}")));
            }
        }
        self.profile.default_world = world_id;
        self.persist()
    }

    pub fn add_highlight(&mut self, rule: HighlightRule) -> MudResult<()> {
        if rule.pattern.is_empty() {
            return Err(MudError::InvalidInput("empty highlight pattern".into()));
        }
        self.profile.highlights.push(rule);
        self.persist()
    }

    pub fn remove_highlight(&mut self, index: usize) -> MudResult<HighlightRule> {
        if index >= self.profile.highlights.len() {
            return Err(MudError::NotFound(format!("highlight #{index}")));
        }
        let rule = self.profile.highlights.remove(index);
        self.persist()?;
        Ok(rule)
    }

    fn character_mut(&mut self, character_id: &CharacterId) -> MudResult<&mut Character> {
        self.profile
            .characters
            .iter_mut()
            .find(|c| &c.id == character_id)
            .ok_or_else(|| MudError::NotFound(format!("character {character_id}")))
    }

    fn forget_secret(&self, character_id: &CharacterId) {
        if let Err(e) = self.credentials.delete_password(character_id) {
            warn!(character = %character_id, error = %e, "failed to delete secret");
        }
    }

    fn persist(&self) -> MudResult<()> {
        self.profiles.save(&self.profile)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    use mudlink_core::model::ConnectionState;
    use mudlink_core::store::{MemoryCredentialStore, MemoryProfileStore};

    use crate::testing::{loopback, ScriptedDialer, Step};
    use crate::transport::NetDialer;

    struct Fixture {
        registry: SessionRegistry,
        profiles: Arc<MemoryProfileStore>,
        credentials: Arc<MemoryCredentialStore>,
    }

    fn fixture_with(profile: Profile, dialer: Arc<dyn Dialer>) -> Fixture {
        let profiles = Arc::new(MemoryProfileStore::new(profile));
        let credentials = Arc::new(MemoryCredentialStore::new());
        let registry = SessionRegistry::new(
            EngineSettings::default(),
            dialer,
            EventBus::default(),
            profiles.clone(),
            credentials.clone(),
        );
        Fixture {
            registry,
            profiles,
            credentials,
        }
    }

    /// Every dial is refused, so sessions settle quickly without a network.
    fn fixture(profile: Profile) -> Fixture {
        fixture_with(profile, ScriptedDialer::new(Step::Refuse, Step::Refuse))
    }

    fn world(name: &str) -> World {
        World::new(name, "localhost", 7007)
    }

    #[tokio::test]
    async fn added_sessions_become_active_and_connect() {
        let mut f = fixture(Profile::default());
        let a = f.registry.add_guest_connection(world("A"));
        let b = f.registry.add_connection_without_character(world("B"));

        assert_eq!(f.registry.sessions().len(), 2);
        assert_eq!(f.registry.active().unwrap().id(), &b);
        assert_eq!(
            f.registry.session(&a).unwrap().state(),
            ConnectionState::Connecting
        );

        assert!(f.registry.set_active(&a));
        assert!(!f.registry.set_active(&SessionId::from("nope")));
        assert_eq!(f.registry.active().unwrap().id(), &a);
    }

    #[tokio::test]
    async fn removing_active_falls_back_to_first_remaining() {
        let mut f = fixture(Profile::default());
        let a = f.registry.add_guest_connection(world("A"));
        let b = f.registry.add_guest_connection(world("B"));
        let c = f.registry.add_guest_connection(world("C"));

        assert!(f.registry.remove_connection(&c));
        assert_eq!(f.registry.active().unwrap().id(), &a);

        f.registry.set_active(&b);
        assert!(f.registry.remove_connection(&a));
        assert_eq!(f.registry.active().unwrap().id(), &b);

        assert!(f.registry.remove_connection(&b));
        assert!(f.registry.active().is_none());
        assert!(!f.registry.remove_connection(&b));
    }

    #[tokio::test]
    async fn dispatches_route_to_their_session() {
        let mut f = fixture(Profile::default());
        let id = f.registry.add_guest_connection(world("A"));

        let changed = tokio::time::timeout(Duration::from_secs(5), f.registry.next_dispatch())
            .await
            .unwrap();
        assert_eq!(changed, Some(id.clone()));
        assert_eq!(
            f.registry.session(&id).unwrap().state(),
            ConnectionState::Disconnected
        );
        assert!(f.registry.drain_pending().is_empty());
    }

    #[tokio::test]
    async fn character_session_logs_in_with_stored_secret() {
        let (listener, endpoint) = loopback().await;
        let mut f = fixture_with(Profile::default(), Arc::new(NetDialer));

        let w = World::new("Local", endpoint.host.clone(), endpoint.port);
        let world_id = f.registry.add_world(w).unwrap();
        let character = Character::new("Ayla", world_id.clone());
        let character_id = f.registry.add_character(character, Some("hunter2")).unwrap();
        assert_eq!(
            f.credentials.get_password(&character_id).unwrap().as_deref(),
            Some("hunter2")
        );

        let id = f.registry.connect_character(&character_id).unwrap();
        while f.registry.session(&id).unwrap().state() != ConnectionState::Connected {
            tokio::time::timeout(Duration::from_secs(5), f.registry.next_dispatch())
                .await
                .unwrap();
        }
        assert!(f.registry.find_session(&character_id, &world_id).is_some());

        let (server, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(server).lines();
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(line, "connect Ayla hunter2");

        f.registry.shutdown();
        assert_eq!(
            f.registry.session(&id).unwrap().state(),
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn characters_for_world_matches_by_id() {
        let w1 = world("One");
        let w2 = world("Two");
        let c1 = Character::new("Ayla", w1.id.clone());
        let c2 = Character::new("Brin", w2.id.clone());
        let profile = Profile {
            worlds: vec![w1.clone(), w2],
            characters: vec![c1.clone(), c2],
            ..Default::default()
        };
        let mut f = fixture(profile);

        assert_eq!(f.registry.characters_for_world(&w1.id), vec![c1]);
        assert_eq!(f.profiles.saves(), 0);
    }

    #[tokio::test]
    async fn characters_for_world_repairs_by_name() {
        let stale = world("Discworld");
        let current = world("Discworld");
        let other = world("Elsewhere");
        let legacy = Character::new("Ayla", stale.id.clone());
        let unrelated = Character::new("Brin", other.id.clone());
        let profile = Profile {
            worlds: vec![stale, current.clone(), other],
            characters: vec![legacy.clone(), unrelated],
            ..Default::default()
        };
        let mut f = fixture(profile);

        let found = f.registry.characters_for_world(&current.id);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, legacy.id);
        assert_eq!(found[0].world_id, current.id);

        let saved = f.profiles.snapshot();
        assert_eq!(saved.character(&legacy.id).unwrap().world_id, current.id);
        assert_eq!(f.profiles.saves(), 1);

        // Now matched directly; nothing left to repair.
        assert_eq!(f.registry.characters_for_world(&current.id).len(), 1);
        assert_eq!(f.profiles.saves(), 1);
    }

    #[tokio::test]
    async fn auto_connect_resolves_by_id() {
        let w1 = world("One");
        let w2 = world("Two");
        let c1 = Character::new("Ayla", w1.id.clone());
        let c2 = Character::new("Brin", w2.id.clone());
        let profile = Profile {
            worlds: vec![w1.clone(), w2],
            characters: vec![c1.clone(), c2],
            auto_connect: vec![c1.id.clone()],
            ..Default::default()
        };
        let mut f = fixture(profile);

        let opened = f.registry.auto_connect_characters();
        assert_eq!(opened.len(), 1);
        assert!(f.registry.find_session(&c1.id, &w1.id).is_some());

        // Second run finds the existing session.
        assert!(f.registry.auto_connect_characters().is_empty());
        assert_eq!(f.registry.sessions().len(), 1);
    }

    #[tokio::test]
    async fn auto_connect_falls_back_to_sole_world() {
        let only = world("Only");
        let orphan = Character::new("Ayla", WorldId::from("gone"));
        let profile = Profile {
            worlds: vec![only.clone()],
            characters: vec![orphan.clone()],
            auto_connect: vec![orphan.id.clone()],
            ..Default::default()
        };
        let mut f = fixture(profile);

        assert_eq!(f.registry.auto_connect_characters().len(), 1);
        assert!(f.registry.find_session(&orphan.id, &only.id).is_some());
    }

    #[tokio::test]
    async fn auto_connect_skips_ambiguous_and_unknown() {
        let orphan = Character::new("Ayla", WorldId::from("gone"));
        let profile = Profile {
            worlds: vec![world("One"), world("Two")],
            characters: vec![orphan.clone()],
            auto_connect: vec![orphan.id.clone(), CharacterId::from("missing")],
            ..Default::default()
        };
        let mut f = fixture(profile);

        assert!(f.registry.auto_connect_characters().is_empty());
        assert!(f.registry.sessions().is_empty());
    }

    #[tokio::test]
    async fn remove_world_cascades() {
        let mut f = fixture(Profile::default());
        let w = f.registry.add_world(world("Doomed")).unwrap();
        let keep = f.registry.add_world(world("Kept")).unwrap();
        let c = f
            .registry
            .add_character(Character::new("Ayla", w.clone()), Some("pw"))
            .unwrap();
        let k = f
            .registry
            .add_character(Character::new("Brin", keep.clone()), None)
            .unwrap();
        f.registry.set_auto_connect(&c, true).unwrap();
        f.registry.set_default_world(Some(w.clone())).unwrap();

        let removed = f.registry.remove_world(&w).unwrap();
        assert_eq!(removed.name, "Doomed");

        let p = f.profiles.snapshot();
        assert_eq!(p.worlds.len(), 1);
        assert_eq!(p.characters.len(), 1);
        assert_eq!(p.characters[0].id, k);
        assert!(p.auto_connect.is_empty());
        assert_eq!(p.default_world, None);
        assert_eq!(f.credentials.get_password(&c).unwrap(), None);
    }

    #[tokio::test]
    async fn entity_mutations_persist() {
        let mut f = fixture(Profile::default());
        let mut w = world("Old name");
        let wid = f.registry.add_world(w.clone()).unwrap();
        w.name = "New name".into();
        f.registry.update_world(w).unwrap();
        assert_eq!(f.profiles.snapshot().worlds[0].name, "New name");

        let cid = f
            .registry
            .add_character(Character::new("Ayla", wid.clone()), None)
            .unwrap();
        f.registry.set_favorite(&cid, true).unwrap();
        f.registry.set_auto_connect(&cid, true).unwrap();
        f.registry.set_auto_connect(&cid, true).unwrap();
        assert!(f.profiles.snapshot().characters[0].favorite);
        assert_eq!(f.profiles.snapshot().auto_connect, vec![cid.clone()]);

        f.registry.add_highlight(HighlightRule::new("tells you", "red")).unwrap();
        assert_eq!(f.registry.remove_highlight(0).unwrap().color, "red");
        assert!(f.registry.remove_highlight(0).is_err());

        f.registry.remove_character(&cid).unwrap();
        let p = f.profiles.snapshot();
        assert!(p.characters.is_empty());
        assert!(p.auto_connect.is_empty());
    }

    #[tokio::test]
    async fn invalid_entities_are_rejected() {
        let mut f = fixture(Profile::default());
        assert!(matches!(
            f.registry.add_world(World::new("", "host", 1)),
            Err(MudError::InvalidInput(_))
        ));
        assert!(matches!(
            f.registry.add_character(Character::new("Ayla", WorldId::from("none")), None),
            Err(MudError::NotFound(_))
        ));
        assert!(matches!(
            f.registry.set_default_world(Some(WorldId::from("none"))),
            Err(MudError::NotFound(_))
        ));
        assert!(matches!(
            f.registry.update_world(world("ghost")),
            Err(MudError::NotFound(_))
        ));
        assert_eq!(f.profiles.saves(), 0);
    }
}

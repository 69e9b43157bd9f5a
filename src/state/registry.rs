//! Session registry and player index.
//!
//! Runtimes are keyed by session ID; the player index maps a player name to
//! the one session they occupy. Every mutator here keeps both sides in
//! agreement, so no background repair is needed.

use super::config::SessionConfig;
use super::session::SessionRuntime;
use std::collections::{BTreeMap, HashMap};

/// Membership errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    UnknownSession,
    AlreadyInSession(String),
    NotInSession,
}

impl std::fmt::Display for MembershipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSession => write!(f, "Session does not exist"),
            Self::AlreadyInSession(id) => write!(f, "Already in session {}", id),
            Self::NotInSession => write!(f, "Not in any session"),
        }
    }
}

impl std::error::Error for MembershipError {}

/// Registry of session runtimes.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Runtimes by session ID
    runtimes: BTreeMap<String, SessionRuntime>,

    /// Player name to session ID
    player_index: HashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime for a session, created with defaults on first reference.
    pub fn ensure(&mut self, session_id: &str, config: &SessionConfig) -> &mut SessionRuntime {
        self.runtimes
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRuntime::new(session_id, config))
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionRuntime> {
        self.runtimes.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionRuntime> {
        self.runtimes.get_mut(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.runtimes.contains_key(session_id)
    }

    /// Session a player currently occupies.
    pub fn session_of(&self, player: &str) -> Option<&str> {
        self.player_index.get(player).map(String::as_str)
    }

    /// Runtime for the session a player occupies.
    pub fn get_for_player(&self, player: &str) -> Option<&SessionRuntime> {
        self.player_index
            .get(player)
            .and_then(|id| self.runtimes.get(id))
    }

    /// Register a player with a session.
    pub fn join(&mut self, session_id: &str, player: &str) -> Result<(), MembershipError> {
        if let Some(current) = self.player_index.get(player) {
            return Err(MembershipError::AlreadyInSession(current.clone()));
        }
        let runtime = self
            .runtimes
            .get_mut(session_id)
            .ok_or(MembershipError::UnknownSession)?;
        runtime.add_player(player);
        self.player_index
            .insert(player.to_string(), session_id.to_string());
        Ok(())
    }

    /// Remove a player from their session. Returns the session ID.
    pub fn leave(&mut self, player: &str) -> Result<String, MembershipError> {
        let session_id = self
            .player_index
            .remove(player)
            .ok_or(MembershipError::NotInSession)?;
        if let Some(runtime) = self.runtimes.get_mut(&session_id) {
            runtime.remove_player(player);
        }
        Ok(session_id)
    }

    /// Drop every index entry pointing at a session. Returns the names released.
    pub fn release_all(&mut self, session_id: &str) -> Vec<String> {
        let released: Vec<String> = self
            .runtimes
            .get(session_id)
            .map(|r| r.players().to_vec())
            .unwrap_or_default();
        self.player_index.retain(|_, sid| sid != session_id);
        released
    }

    /// Remove a session entirely.
    pub fn remove(&mut self, session_id: &str) -> Option<SessionRuntime> {
        self.release_all(session_id);
        self.runtimes.remove(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.runtimes.keys().cloned().collect()
    }

    pub fn runtimes(&self) -> impl Iterator<Item = &SessionRuntime> {
        self.runtimes.values()
    }

    pub fn count(&self) -> usize {
        self.runtimes.len()
    }

    pub fn indexed_players(&self) -> usize {
        self.player_index.len()
    }

    /// A name is indexed iff it appears in exactly one roster, the one the
    /// index points at.
    pub fn is_consistent(&self) -> bool {
        let mut rosters: HashMap<&str, Vec<&str>> = HashMap::new();
        for runtime in self.runtimes.values() {
            for player in runtime.players() {
                rosters
                    .entry(player.as_str())
                    .or_default()
                    .push(runtime.id.as_str());
            }
        }

        let index_ok = self.player_index.iter().all(|(player, sid)| {
            rosters.get(player.as_str()).map(|s| s.as_slice()) == Some(&[sid.as_str()][..])
        });
        index_ok && rosters.len() == self.player_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::region::BlockPos;

    fn registry_with(ids: &[&str]) -> SessionRegistry {
        let config = SessionConfig::new("Arena", BlockPos::default());
        let mut registry = SessionRegistry::new();
        for id in ids {
            registry.ensure(id, &config);
        }
        registry
    }

    #[test]
    fn test_ensure_is_lazy_and_idempotent() {
        let config = SessionConfig::new("Arena", BlockPos::default());
        let mut registry = SessionRegistry::new();
        registry.ensure("1", &config).border_radius = 8;
        assert_eq!(registry.ensure("1", &config).border_radius, 8);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_join_and_leave() {
        let mut registry = registry_with(&["1", "2"]);
        registry.join("1", "Alex").unwrap();

        assert_eq!(registry.session_of("Alex"), Some("1"));
        assert!(registry.get("1").unwrap().has_player("Alex"));
        assert!(registry.is_consistent());

        assert_eq!(
            registry.join("2", "Alex"),
            Err(MembershipError::AlreadyInSession("1".to_string()))
        );
        assert_eq!(registry.join("9", "Steve"), Err(MembershipError::UnknownSession));

        assert_eq!(registry.leave("Alex"), Ok("1".to_string()));
        assert_eq!(registry.leave("Alex"), Err(MembershipError::NotInSession));
        assert!(registry.get("1").unwrap().players().is_empty());
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_remove_session_clears_index() {
        let mut registry = registry_with(&["1", "2"]);
        registry.join("1", "Alex").unwrap();
        registry.join("1", "Steve").unwrap();
        registry.join("2", "Herobrine").unwrap();

        let removed = registry.remove("1").unwrap();
        assert_eq!(removed.player_count(), 2);
        assert_eq!(registry.session_of("Alex"), None);
        assert_eq!(registry.session_of("Herobrine"), Some("2"));
        assert_eq!(registry.indexed_players(), 1);
        assert!(registry.is_consistent());
    }

    #[test]
    fn test_inconsistency_is_detected() {
        let mut registry = registry_with(&["1"]);
        registry.join("1", "Alex").unwrap();
        // Roster entry without an index entry
        registry.get_mut("1").unwrap().add_player("Ghost");
        assert!(!registry.is_consistent());
    }
}

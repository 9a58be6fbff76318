//! In-process identity provider binding opaque session tokens to the player they joined a room as.

use std::fmt;

use dashmap::DashMap;
use rand::{Rng, distr::Alphanumeric, rng};
use uuid::Uuid;

use crate::dao::models::PlayerEntity;

/// Length of generated session tokens.
pub const SESSION_TOKEN_LEN: usize = 32;

/// Opaque token presented by a caller to identify its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let token = rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Raw token text as carried in the session header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps `(token, room)` to the player the session joined that room as.
///
/// One token may be bound to players in several rooms, but to a single player per room.
/// Bindings live as long as the process; rooms are never deleted, so there is nothing to expire.
#[derive(Default)]
pub struct SessionRegistry {
    bindings: DashMap<(SessionToken, Uuid), PlayerEntity>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `player` to `token` for the player's room and return the player the token now acts
    /// as. An existing binding for that room is kept, so a session never loses the identity it
    /// joined with.
    pub fn bind(&self, token: &SessionToken, player: PlayerEntity) -> PlayerEntity {
        self.bindings
            .entry((token.clone(), player.room_id))
            .or_insert(player)
            .value()
            .clone()
    }

    /// Resolve the player a token acts as inside `room_id`.
    pub fn resolve(&self, token: Option<&SessionToken>, room_id: Uuid) -> Option<PlayerEntity> {
        let token = token?;
        self.bindings
            .get(&(token.clone(), room_id))
            .map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(room_id: Uuid, is_host: bool) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            room_id,
            username: "ada".into(),
            is_host,
            team_id: None,
        }
    }

    #[test]
    fn generated_tokens_are_alphanumeric() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), SESSION_TOKEN_LEN);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, SessionToken::generate());
    }

    #[test]
    fn binding_is_scoped_to_the_room() {
        let registry = SessionRegistry::new();
        let token = SessionToken::generate();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let in_a = player(room_a, true);
        registry.bind(&token, in_a.clone());

        assert_eq!(registry.resolve(Some(&token), room_a), Some(in_a));
        assert_eq!(registry.resolve(Some(&token), room_b), None);
    }

    #[test]
    fn missing_or_unknown_token_resolves_to_nobody() {
        let registry = SessionRegistry::new();
        let room = Uuid::new_v4();
        registry.bind(&SessionToken::from("known"), player(room, false));

        assert_eq!(registry.resolve(None, room), None);
        assert_eq!(registry.resolve(Some(&SessionToken::from("other")), room), None);
    }

    #[test]
    fn one_token_can_join_several_rooms() {
        let registry = SessionRegistry::new();
        let token = SessionToken::generate();
        let first = player(Uuid::new_v4(), true);
        let second = player(Uuid::new_v4(), false);
        registry.bind(&token, first.clone());
        registry.bind(&token, second.clone());

        assert_eq!(registry.resolve(Some(&token), first.room_id), Some(first));
        assert_eq!(registry.resolve(Some(&token), second.room_id), Some(second));
    }

    #[test]
    fn first_binding_in_a_room_wins() {
        let registry = SessionRegistry::new();
        let token = SessionToken::generate();
        let room = Uuid::new_v4();
        let host = player(room, true);

        assert_eq!(registry.bind(&token, host.clone()), host);
        assert_eq!(registry.bind(&token, player(room, false)), host);
        assert_eq!(registry.resolve(Some(&token), room), Some(host));
    }
}

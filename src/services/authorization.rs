//! Host and self checks on the identity a session token resolves to inside a room.

use uuid::Uuid;

use crate::{
    dao::models::PlayerEntity,
    error::ServiceError,
    state::{SessionToken, SharedState},
};

/// Whether `identity` is the host of `room_id`.
pub fn is_host(identity: Option<&PlayerEntity>, room_id: Uuid) -> bool {
    identity.is_some_and(|player| player.room_id == room_id && player.is_host)
}

/// Whether `identity` is the player `player_id` of `room_id`.
pub fn is_self(identity: Option<&PlayerEntity>, room_id: Uuid, player_id: Uuid) -> bool {
    identity.is_some_and(|player| player.room_id == room_id && player.id == player_id)
}

/// Resolve the caller and require it to host `room_id`.
pub fn require_host(
    state: &SharedState,
    token: Option<&SessionToken>,
    room_id: Uuid,
) -> Result<PlayerEntity, ServiceError> {
    let identity = state.sessions().resolve(token, room_id);
    if !is_host(identity.as_ref(), room_id) {
        return Err(ServiceError::Forbidden(format!(
            "only the host of room `{room_id}` may do this"
        )));
    }
    identity.ok_or_else(|| ServiceError::Forbidden("no identity".into()))
}

/// Resolve the caller and require it to act as `player_id` inside `room_id`.
pub fn require_self(
    state: &SharedState,
    token: Option<&SessionToken>,
    room_id: Uuid,
    player_id: Uuid,
) -> Result<PlayerEntity, ServiceError> {
    let identity = state.sessions().resolve(token, room_id);
    if !is_self(identity.as_ref(), room_id, player_id) {
        return Err(ServiceError::Forbidden(format!(
            "caller may not act as player `{player_id}`"
        )));
    }
    identity.ok_or_else(|| ServiceError::Forbidden("no identity".into()))
}

//! Room bookkeeping: creation, joining, roster and settings.

use rand::{Rng, distr::Alphanumeric, rng};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{PlayerEntity, RoomEntity},
        trivia_store::TriviaStore,
    },
    dto::room::{
        JoinRoomRequest, JoinRoomResponse, PlayerResponse, RoomResponse, SettingsResponse,
        UpdateSettingsRequest,
    },
    error::ServiceError,
    services::authorization,
    state::{SessionToken, SharedState},
};

/// Length of the shareable room code.
pub const SLUG_LEN: usize = 8;
const MAX_SLUG_ATTEMPTS: usize = 3;

fn generate_slug() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LEN)
        .map(char::from)
        .collect()
}

pub(crate) async fn load_room(
    store: &dyn TriviaStore,
    room_id: Uuid,
) -> Result<RoomEntity, ServiceError> {
    let Some(room) = store.find_room(room_id).await? else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };
    Ok(room)
}

/// Open a room with the configured default settings.
pub async fn create_room(state: &SharedState) -> Result<RoomResponse, ServiceError> {
    let store = state.require_store().await?;
    let settings = state.config().default_settings().instantiate();

    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let room = RoomEntity {
            id: Uuid::new_v4(),
            slug: generate_slug(),
            created_at: state.now(),
            settings_id: settings.id,
        };

        match store.create_room(room.clone(), settings.clone()).await {
            Ok(()) => {
                info!(room_id = %room.id, slug = %room.slug, "room created");
                return Ok(room.into());
            }
            Err(err) if err.is_duplicate() => {
                warn!(attempt, slug = %room.slug, "room slug collision; retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate a unique room slug".into(),
    ))
}

/// Room by id.
pub async fn get_room(state: &SharedState, room_id: Uuid) -> Result<RoomResponse, ServiceError> {
    let store = state.require_store().await?;
    Ok(load_room(store.as_ref(), room_id).await?.into())
}

/// Register a player in a room and bind it to the caller's session.
///
/// The first player to join becomes host. When two joins race for an empty room, the store
/// admits a single host and the loser is registered as a regular player. A session that already
/// joined the room gets its existing player back and nothing is written.
pub async fn join_room(
    state: &SharedState,
    room_id: Uuid,
    request: JoinRoomRequest,
    token: Option<SessionToken>,
) -> Result<JoinRoomResponse, ServiceError> {
    let store = state.require_store().await?;
    load_room(store.as_ref(), room_id).await?;

    if let Some(existing) = state.sessions().resolve(token.as_ref(), room_id) {
        debug!(room_id = %room_id, player_id = %existing.id, "session already joined room");
        return Ok(JoinRoomResponse {
            player: existing.into(),
            session_token: token.map(|token| token.to_string()).unwrap_or_default(),
        });
    }

    let mut player = PlayerEntity {
        id: Uuid::new_v4(),
        room_id,
        username: request.username.trim().to_owned(),
        is_host: store.count_players(room_id).await? == 0,
        team_id: None,
    };

    match store.insert_player(player.clone()).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() && player.is_host => {
            player.is_host = false;
            store.insert_player(player.clone()).await?;
        }
        Err(err) => return Err(err.into()),
    }

    let token = token.unwrap_or_else(SessionToken::generate);
    let player = state.sessions().bind(&token, player);
    info!(
        room_id = %room_id,
        player_id = %player.id,
        is_host = player.is_host,
        "player joined room"
    );

    Ok(JoinRoomResponse {
        player: player.into(),
        session_token: token.to_string(),
    })
}

/// Players of a room in join order.
pub async fn list_players(
    state: &SharedState,
    room_id: Uuid,
) -> Result<Vec<PlayerResponse>, ServiceError> {
    let store = state.require_store().await?;
    load_room(store.as_ref(), room_id).await?;
    let players = store.list_players(room_id).await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Current settings of a room.
pub async fn get_settings(
    state: &SharedState,
    room_id: Uuid,
) -> Result<SettingsResponse, ServiceError> {
    let store = state.require_store().await?;
    let room = load_room(store.as_ref(), room_id).await?;
    let Some(settings) = store.find_settings(room.settings_id).await? else {
        return Err(ServiceError::NotFound(format!(
            "settings of room `{room_id}` not found"
        )));
    };
    Ok(settings.into())
}

/// Replace every settings field of a room. Host only.
///
/// Games already started keep the rounds they were created with.
pub async fn update_settings(
    state: &SharedState,
    room_id: Uuid,
    request: UpdateSettingsRequest,
    token: Option<&SessionToken>,
) -> Result<SettingsResponse, ServiceError> {
    let store = state.require_store().await?;
    let room = load_room(store.as_ref(), room_id).await?;
    authorization::require_host(state, token, room_id)?;

    let settings = request.into_entity(room.settings_id);
    if !store.update_settings(settings.clone()).await? {
        return Err(ServiceError::NotFound(format!(
            "settings of room `{room_id}` not found"
        )));
    }

    info!(room_id = %room_id, rounds = settings.rounds, "room settings updated");
    Ok(settings.into())
}

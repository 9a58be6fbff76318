use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::room::{
        JoinRoomRequest, JoinRoomResponse, PlayerResponse, RoomResponse, SettingsResponse,
        UpdateSettingsRequest,
    },
    error::AppError,
    routes::session::{SESSION_TOKEN_HEADER, SessionHeader},
    services::room_service,
    state::SharedState,
};

/// Room management endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/players", get(list_players).post(join_room))
        .route(
            "/rooms/{room_id}/settings",
            get(get_settings).put(update_settings),
        )
}

/// Open a new room with the default settings.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    responses(
        (status = 201, description = "Room created", body = RoomResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<RoomResponse>), AppError> {
    let room = room_service::create_room(&state).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room", body = RoomResponse),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomResponse>, AppError> {
    Ok(Json(room_service::get_room(&state, room_id).await?))
}

/// Join a room. The first player to join becomes its host.
///
/// The session token is echoed in the `x-session-token` response header; a new one is issued when
/// the request does not carry one.
#[utoipa::path(
    post,
    path = "/rooms/{room_id}/players",
    tag = "rooms",
    params(
        ("room_id" = Uuid, Path, description = "Room identifier"),
        ("x-session-token" = Option<String>, Header, description = "Existing session token to bind")
    ),
    request_body = JoinRoomRequest,
    responses(
        (status = 201, description = "Player joined", body = JoinRoomResponse),
        (status = 400, description = "Invalid username"),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    session: SessionHeader,
    Json(payload): Json<JoinRoomRequest>,
) -> Result<(StatusCode, HeaderMap, Json<JoinRoomResponse>), AppError> {
    payload.validate()?;
    let joined = room_service::join_room(&state, room_id, payload, session.0).await?;

    let mut headers = HeaderMap::new();
    let token = HeaderValue::from_str(&joined.session_token)
        .map_err(|err| AppError::BadRequest(format!("unusable session token: {err}")))?;
    headers.insert(SESSION_TOKEN_HEADER, token);

    Ok((StatusCode::CREATED, headers, Json(joined)))
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}/players",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Players in join order", body = [PlayerResponse]),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<PlayerResponse>>, AppError> {
    Ok(Json(room_service::list_players(&state, room_id).await?))
}

#[utoipa::path(
    get,
    path = "/rooms/{room_id}/settings",
    tag = "rooms",
    params(("room_id" = Uuid, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room settings", body = SettingsResponse),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn get_settings(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<SettingsResponse>, AppError> {
    Ok(Json(room_service::get_settings(&state, room_id).await?))
}

/// Replace the room settings. Host only.
#[utoipa::path(
    put,
    path = "/rooms/{room_id}/settings",
    tag = "rooms",
    params(
        ("room_id" = Uuid, Path, description = "Room identifier"),
        ("x-session-token" = String, Header, description = "Session token of the room host")
    ),
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings replaced", body = SettingsResponse),
        (status = 400, description = "Out-of-range value"),
        (status = 403, description = "Caller is not the host"),
        (status = 404, description = "Unknown room")
    )
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    Path(room_id): Path<Uuid>,
    session: SessionHeader,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        room_service::update_settings(&state, room_id, payload, session.token()).await?,
    ))
}

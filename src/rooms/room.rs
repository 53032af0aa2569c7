use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;

use crate::{auth::CurrentUser, db::Room, hub::HubRegistry, store::ChatStore, AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub(crate) struct RoomInfo {
    #[serde(flatten)]
    room: Room,
    /// Connections currently live in the room.
    online: usize,
}

fn info(registry: &HubRegistry, room: Room) -> RoomInfo {
    let online = registry
        .get(&room.id)
        .map(|hub| hub.member_count())
        .unwrap_or(0);
    RoomInfo { room, online }
}

#[debug_handler(state = AppState)]
pub(crate) async fn list_rooms(
    State(store): State<Arc<dyn ChatStore>>,
    State(registry): State<Arc<HubRegistry>>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<RoomInfo>>> {
    let rooms = store.list_rooms().await?;
    Ok(Json(rooms.into_iter().map(|room| info(&registry, room)).collect()))
}

#[debug_handler(state = AppState)]
pub(crate) async fn room(
    Path(room_id): Path<String>,
    State(store): State<Arc<dyn ChatStore>>,
    State(registry): State<Arc<HubRegistry>>,
    _user: CurrentUser,
) -> AppResult<Json<RoomInfo>> {
    let Some(room) = store.get_room(&room_id).await? else {
        return Err(AppError::NotFound(format!("room {room_id}")));
    };

    Ok(Json(info(&registry, room)))
}

use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{auth::CurrentUser, db::Room, store::ChatStore, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomQuery {
    name: String,
}

#[debug_handler(state = AppState)]
pub(crate) async fn new_room(
    State(store): State<Arc<dyn ChatStore>>,
    CurrentUser(user): CurrentUser,

    Json(NewRoomQuery { name }): Json<NewRoomQuery>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = store.create_room(&name).await?;
    tracing::info!(room_id = %room.id, name = %room.name, user = %user, "room created");

    Ok((StatusCode::CREATED, Json(room)))
}

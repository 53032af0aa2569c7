use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State, WebSocketUpgrade}, response::Response};

use crate::{auth::CurrentUser, hub::{self, HubRegistry}, store::ChatStore, AppResult, AppState};

#[debug_handler(state = AppState)]
pub async fn room_ws(
    Path(room_id): Path<String>,
    State(store): State<Arc<dyn ChatStore>>,
    State(registry): State<Arc<HubRegistry>>,
    CurrentUser(user): CurrentUser,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let room = store.ensure_room(&room_id).await?;
    tracing::debug!(room_id = %room.id, user = %user, "upgrading");

    Ok(ws.on_upgrade(move |socket| hub::serve(socket, user, room.id, registry)))
}

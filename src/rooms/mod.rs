mod room;
mod msg;
mod new;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(room::list_rooms).post(new::new_room))
        .route("/rooms/{room_id}", get(room::room))
        .route("/rooms/{room_id}/messages", get(msg::history))
        .route("/poems/{author}/{title}", get(msg::poems))
        .route("/ws/{room_id}", get(ws::room_ws))
}

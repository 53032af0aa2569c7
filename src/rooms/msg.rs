use std::sync::Arc;

use axum::{debug_handler, extract::{Path, Query, State}, Json};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    db::Message,
    store::{ChatStore, MessageQuery},
    AppError, AppResult, AppState,
};

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    author: Option<String>,
    limit: Option<u32>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn history(
    Path(room_id): Path<String>,
    Query(HistoryQuery { author, limit }): Query<HistoryQuery>,
    State(store): State<Arc<dyn ChatStore>>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<Message>>> {
    if store.get_room(&room_id).await?.is_none() {
        return Err(AppError::NotFound(format!("room {room_id}")));
    }

    let messages = store
        .query(&MessageQuery {
            room_id: Some(room_id),
            author,
            title: None,
            limit,
        })
        .await?;

    Ok(Json(messages))
}

/// Everything `author` wrote in the room named `title`. Public, like the
/// rest of the read-only history.
#[debug_handler(state = AppState)]
pub(crate) async fn poems(
    Path((author, title)): Path<(String, String)>,
    State(store): State<Arc<dyn ChatStore>>,
) -> AppResult<Json<Vec<Message>>> {
    let messages = store
        .query(&MessageQuery {
            author: Some(author),
            title: Some(title),
            ..Default::default()
        })
        .await?;

    Ok(Json(messages))
}

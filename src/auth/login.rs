use axum::{debug_handler, response::Redirect, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{session::USER_ID, AppError, AppResult};

const MAX_NAME_LEN: usize = 64;

#[derive(Deserialize)]
pub struct LoginForm {
    pub name: String,
    pub return_url: Option<String>,
}

#[debug_handler]
pub async fn login(
    session: Session,
    Form(LoginForm { name, return_url }): Form<LoginForm>,
) -> AppResult<Redirect> {
    let name = name.trim();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "name must be 1 to {MAX_NAME_LEN} bytes"
        )));
    }

    session.cycle_id().await?;
    session.insert(USER_ID, name).await?;
    tracing::info!(user = name, "logged in");

    let return_url = return_url
        .filter(|url| is_same_site(url))
        .unwrap_or_else(|| "/rooms".to_owned());
    Ok(Redirect::to(&return_url))
}

/// Only same-site paths, never an absolute url.
pub(super) fn is_same_site(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//")
}

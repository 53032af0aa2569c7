use axum::{debug_handler, extract::Query, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;

use crate::AppResult;

#[derive(Deserialize)]
pub struct LogoutQuery {
    return_url: Option<String>,
}

/// Forgets the session user and sends them back to the login form, or to a
/// same-site `return_url`.
#[debug_handler]
pub async fn logout(
    Query(LogoutQuery { return_url }): Query<LogoutQuery>,
    session: Session,
) -> AppResult<Redirect> {
    if let Ok(Some(user)) = session.get::<String>(crate::session::USER_ID).await {
        tracing::debug!(user = %user, "logging out");
    }
    session.flush().await?;

    let target = return_url
        .filter(|url| super::login::is_same_site(url))
        .unwrap_or_else(|| "/login".to_owned());
    Ok(Redirect::to(&target))
}


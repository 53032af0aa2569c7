mod login;
mod logout;

use axum::{extract::FromRequestParts, http::request::Parts, routing::{get, post}, Router};
use tower_sessions::Session;

use crate::{session::USER_ID, AppError, AppState};

pub use login::login;
pub use logout::logout;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
}

/// The logged-in user's name, read from the session cookie. Rejects with
/// 401 when nobody is logged in.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| anyhow::anyhow!(msg))?;

        match session.get::<String>(USER_ID).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(AppError::Unauthorized),
        }
    }
}

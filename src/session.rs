use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub const USER_ID: &str = "user_id";

pub fn layer(expiry_minutes: i64, secure: bool) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(expiry_minutes)))
}

//! Session manager: login state kept in a tower-sessions [`Session`].
//!
//! The only value stored is the authenticated user's id under
//! [`USER_ID_KEY`]. A session without it is anonymous.

use sha2::{Digest, Sha512};
use time::OffsetDateTime;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, Session};

use crate::config::Config;
use crate::error::AppResult;

pub const USER_ID_KEY: &str = "userId";

/// Marks `session` as belonging to `user_id`.
///
/// The session id is cycled first so a token planted before login can never
/// become authenticated. The expiry is pinned to `now + ttl` and does not
/// slide with activity.
pub async fn establish(session: &Session, user_id: i32, ttl: time::Duration) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user_id).await?;
    session.set_expiry(Some(Expiry::AtDateTime(OffsetDateTime::now_utc() + ttl)));
    Ok(())
}

pub async fn current_user_id(session: &Session) -> AppResult<Option<i32>> {
    Ok(session.get::<i32>(USER_ID_KEY).await?)
}

/// Deletes the stored record; the session layer then clears the cookie.
pub async fn destroy(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// Cookie signing key derived from the configured secret of any length.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

pub fn same_site(config: &Config) -> SameSite {
    if config.cors.enabled {
        SameSite::None
    } else {
        SameSite::Lax
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;

    #[test]
    fn signing_key_is_deterministic() {
        assert_eq!(signing_key("abc").master(), signing_key("abc").master());
        assert_ne!(signing_key("abc").master(), signing_key("abd").master());
    }

    #[test]
    fn same_site_follows_cors() {
        let mut config = Config::default();
        assert_eq!(same_site(&config), SameSite::Lax);

        config.cors = CorsConfig {
            enabled: true,
            origin: Some("https://desk.example.com".into()),
        };
        assert_eq!(same_site(&config), SameSite::None);
    }
}

//! The signed-in session: who the user is, the bearer token for API calls,
//! and idle expiry. Persisted as JSON so a session survives restarts.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::project_dirs;
use crate::error::{Error, Result};
use crate::identity::{User, UserId};

pub const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 15;
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user: User,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Tokens left behind by a careless serializer are not tokens
pub fn is_usable_token(token: &str) -> bool {
    let token = token.trim();
    !(token.is_empty() || token == "undefined" || token == "null")
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    session: Option<Session>,
    idle_timeout: Duration,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES))
    }
}

impl SessionContext {
    /// A zero timeout disables idle expiry
    pub fn new(idle_timeout: Duration) -> Self {
        SessionContext {
            session: None,
            idle_timeout,
        }
    }

    /// Resume a persisted session, unless it went idle meanwhile
    pub fn restore(&mut self, session: Session, now: DateTime<Utc>) -> bool {
        if !is_usable_token(&session.token) {
            warn!("Ignoring stored session with an unusable token");
            return false;
        }
        self.session = Some(session);
        !self.check_expiry(now)
    }

    pub fn login(&mut self, token: &str, user: User, now: DateTime<Utc>) -> Result<()> {
        if !is_usable_token(token) {
            return Err(Error::InvalidToken);
        }
        info!("Signed in as {}", user.id);
        self.session = Some(Session {
            token: token.trim().to_string(),
            user,
            started_at: now,
            last_activity: now,
        });
        Ok(())
    }

    pub fn logout(&mut self) -> Option<Session> {
        let session = self.session.take();
        if let Some(session) = &session {
            info!("Signed out {}", session.user.id);
        }
        session
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if let Some(session) = self.session.as_mut() {
            session.last_activity = now;
        }
    }

    /// End the session when it has been idle for too long.
    /// Returns true if this call ended it.
    pub fn check_expiry(&mut self, now: DateTime<Utc>) -> bool {
        if self.idle_timeout <= Duration::zero() {
            return false;
        }
        let expired = self
            .session
            .as_ref()
            .is_some_and(|session| now - session.last_activity >= self.idle_timeout);
        if expired {
            debug!("Session idle for longer than {}", self.idle_timeout);
            self.logout();
        }
        expired
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.current_user().map(|user| &user.id)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {}", token))
    }

    /// Profile edits keep the session, the id must stay the same
    pub fn update_user(&mut self, user: User) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or(Error::NotSignedIn("update your profile"))?;
        if session.user.id != user.id {
            return Err(Error::Validation(
                "profile update cannot change the user id".to_string(),
            ));
        }
        session.user = user;
        Ok(())
    }
}

/// Where the session is kept between runs
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        SessionStore { path }
    }

    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_local_dir().join(SESSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is no session. A corrupt one is discarded.
    pub fn load(&self) -> Result<Option<Session>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io(&self.path, err)),
        };

        match serde_json::from_str::<Session>(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(
                    "Discarding unreadable session file {}: {err}",
                    self.path.display()
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json).map_err(|err| Error::io(&self.path, err))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(&self.path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::env;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_rejects_unusable_tokens() {
        let mut context = SessionContext::default();
        for token in ["", "   ", "undefined", "null"] {
            assert!(matches!(
                context.login(token, User::new("u1", "Ada"), at(0)),
                Err(Error::InvalidToken)
            ));
        }
        assert!(!context.is_authenticated());
    }

    #[test]
    fn test_login_and_logout() {
        let mut context = SessionContext::default();
        context.login("abc", User::new("u1", "Ada"), at(0)).unwrap();

        assert!(context.is_authenticated());
        assert_eq!(context.authorization_header().as_deref(), Some("Bearer abc"));
        assert_eq!(context.user_id(), Some(&UserId::from("u1")));

        let ended = context.logout().unwrap();
        assert_eq!(ended.token, "abc");
        assert!(context.token().is_none());
    }

    #[test]
    fn test_idle_expiry() {
        let mut context = SessionContext::default();
        context.login("abc", User::new("u1", "Ada"), at(0)).unwrap();

        context.touch(at(10));
        assert!(!context.check_expiry(at(24)));
        assert!(context.check_expiry(at(25)));
        assert!(!context.is_authenticated());
        assert!(!context.check_expiry(at(59)));
    }

    #[test]
    fn test_update_user_keeps_id() {
        let mut context = SessionContext::default();
        assert!(context.update_user(User::new("u1", "Ada")).is_err());

        context.login("abc", User::new("u1", "Ada"), at(0)).unwrap();
        context
            .update_user(User::new("u1", "Ada Lovelace"))
            .unwrap();
        assert_eq!(context.current_user().unwrap().name, "Ada Lovelace");
        assert!(context.update_user(User::new("u2", "Eve")).is_err());
    }

    #[test]
    fn test_store_round_trip_and_corruption() {
        let temp_dir = env::temp_dir().join("inkpost-test-session");
        let _ = fs::remove_dir_all(&temp_dir);

        let store = SessionStore::new(temp_dir.join("nested/session.json"));
        assert_eq!(store.load().unwrap(), None);

        let mut context = SessionContext::default();
        context.login("abc", User::new("u1", "Ada"), at(0)).unwrap();
        store.save(context.session().unwrap()).unwrap();
        assert_eq!(store.load().unwrap().as_ref(), context.session());

        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.path().exists());

        fs::remove_dir_all(&temp_dir).ok();
    }
}

use crate::config::ACCESS_TOKEN;
use crate::submission::SubmitError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Where the bearer credential for the create call lives.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn clear(&self) {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

/// Reads `ACCESS_TOKEN`; clearing only hides it for this process.
#[derive(Debug, Default)]
pub struct EnvTokenStore {
    cleared: AtomicBool,
}

impl TokenStore for EnvTokenStore {
    fn get(&self) -> Option<String> {
        if self.cleared.load(Ordering::SeqCst) {
            return None;
        }
        (*ACCESS_TOKEN).clone()
    }

    fn clear(&self) {
        self.cleared.store(true, Ordering::SeqCst);
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// True when `token` is a JWT whose `exp` claim is at or before `now`.
/// Tokens that are not JWTs, or carry no `exp`, are never judged expired.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    let mut parts = token.split('.');
    let (Some(_), Some(body), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(raw) = BASE64URL.decode(body.trim_end_matches('=')) else {
        return false;
    };
    match serde_json::from_slice::<Claims>(&raw) {
        Ok(Claims { exp: Some(exp) }) => exp <= now.timestamp(),
        _ => false,
    }
}

/// Returns a usable bearer token, or clears the store and reports the
/// session as expired.
pub fn valid_token(store: &dyn TokenStore) -> Result<String, SubmitError> {
    let token = store.get().filter(|t| !t.trim().is_empty());
    match token {
        Some(token) if !is_token_expired(&token, Utc::now()) => Ok(token),
        Some(_) => {
            info!(target = "trucksbus.auth", "access token expired");
            store.clear();
            Err(SubmitError::SessionExpired)
        }
        None => {
            info!(target = "trucksbus.auth", "no access token");
            store.clear();
            Err(SubmitError::SessionExpired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jwt(exp: i64) -> String {
        let header = BASE64URL.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = BASE64URL.encode(format!(r#"{{"sub":"42","exp":{exp}}}"#));
        format!("{header}.{body}.signature")
    }

    #[test]
    fn expiry_is_read_from_jwt_claims() {
        let now = Utc::now();
        assert!(is_token_expired(&jwt((now - Duration::minutes(1)).timestamp()), now));
        assert!(!is_token_expired(&jwt((now + Duration::hours(1)).timestamp()), now));
        assert!(!is_token_expired("opaque-session-token", now));
    }

    #[test]
    fn missing_token_is_session_expiry() {
        let store = MemoryTokenStore::new(None);
        assert_eq!(valid_token(&store), Err(SubmitError::SessionExpired));
    }

    #[test]
    fn expired_token_is_cleared() {
        let store = MemoryTokenStore::new(Some(jwt(1)));
        assert_eq!(valid_token(&store), Err(SubmitError::SessionExpired));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn live_token_is_returned() {
        let token = jwt((Utc::now() + Duration::hours(1)).timestamp());
        let store = MemoryTokenStore::new(Some(token.clone()));
        assert_eq!(valid_token(&store), Ok(token));
    }
}

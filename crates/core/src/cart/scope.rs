//! Cart scopes: the namespace a cart belongs to.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Number of random characters appended to a guest session token.
const TOKEN_SUFFIX_LEN: usize = 9;

/// Opaque token naming a guest cart.
///
/// Generated once per guest storage as `guest_<unix millis>_<suffix>` and
/// reused until the guest scope is discarded (on merge into a user cart).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the current time and a random suffix.
    #[must_use]
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::rng();
        let suffix: String = (0..TOKEN_SUFFIX_LEN)
            .map(|_| char::from_digit(rng.random_range(0..36), 36).unwrap_or('0'))
            .collect();
        Self(format!("guest_{millis}_{suffix}"))
    }

    /// Wrap a token read back from storage.
    #[must_use]
    pub const fn from_stored(token: String) -> Self {
        Self(token)
    }

    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which cart is active: the guest's session cart or a signed-in user's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartScope {
    Guest(SessionToken),
    User(UserId),
}

impl CartScope {
    /// Whether this is a guest scope.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    /// The user ID for a user scope.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }
}

impl fmt::Display for CartScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest(token) => write!(f, "guest:{token}"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = SessionToken::generate();
        let parts: Vec<&str> = token.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.first(), Some(&"guest"));
        assert!(parts.get(1).unwrap().parse::<i64>().is_ok());
        let suffix = parts.get(2).unwrap();
        assert_eq!(suffix.len(), TOKEN_SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }

    #[test]
    fn test_scope_accessors() {
        let guest = CartScope::Guest(SessionToken::from_stored("guest_1_abc".to_owned()));
        assert!(guest.is_guest());
        assert_eq!(guest.user_id(), None);
        assert_eq!(guest.to_string(), "guest:guest_1_abc");

        let user = CartScope::User(UserId::new(9));
        assert!(!user.is_guest());
        assert_eq!(user.user_id(), Some(UserId::new(9)));
        assert_eq!(user.to_string(), "user:9");
    }

    #[test]
    fn test_scope_serializes_tagged() {
        let json = serde_json::to_value(CartScope::User(UserId::new(4))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "user", "id": 4}));
    }
}

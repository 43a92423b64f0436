//! Hierarchical entity keys and their web-safe string form.
//!
//! Every stored entity is addressed by a key path rooted at a profile
//! element: `[(Profile, user_id)]` for profiles and
//! `[(Profile, user_id), (Conference, id)]` for conferences. The root
//! element names the entity group a key belongs to.
//!
//! The web-safe form is an opaque, URL-safe token that round-trips to the
//! exact key path: version 1 encodes the JSON key path with unpadded
//! URL-safe Base64. Decoding validates the version and the path shape, so
//! a tampered or truncated token is rejected rather than misread.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConferenceError, ErrorCode, Result};

/// Entity kind for profile roots.
pub const PROFILE_KIND: &str = "Profile";

/// Entity kind for conferences.
pub const CONFERENCE_KIND: &str = "Conference";

/// Current web-safe encoding version.
const WEBSAFE_VERSION: u8 = 1;

/// Identifier of one path element: externally supplied names for roots,
/// datastore-allocated numbers for children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathId {
    Name(String),
    Numeric(u64),
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Numeric(id) => write!(f, "{}", id),
        }
    }
}

/// One `(kind, id)` element of a key path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PathElement {
    pub kind: String,
    pub id: PathId,
}

/// A full entity key: an ordered path of `(kind, id)` elements.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    path: Vec<PathElement>,
}

/// Wire shape of the web-safe encoding.
#[derive(Serialize, Deserialize)]
struct WebsafePayload {
    v: u8,
    path: Vec<PathElement>,
}

impl Key {
    /// Key of a profile root: `[(Profile, user_id)]`.
    pub fn profile(user_id: impl Into<String>) -> Self {
        Self {
            path: vec![PathElement {
                kind: PROFILE_KIND.to_string(),
                id: PathId::Name(user_id.into()),
            }],
        }
    }

    /// Key of a conference under its organizer's profile:
    /// `[(Profile, user_id), (Conference, id)]`.
    pub fn conference(user_id: impl Into<String>, id: u64) -> Self {
        let mut key = Self::profile(user_id);
        key.path.push(PathElement {
            kind: CONFERENCE_KIND.to_string(),
            id: PathId::Numeric(id),
        });
        key
    }

    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Kind of the entity this key addresses (the last path element).
    pub fn kind(&self) -> &str {
        &self.path[self.path.len() - 1].kind
    }

    /// Key of the entity group this key belongs to (the first element).
    pub fn root(&self) -> Key {
        Self {
            path: vec![self.path[0].clone()],
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }

    /// Whether `other` is this key or one of its descendants.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        other.path.starts_with(&self.path)
    }

    /// User id of the profile root.
    pub fn profile_user_id(&self) -> Option<&str> {
        match &self.path[0].id {
            PathId::Name(name) if self.path[0].kind == PROFILE_KIND => Some(name),
            _ => None,
        }
    }

    /// Numeric conference id, when this key addresses a conference.
    pub fn conference_id(&self) -> Option<u64> {
        let last = self.path.last()?;
        match last.id {
            PathId::Numeric(id) if last.kind == CONFERENCE_KIND => Some(id),
            _ => None,
        }
    }

    /// Encode this key as an opaque, URL-safe token.
    pub fn websafe(&self) -> Result<String> {
        let payload = WebsafePayload {
            v: WEBSAFE_VERSION,
            path: self.path.clone(),
        };
        let json = serde_json::to_string(&payload).map_err(|e| {
            ConferenceError::with_internal(
                ErrorCode::SerializationError,
                "Failed to encode entity key",
                e.to_string(),
            )
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }

    /// Decode a web-safe token back into a key.
    pub fn from_websafe(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|e| {
            ConferenceError::invalid_key("Malformed web-safe key").with_source(e)
        })?;
        let payload: WebsafePayload = serde_json::from_slice(&bytes).map_err(|e| {
            ConferenceError::invalid_key("Malformed web-safe key").with_source(e)
        })?;

        if payload.v != WEBSAFE_VERSION {
            return Err(ConferenceError::invalid_key(format!(
                "Unsupported key version: {}",
                payload.v
            )));
        }

        let key = Self { path: payload.path };
        key.validate()?;
        Ok(key)
    }

    /// Check the path against the known entity layout.
    fn validate(&self) -> Result<()> {
        let valid = match self.path.as_slice() {
            [root] => root.kind == PROFILE_KIND && matches!(root.id, PathId::Name(_)),
            [root, child] => {
                root.kind == PROFILE_KIND
                    && matches!(root.id, PathId::Name(_))
                    && child.kind == CONFERENCE_KIND
                    && matches!(child.id, PathId::Numeric(_))
            }
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(ConferenceError::invalid_key("Unknown key path shape")
                .with_context("path", self.to_string()))
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}:{}", element.kind, element.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websafe_round_trip_profile() {
        let key = Key::profile("u1");
        let token = key.websafe().unwrap();
        assert_eq!(Key::from_websafe(&token).unwrap(), key);
    }

    #[test]
    fn test_websafe_round_trip_conference() {
        let key = Key::conference("u1", 42);
        let token = key.websafe().unwrap();
        let decoded = Key::from_websafe(&token).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(decoded.profile_user_id(), Some("u1"));
        assert_eq!(decoded.conference_id(), Some(42));
    }

    #[test]
    fn test_websafe_token_is_url_safe() {
        let key = Key::conference("user+with/odd=chars", 7);
        let token = key.websafe().unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_from_websafe_rejects_garbage() {
        assert!(Key::from_websafe("not base64!!").is_err());
        // Valid base64, invalid payload.
        let token = URL_SAFE_NO_PAD.encode(b"{\"v\":1,\"path\":[]}");
        assert!(Key::from_websafe(&token).is_err());
    }

    #[test]
    fn test_from_websafe_rejects_unknown_version() {
        let token =
            URL_SAFE_NO_PAD.encode(b"{\"v\":9,\"path\":[{\"kind\":\"Profile\",\"id\":\"u1\"}]}");
        let err = Key::from_websafe(&token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidKey);
    }

    #[test]
    fn test_from_websafe_rejects_wrong_shape() {
        // Conference root without a profile parent.
        let token =
            URL_SAFE_NO_PAD.encode(b"{\"v\":1,\"path\":[{\"kind\":\"Conference\",\"id\":3}]}");
        assert!(Key::from_websafe(&token).is_err());
    }

    #[test]
    fn test_ancestry() {
        let profile = Key::profile("u1");
        let conference = Key::conference("u1", 1);
        assert!(profile.is_ancestor_of(&conference));
        assert!(profile.is_ancestor_of(&profile));
        assert!(!profile.is_ancestor_of(&Key::conference("u2", 1)));
        assert_eq!(conference.root(), profile);
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::conference("u1", 42).to_string(), "Profile:u1/Conference:42");
    }
}

//! # Session
//!
//! The authenticated identity and the permission predicate every page
//! consults.
//!
//! ## Permission Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  has_permission(session, name)                                         │
//! │                                                                         │
//! │  no session ─────────────────────────────────────────────► false       │
//! │  role_id == ADMIN_ROLE_ID ───────────────────────────────► true        │
//! │  permissions[name] == true ──────────────────────────────► true        │
//! │  permissions["all"] == true ─────────────────────────────► true        │
//! │  anything else (missing key, false, missing map) ────────► false       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is derived from the bearer token's claims at login and
//! mirrored to durable storage by the client crate. It is pure data here.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::types::RoleId;
use crate::{ADMIN_ROLE_ID, UNASSIGNED_ROLE_ID};

/// Named boolean capabilities granted to a non-admin user.
pub type PermissionMap = BTreeMap<String, bool>;

/// Well-known permission names.
pub mod permissions {
    pub const INVENTORY: &str = "inventory";
    pub const SALES: &str = "sales";
    pub const REPORTS: &str = "reports";
    /// Grants every named permission.
    pub const ALL: &str = "all";
}

// =============================================================================
// Session
// =============================================================================

/// Who is logged in and what they may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub role_id: RoleId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: PermissionMap,
}

impl Session {
    pub fn new(username: impl Into<String>, role_id: RoleId, permissions: PermissionMap) -> Self {
        Session {
            username: username.into(),
            role_id,
            permissions,
        }
    }

    /// Builds the session carried by a decoded bearer token.
    ///
    /// A token without a role gets [`UNASSIGNED_ROLE_ID`], which only
    /// passes checks through its explicit permission flags.
    pub fn from_claims(claims: TokenClaims) -> Self {
        Session {
            username: claims.sub,
            role_id: claims.role_id.unwrap_or(UNASSIGNED_ROLE_ID),
            permissions: claims.permissions,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role_id == ADMIN_ROLE_ID
    }

    /// Admins pass every check; others need the named flag or `all`.
    pub fn has_permission(&self, name: &str) -> bool {
        if self.is_admin() {
            return true;
        }
        self.flag(name) || self.flag(permissions::ALL)
    }

    /// True when any of `names` is granted.
    pub fn has_any_permission(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has_permission(name))
    }

    fn flag(&self, name: &str) -> bool {
        self.permissions.get(name).copied().unwrap_or(false)
    }
}

/// Permission check for an optional session. No session means no access.
pub fn has_permission(session: Option<&Session>, name: &str) -> bool {
    session.is_some_and(|s| s.has_permission(name))
}

// =============================================================================
// Token Claims
// =============================================================================

/// Payload of the bearer token issued by `POST /login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Username.
    pub sub: String,

    #[serde(default)]
    pub role_id: Option<RoleId>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: PermissionMap,

    /// Expiry as seconds since the Unix epoch, when the issuer sets one.
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// True when `exp` is set and not after `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

/// `null` and non-boolean values in the permission map decode as absent.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PermissionMap, D::Error> {
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.as_bool().map(|b| (k, b)))
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================

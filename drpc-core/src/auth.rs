//! Authentication block attached to requests
//!
//! Devices with authentication enabled expect an `auth` object inside every
//! request. It comes in two shapes:
//!
//! - **Basic**: `username` and `password`
//! - **Digest**: `username`, `realm`, server `nonce`, client `cnonce`, `nc`,
//!   `algorithm` and the computed `response` hash
//!
//! Computing digest material lives in `drpc-client`; this module only holds
//! the data and checks that it is complete.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Authentication material for one request
///
/// Empty fields are left off the wire, so a basic block serializes as
/// `{"username":..,"password":..}` and a digest block never leaks a password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthData {
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub realm: String,

    /// Server nonce from the challenge
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nonce: String,

    /// Client nonce, fresh for every computation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cnonce: String,

    /// Nonce count
    #[serde(default, skip_serializing_if = "is_zero")]
    pub nc: u32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub algorithm: String,

    /// Computed digest response hash
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response: String,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl AuthData {
    /// Whether this block has the digest shape (a computed response hash)
    pub fn is_digest(&self) -> bool {
        !self.response.is_empty()
    }
}

/// Check that authentication data is complete for its shape
///
/// A populated `response` selects the digest shape, which needs realm, nonce,
/// cnonce and a positive nonce count. Otherwise the basic shape needs a
/// password.
///
/// # Examples
///
/// ```rust
/// use drpc_core::{validate_auth_data, AuthData};
///
/// let basic = AuthData { username: "admin".into(), password: "secret".into(), ..Default::default() };
/// assert!(validate_auth_data(Some(&basic)).is_ok());
/// assert!(validate_auth_data(None).is_err());
/// ```
pub fn validate_auth_data(auth: Option<&AuthData>) -> Result<()> {
    let auth = auth.ok_or_else(|| Error::InvalidAuth("auth data is missing".to_string()))?;

    if auth.username.is_empty() {
        return Err(Error::InvalidAuth("username is required".to_string()));
    }

    if auth.is_digest() {
        if auth.realm.is_empty() {
            return Err(Error::InvalidAuth("realm is required for digest auth".to_string()));
        }
        if auth.nonce.is_empty() {
            return Err(Error::InvalidAuth("nonce is required for digest auth".to_string()));
        }
        if auth.cnonce.is_empty() {
            return Err(Error::InvalidAuth("cnonce is required for digest auth".to_string()));
        }
        if auth.nc == 0 {
            return Err(Error::InvalidAuth("nc must be positive for digest auth".to_string()));
        }
    } else if auth.password.is_empty() {
        return Err(Error::InvalidAuth("password is required for basic auth".to_string()));
    }

    Ok(())
}

//! Basic and digest authentication material
//!
//! Device firmware checks a digest computed the HTTP-digest way, but carried
//! inside the JSON request:
//!
//! ```text
//! HA1      = H(username:realm:password)
//! HA2      = H(http_method:uri)
//! response = H(HA1:nonce:nc:cnonce:auth:HA2)
//! ```
//!
//! `H` is SHA-256 when the challenge asks for it and MD5 otherwise, which is
//! what older firmware expects. Every computation uses a fresh 128-bit client
//! nonce and a nonce count of 1: each digest answers one challenge on its own
//! instead of counting up over the lifetime of a server nonce.
//!
//! # Examples
//!
//! ```rust
//! use drpc_client::auth;
//!
//! let auth = auth::digest_auth("admin", "secret", "shellypro1-abc", "1700000000",
//!     auth::DEFAULT_HTTP_METHOD, auth::DEFAULT_URI, "SHA-256");
//! assert_eq!(auth.response.len(), 64);
//! assert_eq!(auth.nc, 1);
//! ```

use drpc_core::{AuthData, Request, Result};
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// HTTP method used for HA2 when the transport is not HTTP
pub const DEFAULT_HTTP_METHOD: &str = "dummy_method";

/// URI used for HA2 when the transport is not HTTP
pub const DEFAULT_URI: &str = "dummy_uri";

const NONCE_COUNT: u32 = 1;
const QOP: &str = "auth";

/// Hash function behind a digest computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// Legacy hash, used for empty, "MD5" and unrecognized names
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// Resolve an algorithm name from a challenge
    ///
    /// Only SHA-256 is recognized as a strong variant; anything else falls
    /// back to MD5 for compatibility with older firmware.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("SHA-256") || name.eq_ignore_ascii_case("SHA256") {
            DigestAlgorithm::Sha256
        } else {
            DigestAlgorithm::Md5
        }
    }

    /// Name sent back in the `algorithm` field
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha256 => "SHA-256",
        }
    }

    /// Lower-case hex digest of `input`
    pub fn hash(self, input: &str) -> String {
        match self {
            DigestAlgorithm::Md5 => format!("{:x}", md5::compute(input.as_bytes())),
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }
}

/// Basic authentication block
pub fn basic_auth(username: impl Into<String>, password: impl Into<String>) -> AuthData {
    AuthData {
        username: username.into(),
        password: password.into(),
        ..Default::default()
    }
}

/// Digest authentication block for a server challenge
pub fn digest_auth(
    username: &str,
    password: &str,
    realm: &str,
    server_nonce: &str,
    http_method: &str,
    uri: &str,
    algorithm: &str,
) -> AuthData {
    let ha1 = calculate_ha1(username, realm, password, algorithm);
    digest_auth_with_ha1(username, &ha1, realm, server_nonce, http_method, uri, algorithm)
}

/// Digest authentication block from a pre-derived HA1
///
/// Lets callers keep `HA1` instead of the plaintext password. The response is
/// byte-identical to [`digest_auth`] for the same nonces.
pub fn digest_auth_with_ha1(
    username: &str,
    ha1: &str,
    realm: &str,
    server_nonce: &str,
    http_method: &str,
    uri: &str,
    algorithm: &str,
) -> AuthData {
    let challenge = Challenge {
        realm,
        nonce: server_nonce,
        http_method,
        uri,
        algorithm: DigestAlgorithm::from_name(algorithm),
    };
    challenge.answer(username, ha1, &generate_cnonce())
}

/// `HA1 = H(username:realm:password)`
pub fn calculate_ha1(username: &str, realm: &str, password: &str, algorithm: &str) -> String {
    DigestAlgorithm::from_name(algorithm).hash(&format!("{}:{}:{}", username, realm, password))
}

/// Fresh client nonce: 128 bits from the OS RNG, hex encoded
pub fn generate_cnonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

struct Challenge<'a> {
    realm: &'a str,
    nonce: &'a str,
    http_method: &'a str,
    uri: &'a str,
    algorithm: DigestAlgorithm,
}

impl Challenge<'_> {
    fn answer(&self, username: &str, ha1: &str, cnonce: &str) -> AuthData {
        let ha2 = self
            .algorithm
            .hash(&format!("{}:{}", self.http_method, self.uri));
        let response = self.algorithm.hash(&format!(
            "{}:{}:{}:{}:{}:{}",
            ha1, self.nonce, NONCE_COUNT, cnonce, QOP, ha2
        ));

        AuthData {
            username: username.to_string(),
            realm: self.realm.to_string(),
            nonce: self.nonce.to_string(),
            cnonce: cnonce.to_string(),
            nc: NONCE_COUNT,
            algorithm: self.algorithm.name().to_string(),
            response,
            ..Default::default()
        }
    }
}

/// Source of per-call authentication material
///
/// The client asks the provider once for every request it sends, so digest
/// providers produce a fresh client nonce each time.
pub trait AuthProvider: Send + Sync {
    /// Authentication for `request`, or `None` to send it unauthenticated
    fn authenticate(&self, request: &Request) -> Result<Option<AuthData>>;
}

/// Username/password sent as a basic block with every request
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl AuthProvider for BasicCredentials {
    fn authenticate(&self, _request: &Request) -> Result<Option<AuthData>> {
        Ok(Some(basic_auth(&self.username, &self.password)))
    }
}

/// Server challenge answered by [`DigestCredentials`]
#[derive(Debug, Clone)]
struct StoredChallenge {
    realm: String,
    nonce: String,
    algorithm: String,
    ha1: String,
}

/// Digest credentials answering the most recent server challenge
///
/// Only HA1 is kept per challenge. Until [`DigestCredentials::set_challenge`]
/// is called there is nothing to answer and requests go out without auth,
/// which is how the device's challenge is obtained in the first place.
pub struct DigestCredentials {
    username: String,
    password: String,
    http_method: String,
    uri: String,
    challenge: RwLock<Option<StoredChallenge>>,
}

impl DigestCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            http_method: DEFAULT_HTTP_METHOD.to_string(),
            uri: DEFAULT_URI.to_string(),
            challenge: RwLock::new(None),
        }
    }

    /// Use a real HTTP method and URI for HA2
    pub fn with_request_line(mut self, http_method: impl Into<String>, uri: impl Into<String>) -> Self {
        self.http_method = http_method.into();
        self.uri = uri.into();
        self
    }

    /// Record a challenge from the device (typically from a 401 error)
    pub fn set_challenge(&self, realm: &str, nonce: &str, algorithm: &str) {
        let ha1 = calculate_ha1(&self.username, realm, &self.password, algorithm);
        *self.challenge.write() = Some(StoredChallenge {
            realm: realm.to_string(),
            nonce: nonce.to_string(),
            algorithm: algorithm.to_string(),
            ha1,
        });
    }

    pub fn clear_challenge(&self) {
        *self.challenge.write() = None;
    }

    pub fn has_challenge(&self) -> bool {
        self.challenge.read().is_some()
    }
}

impl std::fmt::Debug for DigestCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestCredentials")
            .field("username", &self.username)
            .field("has_challenge", &self.has_challenge())
            .finish()
    }
}

impl AuthProvider for DigestCredentials {
    fn authenticate(&self, _request: &Request) -> Result<Option<AuthData>> {
        let challenge = self.challenge.read().clone();
        Ok(challenge.map(|c| {
            digest_auth_with_ha1(
                &self.username,
                &c.ha1,
                &c.realm,
                &c.nonce,
                &self.http_method,
                &self.uri,
                &c.algorithm,
            )
        }))
    }
}

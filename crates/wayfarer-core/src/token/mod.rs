//! Caller tokens: resolve a bearer token to a stable user id.
//!
//! Tokens are HMAC-SHA256 signatures over the user id.
//! Format: `wf_ut_<user_id>_<hmac_hex>`

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "wf_ut_";

/// Environment variable holding the hex-encoded signing secret.
pub const SECRET_ENV: &str = "WAYFARER_TOKEN_SECRET";

const UUID_LEN: usize = 36;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("invalid user ID in token: {0}")]
    InvalidUserId(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("missing token secret")]
    MissingSecret,
}

/// Signing secret shared by token issuance and validation.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenConfig {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Build from a hex string, as stored in the config file or in
    /// `WAYFARER_TOKEN_SECRET`.
    pub fn from_hex(secret_hex: &str) -> Result<Self, TokenError> {
        let secret = hex::decode(secret_hex.trim())
            .map_err(|e| TokenError::InvalidFormat(format!("token secret is not valid hex: {e}")))?;
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self::new(secret))
    }
}

/// Claims extracted from a validated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
}

/// Issue a token for a user. Deterministic for a given secret.
pub fn generate_token(config: &TokenConfig, user_id: Uuid) -> String {
    let mac = compute_hmac(&config.secret, user_id.to_string().as_bytes());
    format!("{TOKEN_PREFIX}{user_id}_{}", hex::encode(mac))
}

/// Validate a token and extract its claims. The HMAC is compared in
/// constant time.
pub fn validate_token(config: &TokenConfig, token: &str) -> Result<TokenClaims, TokenError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
        TokenError::InvalidFormat(format!("token must start with '{TOKEN_PREFIX}'"))
    })?;

    if rest.len() < UUID_LEN || !rest.is_char_boundary(UUID_LEN) {
        return Err(TokenError::InvalidFormat(
            "token too short to contain a valid UUID".to_string(),
        ));
    }
    let (user_id_str, after_user_id) = rest.split_at(UUID_LEN);

    let user_id =
        Uuid::parse_str(user_id_str).map_err(|e| TokenError::InvalidUserId(e.to_string()))?;

    let hmac_hex = after_user_id.strip_prefix('_').ok_or_else(|| {
        TokenError::InvalidFormat("expected underscore after user id".to_string())
    })?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    let mut mac = new_mac(&config.secret);
    mac.update(user_id.to_string().as_bytes());
    mac.verify_slice(&provided_mac)
        .map_err(|_| TokenError::HmacMismatch)?;

    Ok(TokenClaims { user_id })
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length.
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = new_mac(key);
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quiz_core::model::Identity;

use crate::error::AuthError;

/// Turns an identity into an opaque session token and back.
pub trait TokenCodec: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if the identity cannot be serialized.
    fn encode(&self, identity: &Identity) -> Result<String, AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for anything that does not decode to a
    /// valid identity.
    fn decode(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Base64 over the identity's JSON form.
///
/// There is no signature or expiry: anyone holding a token can forge another.
/// It only carries who is signed in between process runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonCodec;

impl TokenCodec for Base64JsonCodec {
    fn encode(&self, identity: &Identity) -> Result<String, AuthError> {
        let json =
            serde_json::to_vec(identity).map_err(|e| AuthError::TokenEncoding(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    fn decode(&self, token: &str) -> Result<Identity, AuthError> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

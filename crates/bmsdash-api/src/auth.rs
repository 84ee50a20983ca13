// Bearer-token supply for REST calls.
//
// Acquiring and refreshing tokens belongs to the identity provider; this
// crate only asks for the current token at request time.

use secrecy::SecretString;

/// Supplies the bearer token attached to each REST request.
///
/// Called once per request, so implementations backed by a refreshing
/// identity client always hand out the newest token.
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` to send the request unauthenticated.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// A fixed token resolved at startup (config file, env var, keyring).
#[derive(Debug, Clone)]
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: SecretString) -> Self {
        Self(token)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

/// No authentication (backends running without an identity provider).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn bearer_token(&self) -> Option<SecretString> {
        None
    }
}

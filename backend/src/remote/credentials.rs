//! Service-account credential loading.
//!
//! The remote service authenticates callers with a service-account key file
//! (JSON holding the account e-mail and an RSA private key). The key is read
//! once at startup and exchanged for short-lived bearer tokens by signing a
//! JWT assertion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::error::{ErrorContext, RemoteError, RemoteResult};

/// Lifetime requested for each signed assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Parsed service-account key file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Never print the private key.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Claims of the JWT-bearer grant assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccountKey {
    /// Read and parse a key file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RemoteResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| RemoteError::Configuration {
            message: format!("Failed to read credentials file: {}", e),
            context: ErrorContext::new("load_credentials").with_entity_id(path.display()),
        })?;
        Self::from_json(&content)
    }

    /// Parse key file contents.
    pub fn from_json(content: &str) -> RemoteResult<Self> {
        let key: ServiceAccountKey = serde_json::from_str(content).map_err(|e| {
            RemoteError::authentication(format!("Malformed service account key: {}", e))
                .with_operation("load_credentials")
        })?;

        if key.client_email.trim().is_empty() {
            return Err(RemoteError::authentication("Service account key has no client_email")
                .with_operation("load_credentials"));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(RemoteError::authentication(
                "Service account private_key is not a PEM encoded key",
            )
            .with_operation("load_credentials"));
        }
        Ok(key)
    }

    pub fn claims(&self, scope: &str, issued_at: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign an RS256 assertion for the JWT-bearer token grant.
    #[cfg(feature = "remote-service")]
    pub fn assertion(&self, scope: &str, issued_at: i64) -> RemoteResult<String> {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            RemoteError::authentication(format!("Invalid RSA private key: {}", e))
                .with_operation("sign_assertion")
        })?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        encode(&header, &self.claims(scope, issued_at), &key).map_err(|e| {
            RemoteError::authentication(format!("Failed to sign assertion: {}", e))
                .with_operation("sign_assertion")
        })
    }
}

//! Signed user identity tokens.

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// A caller's identity as established for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    /// Token to hand back to the client.
    pub token: String,
    /// True when the identity was minted for this request.
    pub is_new: bool,
}

/// Issues and verifies `"<user_id>.<signature>"` tokens.
///
/// The signature is the hex HMAC-SHA256 of the user id keyed by the server
/// secret, so a client cannot claim an id it was not issued.
#[derive(Clone)]
pub struct IdentityService {
    signing_secret: String,
}

impl IdentityService {
    pub fn new(signing_secret: String) -> Self {
        Self { signing_secret }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts any key length")
    }

    fn sign(&self, user_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(user_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Creates a token for `user_id`.
    pub fn token_for(&self, user_id: &str) -> String {
        format!("{user_id}.{}", self.sign(user_id))
    }

    /// Mints a fresh identity with a random user id.
    pub fn issue(&self) -> UserIdentity {
        let user_id = Uuid::new_v4().to_string();
        let token = self.token_for(&user_id);

        UserIdentity {
            user_id,
            token,
            is_new: true,
        }
    }

    /// Verifies a token and returns the identity it carries.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is malformed or its
    /// signature does not match.
    pub fn verify(&self, token: &str) -> Result<UserIdentity, AppError> {
        let invalid = || {
            AppError::unauthorized("Unauthorized", json!({ "reason": "Invalid user token" }))
        };

        let (user_id, signature) = token.rsplit_once('.').ok_or_else(invalid)?;
        if user_id.is_empty() {
            return Err(invalid());
        }

        let signature = hex::decode(signature).map_err(|_| invalid())?;
        let mut mac = self.mac();
        mac.update(user_id.as_bytes());
        mac.verify_slice(&signature).map_err(|_| invalid())?;

        Ok(UserIdentity {
            user_id: user_id.to_string(),
            token: token.to_string(),
            is_new: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        IdentityService::new("test-signing-secret".to_string())
    }

    #[test]
    fn test_issue_then_verify() {
        let svc = service();
        let issued = svc.issue();

        assert!(issued.is_new);
        assert!(Uuid::parse_str(&issued.user_id).is_ok());

        let verified = svc.verify(&issued.token).unwrap();
        assert_eq!(verified.user_id, issued.user_id);
        assert!(!verified.is_new);
    }

    #[test]
    fn test_token_format() {
        let token = service().token_for("alice");
        let (id, sig) = token.split_once('.').unwrap();

        assert_eq!(id, "alice");
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn test_tampered_user_id_rejected() {
        let svc = service();
        let token = svc.token_for("alice");
        let forged = token.replacen("alice", "mallory", 1);

        assert!(matches!(
            svc.verify(&forged),
            Err(AppError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let svc = service();
        for token in ["", "no-dot", ".abcd", "alice.not-hex", "alice.abcd"] {
            assert!(svc.verify(token).is_err(), "accepted {token:?}");
        }
    }

    #[test]
    fn test_secret_matters() {
        let a = IdentityService::new("secret-a".to_string());
        let b = IdentityService::new("secret-b".to_string());

        assert!(b.verify(&a.token_for("alice")).is_err());
    }
}

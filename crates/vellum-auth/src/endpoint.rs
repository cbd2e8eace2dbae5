//! Transport-agnostic multiplexed auth endpoint.
//!
//! One operation, dispatched on `action`:
//!
//! | Request                                                   | Response                      |
//! |-----------------------------------------------------------|-------------------------------|
//! | `{"action":"challenge"}`                                  | `{challenge, timestamp}`      |
//! | `{"action":"verify", signature, publicKey, challenge, timestamp}` | `{sessionToken, identity}` |
//! | `{"action":"session", sessionToken}`                      | `{valid}`                     |
//! | `{"action":"logout", sessionToken}`                       | `{}`                          |

use serde::{Deserialize, Serialize};
use vellum_core::{now_millis, Ed25519PublicKey, Ed25519Signature};

use crate::error::{AuthError, Result};
use crate::identity::Identity;
use crate::protocol::{ChallengeResponse, WalletAuthProtocol};

/// A request to the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AuthRequest {
    Challenge,
    Verify {
        signature: Ed25519Signature,
        #[serde(rename = "publicKey")]
        public_key: Ed25519PublicKey,
        challenge: String,
        timestamp: i64,
    },
    Session {
        #[serde(rename = "sessionToken")]
        session_token: String,
    },
    Logout {
        #[serde(rename = "sessionToken")]
        session_token: String,
    },
}

/// A response from the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthResponse {
    Challenge {
        challenge: String,
        timestamp: i64,
    },
    Verified {
        #[serde(rename = "sessionToken")]
        session_token: String,
        identity: Identity,
    },
    Session {
        valid: bool,
    },
    LoggedOut {},
}

/// Error body returned by [`WalletAuthProtocol::handle_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

impl WalletAuthProtocol {
    /// Handle one endpoint request from `origin`.
    pub fn handle(&self, origin: &str, request: AuthRequest) -> Result<AuthResponse> {
        self.handle_at(origin, request, now_millis())
    }

    pub fn handle_at(&self, origin: &str, request: AuthRequest, now: i64) -> Result<AuthResponse> {
        match request {
            AuthRequest::Challenge => {
                let challenge = self.request_challenge_at(origin, now);
                Ok(AuthResponse::Challenge {
                    challenge: challenge.value,
                    timestamp: challenge.timestamp,
                })
            }
            AuthRequest::Verify {
                signature,
                public_key,
                challenge,
                timestamp,
            } => {
                let response = ChallengeResponse {
                    signature,
                    public_key,
                    challenge,
                    timestamp,
                };
                let ok = self.verify_at(origin, &response, now)?;
                Ok(AuthResponse::Verified {
                    session_token: ok.session.token,
                    identity: ok.identity,
                })
            }
            AuthRequest::Session { session_token } => Ok(AuthResponse::Session {
                valid: self.verify_session_at(&session_token, origin, now),
            }),
            AuthRequest::Logout { session_token } => {
                // Only the issuing origin may end a session.
                if self.verify_session_at(&session_token, origin, now) {
                    self.logout(&session_token);
                }
                Ok(AuthResponse::LoggedOut {})
            }
        }
    }

    /// JSON in, JSON out. Failures become an [`ErrorResponse`] body.
    pub fn handle_json(&self, origin: &str, body: &[u8]) -> Vec<u8> {
        let result = serde_json::from_slice::<AuthRequest>(body)
            .map_err(|e| AuthError::InvalidRequest(e.to_string()))
            .and_then(|request| self.handle(origin, request))
            .and_then(|response| serde_json::to_vec(&response).map_err(AuthError::from));

        match result {
            Ok(bytes) => bytes,
            Err(err) => serde_json::to_vec(&ErrorResponse::from(&err))
                .unwrap_or_else(|_| br#"{"error":"internal","code":"internal"}"#.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::signing_message;
    use crate::config::AuthConfig;
    use crate::permission::DenyAll;
    use std::sync::Arc;
    use vellum_core::Keypair;

    const ORIGIN: &str = "https://docs.example";

    fn protocol() -> WalletAuthProtocol {
        WalletAuthProtocol::new(AuthConfig::default(), Arc::new(DenyAll))
    }

    #[test]
    fn test_request_wire_shapes() {
        let req: AuthRequest = serde_json::from_str(r#"{"action":"challenge"}"#).unwrap();
        assert_eq!(req, AuthRequest::Challenge);

        let req: AuthRequest =
            serde_json::from_str(r#"{"action":"session","sessionToken":"abc"}"#).unwrap();
        assert_eq!(
            req,
            AuthRequest::Session {
                session_token: "abc".into()
            }
        );

        assert!(serde_json::from_str::<AuthRequest>(r#"{"action":"nope"}"#).is_err());
    }

    #[test]
    fn test_full_flow_through_endpoint() {
        let auth = protocol();
        let keypair = Keypair::from_seed(&[6u8; 32]);

        let (challenge, timestamp) = match auth.handle_at(ORIGIN, AuthRequest::Challenge, 100).unwrap() {
            AuthResponse::Challenge { challenge, timestamp } => (challenge, timestamp),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(timestamp, 100);

        let signature = keypair.sign(signing_message(&challenge, timestamp, ORIGIN).as_bytes());
        let verify = AuthRequest::Verify {
            signature,
            public_key: keypair.public_key(),
            challenge,
            timestamp,
        };
        let token = match auth.handle_at(ORIGIN, verify.clone(), 200).unwrap() {
            AuthResponse::Verified { session_token, identity } => {
                assert_eq!(identity.public_key, keypair.public_key());
                session_token
            }
            other => panic!("unexpected {:?}", other),
        };

        assert!(matches!(
            auth.handle_at(ORIGIN, verify, 200),
            Err(AuthError::ChallengeReused)
        ));

        let session = AuthRequest::Session {
            session_token: token.clone(),
        };
        assert_eq!(
            auth.handle_at(ORIGIN, session.clone(), 300).unwrap(),
            AuthResponse::Session { valid: true }
        );
        assert_eq!(
            auth.handle_at("https://other.example", session.clone(), 300).unwrap(),
            AuthResponse::Session { valid: false }
        );

        // Another origin cannot end the session.
        auth.handle_at(
            "https://other.example",
            AuthRequest::Logout {
                session_token: token.clone(),
            },
            300,
        )
        .unwrap();
        assert!(auth.verify_session_at(&token, ORIGIN, 300));

        assert_eq!(
            auth.handle_at(
                ORIGIN,
                AuthRequest::Logout {
                    session_token: token.clone()
                },
                300
            )
            .unwrap(),
            AuthResponse::LoggedOut {}
        );
        assert_eq!(
            auth.handle_at(ORIGIN, session, 300).unwrap(),
            AuthResponse::Session { valid: false }
        );
    }

    #[test]
    fn test_response_wire_shapes() {
        let json = serde_json::to_value(AuthResponse::LoggedOut {}).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let json = serde_json::to_value(AuthResponse::Session { valid: true }).unwrap();
        assert_eq!(json, serde_json::json!({"valid": true}));
    }

    #[test]
    fn test_handle_json_errors() {
        let auth = protocol();

        let body = auth.handle_json(ORIGIN, b"not json");
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "invalid_request");

        let verify = format!(
            r#"{{"action":"verify","signature":"{}","publicKey":"{}","challenge":"ff","timestamp":1}}"#,
            "00".repeat(64),
            "11".repeat(32)
        );
        let body = auth.handle_json(ORIGIN, verify.as_bytes());
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.code, "challenge_not_found");
    }

    #[test]
    fn test_handle_json_challenge() {
        let auth = protocol();
        let body = auth.handle_json(ORIGIN, br#"{"action":"challenge"}"#);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["challenge"].as_str().unwrap().len(), 64);
        assert!(json["timestamp"].is_i64());
    }
}

//! HMAC-SHA256-signed bridging tokens (JWT-shaped) issued when the
//! deterministic path published a household reference.

use crate::errors::{BridgingError, BridgingResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use householdiq_core::time::unix_now;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_EXPIRY_HOURS: u64 = 24;
pub const TOKEN_VERSION: &str = "1.0";

const TOKEN_HEADER: &[u8] = br#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgingClaims {
    /// The ephemeral id the token was issued for
    pub sub: String,
    pub household: String,
    /// Seconds since epoch
    pub iat: u64,
    pub exp: u64,
    pub ver: String,
}

#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn issue(&self, ephem_id: &str, household_id: &str) -> BridgingResult<String> {
        let iat = unix_now() / 1000;
        let claims = BridgingClaims {
            sub: ephem_id.to_string(),
            household: household_id.to_string(),
            iat,
            exp: iat + TOKEN_EXPIRY_HOURS * 3600,
            ver: TOKEN_VERSION.to_string(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &BridgingClaims) -> BridgingResult<String> {
        let header = URL_SAFE_NO_PAD.encode(TOKEN_HEADER);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).map_err(|err| BridgingError::Token(err.to_string()))?);
        let signing_input = format!("{header}.{payload}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> BridgingResult<BridgingClaims> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next(), parts.next()) else {
            return Err(BridgingError::Token("malformed token".to_string()));
        };
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|err| BridgingError::Token(err.to_string()))?;
        let signing_input = format!("{header}.{payload}");
        self.mac(&signing_input)?.verify_slice(&signature).map_err(|_| BridgingError::Token("signature mismatch".to_string()))?;
        let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|err| BridgingError::Token(err.to_string()))?;
        serde_json::from_slice(&payload).map_err(|err| BridgingError::Token(err.to_string()))
    }

    fn mac(&self, signing_input: &str) -> BridgingResult<HmacSha256> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|err| BridgingError::Token(err.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_verify_round_trip() {
        let signer = TokenSigner::new("HOUSEHOLDIQ_TOKEN_SECRET");
        let token = signer.issue("ephem-1", "household-1").unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "ephem-1");
        assert_eq!(claims.household, "household-1");
        assert_eq!(claims.exp, claims.iat + TOKEN_EXPIRY_HOURS * 3600);
        assert_eq!(claims.ver, TOKEN_VERSION);
    }

    #[test]
    fn test_tamper_detection() {
        let signer = TokenSigner::new("secret-a");
        let token = signer.issue("ephem-1", "household-1").unwrap();

        // wrong key
        assert!(TokenSigner::new("secret-b").verify(&token).is_err());

        // altered payload
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"other","household":"h","iat":0,"exp":0,"ver":"1.0"}"#);
        parts[1] = &forged;
        assert!(signer.verify(&parts.join(".")).is_err());

        // malformed shape
        assert!(signer.verify("a.b").is_err());
    }
}

use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::{Error, ErrorKind};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Signs and verifies session tokens with one HMAC-SHA256 key.
#[derive(Clone)]
pub struct TokenKeys {
    key: Hmac<Sha256>,
    lifetime: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], lifetime_hours: i64) -> Result<Self, Error> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_| ErrorKind::InternalServerError.new("Invalid token signing key"))?;

        Ok(Self {
            key,
            lifetime: Duration::hours(lifetime_hours),
        })
    }

    pub fn generate(&self, user: &User) -> Result<String, Error> {
        let claims = JwtSessionData::new(user.id, user.email.to_owned(), self.lifetime);

        claims
            .sign_with_key(&self.key)
            .map_err(|e| ErrorKind::InternalServerError.new(&format!("Failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<JwtSessionData, Error> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_| ErrorKind::Unauthorized.new("Invalid token"))?;

        let now = Local::now().timestamp();
        if (session.exp - now).is_negative() {
            return Err(ErrorKind::Unauthorized.new("Token expired"));
        }

        Ok(session)
    }
}

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::cookies::{is_auth_token_cookie, SessionCookies, SetCookie};
use super::{Claims, IdentityProvider};
use crate::config::IdentityConfig;

const BASE64_PREFIX: &str = "base64-";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no session cookie")]
    MissingSession,

    #[error("malformed session cookie: {0}")]
    MalformedSession(String),

    #[error("access token expired")]
    Expired,

    #[error("invalid access token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("refresh request failed: {0}")]
    Refresh(#[from] reqwest::Error),

    #[error("refresh rejected with status {0}")]
    RefreshRejected(reqwest::StatusCode),
}

/// Session as persisted in the auth cookie. Fields the gate does not use
/// (`user`, `token_type`, ...) are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredSession {
    /// Decodes a cookie value: `base64-<base64url json>` or raw JSON.
    pub fn decode_cookie(raw: &str) -> Result<Self, IdentityError> {
        let json = match raw.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => {
                let trimmed = encoded.trim_end_matches('=');
                let bytes = URL_SAFE_NO_PAD
                    .decode(trimmed)
                    .or_else(|_| STANDARD.decode(encoded))
                    .map_err(|e| IdentityError::MalformedSession(e.to_string()))?;
                String::from_utf8(bytes)
                    .map_err(|e| IdentityError::MalformedSession(e.to_string()))?
            }
            None => raw.to_string(),
        };

        serde_json::from_str(&json).map_err(|e| IdentityError::MalformedSession(e.to_string()))
    }

    pub fn encode_cookie(&self) -> Result<String, IdentityError> {
        let json = serde_json::to_string(self)
            .map_err(|e| IdentityError::MalformedSession(e.to_string()))?;
        Ok(format!("{}{}", BASE64_PREFIX, URL_SAFE_NO_PAD.encode(json)))
    }
}

/// Identity provider backed by the hosted auth service: verifies the access
/// token from the session cookie locally and talks to the service only to
/// refresh an expired session or to log out.
pub struct SessionIdentityProvider {
    config: IdentityConfig,
    client: reqwest::Client,
    decoding_key: DecodingKey,
    validation: Validation,
    secure_cookies: bool,
}

impl SessionIdentityProvider {
    pub fn new(config: IdentityConfig, secure_cookies: bool) -> Self {
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Self {
            config,
            client: reqwest::Client::new(),
            decoding_key,
            validation,
            secure_cookies,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    fn read_session(&self, cookies: &SessionCookies) -> Result<StoredSession, IdentityError> {
        let raw = cookies
            .get_chunked(&self.config.cookie_name)
            .filter(|v| !v.is_empty())
            .ok_or(IdentityError::MissingSession)?;
        StoredSession::decode_cookie(&raw)
    }

    fn verify(&self, access_token: &str) -> Result<Claims, IdentityError> {
        match decode::<Claims>(access_token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                Err(IdentityError::Expired)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredSession, IdentityError> {
        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.config.url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::RefreshRejected(response.status()));
        }

        Ok(response.json::<StoredSession>().await?)
    }

    async fn resolve(&self, cookies: &mut SessionCookies) -> Result<Claims, IdentityError> {
        let session = self.read_session(cookies)?;

        match self.verify(&session.access_token) {
            Err(IdentityError::Expired) => {
                let refresh_token = session
                    .refresh_token
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or(IdentityError::Expired)?;

                let refreshed = self.refresh(refresh_token).await?;
                let claims = self.verify(&refreshed.access_token)?;
                let value = refreshed.encode_cookie()?;
                cookies.set_chunked(&self.config.cookie_name, &value, self.secure_cookies);

                tracing::debug!("Refreshed session for subject {}", claims.sub);
                Ok(claims)
            }
            other => other,
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentityProvider {
    async fn get_claims(&self, cookies: &mut SessionCookies) -> Option<Claims> {
        match self.resolve(cookies).await {
            Ok(claims) => Some(claims),
            Err(IdentityError::MissingSession) => None,
            Err(e) => {
                tracing::debug!("Session did not resolve to an identity: {}", e);
                None
            }
        }
    }

    async fn sign_out(&self, cookies: &mut SessionCookies) {
        if let Ok(session) = self.read_session(cookies) {
            let url = format!("{}/auth/v1/logout?scope=local", self.config.url);
            let result = self
                .client
                .post(&url)
                .header("apikey", &self.config.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;

            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!("Logout request returned status {}", response.status());
                }
                Err(e) => tracing::warn!("Logout request failed: {}", e),
                Ok(_) => {}
            }
        }

        for name in cookies.names() {
            if is_auth_token_cookie(&name) {
                cookies.set(SetCookie::removal(name, self.secure_cookies));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";
    const COOKIE: &str = "sb-test-auth-token";

    fn provider() -> SessionIdentityProvider {
        // Port 9 is discard; nothing in these tests should reach the network
        // except sign-out, whose failure is tolerated.
        let config = IdentityConfig::new(
            "http://127.0.0.1:9",
            "anon-key",
            SECRET,
            Some(COOKIE.to_string()),
        )
        .unwrap();
        SessionIdentityProvider::new(config, false)
    }

    fn token(sub: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: Some(format!("{sub}@example.com")),
            role: Some("authenticated".to_string()),
            session_id: None,
            exp: chrono::Utc::now().timestamp() + exp_offset,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn session_cookie(access_token: String, refresh_token: Option<&str>) -> String {
        StoredSession {
            access_token,
            refresh_token: refresh_token.map(str::to_string),
            expires_at: None,
            extra: Map::new(),
        }
        .encode_cookie()
        .unwrap()
    }

    #[test]
    fn cookie_codec_preserves_unknown_fields() {
        let raw = r#"{"access_token":"a","refresh_token":"r","user":{"id":"u"}}"#;
        let session = StoredSession::decode_cookie(raw).unwrap();
        assert_eq!(session.extra["user"]["id"], "u");

        let encoded = session.encode_cookie().unwrap();
        assert!(encoded.starts_with(BASE64_PREFIX));
        let decoded = StoredSession::decode_cookie(&encoded).unwrap();
        assert_eq!(decoded.refresh_token.as_deref(), Some("r"));
        assert_eq!(decoded.extra["user"]["id"], "u");
    }

    #[test]
    fn malformed_cookie_is_rejected() {
        assert!(matches!(
            StoredSession::decode_cookie("base64-***"),
            Err(IdentityError::MalformedSession(_))
        ));
        assert!(StoredSession::decode_cookie("not json").is_err());
    }

    #[tokio::test]
    async fn resolves_claims_from_valid_session() {
        let provider = provider();
        let mut cookies =
            SessionCookies::from_pairs([(COOKIE, session_cookie(token("user-1", 3600), None))]);

        let claims = provider.get_claims(&mut cookies).await.unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(cookies.pending().is_empty());
    }

    #[tokio::test]
    async fn resolves_chunked_session() {
        let provider = provider();
        let value = session_cookie(token("user-2", 3600), None);
        let (head, tail) = value.split_at(value.len() / 2);
        let mut cookies = SessionCookies::from_pairs([
            (format!("{COOKIE}.0"), head.to_string()),
            (format!("{COOKIE}.1"), tail.to_string()),
        ]);

        let claims = provider.get_claims(&mut cookies).await.unwrap();
        assert_eq!(claims.sub, "user-2");
    }

    #[tokio::test]
    async fn no_cookie_is_anonymous() {
        let provider = provider();
        let mut cookies = SessionCookies::default();
        assert!(provider.get_claims(&mut cookies).await.is_none());
    }

    #[tokio::test]
    async fn expired_token_without_refresh_is_anonymous() {
        let provider = provider();
        let mut cookies =
            SessionCookies::from_pairs([(COOKIE, session_cookie(token("user-3", -3600), None))]);
        assert!(provider.get_claims(&mut cookies).await.is_none());
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_anonymous() {
        let provider = provider();
        let claims = Claims {
            sub: "intruder".to_string(),
            email: None,
            role: None,
            session_id: None,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let forged =
            encode(&Header::default(), &claims, &EncodingKey::from_secret(b"other")).unwrap();
        let mut cookies = SessionCookies::from_pairs([(COOKIE, session_cookie(forged, None))]);
        assert!(provider.get_claims(&mut cookies).await.is_none());
    }

    #[tokio::test]
    async fn sign_out_expires_every_session_cookie() {
        let provider = provider();
        let mut cookies = SessionCookies::from_pairs([
            (format!("{COOKIE}.0"), "a".to_string()),
            (format!("{COOKIE}.1"), "b".to_string()),
            ("theme".to_string(), "dark".to_string()),
        ]);

        provider.sign_out(&mut cookies).await;

        let removed: Vec<&str> = cookies
            .pending()
            .iter()
            .filter(|c| c.is_removal())
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(removed, vec!["sb-test-auth-token.0", "sb-test-auth-token.1"]);
        assert_eq!(cookies.get("theme"), Some("dark"));
    }
}

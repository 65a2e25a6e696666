//! OAuth 2.0 PKCE flow implementation for Google APIs.
//!
//! This module implements the Authorization Code flow with PKCE (Proof Key
//! for Code Exchange). Unlike a desktop flow that hosts its own loopback
//! server, the engine only produces the [`AuthorizationState`] and consumes
//! the callback's code: transporting the redirect is the caller's concern.
//!
//! # Security
//!
//! - PKCE binds the authorization code to the client-held verifier,
//!   preventing code interception attacks
//! - The `state` parameter is an anti-forgery nonce the callback must echo
//!   exactly
//! - Consent is always forced (`prompt=consent`, `access_type=offline`) so
//!   the exchange yields a refresh token even on re-authorization

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::info;

use crate::config::OAuthCredentials;
use crate::error::{EngineError, EngineResult};

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// PKCE utilities (RFC 7636, `S256` method).
pub mod pkce {
    use super::*;
    use rand::Rng as _;
    use sha2::{Digest, Sha256};

    /// Verifier length in random bytes before base64url encoding.
    ///
    /// 64 bytes encode to 86 characters, inside RFC 7636's required
    /// [43, 128] bound for the encoded verifier.
    pub const CODE_VERIFIER_BYTES: usize = 64;

    /// State length in random bytes before base64url encoding.
    pub const STATE_BYTES: usize = 16;

    /// Generates a cryptographically random code verifier,
    /// URL-safe-base64 encoded without padding.
    pub fn generate_verifier() -> String {
        random_urlsafe(CODE_VERIFIER_BYTES)
    }

    /// Computes the `S256` challenge for a code verifier: the SHA-256
    /// digest, URL-safe-base64 encoded without padding.
    ///
    /// Pure and deterministic; reproducible bit-for-bit across
    /// implementations.
    pub fn challenge_from_verifier(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Generates a random opaque state string for CSRF protection.
    pub fn generate_state() -> String {
        random_urlsafe(STATE_BYTES)
    }

    fn random_urlsafe(len: usize) -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }
}

/// One pending authorization attempt.
///
/// The caller must hold `code_verifier` (and compare `state`) until the
/// callback arrives; neither is ever persisted, and the whole value is
/// single-use.
#[derive(Debug, Clone)]
pub struct AuthorizationState {
    /// The consent URL to open in the user's browser.
    pub authorization_url: String,
    /// The PKCE verifier matching the challenge embedded in the URL.
    pub code_verifier: String,
    /// The opaque anti-forgery nonce the callback must echo.
    pub state: String,
}

/// OAuth client for Google APIs.
///
/// Handles consent-URL construction, authorization-code exchange, and
/// access-token refresh.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client with the given credentials.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            http_client,
        }
    }

    /// Builds the consent URL for a new authorization attempt.
    ///
    /// The URL requests offline access and forces re-consent so a refresh
    /// token is always issued, embeds the PKCE challenge with the `S256`
    /// method, and binds the caller-supplied `state`.
    pub fn authorization_request(
        &self,
        scopes: &[String],
        state: impl Into<String>,
    ) -> AuthorizationState {
        let state = state.into();
        let code_verifier = pkce::generate_verifier();
        let challenge = pkce::challenge_from_verifier(&code_verifier);
        let scope = scopes.join(" ");

        let authorization_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent&include_granted_scopes=true",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(&self.credentials.redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&challenge),
            urlencoding::encode(&state),
        );

        AuthorizationState {
            authorization_url,
            code_verifier,
            state,
        }
    }

    /// Exchanges an authorization code (plus its verifier) for a refresh
    /// token.
    ///
    /// Fails with an `AuthExchangeFailed` error when the response carries
    /// no refresh token - this happens when consent was not forced and the
    /// user had already granted it; the remedy is to re-run authorization
    /// with forced consent. The code is single-use: replaying a consumed
    /// code fails at the authorization server.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> EngineResult<String> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| EngineError::network(format!("token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(EngineError::authentication(format!(
                "token exchange failed ({}): {}",
                status, body
            ))
            .with_status(status.as_u16()));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            EngineError::invalid_response(format!("invalid token response: {}", e))
        })?;

        let refresh_token = token_response
            .refresh_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                EngineError::auth_exchange(
                    "no refresh token in exchange response; re-run authorization with \
                     prompt=consent and access_type=offline",
                )
            })?;

        info!("authorization code exchanged for refresh token");
        Ok(refresh_token)
    }

    /// Trades a refresh token for a fresh access token.
    ///
    /// Returns the access token and its lifetime in seconds, when reported.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> EngineResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| EngineError::network(format!("token refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(EngineError::authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            ))
            .with_status(status.as_u16()));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            EngineError::invalid_response(format!("invalid token response: {}", e))
        })?;

        Ok((token_response.access_token, token_response.expires_in))
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

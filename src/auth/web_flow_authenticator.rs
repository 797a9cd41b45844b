use std::{env, path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use chrono::Utc;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
    reqwest::async_http_client,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{Mutex as AsyncMutex, oneshot};

use crate::cache::PersistentCache;

pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

const TOKEN_CACHE_KEY: &str = "gmail_token";
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
/// Tokens this close to expiry (seconds) are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 300;
const AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expiry: i64,
}

impl StoredToken {
    fn from_response(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> Self {
        let expires_in = response
            .expires_in()
            .map(|d| d.as_secs() as i64)
            .unwrap_or(3600);

        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous_refresh.map(str::to_string)),
            expiry: Utc::now().timestamp() + expires_in,
        }
    }

    #[must_use]
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expiry > now + EXPIRY_MARGIN_SECS
    }
}

/// OAuth client identity of an installed application
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google's client secrets download wraps the fields in `installed` or `web`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ClientSecretsFile {
    Installed(ClientSecrets),
    Web(ClientSecrets),
}

impl ClientSecrets {
    /// Parse a client secrets JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretsFile =
            serde_json::from_str(json).context("Client secrets must contain an 'installed' or 'web' object")?;
        Ok(match file {
            ClientSecretsFile::Installed(secrets) | ClientSecretsFile::Web(secrets) => secrets,
        })
    }

    /// Read from `path` when it exists, otherwise from
    /// `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return Self::from_json(&json);
        }

        Ok(Self {
            client_id: env::var("GOOGLE_CLIENT_ID").with_context(|| {
                format!("Missing {} and GOOGLE_CLIENT_ID env var", path.display())
            })?,
            client_secret: env::var("GOOGLE_CLIENT_SECRET").context("Missing GOOGLE_CLIENT_SECRET env var")?,
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        })
    }
}

/// Anything that can hand out a bearer token for the Gmail API
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Supplies Gmail access tokens: cached, refreshed, or freshly authorized
/// through a browser redirect to a loopback callback.
pub struct GoogleAuthenticator {
    secrets: ClientSecrets,
    cache: Arc<PersistentCache>,
}

impl GoogleAuthenticator {
    pub fn new(secrets: ClientSecrets, cache: Arc<PersistentCache>) -> Self {
        Self { secrets, cache }
    }

    fn oauth_client(&self, redirect_uri: Option<String>) -> Result<BasicClient> {
        let client = BasicClient::new(
            ClientId::new(self.secrets.client_id.clone()),
            Some(ClientSecret::new(self.secrets.client_secret.clone())),
            AuthUrl::new(self.secrets.auth_uri.clone()).context("Invalid auth URL")?,
            Some(TokenUrl::new(self.secrets.token_uri.clone()).context("Invalid token URL")?),
        );

        Ok(match redirect_uri {
            Some(uri) => client.set_redirect_uri(RedirectUrl::new(uri).context("Invalid redirect URL")?),
            None => client,
        })
    }

    /// A valid access token, authorizing interactively as a last resort
    pub async fn access_token(&self) -> Result<String> {
        let cached = match self.cache.get::<StoredToken>(TOKEN_CACHE_KEY).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to read stored Gmail token: {e:#}");
                None
            }
        };

        if let Some(token) = cached {
            if token.is_fresh(Utc::now().timestamp()) {
                tracing::debug!("Using stored Gmail token");
                return Ok(token.access_token);
            }

            if let Some(refresh_token) = &token.refresh_token {
                match self.refresh_token(refresh_token).await {
                    Ok(token) => return Ok(token.access_token),
                    Err(e) => tracing::error!("Failed to refresh token: {e:#}"),
                }
            }
        }

        let token = self.authorize_interactively().await?;
        Ok(token.access_token)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<StoredToken> {
        let response = self
            .oauth_client(None)?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .context("Failed to refresh token")?;

        let token = StoredToken::from_response(&response, Some(refresh_token));
        self.store(&token).await?;
        tracing::info!("Refreshed Gmail token");
        Ok(token)
    }

    async fn authorize_interactively(&self) -> Result<StoredToken> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context("Failed to bind OAuth callback listener")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/oauth/callback");
        let client = self.oauth_client(Some(redirect_uri))?;

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(GMAIL_SEND_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = CallbackState {
            expected_state: csrf_token.secret().clone(),
            sender: Arc::new(AsyncMutex::new(Some(code_tx))),
        };
        let app = Router::new()
            .route("/oauth/callback", get(oauth_callback))
            .with_state(state);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!("Waiting for OAuth callback on port {}", port);
        eprintln!("Open this URL in your browser to allow sending the report:\n\n{auth_url}\n");

        let outcome = tokio::time::timeout(AUTHORIZATION_TIMEOUT, code_rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        let code = outcome
            .context("Timed out waiting for authorization")?
            .context("OAuth callback closed without a result")?
            .map_err(|e| anyhow!("Authorization failed: {e}"))?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .context("Failed to exchange code for token")?;

        let token = StoredToken::from_response(&response, None);
        self.store(&token).await?;
        tracing::info!("Successfully stored token in cache");
        Ok(token)
    }

    async fn store(&self, token: &StoredToken) -> Result<()> {
        self.cache
            .put(TOKEN_CACHE_KEY, token.clone(), TOKEN_CACHE_TTL)
            .await
            .context("Failed to store token in cache")
    }
}

#[async_trait]
impl AccessTokenSource for GoogleAuthenticator {
    async fn access_token(&self) -> Result<String> {
        GoogleAuthenticator::access_token(self).await
    }
}

const SUCCESS_PAGE: &str = "<h1>Authorized</h1><p>You can close this tab and return to tripcast.</p>";
const FAILURE_PAGE: &str = "<h1>Authorization failed</h1><p>Return to tripcast for details.</p>";

type CodeSender = oneshot::Sender<std::result::Result<String, String>>;

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    sender: Arc<AsyncMutex<Option<CodeSender>>>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

fn check_callback(expected_state: &str, params: CallbackParams) -> std::result::Result<String, String> {
    if let Some(error) = params.error {
        return Err(error);
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err("state mismatch".to_string());
    }
    params.code.ok_or_else(|| "no authorization code".to_string())
}

async fn oauth_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    // Stray or forged requests must not end the flow waiting for Google's redirect
    if params.state.as_deref() != Some(state.expected_state.as_str()) {
        tracing::warn!("Ignoring OAuth callback with unexpected state");
        return Html(FAILURE_PAGE);
    }

    let outcome = check_callback(&state.expected_state, params);
    let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };

    if let Some(sender) = state.sender.lock().await.take() {
        let _ = sender.send(outcome);
    }

    Html(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_secrets_installed() {
        let secrets = ClientSecrets::from_json(
            r#"{"installed": {"client_id": "id.apps.googleusercontent.com", "client_secret": "shh",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]}}"#,
        )
        .unwrap();
        assert_eq!(secrets.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_client_secrets_web_uses_default_uris() {
        let secrets = ClientSecrets::from_json(r#"{"web": {"client_id": "a", "client_secret": "b"}}"#).unwrap();
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn test_client_secrets_rejects_other_shapes() {
        assert!(ClientSecrets::from_json(r#"{"client_id": "a", "client_secret": "b"}"#).is_err());
    }

    #[test]
    fn test_token_freshness() {
        let token = StoredToken {
            access_token: "t".to_string(),
            refresh_token: None,
            expiry: 10_000,
        };
        assert!(token.is_fresh(10_000 - EXPIRY_MARGIN_SECS - 1));
        assert!(!token.is_fresh(10_000 - EXPIRY_MARGIN_SECS));
        assert!(!token.is_fresh(20_000));
    }

    #[test]
    fn test_check_callback() {
        let ok = CallbackParams {
            code: Some("4/abc".to_string()),
            state: Some("xyz".to_string()),
            error: None,
        };
        assert_eq!(check_callback("xyz", ok), Ok("4/abc".to_string()));

        let forged = CallbackParams {
            code: Some("4/abc".to_string()),
            state: Some("other".to_string()),
            error: None,
        };
        assert_eq!(check_callback("xyz", forged), Err("state mismatch".to_string()));

        let denied = CallbackParams {
            error: Some("access_denied".to_string()),
            ..CallbackParams::default()
        };
        assert_eq!(check_callback("xyz", denied), Err("access_denied".to_string()));
    }

    #[tokio::test]
    async fn test_mismatched_state_keeps_waiting_for_real_redirect() {
        let (tx, mut rx) = oneshot::channel();
        let state = CallbackState {
            expected_state: "xyz".to_string(),
            sender: Arc::new(AsyncMutex::new(Some(tx))),
        };

        let stray = CallbackParams {
            code: Some("4/forged".to_string()),
            state: Some("other".to_string()),
            error: None,
        };
        let Html(page) = oauth_callback(State(state.clone()), Query(stray)).await;
        assert_eq!(page, FAILURE_PAGE);
        assert!(rx.try_recv().is_err());

        let redirect = CallbackParams {
            code: Some("4/real".to_string()),
            state: Some("xyz".to_string()),
            error: None,
        };
        let Html(page) = oauth_callback(State(state), Query(redirect)).await;
        assert_eq!(page, SUCCESS_PAGE);
        assert_eq!(rx.await.unwrap(), Ok("4/real".to_string()));
    }

    #[tokio::test]
    async fn test_fresh_stored_token_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(PersistentCache::open(dir.path()).unwrap());
        let token = StoredToken {
            access_token: "ya29.cached".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry: Utc::now().timestamp() + 3600,
        };
        cache.put(TOKEN_CACHE_KEY, token, TOKEN_CACHE_TTL).await.unwrap();

        let secrets = ClientSecrets::from_json(r#"{"installed": {"client_id": "a", "client_secret": "b"}}"#).unwrap();
        let auth = GoogleAuthenticator::new(secrets, cache);

        assert_eq!(auth.access_token().await.unwrap(), "ya29.cached");
    }
}

//! Report delivery by email

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use lettre::{
    Message, Transport, message::header::ContentType, transport::smtp::SmtpTransport,
    transport::smtp::authentication::Credentials,
};
use serde::Deserialize;

use crate::TripcastError;
use crate::auth::{AccessTokenSource, ClientSecrets, GoogleAuthenticator};
use crate::cache::PersistentCache;
use crate::config::{EmailConfig, TransportKind};

/// Delivers a rendered report to one recipient
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn send_report(&self, recipient: &str, body: &str) -> Result<()>;
}

#[async_trait]
impl<T: ReportTransport + ?Sized> ReportTransport for Box<T> {
    async fn send_report(&self, recipient: &str, body: &str) -> Result<()> {
        (**self).send_report(recipient, body).await
    }
}

/// Build the transport selected in the configuration.
///
/// The Gmail transport keeps its OAuth token in `cache`.
pub fn transport_from_config(
    config: &EmailConfig,
    cache: Arc<PersistentCache>,
) -> Result<Box<dyn ReportTransport>> {
    let transport: Box<dyn ReportTransport> = match config.transport {
        TransportKind::Smtp => Box::new(SmtpReportTransport::from_env(config)?),
        TransportKind::Gmail => {
            let secrets = ClientSecrets::load(Path::new(&config.credentials_file))?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("Failed to create HTTP client")?;
            Box::new(GmailReportTransport::new(
                http,
                &config.gmail_url,
                Arc::new(GoogleAuthenticator::new(secrets, cache)),
                config.sender.clone(),
                &config.subject,
            ))
        }
    };
    Ok(transport)
}

/// Loose check for `local@domain.tld` with no whitespace
#[must_use]
pub fn is_plausible_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !address.chars().any(char::is_whitespace)
        && !domain.contains('@')
}

/// SMTP relay delivery with username/password login
pub struct SmtpReportTransport {
    relay: String,
    credentials: Credentials,
    sender: String,
    subject: String,
}

impl SmtpReportTransport {
    pub fn new(relay: &str, username: String, password: String, sender: String, subject: &str) -> Self {
        Self {
            relay: relay.to_string(),
            credentials: Credentials::new(username, password),
            sender,
            subject: subject.to_string(),
        }
    }

    /// Credentials from `SMTP_USERNAME` / `SMTP_PASSWORD`, falling back to
    /// `GMAIL_ADDRESS` / `GMAIL_APP_PASSWORD`
    pub fn from_env(config: &EmailConfig) -> Result<Self> {
        let username = env::var("SMTP_USERNAME")
            .or_else(|_| env::var("GMAIL_ADDRESS"))
            .context("Missing SMTP_USERNAME (or GMAIL_ADDRESS) env var")?;
        let password = env::var("SMTP_PASSWORD")
            .or_else(|_| env::var("GMAIL_APP_PASSWORD"))
            .context("Missing SMTP_PASSWORD (or GMAIL_APP_PASSWORD) env var")?;
        let sender = config.sender.clone().unwrap_or_else(|| username.clone());

        Ok(Self::new(&config.smtp_relay, username, password, sender, &config.subject))
    }

    fn build_message(&self, recipient: &str, body: &str) -> Result<Message> {
        Message::builder()
            .from(
                format!("Tripcast <{}>", self.sender)
                    .parse()
                    .context("Failed to parse from address")?,
            )
            .to(recipient.parse().context("Failed to parse to address")?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build report email")
    }
}

#[async_trait]
impl ReportTransport for SmtpReportTransport {
    async fn send_report(&self, recipient: &str, body: &str) -> Result<()> {
        let email = self.build_message(recipient, body)?;
        let mailer = SmtpTransport::relay(&self.relay)?
            .credentials(self.credentials.clone())
            .build();

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await?
            .map_err(|e| TripcastError::transport(format!("SMTP delivery failed: {e}")))?;

        tracing::info!("Sent report email to {}", recipient);
        Ok(())
    }
}

/// Gmail REST API delivery on behalf of the authorized account
pub struct GmailReportTransport {
    // Plain client: a retried send could deliver the report twice
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenSource>,
    sender: Option<String>,
    subject: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailErrorBody {
    error: GmailError,
}

#[derive(Debug, Deserialize)]
struct GmailError {
    message: String,
}

impl GmailReportTransport {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        tokens: Arc<dyn AccessTokenSource>,
        sender: Option<String>,
        subject: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            sender,
            subject: subject.to_string(),
        }
    }

    /// RFC 2822 text; Gmail fills in `From` when no sender is configured
    fn raw_message(&self, recipient: &str, body: &str) -> String {
        let mut headers = String::new();
        if let Some(sender) = &self.sender {
            headers.push_str(&format!("From: {sender}\r\n"));
        }
        headers.push_str(&format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n",
            recipient, self.subject
        ));

        format!("{headers}\r\n{}", body.replace('\n', "\r\n"))
    }
}

#[async_trait]
impl ReportTransport for GmailReportTransport {
    async fn send_report(&self, recipient: &str, body: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(self.raw_message(recipient, body).as_bytes());

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "raw": encoded }))
            .send()
            .await
            .context("Gmail send request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GmailErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(
                TripcastError::transport(format!("Gmail API error {}: {}", status.as_u16(), message)).into(),
            );
        }

        let sent: SentMessage = response
            .json()
            .await
            .context("Failed to parse Gmail send response")?;
        tracing::info!("Sent report email to {} (message id {})", recipient, sent.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    struct FixedToken;

    #[async_trait]
    impl AccessTokenSource for FixedToken {
        async fn access_token(&self) -> Result<String> {
            Ok("ya29.test".to_string())
        }
    }

    fn gmail(base_url: &str, sender: Option<&str>) -> GmailReportTransport {
        GmailReportTransport::new(
            reqwest::Client::new(),
            base_url,
            Arc::new(FixedToken),
            sender.map(str::to_string),
            "Weather Forecast for Your Destinations",
        )
    }

    #[rstest]
    #[case("traveler@example.com", true)]
    #[case("a.b+c@mail.example.org", true)]
    #[case("traveler", false)]
    #[case("@example.com", false)]
    #[case("traveler@example", false)]
    #[case("trav eler@example.com", false)]
    #[case("traveler@example.com.", false)]
    fn test_is_plausible_address(#[case] address: &str, #[case] expected: bool) {
        assert_eq!(is_plausible_address(address), expected);
    }

    #[test]
    fn test_raw_message_headers() {
        let raw = gmail("http://localhost", None).raw_message("traveler@example.com", "1. Mallorca\nline");
        assert!(raw.starts_with("To: traveler@example.com\r\n"));
        assert!(raw.contains("Subject: Weather Forecast for Your Destinations\r\n"));
        assert!(raw.ends_with("\r\n\r\n1. Mallorca\r\nline"));
        assert!(!raw.contains("From:"));

        let raw = gmail("http://localhost", Some("me@example.com")).raw_message("t@example.com", "x");
        assert!(raw.starts_with("From: me@example.com\r\n"));
    }

    #[test]
    fn test_smtp_message_builds() {
        let transport = SmtpReportTransport::new(
            "smtp.example.com",
            "user".to_string(),
            "pass".to_string(),
            "sender@example.com".to_string(),
            "Weather Forecast for Your Destinations",
        );
        assert!(transport.build_message("traveler@example.com", "report").is_ok());
        assert!(transport.build_message("not an address", "report").is_err());
    }

    #[tokio::test]
    async fn test_gmail_send() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "18c0ffee", "threadId": "18c0ffee", "labelIds": ["SENT"]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        gmail(&mock_server.uri(), None)
            .send_report("traveler@example.com", "1. Mallorca, Spain Forecast:")
            .await
            .unwrap();

        let requests: Vec<Request> = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(body["raw"].as_str().unwrap())
            .unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.contains("To: traveler@example.com"));
        assert!(raw.ends_with("1. Mallorca, Spain Forecast:"));
    }

    #[tokio::test]
    async fn test_gmail_error_message_is_surfaced() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Request had insufficient authentication scopes."}
            })))
            .mount(&mock_server)
            .await;

        let err = gmail(&mock_server.uri(), None)
            .send_report("traveler@example.com", "report")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("insufficient authentication scopes"));
        assert!(matches!(
            err.downcast_ref::<TripcastError>(),
            Some(TripcastError::Transport { .. })
        ));
    }
}

//! Google OAuth2 for the Gmail report transport

pub mod web_flow_authenticator;

pub use web_flow_authenticator::{
    AccessTokenSource, ClientSecrets, GMAIL_SEND_SCOPE, GoogleAuthenticator, StoredToken,
};

//! Outbound mail for manager invitations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::api::{Message as GmailMessage, Scope};
use google_gmail1::common::GetToken;
use google_gmail1::hyper_rustls::HttpsConnector;
use google_gmail1::Gmail;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use lettre::message::{header::ContentType, Mailbox};
use lettre::Message;
use std::io::Cursor;

use crate::config::{GoogleConfig, MailConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Invitation sent to a newly added manager.
    pub fn invitation(manager_name: &str, manager_email: &str, inviter_email: &str) -> Self {
        Self {
            to: manager_email.to_string(),
            subject: "You've been invited as a manager".to_string(),
            body: format!(
                "Hi {},\n\n{} has added you as a manager. Sign in with this Google account to get started.\n",
                manager_name, inviter_email
            ),
        }
    }

    /// Build the plain-text message sent on behalf of `from`.
    fn to_message(&self, from: &Mailbox) -> Result<Message> {
        let to: Mailbox = self
            .to
            .parse()
            .with_context(|| format!("Invalid recipient address: {}", self.to))?;

        Message::builder()
            .from(from.clone())
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())
            .context("Failed to build mail message")
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

type GmailHub = Gmail<HttpsConnector<HttpConnector>>;

/// Sends through the Gmail API as the configured sender account.
pub struct GmailMailer {
    hub: GmailHub,
    sender: Mailbox,
}

impl GmailMailer {
    /// Authenticate as the sender account using its stored refresh token.
    pub async fn connect(google: &GoogleConfig, mail: &MailConfig) -> Result<Self> {
        // Use the yup_oauth2 re-exported by google_gmail1 to avoid version mismatch
        let secret = google_gmail1::yup_oauth2::authorized_user::AuthorizedUserSecret {
            client_id: google.client_id.clone(),
            client_secret: google.client_secret.clone(),
            refresh_token: mail.sender_refresh_token.clone(),
            key_type: "authorized_user".to_string(),
        };

        let auth = google_gmail1::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .context("Failed to build authenticator from sender refresh token")?;

        Self::with_authenticator(auth, &mail.sender_address)
    }

    fn with_authenticator<A>(auth: A, sender_address: &str) -> Result<Self>
    where
        A: GetToken + 'static,
    {
        let sender: Mailbox = sender_address
            .parse()
            .with_context(|| format!("Invalid MAIL_SENDER_ADDRESS: {}", sender_address))?;

        let connector = google_gmail1::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            hub: Gmail::new(client, auth),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let raw = mail.to_message(&self.sender)?.formatted();
        let mime_type: mime::Mime = "message/rfc822"
            .parse()
            .context("Invalid message MIME type")?;

        let (_, sent) = self
            .hub
            .users()
            .messages_send(GmailMessage::default(), "me")
            .add_scope(Scope::Send)
            .upload(Cursor::new(raw), mime_type)
            .await
            .context("Failed to send mail via Gmail API")?;

        tracing::info!(to = %mail.to, message_id = ?sent.id, "Sent mail via Gmail");
        Ok(())
    }
}

/// Logs instead of sending; used when no sender account is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail sender not configured, skipping delivery");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Keeps every mail it is asked to send.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
        failing: AtomicBool,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<OutgoingMail> {
            self.sent.lock().unwrap().clone()
        }

        pub fn fail_sends(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: &OutgoingMail) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("mail relay unavailable");
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }
}

// pantrykeeper/src/notify/mod.rs
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{error, info, warn};

use crate::config::{EmailConfig, EmailConfigStatus};
use crate::errors::NotificationError;

pub const EMAIL_SUBJECT: &str = "Pantry Keeper - Backup Failed";

/// Reports a failed backup to the operator. Must never fail or panic.
pub trait Notifier {
    async fn notify_failure(&self, error_message: &str, backup_name: Option<&str>);
}

/// Delivers a finished message.
pub trait Mailer {
    async fn send(&self, config: &EmailConfig, message: Message) -> Result<(), NotificationError>;
}

/// SMTP with STARTTLS, one connection per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

impl Mailer for SmtpMailer {
    async fn send(&self, config: &EmailConfig, message: Message) -> Result<(), NotificationError> {
        let creds = config
            .credentials()
            .map(|c| Credentials::new(c.user.to_string(), c.password.to_string()));
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port);
        if let Some(creds) = creds {
            builder = builder.credentials(creds);
        }
        builder.build().send(message).await?;
        Ok(())
    }
}

pub struct EmailNotifier<M = SmtpMailer> {
    config: EmailConfig,
    mailer: M,
}

impl EmailNotifier<SmtpMailer> {
    pub fn smtp(config: EmailConfig) -> Self {
        EmailNotifier::new(config, SmtpMailer)
    }
}

impl<M: Mailer> EmailNotifier<M> {
    pub fn new(config: EmailConfig, mailer: M) -> Self {
        EmailNotifier { config, mailer }
    }

    async fn try_notify(&self, error_message: &str, backup_name: Option<&str>) -> Result<bool, NotificationError> {
        if !self.config.enabled {
            info!("Email notifications disabled. Skipping email notification.");
            return Ok(false);
        }
        let Some(creds) = self.config.credentials() else {
            warn!("Email configuration incomplete. Skipping email notification.");
            return Ok(false);
        };

        let body = failure_body(
            &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            backup_name,
            error_message,
            &host_name(),
        );
        let message = Message::builder()
            .from(parse_mailbox(creds.user)?)
            .to(parse_mailbox(creds.to)?)
            .subject(EMAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.mailer.send(&self.config, message).await?;
        info!("Error notification email sent to {}", creds.to);
        Ok(true)
    }
}

impl<M: Mailer> Notifier for EmailNotifier<M> {
    async fn notify_failure(&self, error_message: &str, backup_name: Option<&str>) {
        if let Err(e) = self.try_notify(error_message, backup_name).await {
            error!("Failed to send error notification email: {}", e);
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address.parse().map_err(|cause| NotificationError::Address {
        address: address.to_string(),
        cause,
    })
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

pub fn failure_body(time: &str, backup_name: Option<&str>, error_message: &str, server: &str) -> String {
    format!(
        "Pantry Keeper Backup Failed\n\n\
         Time: {}\n\
         Backup Name: {}\n\
         Error: {}\n\n\
         Please check the backup logs for more details.\n\n\
         Server: {}\n",
        time,
        backup_name.unwrap_or("Unknown"),
        error_message,
        server
    )
}

/// Logs whether failure emails will actually go out.
pub fn log_email_status(status: &EmailConfigStatus) {
    if !status.enabled {
        info!("Email notifications: DISABLED");
    } else if status.configured {
        info!("Email notifications: ENABLED and CONFIGURED");
    } else {
        warn!(
            "Email notifications: ENABLED but missing variables: {}",
            status.missing_fields.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingMailer {
        sent: RefCell<Vec<Message>>,
        fail: bool,
    }

    impl Mailer for &RecordingMailer {
        async fn send(&self, _config: &EmailConfig, message: Message) -> Result<(), NotificationError> {
            self.sent.borrow_mut().push(message);
            if self.fail {
                return Err(NotificationError::Message(lettre::error::Error::MissingFrom));
            }
            Ok(())
        }
    }

    fn email_config(enabled: bool, user: Option<&str>, password: Option<&str>, to: Option<&str>) -> EmailConfig {
        EmailConfig {
            enabled,
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            user: user.map(str::to_string),
            password: password.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_sends_when_enabled_and_configured() {
        let mailer = RecordingMailer::default();
        let notifier = EmailNotifier::new(
            email_config(true, Some("backup@example.com"), Some("secret"), Some("ops@example.com")),
            &mailer,
        );

        notifier.notify_failure("mongodump failed: auth error", Some("jorbites_backup_20250531_134108")).await;

        let sent = mailer.sent.borrow();
        assert_eq!(sent.len(), 1);
        let raw = String::from_utf8(sent[0].formatted()).unwrap();
        assert!(raw.contains("Subject: Pantry Keeper - Backup Failed"));
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("Backup Name: jorbites_backup_20250531_134108"));
        assert!(raw.contains("mongodump failed: auth error"));
    }

    #[tokio::test]
    async fn test_no_transport_call_when_any_credential_missing() {
        let incomplete = [
            (None, Some("secret"), Some("ops@example.com")),
            (Some("backup@example.com"), None, Some("ops@example.com")),
            (Some("backup@example.com"), Some("secret"), None),
            (Some("backup@example.com"), Some(""), Some("ops@example.com")),
        ];
        for enabled in [true, false] {
            for (user, password, to) in incomplete {
                let mailer = RecordingMailer::default();
                let notifier = EmailNotifier::new(email_config(enabled, user, password, to), &mailer);
                notifier.notify_failure("boom", None).await;
                assert!(mailer.sent.borrow().is_empty());
            }
        }
    }

    #[tokio::test]
    async fn test_no_transport_call_when_disabled() {
        let mailer = RecordingMailer::default();
        let notifier = EmailNotifier::new(
            email_config(false, Some("backup@example.com"), Some("secret"), Some("ops@example.com")),
            &mailer,
        );
        notifier.notify_failure("boom", None).await;
        assert!(mailer.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let mailer = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        let notifier = EmailNotifier::new(
            email_config(true, Some("backup@example.com"), Some("secret"), Some("ops@example.com")),
            &mailer,
        );
        notifier.notify_failure("boom", None).await;
        assert_eq!(mailer.sent.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_address_is_swallowed() {
        let mailer = RecordingMailer::default();
        let notifier = EmailNotifier::new(
            email_config(true, Some("not an address"), Some("secret"), Some("ops@example.com")),
            &mailer,
        );
        notifier.notify_failure("boom", None).await;
        assert!(mailer.sent.borrow().is_empty());
    }

    #[test]
    fn test_failure_body_uses_unknown_placeholder() {
        let body = failure_body("2025-07-01 02:00:00", None, "disk full", "db-host-1");
        assert!(body.contains("Time: 2025-07-01 02:00:00"));
        assert!(body.contains("Backup Name: Unknown"));
        assert!(body.contains("Error: disk full"));
        assert!(body.contains("Server: db-host-1"));
    }
}

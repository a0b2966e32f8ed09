use askama::Template;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;

use crate::config::{Config, SmtpConfig};
use crate::services::otp::OtpPurpose;

const SMTPS_PORT: u16 = 465;

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Invalid mailbox: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Template)]
#[template(path = "email/otp.html")]
struct OtpEmailTemplate<'a> {
    subject: &'a str,
    recipient_name: &'a str,
    action: &'a str,
    code: &'a str,
    minutes: i64,
}

/// Outgoing mail. Without SMTP settings, messages are logged and dropped.
pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    Log {
        from: Mailbox,
    },
}

impl Mailer {
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let from: Mailbox = config.mail_from.parse()?;

        match &config.smtp {
            Some(smtp) => Ok(Mailer::Smtp {
                transport: build_transport(smtp)?,
                from,
            }),
            None => {
                tracing::warn!("SMTP not configured, outgoing mail will only be logged");
                Ok(Mailer::Log { from })
            }
        }
    }

    pub async fn send_otp(
        &self,
        to_email: &str,
        to_name: &str,
        purpose: OtpPurpose,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<(), MailError> {
        let (subject, action) = match purpose {
            OtpPurpose::PasswordReset => ("Reset your ProFinder password", "reset your password"),
            OtpPurpose::EmailVerification => {
                ("Verify your ProFinder email", "verify your email address")
            }
        };

        let html = render_otp_email(subject, to_name, action, code, ttl_minutes)?;
        self.send(to_email, to_name, subject, html).await
    }

    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html: String,
    ) -> Result<(), MailError> {
        let to = Mailbox::new(Some(to_name.to_string()), to_email.parse()?);

        match self {
            Mailer::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(from.clone())
                    .to(to)
                    .subject(subject)
                    .header(ContentType::TEXT_HTML)
                    .body(html)?;

                transport.send(message).await?;
                tracing::info!(to = %to_email, subject, "Email sent");
            }
            Mailer::Log { from } => {
                tracing::info!(from = %from, to = %to_email, subject, "Email not sent (SMTP disabled)");
            }
        }

        Ok(())
    }
}

fn build_transport(smtp: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let builder = if smtp.port == SMTPS_PORT {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
    };

    let builder = builder.port(smtp.port);
    let builder = match (&smtp.username, &smtp.password) {
        (Some(user), Some(pass)) => {
            builder.credentials(Credentials::new(user.clone(), pass.expose_secret().clone()))
        }
        _ => builder,
    };

    Ok(builder.build())
}

fn render_otp_email(
    subject: &str,
    recipient_name: &str,
    action: &str,
    code: &str,
    minutes: i64,
) -> Result<String, MailError> {
    let template = OtpEmailTemplate {
        subject,
        recipient_name,
        action,
        code,
        minutes,
    };
    Ok(template.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_otp_email() {
        let html = render_otp_email("Verify", "Ada", "verify your email address", "042917", 10)
            .unwrap();

        assert!(html.contains("Hi Ada,"));
        assert!(html.contains("042917"));
        assert!(html.contains("10 minutes"));
    }

    #[test]
    fn test_render_escapes_recipient_name() {
        let html = render_otp_email("Verify", "<b>Eve</b>", "reset your password", "000001", 5)
            .unwrap();

        assert!(!html.contains("<b>Eve</b>"));
        assert!(html.contains("&lt;b&gt;Eve"));
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        let mailer = Mailer::Log {
            from: "ProFinder <no-reply@profinder.app>".parse().unwrap(),
        };

        mailer
            .send_otp("ada@example.com", "Ada", OtpPurpose::PasswordReset, "123456", 10)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected() {
        let mailer = Mailer::Log {
            from: "ProFinder <no-reply@profinder.app>".parse().unwrap(),
        };

        let result = mailer
            .send_otp("not-an-address", "Ada", OtpPurpose::PasswordReset, "123456", 10)
            .await;
        assert!(matches!(result, Err(MailError::Address(_))));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_log_mailer_never_logs_code() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mailer = Mailer::Log {
            from: "ProFinder <no-reply@profinder.app>".parse().unwrap(),
        };
        mailer
            .send_otp("ada@example.com", "Ada", OtpPurpose::EmailVerification, "987654", 10)
            .await
            .unwrap();

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ada@example.com"));
        assert!(output.contains("Verify your ProFinder email"));
        assert!(!output.contains("987654"));
    }
}

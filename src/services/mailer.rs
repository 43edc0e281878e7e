// src/services/mailer.rs

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::common::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Transporte de e-mail. `Err` ou `Ok(false)` contam como falha do envio.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, AppError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| AppError::Transport(format!("Remetente inválido '{}': {}", settings.from, e)))?;

        // Com credenciais: relay TLS. Sem: servidor local sem TLS.
        let mut builder = match (&settings.user, &settings.pass) {
            (Some(user), Some(pass)) => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| AppError::Transport(format!("SMTP relay: {}", e)))?
                .credentials(Credentials::new(user.clone(), pass.clone())),
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
        };
        if let Some(port) = settings.port {
            builder = builder.port(port);
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, AppError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::Transport(format!("Destinatário inválido '{}': {}", email.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| AppError::Transport(format!("Falha ao montar e-mail: {}", e)))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| AppError::Transport(format!("Falha ao enviar para {}: {}", email.to, e)))?;
        Ok(response.is_positive())
    }
}

/// Sem SMTP configurado: só registra no log.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<bool, AppError> {
        tracing::info!(
            "📧 [sem SMTP] para={} assunto=\"{}\"\n{}",
            email.to,
            email.subject,
            email.text
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let email = OutgoingEmail {
            to: "ventas@av.mx".into(),
            subject: "Prueba".into(),
            html: "<p>hola</p>".into(),
            text: "hola".into(),
        };
        assert!(LogMailer.send(&email).await.unwrap());
    }

    #[test]
    fn invalid_sender_is_a_transport_error() {
        let settings = SmtpSettings {
            host: "localhost".into(),
            port: Some(2525),
            user: None,
            pass: None,
            from: "no es correo".into(),
        };
        assert!(matches!(SmtpMailer::new(&settings), Err(AppError::Transport(_))));
    }
}

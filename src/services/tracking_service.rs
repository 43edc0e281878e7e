// src/services/tracking_service.rs

//! Acompanhamento da cotização: transições de estado com histórico e o
//! lembrete pendente (no máximo um).

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    common::{
        cache::QueryCache,
        dates::to_iso,
        error::AppError,
        validation::{clean_optional, is_valid_email, ValidationReport},
    },
    db::{DocumentStore, QuoteRepository},
    models::quote::{Quote, QuoteStatus, Reminder, ReminderRequest, ReminderType, StatusChange},
    services::quote_service::ENTITY,
};

#[derive(Clone)]
pub struct TrackingService {
    quotes: QuoteRepository,
    cache: QueryCache,
}

/// Campo de marco carimbado ao entrar em cada estado.
fn milestone_field(status: QuoteStatus) -> Option<&'static str> {
    match status {
        QuoteStatus::Sent => Some("fecha_envio"),
        QuoteStatus::Reviewed => Some("fecha_revision"),
        QuoteStatus::Approved => Some("fecha_aprobacion"),
        _ => None,
    }
}

/// Trim, sem duplicatas (ignorando maiúsculas), cada um um e-mail válido.
pub fn clean_recipients(raw: &[String], report: &mut ValidationReport) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut recipients = Vec::new();
    for email in raw.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            report.push(format!("destinatarios: '{}' no es un correo válido", email));
            continue;
        }
        if seen.insert(email.to_lowercase()) {
            recipients.push(email.to_string());
        }
    }
    recipients
}

impl TrackingService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: QueryCache) -> Self {
        Self {
            quotes: QuoteRepository::new(store),
            cache,
        }
    }

    async fn load(&self, id: &str) -> Result<Quote, AppError> {
        self.quotes
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Cotización", id))
    }

    pub async fn update_status(
        &self,
        quote_id: &str,
        new_status: QuoteStatus,
        comment: Option<String>,
        actor: Option<String>,
    ) -> Result<Quote, AppError> {
        self.update_status_at(quote_id, new_status, comment, actor, Utc::now()).await
    }

    /// Valida a transição e grava estado, histórico e marco numa única escrita.
    pub async fn update_status_at(
        &self,
        quote_id: &str,
        new_status: QuoteStatus,
        comment: Option<String>,
        actor: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Quote, AppError> {
        let mut quote = self.load(quote_id).await?;
        let current = quote.estado;
        if !current.can_transition_to(new_status) {
            tracing::warn!("Transição recusada na cotização {}: {} -> {}", quote_id, current, new_status);
            return Err(AppError::InvalidTransition { from: current, to: new_status });
        }

        quote.historial_estados.push(StatusChange {
            estado_anterior: current,
            estado_nuevo: new_status,
            fecha: now,
            usuario: clean_optional(actor),
            comentario: clean_optional(comment),
            automatico: false,
        });
        quote.estado = new_status;
        quote.updated_at = Some(now);

        let mut fields = Map::new();
        fields.insert("estado".into(), new_status.as_str().into());
        fields.insert(
            "historial_estados".into(),
            serde_json::to_value(&quote.historial_estados)?,
        );
        fields.insert("updated_at".into(), to_iso(now).into());
        if let Some(field) = milestone_field(new_status) {
            fields.insert(field.into(), to_iso(now).into());
            match new_status {
                QuoteStatus::Sent => quote.fecha_envio = Some(now),
                QuoteStatus::Reviewed => quote.fecha_revision = Some(now),
                _ => quote.fecha_aprobacion = Some(now),
            }
        }

        if !self.quotes.update_fields(quote_id, fields).await? {
            return Err(AppError::not_found("Cotización", quote_id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Cotização {}: {} -> {}", quote_id, current, new_status);
        self.load(quote_id).await
    }

    /// Grava (ou substitui) o lembrete. Nada é enviado aqui; o poller envia.
    pub async fn schedule_reminder(
        &self,
        quote_id: &str,
        request: ReminderRequest,
        actor: Option<String>,
    ) -> Result<Quote, AppError> {
        self.load(quote_id).await?;

        let mut report = ValidationReport::new();
        let tipo = match request.tipo.parse::<ReminderType>() {
            Ok(tipo) => Some(tipo),
            Err(e) => {
                report.push(format!("tipo: {}", e));
                None
            }
        };
        report.check(request.fecha.is_some(), "fecha: la fecha del recordatorio es obligatoria o inválida");
        let destinatarios = clean_recipients(&request.destinatarios, &mut report);
        report.finish()?;

        let (Some(tipo), Some(fecha)) = (tipo, request.fecha) else {
            return Err(AppError::validation("recordatorio incompleto"));
        };
        let reminder = Reminder {
            fecha,
            tipo,
            mensaje: request.mensaje.trim().to_string(),
            destinatarios,
            enviar_email: request.enviar_email,
            enviar_push: request.enviar_push,
            creado_por: clean_optional(actor),
        };

        if !self.quotes.set_reminder(quote_id, &reminder, Utc::now()).await? {
            return Err(AppError::not_found("Cotización", quote_id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!(
            "Lembrete ({}) agendado na cotização {} para {}",
            reminder.tipo.as_str(),
            quote_id,
            to_iso(reminder.fecha)
        );
        self.load(quote_id).await
    }

    /// Remove o lembrete sem enviar nada.
    pub async fn delete_reminder(&self, quote_id: &str) -> Result<Quote, AppError> {
        if !self.quotes.clear_reminder(quote_id, Utc::now()).await? {
            return Err(AppError::not_found("Cotización", quote_id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Lembrete removido da cotização {}", quote_id);
        self.load(quote_id).await
    }
}

// src/db/quote_repo.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    common::{dates::to_iso, error::AppError},
    db::{
        quote_document::{normalize_quote, reminder_fields, to_document},
        store::{Collection, DocumentStore, Query},
    },
    models::quote::{Quote, Reminder},
};

const COLLECTION: Collection = Collection::Quotes;

#[derive(Clone)]
pub struct QuoteRepository {
    store: Arc<dyn DocumentStore>,
}

impl QuoteRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &Query) -> Result<Vec<Quote>, AppError> {
        let docs = self.store.list(COLLECTION, query).await?;
        Ok(docs.iter().map(normalize_quote).collect())
    }

    pub async fn find(&self, id: &str) -> Result<Option<Quote>, AppError> {
        Ok(self.store.get(COLLECTION, id).await?.as_ref().map(normalize_quote))
    }

    pub async fn create(&self, quote: &Quote) -> Result<Quote, AppError> {
        let doc = self.store.create(COLLECTION, &quote.id, to_document(quote)?).await?;
        Ok(normalize_quote(&doc))
    }

    /// Regrava o documento inteiro a partir da forma canônica.
    pub async fn save(&self, quote: &Quote) -> Result<bool, AppError> {
        self.store.update_fields(COLLECTION, &quote.id, to_document(quote)?).await
    }

    pub async fn update_fields(&self, id: &str, fields: Map<String, Value>) -> Result<bool, AppError> {
        self.store.update_fields(COLLECTION, id, fields).await
    }

    pub async fn set_reminder(
        &self,
        id: &str,
        reminder: &Reminder,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut fields = reminder_fields(Some(reminder));
        fields.insert("updated_at".into(), to_iso(now).into());
        self.update_fields(id, fields).await
    }

    pub async fn clear_reminder(&self, id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut fields = reminder_fields(None);
        fields.insert("updated_at".into(), to_iso(now).into());
        self.update_fields(id, fields).await
    }

    /// Limpa o lembrete só se ele ainda for o mesmo que foi despachado.
    /// Se alguém reagendou no meio do caminho, o novo lembrete fica.
    pub async fn clear_reminder_if_unchanged(
        &self,
        id: &str,
        dispatched: &Reminder,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let Some(current) = self.find(id).await? else {
            return Ok(false);
        };
        if current.recordatorio.as_ref() != Some(dispatched) {
            tracing::info!("Lembrete da cotização {} mudou durante o envio; mantido", id);
            return Ok(false);
        }
        self.clear_reminder(id, now).await
    }

    /// Cotizações do cliente (considera também `clienteId` dos documentos antigos).
    pub async fn count_by_client(&self, cliente_id: &str) -> Result<usize, AppError> {
        Ok(self
            .list(&Query::new())
            .await?
            .iter()
            .filter(|q| q.cliente_id.as_deref() == Some(cliente_id))
            .count())
    }
}

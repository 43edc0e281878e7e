// src/services/client_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        cache::{QueryCache, QueryShape},
        dates::to_iso,
        error::AppError,
        validation::{clean_optional, ValidationReport},
    },
    db::{Collection, DocumentStore, Query, QuoteRepository, Repository, Direction},
    models::client::{Client, ClientFilters, ClientPatch, ClientPayload},
};

const ENTITY: &str = Collection::Clients.name();

#[derive(Clone)]
pub struct ClientService {
    repo: Repository<Client>,
    quotes: QuoteRepository,
    cache: QueryCache,
}

fn normalized(payload: ClientPayload) -> ClientPayload {
    ClientPayload {
        nombre: payload.nombre.trim().to_string(),
        empresa: clean_optional(payload.empresa),
        email: payload.email.trim().to_lowercase(),
        telefono: clean_optional(payload.telefono),
        direccion: clean_optional(payload.direccion),
        notas: clean_optional(payload.notas),
    }
}

fn matches(client: &Client, filters: &ClientFilters) -> bool {
    if let Some(activo) = filters.activo {
        if client.activo != activo {
            return false;
        }
    }
    match filters.buscar.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let term = term.to_lowercase();
            client.nombre.to_lowercase().contains(&term)
                || client.email.to_lowercase().contains(&term)
                || client
                    .empresa
                    .as_deref()
                    .is_some_and(|e| e.to_lowercase().contains(&term))
        }
        None => true,
    }
}

impl ClientService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: QueryCache) -> Self {
        Self {
            repo: Repository::new(store.clone()),
            quotes: QuoteRepository::new(store),
            cache,
        }
    }

    pub async fn get_all(&self, filters: &ClientFilters) -> Result<Vec<Client>, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::List, &serde_json::to_string(filters)?);
        self.cache
            .get_or_load(key, QueryShape::List, || async {
                let all = self.repo.list(&Query::new().order_by("nombre", Direction::Asc)).await?;
                Ok(all.into_iter().filter(|c| matches(c, filters)).collect())
            })
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Client, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::Detail, id);
        self.cache
            .get_or_load(key, QueryShape::Detail, || async {
                self.repo
                    .find(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Cliente", id))
            })
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Client>, AppError> {
        self.repo.find_by_email(email).await
    }

    // Valida tudo de uma vez, inclusive a unicidade do e-mail.
    async fn validate(&self, payload: &ClientPayload, current_id: Option<&str>) -> Result<(), AppError> {
        let mut report = ValidationReport::new();
        report.merge(payload.validate());
        if !payload.email.is_empty() {
            if let Some(other) = self.repo.find_by_email(&payload.email).await? {
                report.check(
                    Some(other.id.as_str()) == current_id,
                    format!("email: ya existe un cliente con el correo '{}'", payload.email),
                );
            }
        }
        report.finish()
    }

    pub async fn create(&self, payload: ClientPayload) -> Result<Client, AppError> {
        let payload = normalized(payload);
        self.validate(&payload, None).await?;

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4().to_string(),
            nombre: payload.nombre,
            empresa: payload.empresa,
            email: payload.email,
            telefono: payload.telefono,
            direccion: payload.direccion,
            notas: payload.notas,
            activo: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let created = self.repo.insert(&client).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Cliente criado: {} ({})", created.nombre, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: ClientPatch) -> Result<Client, AppError> {
        let existing = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Cliente", id))?;
        let activo = patch.activo.unwrap_or(existing.activo);
        let payload = normalized(patch.apply(&existing));
        self.validate(&payload, Some(id)).await?;

        let updated = Client {
            id: existing.id,
            nombre: payload.nombre,
            empresa: payload.empresa,
            email: payload.email,
            telefono: payload.telefono,
            direccion: payload.direccion,
            notas: payload.notas,
            activo,
            created_at: existing.created_at,
            updated_at: Some(Utc::now()),
        };
        self.repo.save(&updated).await?;
        self.cache.invalidate_entity(ENTITY).await;
        Ok(updated)
    }

    /// Desativa o cliente (o registro continua no banco).
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut fields = Map::new();
        fields.insert("activo".into(), Value::Bool(false));
        fields.insert("updated_at".into(), to_iso(Utc::now()).into());
        if !self.repo.update_fields(id, fields).await? {
            return Err(AppError::not_found("Cliente", id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Cliente desativado: {}", id);
        Ok(())
    }

    /// Exclusão definitiva; só para clientes sem cotizações.
    pub async fn purge(&self, id: &str) -> Result<(), AppError> {
        if self.repo.find(id).await?.is_none() {
            return Err(AppError::not_found("Cliente", id));
        }
        let quotes = self.quotes.count_by_client(id).await?;
        if quotes > 0 {
            return Err(AppError::validation(format!(
                "No se puede eliminar el cliente: tiene {} cotización(es) asociada(s). Desactívelo en su lugar.",
                quotes
            )));
        }
        self.repo.delete(id).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Cliente excluído: {}", id);
        Ok(())
    }
}

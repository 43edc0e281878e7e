// src/services/settings_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        cache::{QueryCache, QueryShape},
        error::AppError,
        validation::{clean_optional, ValidationReport},
    },
    db::{Collection, Direction, DocumentStore, Query, Repository},
    models::settings::{ConfigEntry, ConfigFilters, ConfigPatch, ConfigPayload},
};

const ENTITY: &str = Collection::Settings.name();

#[derive(Clone)]
pub struct SettingsService {
    repo: Repository<ConfigEntry>,
    cache: QueryCache,
}

fn not_found(clave: &str) -> AppError {
    AppError::NotFound(format!("Configuración con clave '{}' no encontrada", clave))
}

impl SettingsService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: QueryCache) -> Self {
        Self {
            repo: Repository::new(store),
            cache,
        }
    }

    pub async fn get_all(&self, filters: &ConfigFilters) -> Result<Vec<ConfigEntry>, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::List, &serde_json::to_string(filters)?);
        self.cache
            .get_or_load(key, QueryShape::List, || async {
                let all = self.repo.list(&Query::new().order_by("clave", Direction::Asc)).await?;
                Ok(all
                    .into_iter()
                    .filter(|e| filters.activo.is_none_or(|a| a == e.activo))
                    .collect())
            })
            .await
    }

    pub async fn get_by_key(&self, clave: &str) -> Result<ConfigEntry, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::Detail, clave);
        self.cache
            .get_or_load(key, QueryShape::Detail, || async {
                self.repo.find_by_key(clave).await?.ok_or_else(|| not_found(clave))
            })
            .await
    }

    /// Valor inteiro de uma chave ativa; `default` se ausente ou ilegível.
    pub async fn get_i64(&self, clave: &str, default: i64) -> i64 {
        let entry = match self.get_by_key(clave).await {
            Ok(entry) if entry.activo => entry,
            Ok(_) | Err(AppError::NotFound(_)) => return default,
            Err(e) => {
                tracing::warn!("Falha ao ler configuração '{}': {}; usando {}", clave, e, default);
                return default;
            }
        };
        let parsed = match &entry.valor {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            tracing::warn!("Configuração '{}' não é inteira ({}); usando {}", clave, entry.valor, default);
            default
        })
    }

    pub async fn create(&self, payload: ConfigPayload) -> Result<ConfigEntry, AppError> {
        let payload = ConfigPayload {
            clave: payload.clave.trim().to_string(),
            valor: payload.valor,
            descripcion: clean_optional(payload.descripcion),
        };
        let mut report = ValidationReport::new();
        report
            .merge(payload.validate())
            .check(
                !payload.clave.contains(char::is_whitespace),
                "clave: la clave no puede contener espacios",
            );
        if self.repo.find_by_key(&payload.clave).await?.is_some() {
            report.push(format!("clave: la clave '{}' ya existe", payload.clave));
        }
        report.finish()?;

        let now = Utc::now();
        let entry = ConfigEntry {
            id: Uuid::new_v4().to_string(),
            clave: payload.clave,
            valor: payload.valor,
            descripcion: payload.descripcion,
            activo: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let created = self.repo.insert(&entry).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Configuração criada: {}", created.clave);
        Ok(created)
    }

    pub async fn update(&self, clave: &str, patch: ConfigPatch) -> Result<ConfigEntry, AppError> {
        let existing = self.repo.find_by_key(clave).await?.ok_or_else(|| not_found(clave))?;
        let updated = ConfigEntry {
            valor: patch.valor.unwrap_or_else(|| existing.valor.clone()),
            descripcion: clean_optional(patch.descripcion).or_else(|| existing.descripcion.clone()),
            activo: patch.activo.unwrap_or(existing.activo),
            updated_at: Some(Utc::now()),
            ..existing
        };
        self.repo.save(&updated).await?;
        self.cache.invalidate_entity(ENTITY).await;
        Ok(updated)
    }

    pub async fn delete(&self, clave: &str) -> Result<(), AppError> {
        self.update(
            clave,
            ConfigPatch {
                activo: Some(false),
                ..Default::default()
            },
        )
        .await?;
        tracing::info!("Configuração desativada: {}", clave);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::cache::CacheTtls, db::MemoryDocumentStore, models::settings::VALIDITY_DAYS_KEY};
    use serde_json::json;

    fn service() -> SettingsService {
        SettingsService::new(Arc::new(MemoryDocumentStore::new()), QueryCache::new(CacheTtls::default()))
    }

    fn payload(clave: &str, valor: Value) -> ConfigPayload {
        ConfigPayload {
            clave: clave.into(),
            valor,
            descripcion: None,
        }
    }

    #[tokio::test]
    async fn integer_values_with_fallback() {
        let settings = service();
        assert_eq!(settings.get_i64(VALIDITY_DAYS_KEY, 15).await, 15);

        settings.create(payload(VALIDITY_DAYS_KEY, json!("30"))).await.unwrap();
        assert_eq!(settings.get_i64(VALIDITY_DAYS_KEY, 15).await, 30);

        settings.delete(VALIDITY_DAYS_KEY).await.unwrap();
        assert_eq!(settings.get_i64(VALIDITY_DAYS_KEY, 15).await, 15);

        settings.create(payload("moneda", json!({"codigo": "MXN"}))).await.unwrap();
        assert_eq!(settings.get_i64("moneda", 7).await, 7);
    }

    #[tokio::test]
    async fn duplicate_and_malformed_keys_are_reported_together() {
        let settings = service();
        settings.create(payload("iva", json!(16))).await.unwrap();

        match settings.create(payload(" iva ", json!(8))).await {
            Err(AppError::Validation(list)) => assert_eq!(list, vec!["clave: la clave 'iva' ya existe"]),
            other => panic!("inesperado: {:?}", other),
        }
        match settings.create(payload("a b", json!(1))).await {
            Err(AppError::Validation(list)) => assert_eq!(list.len(), 1),
            other => panic!("inesperado: {:?}", other),
        }
        match settings.create(payload("x", json!(1))).await {
            Err(AppError::Validation(list)) => assert_eq!(list.len(), 1),
            other => panic!("inesperado: {:?}", other),
        }
    }
}

// src/services/item_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
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
    db::{Collection, Direction, DocumentStore, Query, Repository},
    models::catalog::{Category, Item, ItemFilters, ItemPatch, ItemPayload},
};

const ENTITY: &str = Collection::Items.name();

#[derive(Clone)]
pub struct ItemService {
    repo: Repository<Item>,
    categories: Repository<Category>,
    cache: QueryCache,
}

fn normalized(payload: ItemPayload) -> ItemPayload {
    let unidad = payload.unidad.trim();
    ItemPayload {
        codigo: payload.codigo.trim().to_uppercase(),
        nombre: payload.nombre.trim().to_string(),
        descripcion: clean_optional(payload.descripcion),
        categoria_id: payload.categoria_id.trim().to_string(),
        precio: payload.precio,
        unidad: if unidad.is_empty() { "pieza".to_string() } else { unidad.to_string() },
    }
}

fn matches(item: &Item, filters: &ItemFilters) -> bool {
    if filters.activo.is_some_and(|a| a != item.activo) {
        return false;
    }
    if filters
        .categoria_id
        .as_deref()
        .is_some_and(|c| c != item.categoria_id)
    {
        return false;
    }
    match filters.buscar.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let term = term.to_lowercase();
            item.codigo.to_lowercase().contains(&term) || item.nombre.to_lowercase().contains(&term)
        }
        None => true,
    }
}

impl ItemService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: QueryCache) -> Self {
        Self {
            repo: Repository::new(store.clone()),
            categories: Repository::new(store),
            cache,
        }
    }

    pub async fn get_all(&self, filters: &ItemFilters) -> Result<Vec<Item>, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::List, &serde_json::to_string(filters)?);
        self.cache
            .get_or_load(key, QueryShape::List, || async {
                let all = self.repo.list(&Query::new().order_by("nombre", Direction::Asc)).await?;
                Ok(all.into_iter().filter(|i| matches(i, filters)).collect())
            })
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Item, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::Detail, id);
        self.cache
            .get_or_load(key, QueryShape::Detail, || async {
                self.repo
                    .find(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Item", id))
            })
            .await
    }

    pub async fn find_by_code(&self, codigo: &str) -> Result<Option<Item>, AppError> {
        self.repo.find_by_code(codigo).await
    }

    async fn validate(&self, payload: &ItemPayload, current_id: Option<&str>) -> Result<(), AppError> {
        let mut report = ValidationReport::new();
        report.merge(payload.validate());
        report.check(
            payload.precio >= Decimal::ZERO,
            "precio: el precio no puede ser negativo",
        );
        if !payload.codigo.is_empty() {
            if let Some(other) = self.repo.find_by_code(&payload.codigo).await? {
                report.check(
                    Some(other.id.as_str()) == current_id,
                    format!("codigo: ya existe un item con el código '{}'", payload.codigo),
                );
            }
        }
        if !payload.categoria_id.is_empty() {
            report.check(
                self.categories.find(&payload.categoria_id).await?.is_some(),
                format!("categoria_id: la categoría '{}' no existe", payload.categoria_id),
            );
        }
        report.finish()
    }

    pub async fn create(&self, payload: ItemPayload) -> Result<Item, AppError> {
        let payload = normalized(payload);
        self.validate(&payload, None).await?;

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            codigo: payload.codigo,
            nombre: payload.nombre,
            descripcion: payload.descripcion,
            categoria_id: payload.categoria_id,
            precio: payload.precio,
            unidad: payload.unidad,
            activo: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let created = self.repo.insert(&item).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Item criado: {} ({})", created.codigo, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: ItemPatch) -> Result<Item, AppError> {
        let existing = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Item", id))?;
        let activo = patch.activo.unwrap_or(existing.activo);
        let payload = normalized(patch.apply(&existing));
        self.validate(&payload, Some(id)).await?;

        let updated = Item {
            id: existing.id,
            codigo: payload.codigo,
            nombre: payload.nombre,
            descripcion: payload.descripcion,
            categoria_id: payload.categoria_id,
            precio: payload.precio,
            unidad: payload.unidad,
            activo,
            created_at: existing.created_at,
            updated_at: Some(Utc::now()),
        };
        self.repo.save(&updated).await?;
        self.cache.invalidate_entity(ENTITY).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut fields = Map::new();
        fields.insert("activo".into(), Value::Bool(false));
        fields.insert("updated_at".into(), to_iso(Utc::now()).into());
        if !self.repo.update_fields(id, fields).await? {
            return Err(AppError::not_found("Item", id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Item desativado: {}", id);
        Ok(())
    }
}

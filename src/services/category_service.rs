// src/services/category_service.rs

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
    db::{Collection, Direction, DocumentStore, Query, Repository},
    models::catalog::{Category, CategoryFilters, CategoryPatch, CategoryPayload, Item},
};

const ENTITY: &str = Collection::Categories.name();

#[derive(Clone)]
pub struct CategoryService {
    repo: Repository<Category>,
    items: Repository<Item>,
    cache: QueryCache,
}

fn normalized(payload: CategoryPayload) -> CategoryPayload {
    CategoryPayload {
        nombre: payload.nombre.trim().to_string(),
        descripcion: clean_optional(payload.descripcion),
    }
}

impl CategoryService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: QueryCache) -> Self {
        Self {
            repo: Repository::new(store.clone()),
            items: Repository::new(store),
            cache,
        }
    }

    pub async fn get_all(&self, filters: &CategoryFilters) -> Result<Vec<Category>, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::List, &serde_json::to_string(filters)?);
        self.cache
            .get_or_load(key, QueryShape::List, || async {
                let all = self.repo.list(&Query::new().order_by("nombre", Direction::Asc)).await?;
                Ok(all
                    .into_iter()
                    .filter(|c| filters.activo.is_none_or(|a| a == c.activo))
                    .collect())
            })
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Category, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::Detail, id);
        self.cache
            .get_or_load(key, QueryShape::Detail, || async {
                self.repo
                    .find(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Categoría", id))
            })
            .await
    }

    pub async fn find_by_name(&self, nombre: &str) -> Result<Option<Category>, AppError> {
        self.repo.find_by_name(nombre).await
    }

    async fn validate(&self, payload: &CategoryPayload, current_id: Option<&str>) -> Result<(), AppError> {
        let mut report = ValidationReport::new();
        report.merge(payload.validate());
        if !payload.nombre.is_empty() {
            if let Some(other) = self.repo.find_by_name(&payload.nombre).await? {
                report.check(
                    Some(other.id.as_str()) == current_id,
                    format!("nombre: ya existe una categoría llamada '{}'", other.nombre),
                );
            }
        }
        report.finish()
    }

    pub async fn create(&self, payload: CategoryPayload) -> Result<Category, AppError> {
        let payload = normalized(payload);
        self.validate(&payload, None).await?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            nombre: payload.nombre,
            descripcion: payload.descripcion,
            activo: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let created = self.repo.insert(&category).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Categoria criada: {} ({})", created.nombre, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: CategoryPatch) -> Result<Category, AppError> {
        let existing = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Categoría", id))?;
        let activo = patch.activo.unwrap_or(existing.activo);
        let payload = normalized(patch.apply(&existing));
        self.validate(&payload, Some(id)).await?;

        let updated = Category {
            id: existing.id,
            nombre: payload.nombre,
            descripcion: payload.descripcion,
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
            return Err(AppError::not_found("Categoría", id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Categoria desativada: {}", id);
        Ok(())
    }

    /// Exclusão definitiva; bloqueada enquanto houver itens na categoria.
    pub async fn purge(&self, id: &str) -> Result<(), AppError> {
        if self.repo.find(id).await?.is_none() {
            return Err(AppError::not_found("Categoría", id));
        }
        let items = self.items.count_by_category(id).await?;
        if items > 0 {
            return Err(AppError::validation(format!(
                "No se puede eliminar la categoría: tiene {} item(s) asociado(s).",
                items
            )));
        }
        self.repo.delete(id).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Categoria excluída: {}", id);
        Ok(())
    }
}

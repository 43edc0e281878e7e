// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::dates::lenient_timestamp;

fn default_true() -> bool {
    true
}

fn default_unit() -> String {
    "pieza".to_string()
}

// --- 1. Categorias ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: String,
    #[schema(example = "Audio")]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default = "default_true")]
    pub activo: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CategoryPayload {
    #[validate(length(min = 2, max = 100, message = "el nombre debe tener entre 2 y 100 caracteres"))]
    #[schema(example = "Iluminación")]
    pub nombre: String,
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CategoryPatch {
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub activo: Option<bool>,
}

impl CategoryPatch {
    pub fn apply(self, base: &Category) -> CategoryPayload {
        CategoryPayload {
            nombre: self.nombre.unwrap_or_else(|| base.nombre.clone()),
            descripcion: self.descripcion.or_else(|| base.descripcion.clone()),
        }
    }
}

// --- 2. Itens do catálogo (equipamentos e serviços para locação) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: String,
    #[schema(example = "LED-001")]
    pub codigo: String,
    #[schema(example = "Pantalla LED 3x2")]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub categoria_id: String,
    #[serde(default)]
    #[schema(example = "1500.00")]
    pub precio: Decimal,
    #[serde(default = "default_unit")]
    pub unidad: String,
    #[serde(default = "default_true")]
    pub activo: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ItemPayload {
    #[validate(length(min = 1, max = 30, message = "el código es obligatorio (máximo 30 caracteres)"))]
    #[schema(example = "LED-001")]
    pub codigo: String,
    #[validate(length(min = 2, max = 100, message = "el nombre debe tener entre 2 y 100 caracteres"))]
    pub nombre: String,
    pub descripcion: Option<String>,
    #[validate(length(min = 1, message = "la categoría es obligatoria"))]
    pub categoria_id: String,
    #[schema(example = "1500.00")]
    pub precio: Decimal,
    #[serde(default = "default_unit")]
    pub unidad: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ItemPatch {
    pub codigo: Option<String>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub categoria_id: Option<String>,
    pub precio: Option<Decimal>,
    pub unidad: Option<String>,
    pub activo: Option<bool>,
}

impl ItemPatch {
    pub fn apply(self, base: &Item) -> ItemPayload {
        ItemPayload {
            codigo: self.codigo.unwrap_or_else(|| base.codigo.clone()),
            nombre: self.nombre.unwrap_or_else(|| base.nombre.clone()),
            descripcion: self.descripcion.or_else(|| base.descripcion.clone()),
            categoria_id: self.categoria_id.unwrap_or_else(|| base.categoria_id.clone()),
            precio: self.precio.unwrap_or(base.precio),
            unidad: self.unidad.unwrap_or_else(|| base.unidad.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemFilters {
    pub categoria_id: Option<String>,
    pub activo: Option<bool>,
    /// Busca por código ou nome.
    pub buscar: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryFilters {
    pub activo: Option<bool>,
}

// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::dates::lenient_timestamp;

/// Chave conhecida: dias de validade de uma cotização nova.
pub const VALIDITY_DAYS_KEY: &str = "dias_validez";

fn default_true() -> bool {
    true
}

// Par chave/valor de configuração do sistema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConfigEntry {
    pub id: String,
    #[schema(example = "dias_validez")]
    pub clave: String,
    #[schema(value_type = Object, example = 15)]
    pub valor: Value,
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
pub struct ConfigPayload {
    #[validate(length(min = 2, max = 60, message = "la clave debe tener entre 2 y 60 caracteres"))]
    #[schema(example = "dias_validez")]
    pub clave: String,
    #[schema(value_type = Object, example = 15)]
    pub valor: Value,
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ConfigPatch {
    #[schema(value_type = Option<Object>)]
    pub valor: Option<Value>,
    pub descripcion: Option<String>,
    pub activo: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfigFilters {
    pub activo: Option<bool>,
}

// src/models/client.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::dates::lenient_timestamp;

fn default_true() -> bool {
    true
}

// Representa um cliente vindo do banco de documentos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Client {
    pub id: String,
    #[schema(example = "Acme Corp")]
    pub nombre: String,
    #[serde(default)]
    pub empresa: Option<String>,
    #[serde(default)]
    #[schema(example = "compras@acme.mx")]
    pub email: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub notas: Option<String>,
    #[serde(default = "default_true")]
    pub activo: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

// Dados para criar (ou, já mesclados, atualizar) um cliente
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ClientPayload {
    #[validate(length(min = 2, max = 100, message = "el nombre debe tener entre 2 y 100 caracteres"))]
    #[schema(example = "Acme Corp")]
    pub nombre: String,
    pub empresa: Option<String>,
    #[validate(email(message = "el correo electrónico no es válido"))]
    #[schema(example = "compras@acme.mx")]
    pub email: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub notas: Option<String>,
}

// Atualização parcial: só os campos presentes mudam
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClientPatch {
    pub nombre: Option<String>,
    pub empresa: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub notas: Option<String>,
    pub activo: Option<bool>,
}

impl ClientPatch {
    pub fn apply(self, base: &Client) -> ClientPayload {
        ClientPayload {
            nombre: self.nombre.unwrap_or_else(|| base.nombre.clone()),
            empresa: self.empresa.or_else(|| base.empresa.clone()),
            email: self.email.unwrap_or_else(|| base.email.clone()),
            telefono: self.telefono.or_else(|| base.telefono.clone()),
            direccion: self.direccion.or_else(|| base.direccion.clone()),
            notas: self.notas.or_else(|| base.notas.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClientFilters {
    /// Só ativos (`true`) ou só inativos (`false`).
    pub activo: Option<bool>,
    /// Busca por nome, empresa ou e-mail.
    pub buscar: Option<String>,
}

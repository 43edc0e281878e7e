// src/models/quote.rs

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::common::dates::{lenient_day, lenient_timestamp};

pub const DEFAULT_VALIDITY_DAYS: i64 = 15;
pub const MAX_EVENT_DAYS: i64 = 365;
pub const MAX_VALIDITY_DAYS: i64 = 3650;

// --- Enums ---

/// Estado da cotização. Os nomes persistidos são os do negócio (espanhol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum QuoteStatus {
    #[serde(rename = "borrador")]
    Draft,
    #[serde(rename = "enviada")]
    Sent,
    #[serde(rename = "revisada")]
    Reviewed,
    #[serde(rename = "aprobada")]
    Approved,
    #[serde(rename = "convertida")]
    Converted,
    #[serde(rename = "rechazada")]
    Rejected,
    #[serde(rename = "vencida")]
    Expired,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 7] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Reviewed,
        QuoteStatus::Approved,
        QuoteStatus::Converted,
        QuoteStatus::Rejected,
        QuoteStatus::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Draft => "borrador",
            QuoteStatus::Sent => "enviada",
            QuoteStatus::Reviewed => "revisada",
            QuoteStatus::Approved => "aprobada",
            QuoteStatus::Converted => "convertida",
            QuoteStatus::Rejected => "rechazada",
            QuoteStatus::Expired => "vencida",
        }
    }

    /// Tabela de transições permitidas.
    pub fn allowed_targets(self) -> &'static [QuoteStatus] {
        use QuoteStatus::*;
        match self {
            Draft => &[Sent, Rejected],
            Sent => &[Reviewed, Rejected, Expired],
            Reviewed => &[Approved, Rejected, Expired],
            Approved => &[Converted],
            Rejected => &[Draft],
            Expired => &[Draft],
            Converted => &[],
        }
    }

    pub fn can_transition_to(self, next: QuoteStatus) -> bool {
        self.allowed_targets().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        QuoteStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| format!("estado desconocido: '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReminderType {
    Seguimiento,
    Vencimiento,
    Revision,
}

impl ReminderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderType::Seguimiento => "seguimiento",
            ReminderType::Vencimiento => "vencimiento",
            ReminderType::Revision => "revision",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReminderType::Seguimiento => "Seguimiento",
            ReminderType::Vencimiento => "Vencimiento",
            ReminderType::Revision => "Revisión",
        }
    }
}

impl FromStr for ReminderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "seguimiento" => Ok(ReminderType::Seguimiento),
            "vencimiento" => Ok(ReminderType::Vencimiento),
            "revision" | "revisión" => Ok(ReminderType::Revision),
            other => Err(format!("tipo de recordatorio desconocido: '{}'", other)),
        }
    }
}

// --- Structs embutidas ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    #[schema(example = "Pantalla LED 3x2")]
    pub nombre: String,
    pub descripcion: Option<String>,
    #[schema(example = "2")]
    pub cantidad: Decimal,
    #[schema(example = "1500.00")]
    pub precio: Decimal,
    #[schema(example = "0")]
    pub descuento: Decimal,
    pub subtotal: Decimal,
    #[schema(example = "pieza")]
    pub unidad: String,
    pub notas: Option<String>,
}

/// Lembrete pendente. No máximo um por cotização.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reminder {
    pub fecha: DateTime<Utc>,
    pub tipo: ReminderType,
    pub mensaje: String,
    #[schema(example = json!(["ventas@empresa.mx"]))]
    pub destinatarios: Vec<String>,
    pub enviar_email: bool,
    pub enviar_push: bool,
    pub creado_por: Option<String>,
}

impl Reminder {
    /// Vencido e com canal de e-mail ligado.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enviar_email && self.fecha <= now
    }
}

/// Entrada do histórico de estados. Nunca é alterada nem removida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    pub estado_anterior: QuoteStatus,
    pub estado_nuevo: QuoteStatus,
    pub fecha: DateTime<Utc>,
    pub usuario: Option<String>,
    pub comentario: Option<String>,
    #[serde(default)]
    pub automatico: bool,
}

// --- Cotização ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Quote {
    pub id: String,
    #[schema(example = "COT-001-20240305-ACMECORP-GALAANUAL")]
    pub numero: String,
    pub cliente_id: Option<String>,
    pub lugar_id: Option<String>,
    #[schema(example = "Gala Anual")]
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_evento: Option<NaiveDate>,
    pub fecha_evento_fin: Option<NaiveDate>,
    pub dias_evento: i64,
    pub requiere_montaje: bool,
    pub estado: QuoteStatus,
    pub subtotal: Decimal,
    /// Percentual de desconto global.
    pub descuento: Decimal,
    pub total: Decimal,
    pub observaciones: Option<String>,
    pub condiciones: Option<String>,
    pub validez_dias: i64,
    pub fecha_validez: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub recordatorio: Option<Reminder>,
    pub historial_estados: Vec<StatusChange>,
    pub fecha_envio: Option<DateTime<Utc>>,
    pub fecha_revision: Option<DateTime<Utc>>,
    pub fecha_aprobacion: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Cotização vazia em rascunho; útil como base para criação e testes.
    pub fn draft(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            numero: String::new(),
            cliente_id: None,
            lugar_id: None,
            titulo: String::new(),
            descripcion: None,
            fecha_evento: None,
            fecha_evento_fin: None,
            dias_evento: 1,
            requiere_montaje: false,
            estado: QuoteStatus::Draft,
            subtotal: Decimal::ZERO,
            descuento: Decimal::ZERO,
            total: Decimal::ZERO,
            observaciones: None,
            condiciones: None,
            validez_dias: DEFAULT_VALIDITY_DAYS,
            fecha_validez: None,
            items: Vec::new(),
            recordatorio: None,
            historial_estados: Vec::new(),
            fecha_envio: None,
            fecha_revision: None,
            fecha_aprobacion: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Indicadores agregados das cotizações.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuoteStats {
    pub total_cotizaciones: usize,
    #[schema(example = json!({"borrador": 3, "enviada": 1}))]
    pub por_estado: BTreeMap<String, usize>,
    pub monto_total: Decimal,
    /// Soma das aprovadas + convertidas.
    pub monto_aprobado: Decimal,
    pub recordatorios_pendientes: usize,
}

// --- Payloads ---

fn default_true() -> bool {
    true
}

/// Dados de criação. `items` aceita lista ou mapa indexado.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct QuotePayload {
    #[validate(length(min = 1, message = "el cliente es obligatorio"))]
    pub cliente_id: String,
    pub lugar_id: Option<String>,
    #[validate(length(min = 2, max = 200, message = "el título debe tener entre 2 y 200 caracteres"))]
    #[schema(example = "Gala Anual")]
    pub titulo: String,
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "lenient_day")]
    #[schema(value_type = Option<String>, example = "2024-05-10")]
    pub fecha_evento: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_day")]
    #[schema(value_type = Option<String>, example = "2024-05-12")]
    pub fecha_evento_fin: Option<NaiveDate>,
    pub dias_evento: Option<i64>,
    #[serde(default)]
    pub requiere_montaje: bool,
    #[serde(default)]
    #[schema(example = "10")]
    pub descuento: Decimal,
    pub observaciones: Option<String>,
    pub condiciones: Option<String>,
    pub validez_dias: Option<i64>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>, example = json!([{"nombre": "Pantalla LED 3x2", "cantidad": 2, "precio": 1500}]))]
    pub items: Value,
}

/// Atualização parcial. O estado não é editável por aqui.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct QuotePatch {
    pub cliente_id: Option<String>,
    pub lugar_id: Option<String>,
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    #[serde(default, deserialize_with = "lenient_day")]
    #[schema(value_type = Option<String>)]
    pub fecha_evento: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_day")]
    #[schema(value_type = Option<String>)]
    pub fecha_evento_fin: Option<NaiveDate>,
    pub dias_evento: Option<i64>,
    pub requiere_montaje: Option<bool>,
    pub descuento: Option<Decimal>,
    pub observaciones: Option<String>,
    pub condiciones: Option<String>,
    pub validez_dias: Option<i64>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub items: Option<Value>,
}

impl QuotePatch {
    pub fn apply(self, base: &Quote) -> Result<QuotePayload, serde_json::Error> {
        let items = match self.items {
            Some(items) => items,
            None => serde_json::to_value(&base.items)?,
        };
        // Datas novas sem fim explícito: o fim antigo não vale mais
        let fecha_evento_fin = match (self.fecha_evento, self.fecha_evento_fin) {
            (_, Some(fin)) => Some(fin),
            (Some(_), None) => None,
            (None, None) => base.fecha_evento_fin,
        };
        Ok(QuotePayload {
            cliente_id: self.cliente_id.or_else(|| base.cliente_id.clone()).unwrap_or_default(),
            lugar_id: self.lugar_id.or_else(|| base.lugar_id.clone()),
            titulo: self.titulo.unwrap_or_else(|| base.titulo.clone()),
            descripcion: self.descripcion.or_else(|| base.descripcion.clone()),
            fecha_evento: self.fecha_evento.or(base.fecha_evento),
            fecha_evento_fin,
            dias_evento: self.dias_evento.or(Some(base.dias_evento)),
            requiere_montaje: self.requiere_montaje.unwrap_or(base.requiere_montaje),
            descuento: self.descuento.unwrap_or(base.descuento),
            observaciones: self.observaciones.or_else(|| base.observaciones.clone()),
            condiciones: self.condiciones.or_else(|| base.condiciones.clone()),
            validez_dias: self.validez_dias.or(Some(base.validez_dias)),
            items,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteFilters {
    /// Nome persistido do estado (`borrador`, `enviada`...).
    pub estado: Option<String>,
    pub cliente_id: Option<String>,
    /// Data do evento a partir de (`YYYY-MM-DD`).
    pub desde: Option<String>,
    /// Data do evento até (`YYYY-MM-DD`).
    pub hasta: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "enviada")]
    pub estado: String,
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReminderRequest {
    #[schema(example = "seguimiento")]
    pub tipo: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    #[schema(value_type = String, example = "2024-06-01T15:00:00Z")]
    pub fecha: Option<DateTime<Utc>>,
    #[serde(default)]
    pub mensaje: String,
    #[serde(default = "default_true")]
    pub enviar_email: bool,
    #[serde(default)]
    pub enviar_push: bool,
    #[serde(default)]
    #[schema(example = json!(["ventas@empresa.mx", "gerencia@empresa.mx"]))]
    pub destinatarios: Vec<String>,
}

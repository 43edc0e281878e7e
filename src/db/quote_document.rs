// src/db/quote_document.rs

//! Fronteira entre o documento gravado e a `Quote` canônica.
//!
//! Documentos antigos usam camelCase para alguns campos (`clienteId`,
//! `fechaEvento`, `fechaEventoFin`, `createdAt`). A leitura reconcilia as duas
//! grafias; a escrita usa sempre snake_case.

use serde_json::{Map, Value};

use crate::{
    common::{
        dates::{duration_in_days, parse_day, parse_timestamp, to_iso},
        error::AppError,
    },
    db::store::Document,
    models::quote::{Quote, QuoteStatus, Reminder, ReminderType, StatusChange, DEFAULT_VALIDITY_DAYS},
    services::normalization::{lenient_decimal, parse_line_items},
};

// (snake_case, camelCase legado)
const CLIENT_KEYS: (&str, &str) = ("cliente_id", "clienteId");
const START_KEYS: (&str, &str) = ("fecha_evento", "fechaEvento");
const END_KEYS: (&str, &str) = ("fecha_evento_fin", "fechaEventoFin");
const CREATED_KEYS: (&str, &str) = ("created_at", "createdAt");

pub const REMINDER_KEYS: [&str; 7] = [
    "recordatorio_fecha",
    "recordatorio_tipo",
    "recordatorio_mensaje",
    "recordatorio_destinatarios",
    "recordatorio_email",
    "recordatorio_push",
    "recordatorio_creado_por",
];

fn present<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    data.get(key).filter(|v| !v.is_null())
}

/// snake_case vence quando não é nulo; camelCase só cobre a ausência.
fn pick<'a>(data: &'a Map<String, Value>, (snake, camel): (&str, &str)) -> Option<&'a Value> {
    present(data, snake).or_else(|| present(data, camel))
}

fn string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn boolean(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "si" | "sí" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| string(Some(v)))
            .collect(),
        // Formato antigo: "a@x.mx, b@x.mx"
        Some(Value::String(s)) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn reminder(data: &Map<String, Value>) -> Option<Reminder> {
    let fecha = present(data, "recordatorio_fecha").and_then(parse_timestamp)?;
    let tipo = match string(present(data, "recordatorio_tipo")) {
        Some(raw) => match raw.parse::<ReminderType>() {
            Ok(tipo) => tipo,
            Err(e) => {
                tracing::warn!("{}; usando 'seguimiento'", e);
                ReminderType::Seguimiento
            }
        },
        None => ReminderType::Seguimiento,
    };
    Some(Reminder {
        fecha,
        tipo,
        mensaje: string(present(data, "recordatorio_mensaje")).unwrap_or_default(),
        destinatarios: string_list(present(data, "recordatorio_destinatarios")),
        enviar_email: boolean(present(data, "recordatorio_email")).unwrap_or(true),
        enviar_push: boolean(present(data, "recordatorio_push")).unwrap_or(false),
        creado_por: string(present(data, "recordatorio_creado_por")),
    })
}

fn history(data: &Map<String, Value>) -> Vec<StatusChange> {
    let Some(Value::Array(entries)) = present(data, "historial_estados") else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let obj = entry.as_object()?;
            let status = |key: &str| string(obj.get(key)).and_then(|s| s.parse::<QuoteStatus>().ok());
            Some(StatusChange {
                estado_anterior: status("estado_anterior")?,
                estado_nuevo: status("estado_nuevo")?,
                fecha: obj.get("fecha").and_then(parse_timestamp)?,
                usuario: string(obj.get("usuario")),
                comentario: string(obj.get("comentario")),
                automatico: boolean(obj.get("automatico")).unwrap_or(false),
            })
        })
        .collect()
}

/// Documento gravado -> `Quote`. Nunca falha: campos ilegíveis viram padrão.
pub fn normalize_quote(doc: &Document) -> Quote {
    let data = &doc.data;

    let estado = match string(present(data, "estado")) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Cotização {}: {}; tratando como rascunho", doc.id, e);
            QuoteStatus::Draft
        }),
        None => QuoteStatus::Draft,
    };

    let fecha_evento = pick(data, START_KEYS).and_then(parse_day);
    let fecha_evento_fin = pick(data, END_KEYS).and_then(parse_day);
    let dias_evento = integer(present(data, "dias_evento"))
        .filter(|d| *d > 0)
        .unwrap_or_else(|| duration_in_days(fecha_evento, fecha_evento_fin).max(1));

    let money = |key: &str| present(data, key).and_then(lenient_decimal).unwrap_or_default();

    Quote {
        id: doc.id.clone(),
        numero: string(present(data, "numero")).unwrap_or_default(),
        cliente_id: string(pick(data, CLIENT_KEYS)),
        lugar_id: string(present(data, "lugar_id")),
        titulo: string(present(data, "titulo")).unwrap_or_default(),
        descripcion: string(present(data, "descripcion")),
        fecha_evento,
        fecha_evento_fin,
        dias_evento,
        requiere_montaje: boolean(present(data, "requiere_montaje")).unwrap_or(false),
        estado,
        subtotal: money("subtotal"),
        descuento: money("descuento"),
        total: money("total"),
        observaciones: string(present(data, "observaciones")),
        condiciones: string(present(data, "condiciones")),
        validez_dias: integer(present(data, "validez_dias")).unwrap_or(DEFAULT_VALIDITY_DAYS),
        fecha_validez: present(data, "fecha_validez").and_then(parse_day),
        items: present(data, "items").map(parse_line_items).unwrap_or_default(),
        recordatorio: reminder(data),
        historial_estados: history(data),
        fecha_envio: present(data, "fecha_envio").and_then(parse_timestamp),
        fecha_revision: present(data, "fecha_revision").and_then(parse_timestamp),
        fecha_aprobacion: present(data, "fecha_aprobacion").and_then(parse_timestamp),
        created_at: pick(data, CREATED_KEYS).and_then(parse_timestamp),
        updated_at: present(data, "updated_at").and_then(parse_timestamp),
    }
}

/// Campos planos do lembrete. `None` grava nulos (limpa o lembrete).
pub fn reminder_fields(reminder: Option<&Reminder>) -> Map<String, Value> {
    let values: [Value; 7] = match reminder {
        Some(r) => [
            Value::String(to_iso(r.fecha)),
            Value::String(r.tipo.as_str().to_string()),
            Value::String(r.mensaje.clone()),
            Value::from(r.destinatarios.clone()),
            Value::Bool(r.enviar_email),
            Value::Bool(r.enviar_push),
            r.creado_por.clone().map(Value::String).unwrap_or(Value::Null),
        ],
        None => Default::default(),
    };
    REMINDER_KEYS
        .iter()
        .map(|k| k.to_string())
        .zip(values)
        .collect()
}

fn opt<T: Into<Value>>(value: Option<T>) -> Value {
    value.map(Into::into).unwrap_or(Value::Null)
}

/// `Quote` -> corpo do documento, só com as chaves snake_case. As chaves
/// camelCase legadas vão como nulo para não "ressuscitarem" na próxima leitura.
pub fn to_document(quote: &Quote) -> Result<Map<String, Value>, AppError> {
    let day = |d: Option<chrono::NaiveDate>| opt(d.map(|d| d.format("%Y-%m-%d").to_string()));
    let ts = |t: Option<chrono::DateTime<chrono::Utc>>| opt(t.map(to_iso));

    let mut map = Map::new();
    map.insert("numero".into(), quote.numero.clone().into());
    map.insert("cliente_id".into(), opt(quote.cliente_id.clone()));
    map.insert("lugar_id".into(), opt(quote.lugar_id.clone()));
    map.insert("titulo".into(), quote.titulo.clone().into());
    map.insert("descripcion".into(), opt(quote.descripcion.clone()));
    map.insert("fecha_evento".into(), day(quote.fecha_evento));
    map.insert("fecha_evento_fin".into(), day(quote.fecha_evento_fin));
    map.insert("dias_evento".into(), quote.dias_evento.into());
    map.insert("requiere_montaje".into(), quote.requiere_montaje.into());
    map.insert("estado".into(), quote.estado.as_str().into());
    map.insert("subtotal".into(), serde_json::to_value(quote.subtotal)?);
    map.insert("descuento".into(), serde_json::to_value(quote.descuento)?);
    map.insert("total".into(), serde_json::to_value(quote.total)?);
    map.insert("observaciones".into(), opt(quote.observaciones.clone()));
    map.insert("condiciones".into(), opt(quote.condiciones.clone()));
    map.insert("validez_dias".into(), quote.validez_dias.into());
    map.insert("fecha_validez".into(), day(quote.fecha_validez));
    map.insert("items".into(), serde_json::to_value(&quote.items)?);
    map.insert("historial_estados".into(), serde_json::to_value(&quote.historial_estados)?);
    map.insert("fecha_envio".into(), ts(quote.fecha_envio));
    map.insert("fecha_revision".into(), ts(quote.fecha_revision));
    map.insert("fecha_aprobacion".into(), ts(quote.fecha_aprobacion));
    map.insert("created_at".into(), ts(quote.created_at));
    map.insert("updated_at".into(), ts(quote.updated_at));
    map.extend(reminder_fields(quote.recordatorio.as_ref()));
    for (_, camel) in [CLIENT_KEYS, START_KEYS, END_KEYS, CREATED_KEYS] {
        map.insert(camel.into(), Value::Null);
    }
    Ok(map)
}

// Chaves que só o acompanhamento (estado/lembrete) escreve.
const TRACKING_KEYS: [&str; 5] = [
    "estado",
    "historial_estados",
    "fecha_envio",
    "fecha_revision",
    "fecha_aprobacion",
];

/// Como `to_document`, sem estado, histórico, marcos nem lembrete: uma edição
/// do formulário não sobrescreve o que o acompanhamento gravou no meio tempo.
pub fn editable_fields(quote: &Quote) -> Result<Map<String, Value>, AppError> {
    let mut map = to_document(quote)?;
    for key in TRACKING_KEYS.iter().chain(REMINDER_KEYS.iter()) {
        map.remove(*key);
    }
    Ok(map)
}

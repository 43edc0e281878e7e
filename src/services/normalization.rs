// src/services/normalization.rs

//! Regras puras sobre a cotização: itens, totais, número e datas derivadas.

use std::str::FromStr;

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    common::dates::{end_date, to_iso},
    models::{
        client::Client,
        quote::{LineItem, Quote},
    },
};

const CLIENT_PLACEHOLDER: &str = "CLIENTE";
const EVENT_PLACEHOLDER: &str = "EVENTO";
const TOKEN_LEN: usize = 10;
const DEFAULT_UNIT: &str = "pieza";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

/// Arredondamento monetário: 2 casas, metade para longe do zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Número vindo de JSON "solto": aceita número ou string numérica.
pub fn lenient_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

/// Itens podem vir como lista ou como mapa `{"0": {...}, "1": {...}}`.
/// Chaves numéricas saem em ordem numérica; as demais depois, em ordem de chave.
pub fn normalize_items(raw: &Value) -> Vec<Value> {
    match raw {
        Value::Array(items) => items.clone(),
        Value::Object(map) => {
            let mut numbered: Vec<(u64, &Value)> = Vec::new();
            let mut named: Vec<(&String, &Value)> = Vec::new();
            for (key, value) in map {
                match key.parse::<u64>() {
                    Ok(n) => numbered.push((n, value)),
                    Err(_) => named.push((key, value)),
                }
            }
            numbered.sort_by_key(|(n, _)| *n);
            named.sort_by(|a, b| a.0.cmp(b.0));
            numbered
                .into_iter()
                .map(|(_, v)| v.clone())
                .chain(named.into_iter().map(|(_, v)| v.clone()))
                .collect()
        }
        _ => Vec::new(),
    }
}

fn text(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Converte um item bruto. Quantidade ou preço ausentes/inválidos valem 0.
pub fn parse_line_item(raw: &Value) -> Option<LineItem> {
    let Value::Object(obj) = raw else {
        tracing::warn!("Item de cotização ignorado (não é objeto): {}", raw);
        return None;
    };
    let number = |key: &str| obj.get(key).and_then(lenient_decimal).unwrap_or(Decimal::ZERO);

    let cantidad = number("cantidad");
    let precio = number("precio");
    let subtotal = match line_amount(cantidad, precio) {
        Some(amount) => round_money(amount),
        None => {
            tracing::warn!("Item de cotização com valor fora do limite ({} x {}); vale 0", cantidad, precio);
            Decimal::ZERO
        }
    };
    Some(LineItem {
        nombre: text(obj, "nombre").unwrap_or_default(),
        descripcion: text(obj, "descripcion"),
        cantidad,
        precio,
        descuento: number("descuento"),
        subtotal,
        unidad: text(obj, "unidad").unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        notas: text(obj, "notas"),
    })
}

pub fn parse_line_items(raw: &Value) -> Vec<LineItem> {
    normalize_items(raw).iter().filter_map(parse_line_item).collect()
}

/// `cantidad × precio`, ou `None` se estourar o `Decimal`.
pub fn line_amount(cantidad: Decimal, precio: Decimal) -> Option<Decimal> {
    cantidad.checked_mul(precio)
}

/// Subtotal = Σ(cantidad × precio). O desconto de linha é só informativo.
/// `None` quando algum produto ou a soma passa do limite do `Decimal`.
pub fn compute_totals(items: &[LineItem], discount_percent: Decimal) -> Option<Totals> {
    let subtotal = items.iter().try_fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(line_amount(item.cantidad, item.precio)?)
    })?;
    let subtotal = round_money(subtotal);
    let discount_amount = round_money(
        subtotal
            .checked_mul(discount_percent)?
            .checked_div(Decimal::ONE_HUNDRED)?,
    );
    Some(Totals {
        subtotal,
        discount_amount,
        total: subtotal.checked_sub(discount_amount)?,
    })
}

pub fn is_placeholder_number(numero: &str) -> bool {
    let numero = numero.trim();
    numero.is_empty()
        || numero.eq_ignore_ascii_case("N/A")
        || numero.eq_ignore_ascii_case("Sin número")
        || numero.starts_with("COT-TEMP")
        || numero.starts_with("COT-ERROR-")
}

/// Sem espaços, maiúsculo, até 10 caracteres.
fn token(source: Option<&str>, placeholder: &str) -> String {
    let token: String = source
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .take(TOKEN_LEN)
        .collect();
    if token.is_empty() {
        placeholder.to_string()
    } else {
        token
    }
}

/// `COT-001-<AAAAMMDD>-<CLIENTE>-<EVENTO>`. Números já definitivos não mudam.
pub fn generate_quote_number(quote: &Quote, client: Option<&Client>) -> String {
    if !is_placeholder_number(&quote.numero) {
        return quote.numero.clone();
    }
    let Some(created_at) = quote.created_at else {
        tracing::warn!("Cotização {} sem data de criação; número provisório", quote.id);
        return format!("COT-ERROR-{}", to_iso(Utc::now()));
    };
    let day = created_at.with_timezone(&Local).format("%Y%m%d");
    let client_token = token(client.map(|c| c.nombre.as_str()), CLIENT_PLACEHOLDER);
    let event_token = token(Some(quote.titulo.as_str()), EVENT_PLACEHOLDER);
    format!("COT-001-{}-{}-{}", day, client_token, event_token)
}

/// Preenche a data final quando ela falta: início + duração, ou o próprio início.
pub fn calculate_end_date_if_missing(quote: &mut Quote) {
    if quote.fecha_evento_fin.is_some() {
        return;
    }
    quote.fecha_evento_fin = match quote.fecha_evento {
        Some(start) if quote.dias_evento > 1 => end_date(start, quote.dias_evento).or_else(|| {
            tracing::warn!("Cotização {}: {} dias de evento fora do calendário", quote.id, quote.dias_evento);
            Some(start)
        }),
        start => start,
    };
}

/// Data de validade: dia (local) da criação + dias de validade. `None` fora do calendário.
pub fn validity_date(created_at: DateTime<Utc>, validity_days: i64) -> Option<NaiveDate> {
    let days = u64::try_from(validity_days.max(0)).ok()?;
    created_at
        .with_timezone(&Local)
        .date_naive()
        .checked_add_days(Days::new(days))
}

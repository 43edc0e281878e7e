// src/common/dates.rs

//! Datas "soltas" vindas do banco e dos formulários.
//!
//! Tudo aqui trabalha em horário local de parede (`NaiveDateTime`), porque é
//! assim que a equipe enxerga as datas do evento. Datas puras (`YYYY-MM-DD`)
//! são ancoradas ao meio-dia para nunca "pularem" de dia com fuso horário.

use chrono::{
    DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const NOT_SPECIFIED: &str = "No especificada";

/// As formas de entrada que aceitamos para uma data.
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Empty,
    Native(NaiveDateTime),
    Text(&'a str),
    Timestamp(DateTime<Utc>),
    EpochSeconds { seconds: i64, nanos: u32 },
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(s: &'a str) -> Self {
        DateInput::Text(s)
    }
}

impl<'a> From<Option<&'a str>> for DateInput<'a> {
    fn from(s: Option<&'a str>) -> Self {
        s.map(DateInput::Text).unwrap_or(DateInput::Empty)
    }
}

impl From<NaiveDateTime> for DateInput<'_> {
    fn from(d: NaiveDateTime) -> Self {
        DateInput::Native(d)
    }
}

impl From<DateTime<Utc>> for DateInput<'_> {
    fn from(d: DateTime<Utc>) -> Self {
        DateInput::Timestamp(d)
    }
}

impl<'a> From<&'a Value> for DateInput<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(s) => DateInput::Text(s.as_str()),
            Value::Object(obj) => {
                // Timestamps exportados: { "seconds": .., "nanoseconds": .. } ou "_seconds"
                let seconds = obj
                    .get("seconds")
                    .or_else(|| obj.get("_seconds"))
                    .and_then(Value::as_i64);
                let nanos = obj
                    .get("nanoseconds")
                    .or_else(|| obj.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                match seconds {
                    Some(seconds) => DateInput::EpochSeconds {
                        seconds,
                        nanos: u32::try_from(nanos).unwrap_or(0),
                    },
                    None => DateInput::Empty,
                }
            }
            _ => DateInput::Empty,
        }
    }
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default())
}

fn utc_to_local(d: DateTime<Utc>) -> NaiveDateTime {
    d.with_timezone(&Local).naive_local()
}

/// Converte qualquer entrada aceita numa data local. Nunca falha: entradas
/// inválidas viram `None`.
pub fn parse_date<'a>(input: impl Into<DateInput<'a>>) -> Option<NaiveDateTime> {
    match input.into() {
        DateInput::Empty => None,
        DateInput::Native(d) => Some(d),
        DateInput::Timestamp(d) => Some(utc_to_local(d)),
        DateInput::EpochSeconds { seconds, nanos } => {
            DateTime::from_timestamp(seconds, nanos).map(utc_to_local)
        }
        DateInput::Text(raw) => parse_text(raw),
    }
}

fn parse_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(noon(date));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(noon(date));
    }
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(utc_to_local(d.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(d) = NaiveDateTime::parse_from_str(s, format) {
            return Some(d);
        }
    }
    tracing::warn!("Data inválida ignorada: {:?}", raw);
    None
}

/// Igual a `parse_date`, mas devolvendo só o dia.
pub fn parse_day<'a>(input: impl Into<DateInput<'a>>) -> Option<NaiveDate> {
    parse_date(input).map(|d| d.date())
}

/// Converte um horário local de parede em UTC. Em horários ambíguos (troca de
/// horário de verão) fica com o mais cedo.
pub fn local_to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
}

/// `DD/MM/YYYY`, ou "No especificada".
pub fn format_display(date: Option<NaiveDateTime>) -> String {
    match date {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => NOT_SPECIFIED.to_string(),
    }
}

/// `YYYY-MM-DD` para campos `<input type="date">`, ou string vazia.
pub fn format_for_input(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Contagem inclusiva de dias (início e fim contam). Mínimo 1; entrada
/// ausente dá 0.
pub fn duration_in_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => ((end - start).num_days() + 1).max(1),
        _ => 0,
    }
}

/// Último dia de um evento de `duration_days` dias. `None` fora do calendário.
pub fn end_date(start: NaiveDate, duration_days: i64) -> Option<NaiveDate> {
    let extra = u64::try_from(duration_days.max(1) - 1).ok()?;
    start.checked_add_days(Days::new(extra))
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> bool {
    end >= start
}

/// Instante exato quando a entrada carrega fuso (RFC 3339, epoch); senão
/// interpreta como horário local.
pub fn parse_timestamp<'a>(input: impl Into<DateInput<'a>>) -> Option<DateTime<Utc>> {
    match input.into() {
        DateInput::Timestamp(d) => Some(d),
        DateInput::EpochSeconds { seconds, nanos } => DateTime::from_timestamp(seconds, nanos),
        DateInput::Text(raw) => match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(d) => Some(d.with_timezone(&Utc)),
            Err(_) => parse_text(raw).and_then(local_to_utc),
        },
        other => parse_date(other).and_then(local_to_utc),
    }
}

/// Timestamp gravado como string ISO (padrão atual, em UTC, milissegundos).
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Para `#[serde(deserialize_with = ...)]` em timestamps de documentos antigos,
/// que podem vir como string, `{ seconds }` ou nulos.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_timestamp(&value))
}

/// Mesma ideia para datas puras (`YYYY-MM-DD`, `DD/MM/YYYY`...).
pub fn lenient_day<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_day(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_date_is_anchored_at_local_noon() {
        let parsed = parse_date("2024-01-15").unwrap();
        assert_eq!((parsed.year(), parsed.month0(), parsed.day()), (2024, 0, 15));
        assert_eq!(parsed.hour(), 12);
    }

    #[test]
    fn accepts_the_other_supported_shapes() {
        assert_eq!(parse_day("15/01/2024"), Some(day(2024, 1, 15)));
        assert_eq!(
            parse_date("2024-01-15T09:30").map(|d| (d.hour(), d.minute())),
            Some((9, 30))
        );
        let native = noon(day(2023, 5, 1));
        assert_eq!(parse_date(native), Some(native));

        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap();
        let from_object = parse_date(&json!({ "seconds": ts.timestamp(), "nanoseconds": 0 }));
        assert_eq!(from_object, Some(ts.with_timezone(&Local).naive_local()));
        assert_eq!(parse_date(ts), from_object);
        assert_eq!(parse_date(&json!({ "_seconds": ts.timestamp() })), from_object);
    }

    #[test]
    fn garbage_and_empty_input_yield_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("mañana"), None);
        assert_eq!(parse_date(None::<&str>), None);
        assert_eq!(parse_date(&json!(null)), None);
        assert_eq!(parse_date(&json!({ "foo": 1 })), None);
        assert_eq!(parse_date(&json!(42)), None);
    }

    #[test]
    fn timestamps_keep_the_exact_instant() {
        let ts = Utc.with_ymd_and_hms(2024, 10, 27, 1, 30, 0).unwrap();
        assert_eq!(parse_timestamp(to_iso(ts).as_str()), Some(ts));
        assert_eq!(parse_timestamp(&json!({ "seconds": ts.timestamp() })), Some(ts));
        let day_only = parse_timestamp("2024-03-05").unwrap();
        assert_eq!(day_only.with_timezone(&Local).date_naive(), day(2024, 3, 5));
    }

    #[test]
    fn formatting() {
        let d = parse_date("2024-03-05");
        assert_eq!(format_display(d), "05/03/2024");
        assert_eq!(format_for_input(d), "2024-03-05");
        assert_eq!(format_display(None), NOT_SPECIFIED);
        assert_eq!(format_for_input(None), "");
    }

    #[test]
    fn duration_is_inclusive_and_round_trips_with_end_date() {
        let start = day(2024, 2, 27);
        for offset in 0..40 {
            let end = start + Days::new(offset as u64);
            assert!(validate_range(start, end));
            let days = duration_in_days(Some(start), Some(end));
            assert_eq!(days, offset + 1);
            assert_eq!(end_date(start, days), Some(end));
        }
    }

    #[test]
    fn duration_edge_cases() {
        assert_eq!(duration_in_days(None, Some(day(2024, 1, 1))), 0);
        assert_eq!(duration_in_days(Some(day(2024, 1, 5)), Some(day(2024, 1, 1))), 1);
        assert_eq!(end_date(day(2024, 1, 5), 0), Some(day(2024, 1, 5)));
        assert_eq!(end_date(day(2024, 1, 5), 100_000_000), None);
        assert_eq!(end_date(day(2024, 1, 5), i64::MAX), None);
        assert!(!validate_range(day(2024, 1, 5), day(2024, 1, 4)));
    }
}

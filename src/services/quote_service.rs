// src/services/quote_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        cache::{QueryCache, QueryShape},
        dates::{duration_in_days, parse_day, validate_range},
        error::AppError,
        validation::{clean_optional, ValidationReport},
    },
    db::{quote_document::editable_fields, Collection, DocumentStore, Query, QuoteRepository, Repository},
    models::{
        client::Client,
        quote::{
            LineItem, Quote, QuoteFilters, QuotePatch, QuotePayload, QuoteStats, QuoteStatus, DEFAULT_VALIDITY_DAYS,
            MAX_EVENT_DAYS, MAX_VALIDITY_DAYS,
        },
        settings::VALIDITY_DAYS_KEY,
    },
    services::{
        normalization::{
            calculate_end_date_if_missing, compute_totals, generate_quote_number, is_placeholder_number,
            parse_line_items, validity_date, Totals,
        },
        settings_service::SettingsService,
    },
};

pub(crate) const ENTITY: &str = Collection::Quotes.name();

#[derive(Clone)]
pub struct QuoteService {
    quotes: QuoteRepository,
    clients: Repository<Client>,
    settings: SettingsService,
    cache: QueryCache,
}

// Campos que o formulário controla; o resto (estado, histórico, lembrete)
// pertence ao acompanhamento.
struct EditableFields {
    cliente_id: String,
    client: Client,
    fecha_evento: NaiveDate,
    fecha_evento_fin: Option<NaiveDate>,
    dias_evento: i64,
    items: Vec<LineItem>,
    totals: Totals,
}

fn percent_ok(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED
}

// Documentos antigos podem trazer totais absurdos; esses ficam fora da soma.
fn add_amount(acc: Decimal, quote: &Quote) -> Decimal {
    acc.checked_add(quote.total).unwrap_or_else(|| {
        tracing::warn!("Total da cotização {} estoura a soma das estatísticas; ignorado", quote.id);
        acc
    })
}

impl QuoteService {
    pub fn new(store: Arc<dyn DocumentStore>, settings: SettingsService, cache: QueryCache) -> Self {
        Self {
            quotes: QuoteRepository::new(store.clone()),
            clients: Repository::new(store),
            settings,
            cache,
        }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> Result<Quote, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::Detail, id);
        self.cache
            .get_or_load(key, QueryShape::Detail, || async {
                self.quotes
                    .find(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Cotización", id))
            })
            .await
    }

    /// Lista ordenada da mais nova para a mais antiga.
    pub async fn get_all(&self, filters: &QuoteFilters) -> Result<Vec<Quote>, AppError> {
        let mut report = ValidationReport::new();
        let estado = match filters.estado.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match raw.parse::<QuoteStatus>() {
                Ok(estado) => Some(estado),
                Err(e) => {
                    report.push(format!("estado: {}", e));
                    None
                }
            },
            None => None,
        };
        let mut day = |field: &str, raw: &Option<String>| {
            let raw = raw.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
            let parsed = parse_day(raw);
            if parsed.is_none() {
                report.push(format!("{}: fecha inválida '{}'", field, raw));
            }
            parsed
        };
        let desde = day("desde", &filters.desde);
        let hasta = day("hasta", &filters.hasta);
        report.finish()?;

        let key = QueryCache::key(ENTITY, QueryShape::List, &serde_json::to_string(filters)?);
        self.cache
            .get_or_load(key, QueryShape::List, || async {
                let query = match estado {
                    Some(estado) => Query::new().eq("estado", estado.as_str()),
                    None => Query::new(),
                };
                // cliente e datas filtram depois da normalização (grafias antigas)
                let mut quotes: Vec<Quote> = self
                    .quotes
                    .list(&query)
                    .await?
                    .into_iter()
                    .filter(|q| {
                        filters
                            .cliente_id
                            .as_deref()
                            .is_none_or(|c| q.cliente_id.as_deref() == Some(c))
                    })
                    .filter(|q| match (desde, hasta) {
                        (None, None) => true,
                        _ => q.fecha_evento.is_some_and(|f| {
                            desde.is_none_or(|d| f >= d) && hasta.is_none_or(|h| f <= h)
                        }),
                    })
                    .collect();
                quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok(quotes)
            })
            .await
    }

    pub async fn stats(&self) -> Result<QuoteStats, AppError> {
        let key = QueryCache::key(ENTITY, QueryShape::Stats, "all");
        self.cache
            .get_or_load(key, QueryShape::Stats, || async {
                let quotes = self.quotes.list(&Query::new()).await?;
                let mut stats = QuoteStats {
                    total_cotizaciones: quotes.len(),
                    por_estado: QuoteStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect(),
                    ..Default::default()
                };
                for quote in &quotes {
                    *stats.por_estado.entry(quote.estado.as_str().to_string()).or_default() += 1;
                    stats.monto_total = add_amount(stats.monto_total, quote);
                    if matches!(quote.estado, QuoteStatus::Approved | QuoteStatus::Converted) {
                        stats.monto_aprobado = add_amount(stats.monto_aprobado, quote);
                    }
                    if quote.recordatorio.is_some() {
                        stats.recordatorios_pendientes += 1;
                    }
                }
                Ok(stats)
            })
            .await
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    // Validação completa do formulário, com todas as violações juntas.
    async fn validate(&self, payload: &QuotePayload) -> Result<EditableFields, AppError> {
        let mut report = ValidationReport::new();
        report.merge(payload.validate());
        report.check(payload.fecha_evento.is_some(), "fecha_evento: la fecha del evento es obligatoria");
        if let (Some(start), Some(end)) = (payload.fecha_evento, payload.fecha_evento_fin) {
            report.check(
                validate_range(start, end),
                "fecha_evento_fin: la fecha final no puede ser anterior a la fecha del evento",
            );
        }
        report
            .check(percent_ok(payload.descuento), "descuento: debe estar entre 0 y 100")
            .check(
                payload.dias_evento.is_none_or(|d| (1..=MAX_EVENT_DAYS).contains(&d)),
                format!("dias_evento: debe estar entre 1 y {}", MAX_EVENT_DAYS),
            )
            .check(
                payload.validez_dias.is_none_or(|d| (1..=MAX_VALIDITY_DAYS).contains(&d)),
                format!("validez_dias: debe estar entre 1 y {}", MAX_VALIDITY_DAYS),
            );

        let items = parse_line_items(&payload.items);
        let totals = compute_totals(&items, payload.descuento);
        report.check(totals.is_some(), "items: los importes exceden el máximo permitido");

        let cliente_id = payload.cliente_id.trim().to_string();
        let client = if cliente_id.is_empty() {
            None
        } else {
            let client = self.clients.find(&cliente_id).await?;
            report.check(
                client.is_some(),
                format!("cliente_id: el cliente '{}' no existe", cliente_id),
            );
            client
        };
        report.finish()?;

        // Depois do finish() ambos existem; o `ok_or_else` só cobre o impossível
        let fecha_evento = payload
            .fecha_evento
            .ok_or_else(|| AppError::validation("fecha_evento: la fecha del evento es obligatoria"))?;
        let client = client.ok_or_else(|| AppError::not_found("Cliente", &cliente_id))?;
        let totals = totals.ok_or_else(|| AppError::validation("items: los importes exceden el máximo permitido"))?;

        let dias_evento = match payload.fecha_evento_fin {
            Some(end) => duration_in_days(Some(fecha_evento), Some(end)),
            None => payload.dias_evento.unwrap_or(1),
        };
        Ok(EditableFields {
            cliente_id,
            client,
            fecha_evento,
            fecha_evento_fin: payload.fecha_evento_fin,
            dias_evento,
            items,
            totals,
        })
    }

    // Aplica o formulário validado sobre `quote`, recalculando o derivado.
    fn apply(&self, quote: &mut Quote, payload: QuotePayload, fields: EditableFields, validez_dias: i64) {
        let totals = fields.totals;

        quote.cliente_id = Some(fields.cliente_id);
        quote.lugar_id = clean_optional(payload.lugar_id);
        quote.titulo = payload.titulo.trim().to_string();
        quote.descripcion = clean_optional(payload.descripcion);
        quote.fecha_evento = Some(fields.fecha_evento);
        quote.fecha_evento_fin = fields.fecha_evento_fin;
        quote.dias_evento = fields.dias_evento;
        quote.requiere_montaje = payload.requiere_montaje;
        quote.descuento = payload.descuento;
        quote.observaciones = clean_optional(payload.observaciones);
        quote.condiciones = clean_optional(payload.condiciones);
        quote.items = fields.items;
        quote.subtotal = totals.subtotal;
        quote.total = totals.total;
        quote.validez_dias = validez_dias;
        calculate_end_date_if_missing(quote);

        let reference = quote.created_at.unwrap_or_else(Utc::now);
        quote.fecha_validez = validity_date(reference, validez_dias);
        quote.numero = generate_quote_number(quote, Some(&fields.client));
    }

    // Mesmo limite do formulário; valor fora dele cai no padrão.
    async fn configured_validity_days(&self) -> i64 {
        let days = self.settings.get_i64(VALIDITY_DAYS_KEY, DEFAULT_VALIDITY_DAYS).await;
        if (1..=MAX_VALIDITY_DAYS).contains(&days) {
            return days;
        }
        tracing::warn!(
            "Configuração '{}' = {} fora de 1..={}; usando {}",
            VALIDITY_DAYS_KEY,
            days,
            MAX_VALIDITY_DAYS,
            DEFAULT_VALIDITY_DAYS
        );
        DEFAULT_VALIDITY_DAYS
    }

    pub async fn create(&self, payload: QuotePayload) -> Result<Quote, AppError> {
        let fields = self.validate(&payload).await?;
        let validez_dias = match payload.validez_dias {
            Some(days) => days,
            None => self.configured_validity_days().await,
        };

        let now = Utc::now();
        let mut quote = Quote::draft(Uuid::new_v4().to_string());
        quote.created_at = Some(now);
        quote.updated_at = Some(now);
        self.apply(&mut quote, payload, fields, validez_dias);

        let created = self.quotes.create(&quote).await?;
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Cotização criada: {} ({})", created.numero, created.id);
        Ok(created)
    }

    /// Recalcula totais, duração e validade. O número, uma vez definitivo, fica.
    pub async fn update(&self, id: &str, patch: QuotePatch) -> Result<Quote, AppError> {
        let mut quote = self
            .quotes
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Cotización", id))?;
        let payload = patch.apply(&quote)?;
        let fields = self.validate(&payload).await?;
        let validez_dias = payload.validez_dias.unwrap_or(quote.validez_dias);

        let numero_definitivo = !is_placeholder_number(&quote.numero);
        let numero = quote.numero.clone();
        self.apply(&mut quote, payload, fields, validez_dias);
        if numero_definitivo {
            quote.numero = numero;
        }
        quote.updated_at = Some(Utc::now());

        if !self.quotes.update_fields(id, editable_fields(&quote)?).await? {
            return Err(AppError::not_found("Cotización", id));
        }
        self.cache.invalidate_entity(ENTITY).await;
        tracing::info!("Cotização atualizada: {} ({})", quote.numero, quote.id);
        self.quotes
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Cotización", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::cache::CacheTtls,
        db::MemoryDocumentStore,
        models::{client::ClientPayload, settings::ConfigPayload},
        services::client_service::ClientService,
    };
    use serde_json::json;

    struct Fixture {
        quotes: QuoteService,
        settings: SettingsService,
        client_id: String,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let cache = QueryCache::new(CacheTtls::default());
        let settings = SettingsService::new(store.clone(), cache.clone());
        let clients = ClientService::new(store.clone(), cache.clone());
        let client = clients
            .create(ClientPayload {
                nombre: "Acme Corp".into(),
                empresa: None,
                email: "compras@acme.mx".into(),
                telefono: None,
                direccion: None,
                notas: None,
            })
            .await
            .unwrap();
        Fixture {
            quotes: QuoteService::new(store, settings.clone(), cache),
            settings,
            client_id: client.id,
        }
    }

    fn payload(client_id: &str) -> QuotePayload {
        QuotePayload {
            cliente_id: client_id.into(),
            titulo: "Gala Anual".into(),
            fecha_evento: NaiveDate::from_ymd_opt(2024, 5, 10),
            descuento: Decimal::TEN,
            items: json!([{"nombre": "Pantalla", "cantidad": 2, "precio": 100}, {"nombre": "Bocina", "cantidad": 1, "precio": 50}]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_computes_totals_number_and_validity() {
        let f = fixture().await;
        let quote = f.quotes.create(payload(&f.client_id)).await.unwrap();

        assert_eq!(quote.estado, QuoteStatus::Draft);
        assert_eq!(quote.subtotal, Decimal::from(250));
        assert_eq!(quote.total, Decimal::from(225));
        assert_eq!(quote.items[0].subtotal, Decimal::from(200));
        assert_eq!(quote.dias_evento, 1);
        assert_eq!(quote.fecha_evento_fin, quote.fecha_evento);
        assert_eq!(quote.validez_dias, DEFAULT_VALIDITY_DAYS);
        assert!(quote.numero.starts_with("COT-001-"));
        assert!(quote.numero.ends_with("-ACMECORP-GALAANUAL"));

        let stored = f.quotes.get_by_id(&quote.id).await.unwrap();
        assert_eq!(stored, quote);
    }

    #[tokio::test]
    async fn validity_days_come_from_configuration() {
        let f = fixture().await;
        f.settings
            .create(ConfigPayload { clave: VALIDITY_DAYS_KEY.into(), valor: json!(30), descripcion: None })
            .await
            .unwrap();
        let quote = f.quotes.create(payload(&f.client_id)).await.unwrap();
        assert_eq!(quote.validez_dias, 30);
        let created = quote.created_at.unwrap();
        assert_eq!(quote.fecha_validez, validity_date(created, 30));
    }

    #[tokio::test]
    async fn out_of_range_configured_validity_falls_back_to_default() {
        for valor in [json!(0), json!(-5), json!(100_000_000)] {
            let f = fixture().await;
            f.settings
                .create(ConfigPayload { clave: VALIDITY_DAYS_KEY.into(), valor, descripcion: None })
                .await
                .unwrap();
            let quote = f.quotes.create(payload(&f.client_id)).await.unwrap();
            assert_eq!(quote.validez_dias, DEFAULT_VALIDITY_DAYS);
            assert_eq!(quote.fecha_validez, validity_date(quote.created_at.unwrap(), DEFAULT_VALIDITY_DAYS));
        }
    }

    #[tokio::test]
    async fn day_counts_beyond_the_limits_are_rejected() {
        let f = fixture().await;
        let mut bad = payload(&f.client_id);
        bad.dias_evento = Some(100_000_000);
        bad.validez_dias = Some(100_000_000);
        match f.quotes.create(bad).await {
            Err(AppError::Validation(list)) => {
                assert_eq!(list.len(), 2, "{:?}", list);
                assert!(list.iter().any(|m| m.starts_with("dias_evento:")));
                assert!(list.iter().any(|m| m.starts_with("validez_dias:")));
            }
            other => panic!("inesperado: {:?}", other),
        }

        let mut edge = payload(&f.client_id);
        edge.dias_evento = Some(MAX_EVENT_DAYS);
        edge.validez_dias = Some(MAX_VALIDITY_DAYS);
        let quote = f.quotes.create(edge).await.unwrap();
        assert_eq!(quote.dias_evento, MAX_EVENT_DAYS);
        assert!(quote.fecha_evento_fin > quote.fecha_evento);
        assert!(quote.fecha_validez.is_some());
    }

    #[tokio::test]
    async fn overflowing_amounts_are_a_validation_error() {
        let f = fixture().await;
        let mut huge = payload(&f.client_id);
        huge.items = json!([{"cantidad": "1000000000000000", "precio": "1000000000000000"}]);
        match f.quotes.create(huge).await {
            Err(AppError::Validation(list)) => assert_eq!(list, ["items: los importes exceden el máximo permitido"]),
            other => panic!("inesperado: {:?}", other),
        }

        let quote = f.quotes.create(payload(&f.client_id)).await.unwrap();
        let patch = QuotePatch {
            items: Some(json!({"0": {"cantidad": "1e15", "precio": "1e15"}})),
            ..Default::default()
        };
        assert!(matches!(f.quotes.update(&quote.id, patch).await, Err(AppError::Validation(_))));
        assert_eq!(f.quotes.get_by_id(&quote.id).await.unwrap(), quote);
    }

    #[tokio::test]
    async fn every_violation_is_reported() {
        let f = fixture().await;
        let bad = QuotePayload {
            cliente_id: "nao-existe".into(),
            titulo: "x".into(),
            fecha_evento: NaiveDate::from_ymd_opt(2024, 5, 10),
            fecha_evento_fin: NaiveDate::from_ymd_opt(2024, 5, 9),
            descuento: Decimal::from(120),
            ..Default::default()
        };
        match f.quotes.create(bad).await {
            Err(AppError::Validation(list)) => {
                assert_eq!(list.len(), 4, "{:?}", list);
                assert!(list.iter().any(|m| m.starts_with("titulo:")));
                assert!(list.iter().any(|m| m.starts_with("fecha_evento_fin:")));
                assert!(list.iter().any(|m| m.starts_with("descuento:")));
                assert!(list.iter().any(|m| m.starts_with("cliente_id:")));
            }
            other => panic!("inesperado: {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_keeps_definitive_number_and_recomputes() {
        let f = fixture().await;
        let quote = f.quotes.create(payload(&f.client_id)).await.unwrap();

        let patch = QuotePatch {
            titulo: Some("Otro Evento".into()),
            fecha_evento_fin: NaiveDate::from_ymd_opt(2024, 5, 12),
            items: Some(json!({"0": {"cantidad": 3, "precio": 10}})),
            ..Default::default()
        };
        let updated = f.quotes.update(&quote.id, patch).await.unwrap();
        assert_eq!(updated.numero, quote.numero);
        assert_eq!(updated.subtotal, Decimal::from(30));
        assert_eq!(updated.total, Decimal::from(27));
        assert_eq!(updated.dias_evento, 3);
        assert_eq!(updated.estado, QuoteStatus::Draft);

        // o cache de detalhe foi invalidado
        assert_eq!(f.quotes.get_by_id(&quote.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn listing_filters_and_stats() {
        let f = fixture().await;
        let first = f.quotes.create(payload(&f.client_id)).await.unwrap();
        // created_at é gravado com milissegundos
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut later = payload(&f.client_id);
        later.fecha_evento = NaiveDate::from_ymd_opt(2024, 8, 1);
        let second = f.quotes.create(later).await.unwrap();

        let all = f.quotes.get_all(&QuoteFilters::default()).await.unwrap();
        assert_eq!(all.iter().map(|q| q.id.as_str()).collect::<Vec<_>>(), [second.id.as_str(), first.id.as_str()]);

        let june_on = QuoteFilters { desde: Some("2024-06-01".into()), ..Default::default() };
        assert_eq!(f.quotes.get_all(&june_on).await.unwrap().len(), 1);

        let sent = QuoteFilters { estado: Some("enviada".into()), ..Default::default() };
        assert!(f.quotes.get_all(&sent).await.unwrap().is_empty());

        let bad = QuoteFilters { estado: Some("cancelada".into()), hasta: Some("ayer".into()), ..Default::default() };
        assert!(matches!(f.quotes.get_all(&bad).await, Err(AppError::Validation(list)) if list.len() == 2));

        let stats = f.quotes.stats().await.unwrap();
        assert_eq!(stats.total_cotizaciones, 2);
        assert_eq!(stats.por_estado["borrador"], 2);
        assert_eq!(stats.por_estado["aprobada"], 0);
        assert_eq!(stats.monto_total, Decimal::from(450));
        assert_eq!(stats.monto_aprobado, Decimal::ZERO);
    }
}

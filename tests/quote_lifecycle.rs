// tests/quote_lifecycle.rs

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use cotizaciones::{
    common::{
        cache::{CacheTtls, QueryCache},
        error::AppError,
    },
    db::{Collection, DocumentStore, MemoryDocumentStore, QuoteRepository},
    models::{
        client::ClientPayload,
        quote::{Quote, QuotePatch, QuotePayload, QuoteStatus},
    },
    services::{LogMailer, TrackingService},
    AppConfig, AppState,
};

fn tracking(store: &Arc<dyn DocumentStore>) -> TrackingService {
    TrackingService::new(store.clone(), QueryCache::new(CacheTtls::default()))
}

#[tokio::test]
async fn every_transition_pair_follows_the_table() {
    let now = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

    for from in QuoteStatus::ALL {
        for to in QuoteStatus::ALL {
            let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
            let mut quote = Quote::draft("q");
            quote.estado = from;
            QuoteRepository::new(store.clone()).create(&quote).await.unwrap();
            let before = store.get(Collection::Quotes, "q").await.unwrap();

            let result = tracking(&store)
                .update_status_at("q", to, Some("ok".into()), Some("Ana".into()), now)
                .await;

            if from.can_transition_to(to) {
                let updated = result.unwrap_or_else(|e| panic!("{} -> {}: {:?}", from, to, e));
                assert_eq!(updated.estado, to);
                assert_eq!(updated.historial_estados.len(), 1);
                let entry = &updated.historial_estados[0];
                assert_eq!((entry.estado_anterior, entry.estado_nuevo), (from, to));
                assert_eq!(entry.fecha, now);
                assert_eq!(entry.usuario.as_deref(), Some("Ana"));
                assert!(!entry.automatico);
            } else {
                match result {
                    Err(AppError::InvalidTransition { from: f, to: t }) => assert_eq!((f, t), (from, to)),
                    other => panic!("{} -> {} deveria falhar, veio {:?}", from, to, other),
                }
                // Falha não escreve nada
                let after = store.get(Collection::Quotes, "q").await.unwrap();
                assert_eq!(before, after, "{} -> {}", from, to);
            }
        }
    }
}

#[test]
fn converted_is_terminal() {
    assert!(QuoteStatus::Converted.is_terminal());
    assert!(QuoteStatus::ALL
        .iter()
        .filter(|s| **s != QuoteStatus::Converted)
        .all(|s| !s.is_terminal()));
}

#[tokio::test]
async fn milestones_are_stamped_on_entry() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    QuoteRepository::new(store.clone()).create(&Quote::draft("q")).await.unwrap();
    let tracking = tracking(&store);

    let sent_at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    let reviewed_at = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
    let approved_at = Utc.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).unwrap();

    tracking.update_status_at("q", QuoteStatus::Sent, None, None, sent_at).await.unwrap();
    tracking.update_status_at("q", QuoteStatus::Reviewed, None, None, reviewed_at).await.unwrap();
    let quote = tracking
        .update_status_at("q", QuoteStatus::Approved, Some("  ".into()), None, approved_at)
        .await
        .unwrap();

    assert_eq!(quote.fecha_envio, Some(sent_at));
    assert_eq!(quote.fecha_revision, Some(reviewed_at));
    assert_eq!(quote.fecha_aprobacion, Some(approved_at));
    let path: Vec<_> = quote.historial_estados.iter().map(|h| h.estado_nuevo).collect();
    assert_eq!(path, vec![QuoteStatus::Sent, QuoteStatus::Reviewed, QuoteStatus::Approved]);
    // Comentário em branco não é gravado
    assert_eq!(quote.historial_estados[2].comentario, None);

    // Convertida é terminal; a recusa não toca no histórico
    tracking.update_status("q", QuoteStatus::Converted, None, None).await.unwrap();
    assert!(matches!(
        tracking.update_status("q", QuoteStatus::Draft, None, None).await,
        Err(AppError::InvalidTransition { .. })
    ));
    let quote = QuoteRepository::new(store).find("q").await.unwrap().unwrap();
    assert_eq!(quote.historial_estados.len(), 4);
    assert_eq!(quote.fecha_aprobacion, Some(approved_at));
}

#[tokio::test]
async fn full_lifecycle_through_the_services() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let state = AppState::from_parts(AppConfig::default(), store, Arc::new(LogMailer));

    let client = state
        .client_service
        .create(ClientPayload {
            nombre: "Acme Corp".into(),
            empresa: Some("Acme".into()),
            email: "compras@acme.mx".into(),
            telefono: None,
            direccion: None,
            notas: None,
        })
        .await
        .unwrap();

    let quote = state
        .quote_service
        .create(QuotePayload {
            cliente_id: client.id.clone(),
            titulo: "Gala Anual".into(),
            fecha_evento: NaiveDate::from_ymd_opt(2024, 5, 10),
            dias_evento: Some(3),
            descuento: Decimal::from(10),
            items: json!([
                {"nombre": "Pantalla LED", "cantidad": 2, "precio": 100},
                {"nombre": "Audio", "cantidad": "1", "precio": "50"}
            ]),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(quote.estado, QuoteStatus::Draft);
    assert_eq!(quote.subtotal, Decimal::from(250));
    assert_eq!(quote.total, Decimal::from(225));
    assert_eq!(quote.fecha_evento_fin, NaiveDate::from_ymd_opt(2024, 5, 12));
    assert_eq!(quote.validez_dias, 15);
    assert!(quote.numero.starts_with("COT-"), "{}", quote.numero);
    assert!(quote.numero.ends_with("-ACMECORP-GALAANUAL"), "{}", quote.numero);

    // Edição não mexe no estado nem no número
    let numero = quote.numero.clone();
    let edited = state
        .quote_service
        .update(
            &quote.id,
            QuotePatch {
                titulo: Some("Gala de Primavera".into()),
                descuento: Some(Decimal::ZERO),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.numero, numero);
    assert_eq!(edited.total, Decimal::from(250));

    for status in [QuoteStatus::Sent, QuoteStatus::Reviewed, QuoteStatus::Approved] {
        state
            .tracking_service
            .update_status(&quote.id, status, None, Some("Ana".into()))
            .await
            .unwrap();
    }

    // A edição depois das transições preserva o histórico
    let edited = state
        .quote_service
        .update(
            &quote.id,
            QuotePatch {
                observaciones: Some("Montaje el día anterior".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.estado, QuoteStatus::Approved);
    assert_eq!(edited.historial_estados.len(), 3);
    assert!(edited.fecha_aprobacion.is_some());

    let stats = state.quote_service.stats().await.unwrap();
    assert_eq!(stats.total_cotizaciones, 1);
    assert_eq!(stats.por_estado["aprobada"], 1);
    assert_eq!(stats.por_estado["borrador"], 0);
    assert_eq!(stats.monto_aprobado, Decimal::from(250));
}

// tests/http_api.rs

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cotizaciones::{
    db::{DocumentStore, MemoryDocumentStore},
    handlers,
    services::LogMailer,
    AppConfig, AppState,
};

fn app() -> Router {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    handlers::router(AppState::from_parts(AppConfig::default(), store, Arc::new(LogMailer)))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>, user: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-name", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn seed_quote(app: &Router) -> String {
    let (status, client) = call(
        app,
        "POST",
        "/api/clients",
        Some(json!({"nombre": "Acme Corp", "email": "compras@acme.mx"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", client);

    let (status, quote) = call(
        app,
        "POST",
        "/api/quotes",
        Some(json!({
            "cliente_id": client["id"],
            "titulo": "Gala Anual",
            "fecha_evento": "2024-05-10",
            "descuento": 10,
            "items": {"1": {"nombre": "Audio", "cantidad": 1, "precio": 50}, "0": {"nombre": "LED", "cantidad": 2, "precio": 100}}
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", quote);
    assert_eq!(quote["items"][0]["nombre"], "LED");
    assert_eq!(quote["total"], json!(225.0));
    quote["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, doc) = call(&app, "GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/quotes/{id}"].is_object());
}

#[tokio::test]
async fn validation_errors_come_back_as_a_list() {
    let app = app();
    let (status, body) = call(
        &app,
        "POST",
        "/api/quotes",
        Some(json!({"cliente_id": "", "titulo": "x", "descuento": 150})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_array().unwrap();
    // cliente_id, titulo, fecha_evento e descuento
    assert_eq!(details.len(), 4, "{}", body);
}

#[tokio::test]
async fn status_changes_record_the_acting_user() {
    let app = app();
    let id = seed_quote(&app).await;

    let uri = format!("/api/quotes/{}/tracking/update-status", id);
    let (status, quote) = call(
        &app,
        "POST",
        &uri,
        Some(json!({"estado": "enviada", "comentario": "Por correo"})),
        Some("Ana López"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", quote);
    assert_eq!(quote["estado"], "enviada");
    assert_eq!(quote["historial_estados"][0]["usuario"], "Ana López");
    assert!(quote["fecha_envio"].is_string());

    let (status, body) = call(&app, "POST", &uri, Some(json!({"estado": "convertida"})), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("enviada -> convertida"));

    let (status, _) = call(&app, "POST", &uri, Some(json!({"estado": "archivada"})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/quotes/nada/tracking/update-status",
        Some(json!({"estado": "enviada"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reminders_can_be_scheduled_run_and_removed() {
    let app = app();
    let id = seed_quote(&app).await;

    let (status, quote) = call(
        &app,
        "POST",
        &format!("/api/quotes/{}/tracking/schedule-reminder", id),
        Some(json!({
            "tipo": "seguimiento",
            "fecha": "2020-01-01T09:00:00Z",
            "mensaje": "Confirmar montaje",
            "destinatarios": ["ventas@av.mx"]
        })),
        Some("Ana"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", quote);
    assert_eq!(quote["recordatorio"]["creado_por"], "Ana");

    let (status, stats) = call(&app, "GET", "/api/quotes/stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["recordatorios_pendientes"], 1);

    // Vencido: o ciclo manual envia (LogMailer) e limpa
    let (status, report) = call(&app, "POST", "/api/reminders/run", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report, json!({"skipped": false, "due": 1, "sent": 1, "failed": 0, "cleared": 1}));

    let (_, quote) = call(&app, "GET", &format!("/api/quotes/{}", id), None, None).await;
    assert!(quote["recordatorio"].is_null());

    let (status, quote) = call(
        &app,
        "POST",
        &format!("/api/quotes/{}/tracking/delete-reminder", id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(quote["recordatorio"].is_null());
}

#[tokio::test]
async fn settings_drive_the_default_validity() {
    let app = app();
    let (status, _) = call(
        &app,
        "POST",
        "/api/settings",
        Some(json!({"clave": "dias_validez", "valor": 30})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = seed_quote(&app).await;
    let (_, quote) = call(&app, "GET", &format!("/api/quotes/{}", id), None, None).await;
    assert_eq!(quote["validez_dias"], 30);

    let (status, _) = call(&app, "DELETE", "/api/settings/dias_validez", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, entry) = call(&app, "GET", "/api/settings/dias_validez", None, None).await;
    assert_eq!(entry["activo"], false);

    let (status, _) = call(&app, "GET", "/api/settings/no_existe", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

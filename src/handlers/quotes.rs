// src/handlers/quotes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::quote::{Quote, QuoteFilters, QuotePatch, QuotePayload, QuoteStats},
};

// ---
// Handler: list_quotes
// ---
#[utoipa::path(
    get,
    path = "/api/quotes",
    tag = "Quotes",
    params(QuoteFilters),
    responses(
        (status = 200, description = "Cotizaciones, más recientes primero", body = [Quote]),
        (status = 400, description = "Filtro inválido")
    )
)]
pub async fn list_quotes(
    State(app_state): State<AppState>,
    Query(filters): Query<QuoteFilters>,
) -> Result<impl IntoResponse, AppError> {
    let quotes = app_state.quote_service.get_all(&filters).await?;
    Ok((StatusCode::OK, Json(quotes)))
}

// ---
// Handler: create_quote
// ---
#[utoipa::path(
    post,
    path = "/api/quotes",
    tag = "Quotes",
    request_body = QuotePayload,
    responses(
        (status = 201, description = "Cotización creada en borrador", body = Quote),
        (status = 400, description = "Lista de errores de validación")
    )
)]
pub async fn create_quote(
    State(app_state): State<AppState>,
    Json(payload): Json<QuotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state.quote_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

#[utoipa::path(
    get,
    path = "/api/quotes/stats",
    tag = "Quotes",
    responses(
        (status = 200, description = "Conteo por estado y montos", body = QuoteStats)
    )
)]
pub async fn get_stats(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.quote_service.stats().await?;
    Ok((StatusCode::OK, Json(stats)))
}

#[utoipa::path(
    get,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    params(("id" = String, Path, description = "ID de la cotización")),
    responses(
        (status = 200, description = "Cotización", body = Quote),
        (status = 404, description = "No existe")
    )
)]
pub async fn get_quote(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state.quote_service.get_by_id(&id).await?;
    Ok((StatusCode::OK, Json(quote)))
}

// ---
// Handler: update_quote
// O estado não é editável aqui; use /tracking/update-status.
// ---
#[utoipa::path(
    put,
    path = "/api/quotes/{id}",
    tag = "Quotes",
    request_body = QuotePatch,
    params(("id" = String, Path, description = "ID de la cotización")),
    responses(
        (status = 200, description = "Cotización recalculada", body = Quote),
        (status = 400, description = "Lista de errores de validación"),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_quote(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<QuotePatch>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state.quote_service.update(&id, patch).await?;
    Ok((StatusCode::OK, Json(quote)))
}

// src/handlers/tracking.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::Actor,
    models::quote::{Quote, QuoteStatus, ReminderRequest, UpdateStatusRequest},
    services::TickReport,
};

// ---
// Handler: update_status
// ---
#[utoipa::path(
    post,
    path = "/api/quotes/{id}/tracking/update-status",
    tag = "Tracking",
    request_body = UpdateStatusRequest,
    params(
        ("id" = String, Path, description = "ID de la cotización"),
        ("x-user-name" = Option<String>, Header, description = "Usuario que realiza el cambio")
    ),
    responses(
        (status = 200, description = "Estado actualizado con historial", body = Quote),
        (status = 400, description = "Estado desconocido"),
        (status = 404, description = "No existe"),
        (status = 409, description = "Transición no permitida")
    )
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_status = payload
        .estado
        .parse::<QuoteStatus>()
        .map_err(|e| AppError::validation(format!("estado: {}", e)))?;

    let quote = app_state
        .tracking_service
        .update_status(&id, new_status, payload.comentario, actor)
        .await?;
    Ok((StatusCode::OK, Json(quote)))
}

#[utoipa::path(
    post,
    path = "/api/quotes/{id}/tracking/schedule-reminder",
    tag = "Tracking",
    request_body = ReminderRequest,
    params(
        ("id" = String, Path, description = "ID de la cotización"),
        ("x-user-name" = Option<String>, Header, description = "Usuario que agenda")
    ),
    responses(
        (status = 200, description = "Recordatorio guardado (reemplaza al anterior)", body = Quote),
        (status = 400, description = "Lista de errores de validación"),
        (status = 404, description = "No existe")
    )
)]
pub async fn schedule_reminder(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Actor(actor): Actor,
    Json(payload): Json<ReminderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state
        .tracking_service
        .schedule_reminder(&id, payload, actor)
        .await?;
    Ok((StatusCode::OK, Json(quote)))
}

#[utoipa::path(
    post,
    path = "/api/quotes/{id}/tracking/delete-reminder",
    tag = "Tracking",
    params(("id" = String, Path, description = "ID de la cotización")),
    responses(
        (status = 200, description = "Recordatorio eliminado", body = Quote),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_reminder(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quote = app_state.tracking_service.delete_reminder(&id).await?;
    Ok((StatusCode::OK, Json(quote)))
}

// ---
// Handler: run_reminders
// Executa um ciclo do despachante na hora, sem esperar o poller.
// ---
#[utoipa::path(
    post,
    path = "/api/reminders/run",
    tag = "Tracking",
    responses(
        (status = 200, description = "Resumen del ciclo", body = TickReport)
    )
)]
pub async fn run_reminders(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let report = app_state.reminder_dispatcher.process_reminders().await;
    Ok((StatusCode::OK, Json(report)))
}

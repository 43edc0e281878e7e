// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::client::{Client, ClientFilters, ClientPatch, ClientPayload},
};

#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(ClientFilters),
    responses((status = 200, description = "Clientes por nombre", body = [Client]))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    Query(filters): Query<ClientFilters>,
) -> Result<impl IntoResponse, AppError> {
    let clients = app_state.client_service.get_all(&filters).await?;
    Ok((StatusCode::OK, Json(clients)))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente creado", body = Client),
        (status = 400, description = "Lista de errores de validación")
    )
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.client_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = String, Path, description = "ID del cliente")),
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "No existe")
    )
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.client_service.get_by_id(&id).await?;
    Ok((StatusCode::OK, Json(client)))
}

#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "Clients",
    request_body = ClientPatch,
    params(("id" = String, Path, description = "ID del cliente")),
    responses(
        (status = 200, description = "Cliente actualizado", body = Client),
        (status = 400, description = "Lista de errores de validación"),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ClientPatch>,
) -> Result<impl IntoResponse, AppError> {
    let client = app_state.client_service.update(&id, patch).await?;
    Ok((StatusCode::OK, Json(client)))
}

// Baixa lógica (activo = false)
#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = String, Path, description = "ID del cliente")),
    responses(
        (status = 204, description = "Cliente desactivado"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.client_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}/permanent",
    tag = "Clients",
    params(("id" = String, Path, description = "ID del cliente")),
    responses(
        (status = 204, description = "Cliente eliminado"),
        (status = 400, description = "El cliente tiene cotizaciones"),
        (status = 404, description = "No existe")
    )
)]
pub async fn purge_client(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.client_service.purge(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/settings.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::settings::{ConfigEntry, ConfigFilters, ConfigPatch, ConfigPayload},
};

// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    params(ConfigFilters),
    responses((status = 200, description = "Configuraciones por clave", body = [ConfigEntry]))
)]
pub async fn list_settings(
    State(app_state): State<AppState>,
    Query(filters): Query<ConfigFilters>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.settings_service.get_all(&filters).await?;
    Ok((StatusCode::OK, Json(entries)))
}

// POST /api/settings
#[utoipa::path(
    post,
    path = "/api/settings",
    tag = "Settings",
    request_body = ConfigPayload,
    responses(
        (status = 201, description = "Configuración creada", body = ConfigEntry),
        (status = 400, description = "Lista de errores de validación")
    )
)]
pub async fn create_setting(
    State(app_state): State<AppState>,
    Json(payload): Json<ConfigPayload>,
) -> Result<impl IntoResponse, AppError> {
    let entry = app_state.settings_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/settings/{key}
#[utoipa::path(
    get,
    path = "/api/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Clave de la configuración")),
    responses(
        (status = 200, description = "Configuración", body = ConfigEntry),
        (status = 404, description = "No existe")
    )
)]
pub async fn get_setting(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = app_state.settings_service.get_by_key(&key).await?;
    Ok((StatusCode::OK, Json(entry)))
}

// PUT /api/settings/{key}
#[utoipa::path(
    put,
    path = "/api/settings/{key}",
    tag = "Settings",
    request_body = ConfigPatch,
    params(("key" = String, Path, description = "Clave de la configuración")),
    responses(
        (status = 200, description = "Configuración actualizada", body = ConfigEntry),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_setting(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
    Json(patch): Json<ConfigPatch>,
) -> Result<impl IntoResponse, AppError> {
    let entry = app_state.settings_service.update(&key, patch).await?;
    Ok((StatusCode::OK, Json(entry)))
}

// DELETE /api/settings/{key}
#[utoipa::path(
    delete,
    path = "/api/settings/{key}",
    tag = "Settings",
    params(("key" = String, Path, description = "Clave de la configuración")),
    responses(
        (status = 204, description = "Configuración desactivada"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_setting(
    State(app_state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.settings_service.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

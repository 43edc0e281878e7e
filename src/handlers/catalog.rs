// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::catalog::{
        Category, CategoryFilters, CategoryPatch, CategoryPayload, Item, ItemFilters, ItemPatch, ItemPayload,
    },
};

// ===================================================================
// ITENS
// ===================================================================

#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Catalog",
    params(ItemFilters),
    responses((status = 200, description = "Items del catálogo", body = [Item]))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    Query(filters): Query<ItemFilters>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state.item_service.get_all(&filters).await?;
    Ok((StatusCode::OK, Json(items)))
}

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Catalog",
    request_body = ItemPayload,
    responses(
        (status = 201, description = "Item creado", body = Item),
        (status = 400, description = "Lista de errores de validación")
    )
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    Json(payload): Json<ItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.item_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "Catalog",
    params(("id" = String, Path, description = "ID del item")),
    responses(
        (status = 200, description = "Item", body = Item),
        (status = 404, description = "No existe")
    )
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.item_service.get_by_id(&id).await?;
    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    put,
    path = "/api/items/{id}",
    tag = "Catalog",
    request_body = ItemPatch,
    params(("id" = String, Path, description = "ID del item")),
    responses(
        (status = 200, description = "Item actualizado", body = Item),
        (status = 400, description = "Lista de errores de validación"),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ItemPatch>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.item_service.update(&id, patch).await?;
    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "Catalog",
    params(("id" = String, Path, description = "ID del item")),
    responses(
        (status = 204, description = "Item desactivado"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.item_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ===================================================================
// CATEGORIAS
// ===================================================================

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Catalog",
    params(CategoryFilters),
    responses((status = 200, description = "Categorías por nombre", body = [Category]))
)]
pub async fn list_categories(
    State(app_state): State<AppState>,
    Query(filters): Query<CategoryFilters>,
) -> Result<impl IntoResponse, AppError> {
    let categories = app_state.category_service.get_all(&filters).await?;
    Ok((StatusCode::OK, Json(categories)))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Catalog",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Categoría creada", body = Category),
        (status = 400, description = "Lista de errores de validación")
    )
)]
pub async fn create_category(
    State(app_state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    let category = app_state.category_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    tag = "Catalog",
    params(("id" = String, Path, description = "ID de la categoría")),
    responses(
        (status = 200, description = "Categoría", body = Category),
        (status = 404, description = "No existe")
    )
)]
pub async fn get_category(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let category = app_state.category_service.get_by_id(&id).await?;
    Ok((StatusCode::OK, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    tag = "Catalog",
    request_body = CategoryPatch,
    params(("id" = String, Path, description = "ID de la categoría")),
    responses(
        (status = 200, description = "Categoría actualizada", body = Category),
        (status = 400, description = "Lista de errores de validación"),
        (status = 404, description = "No existe")
    )
)]
pub async fn update_category(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> Result<impl IntoResponse, AppError> {
    let category = app_state.category_service.update(&id, patch).await?;
    Ok((StatusCode::OK, Json(category)))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Catalog",
    params(("id" = String, Path, description = "ID de la categoría")),
    responses(
        (status = 204, description = "Categoría desactivada"),
        (status = 404, description = "No existe")
    )
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.category_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}/permanent",
    tag = "Catalog",
    params(("id" = String, Path, description = "ID de la categoría")),
    responses(
        (status = 204, description = "Categoría eliminada"),
        (status = 400, description = "La categoría tiene items"),
        (status = 404, description = "No existe")
    )
)]
pub async fn purge_category(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    app_state.category_service.purge(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

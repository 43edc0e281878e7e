// src/handlers.rs

use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc};

pub mod catalog;
pub mod clients;
pub mod quotes;
pub mod settings;
pub mod tracking;

/// Monta todas as rotas da API sobre o estado já construído.
pub fn router(app_state: AppState) -> Router {
    let quote_routes = Router::new()
        .route("/", get(quotes::list_quotes).post(quotes::create_quote))
        .route("/stats", get(quotes::get_stats))
        .route("/{id}", get(quotes::get_quote).put(quotes::update_quote))
        // Acompanhamento
        .route("/{id}/tracking/update-status", post(tracking::update_status))
        .route("/{id}/tracking/schedule-reminder", post(tracking::schedule_reminder))
        .route("/{id}/tracking/delete-reminder", post(tracking::delete_reminder));

    let client_routes = Router::new()
        .route("/", get(clients::list_clients).post(clients::create_client))
        .route(
            "/{id}",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/{id}/permanent", delete(clients::purge_client));

    let item_routes = Router::new()
        .route("/", get(catalog::list_items).post(catalog::create_item))
        .route(
            "/{id}",
            get(catalog::get_item)
                .put(catalog::update_item)
                .delete(catalog::delete_item),
        );

    let category_routes = Router::new()
        .route("/", get(catalog::list_categories).post(catalog::create_category))
        .route(
            "/{id}",
            get(catalog::get_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route("/{id}/permanent", delete(catalog::purge_category));

    let settings_routes = Router::new()
        .route("/", get(settings::list_settings).post(settings::create_setting))
        .route(
            "/{key}",
            get(settings::get_setting)
                .put(settings::update_setting)
                .delete(settings::delete_setting),
        );

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .route("/api/reminders/run", post(tracking::run_reminders))
        .nest("/api/quotes", quote_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/items", item_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/settings", settings_routes)
        .with_state(app_state)
}

// src/docs.rs

use utoipa::OpenApi;

use crate::{handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Quotes ---
        handlers::quotes::list_quotes,
        handlers::quotes::create_quote,
        handlers::quotes::get_stats,
        handlers::quotes::get_quote,
        handlers::quotes::update_quote,

        // --- Tracking ---
        handlers::tracking::update_status,
        handlers::tracking::schedule_reminder,
        handlers::tracking::delete_reminder,
        handlers::tracking::run_reminders,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::clients::purge_client,

        // --- Catalog ---
        handlers::catalog::list_items,
        handlers::catalog::create_item,
        handlers::catalog::get_item,
        handlers::catalog::update_item,
        handlers::catalog::delete_item,
        handlers::catalog::list_categories,
        handlers::catalog::create_category,
        handlers::catalog::get_category,
        handlers::catalog::update_category,
        handlers::catalog::delete_category,
        handlers::catalog::purge_category,

        // --- Settings ---
        handlers::settings::list_settings,
        handlers::settings::create_setting,
        handlers::settings::get_setting,
        handlers::settings::update_setting,
        handlers::settings::delete_setting,
    ),
    components(
        schemas(
            // --- Quotes ---
            models::quote::QuoteStatus,
            models::quote::ReminderType,
            models::quote::LineItem,
            models::quote::Reminder,
            models::quote::StatusChange,
            models::quote::Quote,
            models::quote::QuoteStats,
            models::quote::QuotePayload,
            models::quote::QuotePatch,
            models::quote::UpdateStatusRequest,
            models::quote::ReminderRequest,
            services::TickReport,

            // --- Clients ---
            models::client::Client,
            models::client::ClientPayload,
            models::client::ClientPatch,

            // --- Catalog ---
            models::catalog::Item,
            models::catalog::ItemPayload,
            models::catalog::ItemPatch,
            models::catalog::Category,
            models::catalog::CategoryPayload,
            models::catalog::CategoryPatch,

            // --- Settings ---
            models::settings::ConfigEntry,
            models::settings::ConfigPayload,
            models::settings::ConfigPatch,
        )
    ),
    tags(
        (name = "Quotes", description = "Cotizaciones: alta, edición y estadísticas"),
        (name = "Tracking", description = "Estados, historial y recordatorios"),
        (name = "Clients", description = "Clientes"),
        (name = "Catalog", description = "Items y categorías del catálogo"),
        (name = "Settings", description = "Configuración del sistema")
    )
)]
pub struct ApiDoc;

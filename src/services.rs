pub mod normalization;
pub mod mailer;
pub use mailer::{LogMailer, Mailer, OutgoingEmail, SmtpMailer};
pub mod settings_service;
pub use settings_service::SettingsService;
pub mod client_service;
pub use client_service::ClientService;
pub mod item_service;
pub use item_service::ItemService;
pub mod category_service;
pub use category_service::CategoryService;
pub mod quote_service;
pub use quote_service::QuoteService;
pub mod tracking_service;
pub use tracking_service::TrackingService;
pub mod reminder_dispatcher;
pub use reminder_dispatcher::{ReminderDispatcher, ReminderPoller, TickReport};

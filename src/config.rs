// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::cache::{CacheTtls, QueryCache},
    db::{DocumentStore, MemoryDocumentStore, PgDocumentStore},
    services::{
        mailer::SmtpSettings, CategoryService, ClientService, ItemService, LogMailer, Mailer, QuoteService,
        ReminderDispatcher, ReminderPoller, SettingsService, SmtpMailer, TrackingService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "memoria" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("STORE_BACKEND desconhecido: '{}'", other),
        }
    }
}

/// Tudo que vem do ambiente (`.env` incluso), lido uma única vez no arranque.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub smtp: Option<SmtpSettings>,
    pub reminder_interval: Duration,
    pub reminder_fallback_email: String,
    pub cache_ttls: CacheTtls,
    pub cache_sweep: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 5,
            smtp: None,
            reminder_interval: Duration::from_secs(60),
            reminder_fallback_email: "admin@localhost".to_string(),
            cache_ttls: CacheTtls::default(),
            cache_sweep: Duration::from_secs(60),
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} inválida ('{}'): {}", name, raw, e)),
        None => Ok(None),
    }
}

fn secs_var(name: &str, default: Duration) -> anyhow::Result<Duration> {
    Ok(parse_var::<u64>(name)?.map(Duration::from_secs).unwrap_or(default))
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let database_url = var("DATABASE_URL");

        // Sem STORE_BACKEND explícito: Postgres se houver DATABASE_URL
        let store_backend = match parse_var::<StoreBackend>("STORE_BACKEND")? {
            Some(backend) => backend,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL deve ser definida para STORE_BACKEND=postgres");
        }

        let smtp = match var("SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                from: var("SMTP_FROM")
                    .or_else(|| var("SMTP_USER"))
                    .context("SMTP_FROM (ou SMTP_USER) deve ser definido junto com SMTP_HOST")?,
                host,
                port: parse_var("SMTP_PORT")?,
                user: var("SMTP_USER"),
                pass: var("SMTP_PASS"),
            }),
            None => None,
        };

        let ttls = defaults.cache_ttls;
        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            store_backend,
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS")?.unwrap_or(defaults.db_max_connections),
            smtp,
            reminder_interval: secs_var("REMINDER_INTERVAL_SECS", defaults.reminder_interval)?,
            reminder_fallback_email: var("REMINDER_FALLBACK_EMAIL").unwrap_or(defaults.reminder_fallback_email),
            cache_ttls: CacheTtls {
                list: secs_var("CACHE_LIST_TTL_SECS", ttls.list)?,
                detail: secs_var("CACHE_DETAIL_TTL_SECS", ttls.detail)?,
                stats: secs_var("CACHE_STATS_TTL_SECS", ttls.stats)?,
            },
            cache_sweep: secs_var("CACHE_SWEEP_SECS", defaults.cache_sweep)?,
        })
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: QueryCache,
    pub quote_service: QuoteService,
    pub tracking_service: TrackingService,
    pub client_service: ClientService,
    pub item_service: ItemService,
    pub category_service: CategoryService,
    pub settings_service: SettingsService,
    pub reminder_dispatcher: Arc<ReminderDispatcher>,
    pub reminder_poller: Arc<ReminderPoller>,
}

impl AppState {
    /// Conecta o armazenamento e o transporte de e-mail escolhidos na configuração.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                // Faz o app rodar as migrações do SQLx na inicialização
                sqlx::migrate!()
                    .run(&pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgDocumentStore::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("⚠️ Usando armazenamento em memória; os dados somem ao reiniciar");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => {
                tracing::info!("📧 Lembretes por e-mail via SMTP {}", smtp.host);
                Arc::new(SmtpMailer::new(smtp)?)
            }
            None => {
                tracing::warn!("📧 SMTP_HOST não definido; e-mails serão apenas registrados no log");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::from_parts(config, store, mailer))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(config: AppConfig, store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        let cache = QueryCache::new(config.cache_ttls);
        let settings_service = SettingsService::new(store.clone(), cache.clone());
        let reminder_dispatcher = Arc::new(ReminderDispatcher::new(
            store.clone(),
            mailer,
            cache.clone(),
            config.reminder_fallback_email.clone(),
        ));
        let reminder_poller = Arc::new(ReminderPoller::new(
            reminder_dispatcher.clone(),
            config.reminder_interval,
        ));

        Self {
            quote_service: QuoteService::new(store.clone(), settings_service.clone(), cache.clone()),
            tracking_service: TrackingService::new(store.clone(), cache.clone()),
            client_service: ClientService::new(store.clone(), cache.clone()),
            item_service: ItemService::new(store.clone(), cache.clone()),
            category_service: CategoryService::new(store, cache.clone()),
            settings_service,
            reminder_dispatcher,
            reminder_poller,
            cache,
            config: Arc::new(config),
        }
    }
}

//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use cotizaciones::{handlers, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let cache_sweep = config.cache_sweep;
    let app_state = AppState::new(config).await?;

    // Tarefas de fundo: lembretes e limpeza do cache
    app_state.reminder_poller.start();
    let sweeper = app_state.cache.spawn_sweeper(cache_sweep);
    let poller = app_state.reminder_poller.clone();

    let app = handlers::router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("🛑 Encerrando...");
        })
        .await?;

    poller.stop();
    sweeper.abort();
    Ok(())
}

//src/main.rs

use tokio::{net::TcpListener, sync::watch};
use tracing_subscriber::EnvFilter;

use mizan::config::{AppConfig, AppState};
use mizan::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env()?;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Varredura de notificações em segundo plano
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_handle = app_state.reminder_sweep.clone().spawn(
        app_state.config.session_sweep_interval,
        app_state.config.task_sweep_interval,
        shutdown_rx,
    );

    let listener = TcpListener::bind(&app_state.config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, routes::app(app_state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Falha ao ouvir o sinal de desligamento: {}", e);
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    sweep_handle.await?;

    Ok(())
}

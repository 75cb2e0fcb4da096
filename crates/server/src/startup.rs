use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::Router;
use configs::{AppConfig, StorageBackend};
use migration::MigratorTrait;
use service::customer::{
    repo::{InMemoryCustomerRepository, SeaOrmCustomerRepository},
    CustomerRepository, CustomerService,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load `config.toml` (or `CONFIG_PATH`) when present, otherwise fall back to
/// environment variables and the in-memory backend.
pub fn load_config() -> Result<AppConfig, StartupError> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let res = if Path::new(&path).exists() {
        info!(%path, "loading configuration file");
        AppConfig::load_and_validate()
    } else {
        info!(%path, "no configuration file; using environment");
        AppConfig::from_env()
    };
    res.map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

/// Construct the record store selected by configuration. The database
/// backend connects and applies pending migrations when enabled.
pub async fn build_repository(cfg: &AppConfig) -> Result<Arc<dyn CustomerRepository>, StartupError> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            warn!("memory storage selected; data is lost on restart");
            Ok(Arc::new(InMemoryCustomerRepository::new()))
        }
        StorageBackend::Database => {
            let db_cfg = &cfg.database;
            if db_cfg.is_sqlite() {
                common::env::ensure_sqlite_dir(&db_cfg.url).await?;
            }
            let db = models::db::connect_with_config(db_cfg)
                .await
                .map_err(|e| StartupError::Storage(e.to_string()))?;
            if db_cfg.run_migrations {
                migration::Migrator::up(&db, None)
                    .await
                    .map_err(|e| StartupError::Storage(format!("migrations failed: {e}")))?;
                info!("database migrations applied");
            }
            Ok(Arc::new(SeaOrmCustomerRepository::new(db)))
        }
    }
}

/// Build the application router over an already constructed store.
pub fn build_app(repo: Arc<dyn CustomerRepository>) -> Router {
    let state = ServerState::new(CustomerService::new(repo));
    routes::build_router(state, build_cors())
}

pub fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bad listen address {}:{}: {e}", cfg.server.host, cfg.server.port)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, draining connections");
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    Ok(())
}

/// Public entry: build the store from `cfg` and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let repo = build_repository(&cfg).await?;
    let storage = repo.backend();
    let app = build_app(repo);

    let addr = bind_addr(&cfg)?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, storage, "customer directory listening");
    serve(listener, app, shutdown_signal()).await
}

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StoreBackend, StoreConfig};
use service::{
    capability::{AllowAll, ApiKeyCapability, CapabilityCheck},
    objects::{ObjectListing, ReservationEngine},
    storage::{EntityStore, JsonFileStore, MemoryStore, TimedStore},
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, ServerState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured backend, wrapped so every call is bounded by `op_timeout_ms`.
pub async fn open_store(cfg: &StoreConfig) -> Result<Arc<dyn EntityStore>, StartupError> {
    let backend: Arc<dyn EntityStore> = match cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => {
            let path = cfg
                .path
                .clone()
                .ok_or_else(|| StartupError::InvalidConfig("store.path is required for the file backend".into()))?;
            common::env::ensure_data_dir(&path).await?;
            JsonFileStore::new(path).await?
        }
    };
    info!(backend = ?cfg.backend, op_timeout_ms = cfg.op_timeout_ms, max_cas_attempts = cfg.max_cas_attempts, "entity store ready");
    // 每次存储调用都受 op_timeout_ms 约束，超时视为 StoreUnavailable
    Ok(Arc::new(TimedStore::new(backend, cfg.op_timeout())))
}

fn build_capability(cfg: &AppConfig) -> Arc<dyn CapabilityCheck> {
    if cfg.auth.api_keys.is_empty() {
        Arc::new(AllowAll)
    } else {
        info!(keys = cfg.auth.api_keys.len(), "api key capability check enabled for mutating routes");
        Arc::new(ApiKeyCapability::new(cfg.auth.api_keys.iter().cloned()))
    }
}

/// Wire engine, listing and capability check over one store handle.
pub fn build_state(cfg: &AppConfig, store: Arc<dyn EntityStore>) -> ServerState {
    ServerState {
        engine: ReservationEngine::new(Arc::clone(&store)).with_max_attempts(cfg.store.max_cas_attempts),
        listing: ObjectListing::new(store),
        capability: build_capability(cfg),
    }
}

/// Build the whole app for a validated config.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let store = open_store(&cfg.store).await?;
    Ok(routes::build_router(build_state(cfg, store), build_cors()))
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Public entry: build the app and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    // 构建路由（存储、引擎、能力校验）
    let app = build_app(&cfg).await?;

    // 绑定地址并启动服务
    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting object reservation server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use keyward_auth::config::AuthConfig;
use keyward_auth::{
    AuthState, DiscoveryDocumentBuilder, InMemorySigningKeyStore, JwksState, KeyRotator,
    KeySelector, RotatedKey, SigningKeyStore, TokenIssuer, TokenSettings, TokenVerifier,
    jwks_handler,
};
use keyward_auth_postgres::PostgresSigningKeyStore;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::handlers;
use crate::users::{InMemoryUserDirectory, UserDirectory};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub auth: AuthState,
    pub jwks: JwksState,
    pub users: Arc<dyn UserDirectory>,
    pub token_lifetime: Duration,
}

impl AppState {
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn SigningKeyStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let keys = KeySelector::new(store);
        let settings = TokenSettings::from(config);
        Self {
            issuer: Arc::new(TokenIssuer::new(keys.clone(), settings.clone())),
            auth: AuthState::new(Arc::new(TokenVerifier::new(keys.clone(), settings))),
            jwks: JwksState::new(
                keys,
                DiscoveryDocumentBuilder::new().with_algorithm(config.signing.algorithm),
            ),
            users,
            token_lifetime: config.token_lifetime,
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for JwksState {
    fn from_ref(state: &AppState) -> Self {
        state.jwks.clone()
    }
}

pub async fn open_key_store(cfg: &StorageConfig) -> anyhow::Result<Arc<dyn SigningKeyStore>> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory key store; signing keys are lost on restart");
            Ok(Arc::new(InMemorySigningKeyStore::new()))
        }
        StorageBackend::Postgres => {
            let store =
                PostgresSigningKeyStore::connect(&cfg.postgres.url, cfg.postgres.max_connections)
                    .await?;
            store.ensure_schema().await?;
            tracing::info!("Connected to PostgreSQL key store");
            Ok(Arc::new(store))
        }
    }
}

/// Builds handler state from configuration, rotating in a first key if the
/// store is empty and bootstrap allows it.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = open_key_store(&cfg.storage).await?;
    build_state_with_store(cfg, store).await
}

pub async fn build_state_with_store(
    cfg: &AppConfig,
    store: Arc<dyn SigningKeyStore>,
) -> anyhow::Result<AppState> {
    if cfg.bootstrap.generate_key_if_empty {
        KeyRotator::from_config(store.clone(), &cfg.auth.signing)
            .rotate_if_empty()
            .await?;
    }

    let users = InMemoryUserDirectory::from_seeds(&cfg.users)?;
    tracing::info!(users = users.len(), "User directory loaded");

    Ok(AppState::new(&cfg.auth, store, Arc::new(users)))
}

pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    Ok(router(build_state(cfg).await?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(handlers::auth))
        .route("/user", get(handlers::get_user))
        // Referenced by the `jku` header of issued tokens
        .route("/jwks", get(jwks_handler))
        .route("/healthz", get(handlers::healthz))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;
    let addr = cfg.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, base_url = %cfg.base_url(), "listening");

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    });

    let timeout = cfg.server.shutdown_timeout;
    tokio::select! {
        result = serve => result?,
        _ = async {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::warn!(?timeout, "Shutdown timeout elapsed, dropping open connections");
        }
    }
    Ok(())
}

/// Generates and stores one signing key.
pub async fn rotate_keys(
    cfg: &AppConfig,
    lifetime: Option<Duration>,
) -> anyhow::Result<RotatedKey> {
    if cfg.storage.backend == StorageBackend::Memory {
        tracing::warn!("Rotating into an in-memory store has no lasting effect");
    }
    let store = open_key_store(&cfg.storage).await?;
    let mut rotator = KeyRotator::from_config(store, &cfg.auth.signing);
    if let Some(lifetime) = lifetime {
        rotator = rotator.with_key_lifetime(lifetime);
    }
    Ok(rotator.rotate().await?)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn test_router() -> (Router, Arc<dyn SigningKeyStore>) {
        let store: Arc<dyn SigningKeyStore> = Arc::new(InMemorySigningKeyStore::new());
        let state = build_state_with_store(&AppConfig::default(), store.clone())
            .await
            .unwrap();
        (router(state), store)
    }

    #[tokio::test]
    async fn test_bootstrap_generates_one_key() {
        let (_, store) = test_router().await;
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_disabled_leaves_store_empty() {
        let mut cfg = AppConfig::default();
        cfg.bootstrap.generate_key_if_empty = false;
        let store: Arc<dyn SigningKeyStore> = Arc::new(InMemorySigningKeyStore::new());
        let state = build_state_with_store(&cfg, store.clone()).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());

        let response = router(state)
            .oneshot(Request::get("/jwks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let jwks: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(jwks["keys"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_healthz() {
        let (app, _) = test_router().await;
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _) = test_router().await;
        let response = app
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rotate_keys_memory_backend() {
        let rotated = rotate_keys(&AppConfig::default(), Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(!rotated.kid.is_empty());
    }
}

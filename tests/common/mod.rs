#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use ipnetwork::IpNetwork;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use urlshrink::application::services::{IdentityService, ResolverStrategy, UrlResolver, UrlService};
use urlshrink::domain::delete_worker::{DeleteWorker, DeleteWorkerConfig};
use urlshrink::domain::repositories::UrlRepository;
use urlshrink::infrastructure::persistence::MemoryUrlRepository;
use urlshrink::routes::router;
use urlshrink::state::AppState;

pub const BASE_URL: &str = "http://localhost:8080";
pub const SECRET: &str = "test-signing-secret";
pub const TRUSTED_SUBNET: &str = "10.0.0.0/8";

/// A running app over in-memory storage.
pub struct TestApp {
    pub server: TestServer,
    pub repository: Arc<MemoryUrlRepository>,
    pub identity: IdentityService,
    shutdown: CancellationToken,
    _worker: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl TestApp {
    /// Bearer header value for an already issued `user_id`.
    pub fn bearer(&self, user_id: &str) -> String {
        format!("Bearer {}", self.identity.token_for(user_id))
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(ResolverStrategy::Stateless, Some(TRUSTED_SUBNET))
}

pub fn spawn_app_with(strategy: ResolverStrategy, trusted_subnet: Option<&str>) -> TestApp {
    let repository = Arc::new(MemoryUrlRepository::new());
    let dyn_repository: Arc<dyn UrlRepository> = repository.clone();

    let shutdown = CancellationToken::new();
    let config = DeleteWorkerConfig {
        batch_size: 25,
        flush_interval: Duration::from_millis(20),
        flush_timeout: Duration::from_secs(1),
        flush_retries: 0,
    };
    let (queue, worker) = DeleteWorker::spawn(dyn_repository.clone(), config, shutdown.clone());

    let resolver = UrlResolver::new(dyn_repository.clone(), strategy, 8);
    let url_service = Arc::new(UrlService::new(dyn_repository, resolver, queue, BASE_URL));
    let identity = IdentityService::new(SECRET.to_string());

    let subnet = trusted_subnet.map(|s| s.parse::<IpNetwork>().unwrap());
    let state = AppState::new(url_service, Arc::new(identity.clone()), subnet);

    TestApp {
        server: TestServer::new(router(state)).unwrap(),
        repository,
        identity,
        shutdown,
        _worker: worker,
    }
}

/// Extracts the user id from an `Authorization: Bearer <id>.<sig>` value.
pub fn user_id_from_header(value: &str) -> String {
    let token = value.strip_prefix("Bearer ").unwrap();
    token.rsplit_once('.').unwrap().0.to_string()
}

/// Polls `check` until it holds or a second has passed.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

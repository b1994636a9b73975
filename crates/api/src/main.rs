use std::sync::Arc;
use std::time::Duration;

use trolley_api::app::{build_app, AppServices};
use trolley_infra::sqlx::PgPool;
use trolley_infra::SweeperConfig;

#[tokio::main]
async fn main() {
    trolley_observability::init();

    let bind = std::env::var("TROLLEY_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let services = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = PgPool::connect(&url)
                .await
                .expect("failed to connect to DATABASE_URL");
            Arc::new(
                AppServices::postgres(pool)
                    .await
                    .expect("failed to initialize cart schema"),
            )
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory cart store");
            Arc::new(AppServices::in_memory())
        }
    };

    let sweeper_config = SweeperConfig::default().with_thresholds(
        Duration::from_secs(env_u64("TROLLEY_INACTIVITY_HOURS", 3) * 60 * 60),
        Duration::from_secs(env_u64("TROLLEY_REMOVAL_DAYS", 7) * 24 * 60 * 60),
    );
    let sweeper_config = sweeper_config
        .with_interval(Duration::from_secs(env_u64("TROLLEY_SWEEP_INTERVAL_SECS", 1800)));
    let _sweeper = services.spawn_sweeper(sweeper_config);

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(%name, %value, "unparseable value, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

use std::sync::Arc;

mod app;
mod auth;
mod config;
mod csrf;
mod db;
mod error;
mod forms;
mod middleware;
mod pages;
mod recipes;
mod session;
mod state;
#[cfg(test)]
mod testing;
mod views;
mod web;
mod workouts;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fitness_studio=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;

    let state = AppState::from_pool(config.clone(), pool);
    state.sessions.spawn_idle_sweep(std::time::Duration::from_secs(
        config.session.sweep_interval_secs,
    ));
    app::serve(app::build_app(state)).await
}

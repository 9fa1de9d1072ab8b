mod app;
mod auth;
mod catalog;
mod config;
mod error;
mod images;
mod pagination;
mod recipes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;
mod users;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "foodgram=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    if let Some(path) = app_state.config.ingredients_json.as_deref() {
        if let Err(e) = catalog::services::import_ingredients_file(&app_state.db, path).await {
            tracing::warn!(error = ?e, path, "ingredient import failed; continuing");
        }
    }

    app::serve(app::build_app(app_state)).await
}

mod config;
mod db;
mod error;
mod render;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");
    let port = config.port;

    std::fs::create_dir_all(&config.output_dir).expect("cannot create output directory");

    let pool = db::init_pool(&config).await.expect("database init failed");
    let state = state::AppState::new(pool, config);

    if let Err(e) = services::persistence::hydrate(&state).await {
        tracing::warn!(error = %e, "design hydration failed; starting with an empty registry");
    }

    // Spawn background persistence task.
    let _persistence = services::persistence::spawn_persistence_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "card design server listening");
    axum::serve(listener, app).await.expect("server failed");
}

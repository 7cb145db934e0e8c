use {
    adyen_reconcile::{
        AppState,
        adapters::adyen::AdyenClient,
        config::AppConfig,
        domain::method::PaymentMethods,
        infra::postgres::PgLedger,
        services::reconciler::Reconciler,
    },
    axum::http::StatusCode,
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::signal,
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let methods = Arc::new(PaymentMethods::new(config.payment_methods.clone()));
    let gateway = AdyenClient::new(&config.adyen_api_base_url, &config.adyen_api_key)
        .expect("failed to build processor client");
    let reconciler = Reconciler::new(Arc::new(PgLedger::new(pool)), methods, Arc::new(gateway));

    let state = AppState {
        reconciler: Arc::new(reconciler),
    };

    let app = adyen_reconcile::router(state).layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(30),
    ));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

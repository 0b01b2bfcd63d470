use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::cors::Cors;
use salvo::http::{Method, header};
use salvo::{Listener, Router, Service};
use rolodex_app::app::api::routes;
use rolodex_app::config::ConfigHandler;
use rolodex_app::db_handler::DbProviderHandler;
use rolodex_app::mail_handler::MailerHandler;
use rolodex_core::config::load_config;
use rolodex_db::db::connection::create_pool;
use rolodex_db::db::migrate::run_migrations;
use rolodex_service::mail::LogMailer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Rolodex contacts server");

    let config = load_config()?;

    tracing::info!(
        server = ?config.server,
        frontend = %config.frontend.url,
        "Configuration loaded"
    );

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    run_migrations(&config.database.url).await?;

    let pool = create_pool(&config.database).await?;

    let cors = Cors::new()
        .allow_origin(config.frontend.base_url())
        .allow_credentials(true)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(vec![header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .into_handler();

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(DbProviderHandler::new(pool))
        .hoop(MailerHandler {
            mailer: Arc::new(LogMailer::new(&config.mail)),
        })
        .hoop(ConfigHandler::new(config))
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor)
        .serve(Service::new(router).hoop(cors))
        .await;

    Ok(())
}

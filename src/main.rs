use std::sync::Arc;

use poem::{
    EndpointExt, Server,
    http::Method,
    listener::TcpListener,
    middleware::{Cors, Tracing},
};
use tokio::main;
use tracing_subscriber::EnvFilter;

use crate::{
    application::{
        handlers::message_dispatcher::MessageDispatchHandler,
        services::{
            clock::{Clock, SystemClock},
            delivery::DeliveryClient,
            rate_gate::RateGate,
        },
    },
    config::{Config, DeliveryBackendConfig},
    domain::repositories::ScheduledMessageRepository,
    infrastructure::{
        delivery::{stub::StubBackend, twilio::TwilioBackend},
        repositories::{
            in_memory::InMemoryScheduledMessageRepository,
            postgres::{self, PostgresScheduledMessageRepository},
        },
        scheduling::poller::PollScheduler,
    },
    presentation::http::{endpoints::root::ApiState, routes},
};

mod application;
mod config;
mod domain;
mod infrastructure;
mod presentation;

#[main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::try_parse()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let repo: Arc<dyn ScheduledMessageRepository> = match &config.database_url {
        Some(url) => {
            let pool = postgres::connect(url, config.database_max_connections).await?;
            tracing::info!("connected to postgres, migrations applied");
            PostgresScheduledMessageRepository::new(pool, clock.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, scheduled messages are kept in memory only");
            Arc::new(InMemoryScheduledMessageRepository::new(clock.clone()))
        }
    };

    let backend = match config.delivery_backend.clone() {
        DeliveryBackendConfig::Stub { success_rate } => StubBackend::new(success_rate),
        DeliveryBackendConfig::Twilio(twilio) => TwilioBackend::new(twilio)?,
    };
    let delivery = Arc::new(DeliveryClient::new(backend, config.delivery_policy));
    tracing::info!(backend = delivery.backend_name(), "delivery backend selected");

    let scheduler = PollScheduler::new(
        repo.clone(),
        Arc::new(MessageDispatchHandler::new(repo.clone(), delivery)),
        Arc::new(RateGate::new(config.send_interval)),
        clock.clone(),
        config.poll_interval,
    )
    .spawn();

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);
    tracing::info!("Starting server at {}", server_url);

    let state = Arc::new(ApiState::new(repo, clock));
    let app = routes(state, &server_url)
        .with(
            Cors::new()
                .allow_origin(config.cors_origin.as_str())
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(["Origin", "Content-Type", "Accept", "Authorization"])
                .expose_headers(["Content-Length"])
                .allow_credentials(true)
                .max_age(12 * 60 * 60),
        )
        .with(Tracing);

    Server::new(TcpListener::bind(format!("{}:{}", config.host, config.port)))
        .run_with_graceful_shutdown(
            app,
            async {
                let _ = tokio::signal::ctrl_c().await;
            },
            None,
        )
        .await?;

    scheduler.shutdown().await;
    Ok(())
}

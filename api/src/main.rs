use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenv::dotenv;

use contact_api::config::AppConfig;
use contact_api::notification::{
    Dispatcher, Identities, LogTransport, MailTransport, SmtpMailer, TemplateRenderer,
    TemplateSource,
};
use contact_api::observability::Observability;
use contact_api::rate_limit::RateLimitState;
use contact_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let obs = Observability::init()?;
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let transport: Arc<dyn MailTransport> = if config.mail.dry_run {
        tracing::warn!("MAIL_DRY_RUN is set; notifications are logged, not sent");
        Arc::new(LogTransport)
    } else {
        Arc::new(SmtpMailer::from_config(&config.mail).context("failed to configure SMTP relay")?)
    };

    if !config.template_path.is_file() {
        tracing::warn!(
            "Confirmation template {} not found; confirmations will fail until it exists",
            config.template_path.display()
        );
    }

    let identities =
        Identities::from_config(&config.mail).context("invalid sender or recipient address")?;
    let renderer = TemplateRenderer::new(TemplateSource::File(config.template_path.clone()));
    let dispatcher = Dispatcher::new(transport, renderer, identities);

    let state = AppState::new(dispatcher, obs.registry.clone());
    let rate_limit_state = RateLimitState::from_env();

    let app = contact_api::build_router(state, rate_limit_state, &config.allowed_origins);

    tracing::info!("Contact API listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

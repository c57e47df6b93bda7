pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod intent;
pub mod models;
pub mod prompts;
pub mod providers;
pub mod store;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::handlers::AppState;
use crate::providers::ProviderRegistry;
use crate::transport::{HttpTransport, Transport};

/// Wires the HTTP transport, provider registry and dispatcher into a router.
pub fn app(cfg: &Config) -> Result<Router> {
    let transport = Arc::new(HttpTransport::new(cfg.provider_timeout())?);
    let registry = ProviderRegistry::from_config(
        &cfg.providers,
        Arc::clone(&transport) as Arc<dyn Transport>,
    );
    let dispatcher = Dispatcher::new(Arc::new(registry), cfg);
    tracing::info!(
        ai_agent = cfg.routing.ai_agent.as_str(),
        chat = cfg.routing.chat.as_str(),
        assessment = cfg.routing.assessment.as_str(),
        feedback = cfg.routing.feedback.as_str(),
        "Provider routing"
    );
    Ok(handlers::router(
        AppState::new(Arc::new(dispatcher)),
        &cfg.server,
    ))
}

use std::sync::Arc;

use vgb_core::{
    config::Config,
    moderation::{ExpiryScheduler, JsonFileRestrictionStore, RestrictionStore},
    payments::{HttpTransport, PaymentGateway, ReqwestTransport},
    resilience::CircuitBreaker,
};

#[tokio::main]
async fn main() -> Result<(), vgb_core::Error> {
    vgb_core::logging::init("vgb")?;

    let cfg = Arc::new(Config::load()?);

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(cfg.request_timeout)?);
    let breaker = Arc::new(CircuitBreaker::new("payment_api", cfg.breaker_config()));
    let gateway = Arc::new(PaymentGateway::new(cfg.gateway_config(), transport, breaker));

    let store: Arc<dyn RestrictionStore> =
        Arc::new(JsonFileRestrictionStore::open(&cfg.restrictions_file).await?);
    let scheduler = ExpiryScheduler::new(store.clone(), cfg.scheduler_interval);
    scheduler.start().await;

    let outcome = vgb_telegram::router::run_polling(cfg, gateway, store, scheduler.clone()).await;

    // Let an in-flight sweep finish before exiting.
    scheduler.stop().await;

    outcome.map_err(|e| vgb_core::Error::External(format!("telegram bot failed: {e}")))?;
    tracing::info!("shutdown complete");
    Ok(())
}

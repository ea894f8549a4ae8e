use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use vgb_core::{
    config::Config,
    messaging::port::MessagingPort,
    moderation::{ExpiryScheduler, RestrictionStore},
    payments::{PaymentGateway, UsdtSettlement},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub gateway: Arc<PaymentGateway>,
    /// Present only when a USDT wallet is configured.
    pub usdt: Option<UsdtSettlement>,
    pub store: Arc<dyn RestrictionStore>,
    pub scheduler: ExpiryScheduler,
}

/// Run the long-polling dispatcher until Ctrl-C.
///
/// The scheduler is owned by the caller; it is only read here for `/breaker`.
pub async fn run_polling(
    cfg: Arc<Config>,
    gateway: Arc<PaymentGateway>,
    store: Arc<dyn RestrictionStore>,
    scheduler: ExpiryScheduler,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed; continuing"),
    }
    tracing::info!(admins = cfg.telegram_admin_users.len(), "admin users loaded");

    let usdt = Some(UsdtSettlement::new(
        cfg.usdt_wallet_address.clone(),
        cfg.usdt_network.clone(),
        cfg.payment_currency.clone(),
    ))
    .filter(UsdtSettlement::is_configured);
    if usdt.is_none() {
        tracing::warn!("USDT_WALLET_ADDRESS not set; payment fallback disabled");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));

    let state = Arc::new(AppState {
        cfg,
        messenger,
        gateway,
        usdt,
        store,
        scheduler,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde_json::json;
use teloxide::{prelude::*, types::Message};

use vgb_core::{
    domain::{ChatId, Subject, UserId},
    formatting::{escape_html, format_duration},
    moderation::ExpiryScheduler,
    payments::{ChargeResult, PayerInfo, PaymentStatus, SettlementFallback},
    resilience::BreakerSnapshot,
};

use crate::router::AppState;

/// Longest timed mute accepted by `/mute` (one year).
const MAX_MUTE_MINUTES: u32 = 525_600;

const HELP: &str = "<b>Commands</b>\n\
/vip - buy VIP group access\n\
/payment &lt;id&gt; - check a payment\n\
\n\
<b>Admins</b>\n\
/mute &lt;user_id&gt; [minutes] - mute in this group (permanent without minutes)\n\
/unmute &lt;user_id&gt; - lift a mute in this group\n\
/breaker [reset] - payment gateway health, or force the circuit closed";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// `<user_id> [minutes]`. Minutes of `None` means permanent.
fn parse_mute_args(args: &str) -> Result<(i64, Option<u32>), &'static str> {
    let mut it = args.split_whitespace();
    let user_id = parse_user_id(it.next())?;
    let minutes = match it.next() {
        None => None,
        Some(raw) => match raw.parse::<u32>() {
            Ok(m) if (1..=MAX_MUTE_MINUTES).contains(&m) => Some(m),
            _ => return Err("Minutes must be a whole number between 1 and 525600."),
        },
    };
    if it.next().is_some() {
        return Err("Usage: /mute &lt;user_id&gt; [minutes]");
    }
    Ok((user_id, minutes))
}

fn parse_user_id(raw: Option<&str>) -> Result<i64, &'static str> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or("Give a numeric user id.")
}

fn render_charge(result: &ChargeResult, currency: &str) -> String {
    match result {
        ChargeResult::Succeeded {
            charge_id,
            display_code,
            amount,
        } => format!(
            "<b>VIP access</b>\n\
Amount: {amount} {currency}\n\
Charge: <code>{id}</code>\n\n\
PIX copy-and-paste code:\n<code>{code}</code>\n\n\
Check it with /payment {id}",
            currency = escape_html(currency),
            id = escape_html(charge_id),
            code = escape_html(display_code),
        ),
        ChargeResult::FellBackToSecondary {
            instructions,
            cause,
        } => format!(
            "<b>PIX is unavailable right now.</b>\n{reason}\n\n\
<b>Pay with USDT ({network})</b>\n\
Address: <code>{address}</code>\n\n{text}",
            reason = escape_html(&cause.user_message()),
            network = escape_html(&instructions.network),
            address = escape_html(&instructions.address),
            text = escape_html(&instructions.instructions),
        ),
        ChargeResult::Failed(err) => escape_html(&err.user_message()),
    }
}

fn render_status(payment_id: &str, status: &PaymentStatus) -> String {
    let note = match status {
        PaymentStatus::Paid => "\nThanks! An admin will add you to the VIP group.",
        PaymentStatus::Pending => "\nNot paid yet. Use the PIX code from /vip.",
        PaymentStatus::Expired | PaymentStatus::Cancelled => "\nStart a new payment with /vip.",
        PaymentStatus::Other(_) => "",
    };
    format!(
        "Payment <code>{}</code>: <b>{}</b>{note}",
        escape_html(payment_id),
        escape_html(&status.to_string()),
    )
}

fn render_breaker(
    name: &str,
    snapshot: &BreakerSnapshot,
    threshold: u32,
    scheduler_running: bool,
    scheduler_period: Duration,
) -> String {
    let last_failure = snapshot
        .since_last_failure
        .map(|d| format!("{} ago", format_duration(d)))
        .unwrap_or_else(|| "never".to_string());
    let scheduler = if scheduler_running {
        format!("running (every {})", format_duration(scheduler_period))
    } else {
        "stopped".to_string()
    };
    format!(
        "<b>Circuit {}</b>: {}\n\
Failures: {}/{threshold}\n\
Last failure: {last_failure}\n\
Mute expiry: {scheduler}",
        escape_html(name),
        snapshot.state,
        snapshot.failure_count,
    )
}

fn payer_info(user: &teloxide::types::User) -> PayerInfo {
    let mut info = PayerInfo::new();
    info.insert("telegram_user_id".to_string(), json!(user.id.0));
    if let Some(username) = &user.username {
        info.insert("telegram_username".to_string(), json!(username));
    }
    info
}

async fn reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!(error = %e, chat_id = chat_id.0, "reply failed");
    }
}

async fn scheduler_status(scheduler: &ExpiryScheduler) -> (bool, Duration) {
    (scheduler.is_running().await, scheduler.period())
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);
    let chat_id = ChatId(msg.chat.id.0);
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let in_group = msg.chat.is_group() || msg.chat.is_supergroup();

    let admin_only = matches!(cmd.as_str(), "mute" | "unmute" | "breaker");
    if admin_only && !state.cfg.is_admin(user_id) {
        tracing::info!(user_id, cmd = %cmd, "admin command refused");
        reply(&state, chat_id, "Only admins can use this command.").await;
        return Ok(());
    }

    match cmd.as_str() {
        "start" | "help" => reply(&state, chat_id, HELP).await,

        "vip" => {
            let payer = payer_info(user);
            let fallback = state.usdt.as_ref().map(|u| u as &dyn SettlementFallback);
            let result = state
                .gateway
                .create_charge(
                    state.cfg.vip_price,
                    &state.cfg.vip_description,
                    Some(&payer),
                    fallback,
                )
                .await;
            if let ChargeResult::Failed(e) = &result {
                tracing::warn!(user_id, error = %e, "vip charge failed");
            }
            reply(&state, chat_id, &render_charge(&result, state.gateway.currency())).await;
        }

        "payment" => {
            let payment_id = args.split_whitespace().next().unwrap_or("");
            if payment_id.is_empty() {
                reply(&state, chat_id, "Usage: /payment &lt;id&gt;").await;
                return Ok(());
            }
            let html = match state.gateway.payment_status(payment_id).await {
                Ok(status) => {
                    if status.is_paid() {
                        tracing::info!(payment_id, user_id, "payment confirmed");
                    }
                    render_status(payment_id, &status)
                }
                Err(e) => {
                    tracing::warn!(payment_id, error = %e, "payment status lookup failed");
                    escape_html(&e.user_message())
                }
            };
            reply(&state, chat_id, &html).await;
        }

        "mute" => {
            if !in_group {
                reply(&state, chat_id, "Use /mute inside the group.").await;
                return Ok(());
            }
            let (target, minutes) = match parse_mute_args(&args) {
                Ok(v) => v,
                Err(usage) => {
                    reply(&state, chat_id, usage).await;
                    return Ok(());
                }
            };
            let until = minutes.map(|m| Utc::now() + chrono::Duration::minutes(i64::from(m)));
            let subject = Subject::new(chat_id, UserId(target));
            let html = match state.store.restrict(subject, until).await {
                Ok(()) => {
                    tracing::info!(chat_id = chat_id.0, target, ?until, by = user_id, "user muted");
                    match minutes {
                        Some(m) => format!(
                            "User <code>{target}</code> muted for {}.",
                            format_duration(Duration::from_secs(u64::from(m) * 60))
                        ),
                        None => format!("User <code>{target}</code> muted permanently."),
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, target, "failed to store mute");
                    "Could not save the mute. Try again.".to_string()
                }
            };
            reply(&state, chat_id, &html).await;
        }

        "unmute" => {
            let target = match parse_user_id(args.split_whitespace().next()) {
                Ok(id) => id,
                Err(usage) => {
                    reply(&state, chat_id, usage).await;
                    return Ok(());
                }
            };
            let subject = Subject::new(chat_id, UserId(target));
            let html = match state.store.lift(subject).await {
                Ok(true) => {
                    tracing::info!(chat_id = chat_id.0, target, by = user_id, "user unmuted");
                    format!("User <code>{target}</code> unmuted.")
                }
                Ok(false) => format!("User <code>{target}</code> is not muted here."),
                Err(e) => {
                    tracing::error!(error = %e, target, "failed to lift mute");
                    "Could not lift the mute. Try again.".to_string()
                }
            };
            reply(&state, chat_id, &html).await;
        }

        "breaker" => {
            let breaker = state.gateway.breaker();
            match args.as_str() {
                "" => {}
                "reset" => {
                    breaker.reset();
                    tracing::warn!(breaker = %breaker.name(), by = user_id, "circuit reset by admin");
                }
                _ => {
                    reply(&state, chat_id, "Usage: /breaker [reset]").await;
                    return Ok(());
                }
            }
            let (running, period) = scheduler_status(&state.scheduler).await;
            let html = render_breaker(
                breaker.name(),
                &breaker.snapshot(),
                breaker.config().failure_threshold,
                running,
                period,
            );
            reply(&state, chat_id, &html).await;
        }

        // Not ours (or another bot's); stay quiet in groups.
        _ if in_group => {}
        _ => reply(&state, chat_id, "Unknown command. Try /help.").await,
    }

    Ok(())
}

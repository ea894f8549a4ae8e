//! PIX payment gateway client.
//!
//! Every call goes breaker -> retry -> transport. The breaker sees one
//! outcome per logical call (after retries), and response interpretation
//! happens inside the breaker so API-level failures count toward it.

use std::{sync::Arc, time::Duration};

use serde_json::{json, Map, Value};

use crate::{
    payments::{
        transport::{HttpRequest, HttpResponse, HttpTransport},
        Amount, ChargeResult, PayerInfo, PaymentError, PaymentStatus, SettlementFallback,
    },
    resilience::{CircuitBreaker, RetryPolicy},
};

/// Used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base URL without trailing slash, e.g. `https://api.pix.example/v1`.
    pub base_url: String,
    pub api_key: String,
    pub currency: String,
    pub retry: RetryPolicy,
}

/// A charge as issued by the gateway.
#[derive(Clone, Debug, PartialEq)]
struct IssuedCharge {
    charge_id: String,
    display_code: String,
    amount: Option<Amount>,
}

pub struct PaymentGateway {
    cfg: GatewayConfig,
    transport: Arc<dyn HttpTransport>,
    breaker: Arc<CircuitBreaker>,
}

impl PaymentGateway {
    pub fn new(
        cfg: GatewayConfig,
        transport: Arc<dyn HttpTransport>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let base_url = cfg.base_url.trim_end_matches('/').to_string();
        Self {
            cfg: GatewayConfig { base_url, ..cfg },
            transport,
            breaker,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn currency(&self) -> &str {
        &self.cfg.currency
    }

    /// Create a charge, falling back to `fallback` when the gateway is down,
    /// overloaded or its circuit is open.
    ///
    /// Never returns an error: every failure is folded into [`ChargeResult`].
    pub async fn create_charge(
        &self,
        amount: Amount,
        description: &str,
        payer_info: Option<&PayerInfo>,
        fallback: Option<&dyn SettlementFallback>,
    ) -> ChargeResult {
        let description = description.trim();
        if let Err(e) = validate_charge(amount, description) {
            tracing::debug!(error = %e, "charge rejected locally");
            return ChargeResult::Failed(e);
        }

        let body = self.charge_body(amount, description, payer_info);
        let req = HttpRequest::post(self.url("/payment/create"), body).bearer(&self.cfg.api_key);

        match self.call(&req, parse_charge).await {
            Ok(charge) => {
                tracing::info!(charge_id = %charge.charge_id, %amount, "charge created");
                ChargeResult::Succeeded {
                    charge_id: charge.charge_id,
                    display_code: charge.display_code,
                    amount: charge.amount.unwrap_or(amount),
                }
            }
            Err(err) => settle_failure(err, amount, description, fallback),
        }
    }

    /// Look up the lifecycle status of a previously created charge.
    pub async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, PaymentError> {
        validate_payment_id(payment_id)?;
        let req = HttpRequest::get(self.url(&format!("/payment/{payment_id}/status")))
            .bearer(&self.cfg.api_key);
        self.call(&req, parse_status).await
    }

    /// Fetch the QR payload for a previously created charge.
    pub async fn qr_code(&self, payment_id: &str) -> Result<String, PaymentError> {
        validate_payment_id(payment_id)?;
        let req = HttpRequest::get(self.url(&format!("/payment/{payment_id}/qr")))
            .bearer(&self.cfg.api_key);
        self.call(&req, parse_qr).await
    }

    async fn call<T>(
        &self,
        req: &HttpRequest,
        parse: fn(&HttpResponse) -> Result<T, PaymentError>,
    ) -> Result<T, PaymentError> {
        self.breaker
            .execute(|| async {
                let resp = self
                    .cfg
                    .retry
                    .run(|| self.transport.send(req))
                    .await
                    .map_err(PaymentError::from)?;
                parse(&resp)
            })
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.cfg.base_url)
    }

    fn charge_body(&self, amount: Amount, description: &str, payer: Option<&PayerInfo>) -> Value {
        let mut body: Map<String, Value> = payer.cloned().unwrap_or_default();
        body.insert("amount".to_string(), json!(amount.as_major()));
        body.insert("description".to_string(), json!(description));
        body.insert("currency".to_string(), json!(self.cfg.currency));
        Value::Object(body)
    }
}

fn settle_failure(
    err: PaymentError,
    amount: Amount,
    description: &str,
    fallback: Option<&dyn SettlementFallback>,
) -> ChargeResult {
    let Some(fallback) = fallback.filter(|_| err.triggers_fallback()) else {
        tracing::warn!(error = %err, "charge failed");
        return ChargeResult::Failed(err);
    };

    match fallback.instructions(amount, description) {
        Ok(instructions) => {
            tracing::warn!(cause = %err, network = %instructions.network, "using secondary settlement");
            ChargeResult::FellBackToSecondary {
                instructions,
                cause: err,
            }
        }
        Err(e) => {
            tracing::error!(cause = %err, error = %e, "secondary settlement unavailable");
            ChargeResult::Failed(PaymentError::Fallback(e.to_string()))
        }
    }
}

fn validate_charge(amount: Amount, description: &str) -> Result<(), PaymentError> {
    if !amount.is_positive() {
        return Err(PaymentError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if description.is_empty() {
        return Err(PaymentError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_payment_id(id: &str) -> Result<(), PaymentError> {
    let ok = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(PaymentError::Validation(format!("invalid payment id: {id:?}")))
    }
}

/// `Retry-After` as integer seconds; anything else falls back to the default.
fn parse_retry_after(raw: Option<&str>) -> Duration {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn error_message(v: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|k| v.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Common status handling; returns the parsed JSON body of a 2xx response.
fn parse_envelope(resp: &HttpResponse) -> Result<Value, PaymentError> {
    if resp.status == 429 {
        return Err(PaymentError::RateLimited {
            retry_after: parse_retry_after(resp.header("retry-after")),
        });
    }

    let json = serde_json::from_str::<Value>(&resp.body).ok();
    if !resp.is_success() {
        let message = json
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| format!("HTTP {}", resp.status));
        return Err(PaymentError::Api {
            status: resp.status,
            message,
        });
    }

    json.ok_or_else(|| PaymentError::ResponseShape("body is not JSON".to_string()))
}

/// Reject an explicit `success: false` envelope.
fn reject_unsuccessful(resp: &HttpResponse, v: &Value) -> Result<(), PaymentError> {
    if v.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(PaymentError::Api {
            status: resp.status,
            message: error_message(v).unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    Ok(())
}

fn id_like(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_charge(resp: &HttpResponse) -> Result<IssuedCharge, PaymentError> {
    let v = parse_envelope(resp)?;
    let Some(success) = v.get("success").and_then(Value::as_bool) else {
        return Err(PaymentError::ResponseShape(
            "missing boolean `success` field".to_string(),
        ));
    };
    if !success {
        reject_unsuccessful(resp, &v)?;
    }

    let data = v
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| PaymentError::ResponseShape("missing `data` object".to_string()))?;

    let charge_id = ["payment_id", "id"]
        .iter()
        .find_map(|k| data.get(*k).and_then(id_like))
        .ok_or_else(|| PaymentError::ResponseShape("missing payment id".to_string()))?;
    let display_code = ["qr_code", "pix_code"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PaymentError::ResponseShape("missing qr code".to_string()))?
        .to_string();
    let amount = data.get("amount").and_then(Value::as_f64).map(Amount::from_major);

    Ok(IssuedCharge {
        charge_id,
        display_code,
        amount,
    })
}

fn parse_status(resp: &HttpResponse) -> Result<PaymentStatus, PaymentError> {
    let v = parse_envelope(resp)?;
    reject_unsuccessful(resp, &v)?;
    v.get("status")
        .or_else(|| v.pointer("/data/status"))
        .and_then(Value::as_str)
        .map(PaymentStatus::parse)
        .ok_or_else(|| PaymentError::ResponseShape("missing `status` field".to_string()))
}

fn parse_qr(resp: &HttpResponse) -> Result<String, PaymentError> {
    let v = parse_envelope(resp)?;
    reject_unsuccessful(resp, &v)?;
    v.get("qr_code")
        .or_else(|| v.pointer("/data/qr_code"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PaymentError::ResponseShape("missing `qr_code` field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payments::{transport::TransportError, Method, UsdtSettlement},
        resilience::{CircuitBreakerConfig, CircuitState},
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    type Reply = Result<HttpResponse, TransportError>;

    /// Scripted transport: pops replies in order, repeating the last one.
    struct FakeTransport {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn always(reply: Reply) -> Arc<Self> {
            Self::new(vec![reply])
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn send(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(req.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                replies.front().cloned().unwrap()
            }
        }
    }

    fn ok_json(v: Value) -> Reply {
        Ok(HttpResponse::new(200, v.to_string()))
    }

    fn success_reply() -> Reply {
        ok_json(json!({"success": true, "data": {"payment_id": "p1", "qr_code": "Q"}}))
    }

    fn gateway(transport: Arc<FakeTransport>, threshold: u32) -> PaymentGateway {
        let breaker = Arc::new(CircuitBreaker::new(
            "pix",
            CircuitBreakerConfig::default()
                .with_failure_threshold(threshold)
                .with_recovery_timeout(Duration::from_secs(60)),
        ));
        PaymentGateway::new(
            GatewayConfig {
                base_url: "https://pay.example/api/".to_string(),
                api_key: "sk_test".to_string(),
                currency: "BRL".to_string(),
                retry: RetryPolicy::new(2, Duration::from_millis(300)),
            },
            transport,
            breaker,
        )
    }

    fn usdt() -> UsdtSettlement {
        UsdtSettlement::new(Some("TWallet1".to_string()), "TRC20", "BRL")
    }

    fn ten() -> Amount {
        Amount::from_cents(1000)
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_never_hits_the_network() {
        let t = FakeTransport::always(success_reply());
        let gw = gateway(t.clone(), 1);

        for (amount, desc) in [
            (Amount::from_cents(0), "VIP"),
            (Amount::from_cents(-100), "VIP"),
            (ten(), "   "),
            (ten(), ""),
        ] {
            let out = gw.create_charge(amount, desc, None, Some(&usdt())).await;
            assert!(
                matches!(out, ChargeResult::Failed(PaymentError::Validation(_))),
                "got {out:?}"
            );
        }
        assert_eq!(t.calls(), 0);
        assert_eq!(gw.breaker().snapshot().failure_count, 0);
        assert_eq!(gw.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn creates_charge_end_to_end() {
        let t = FakeTransport::always(success_reply());
        let gw = gateway(t.clone(), 3);

        let mut payer = PayerInfo::new();
        payer.insert("telegram_user_id".to_string(), json!(42));

        let out = gw.create_charge(ten(), " VIP ", Some(&payer), None).await;
        assert_eq!(
            out,
            ChargeResult::Succeeded {
                charge_id: "p1".to_string(),
                display_code: "Q".to_string(),
                amount: ten(),
            }
        );

        let req = t.last_request();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "https://pay.example/api/payment/create");
        assert_eq!(req.bearer.as_deref(), Some("sk_test"));
        let body = req.body.unwrap();
        assert_eq!(body["amount"], json!(10.0));
        assert_eq!(body["description"], json!("VIP"));
        assert_eq!(body["currency"], json!("BRL"));
        assert_eq!(body["telegram_user_id"], json!(42));
    }

    #[tokio::test(start_paused = true)]
    async fn payer_info_cannot_override_core_fields() {
        let t = FakeTransport::always(success_reply());
        let gw = gateway(t.clone(), 3);
        let mut payer = PayerInfo::new();
        payer.insert("amount".to_string(), json!(0.01));

        gw.create_charge(ten(), "VIP", Some(&payer), None).await;
        assert_eq!(t.last_request().body.unwrap()["amount"], json!(10.0));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_on_every_attempt_fall_back_to_usdt() {
        let t = FakeTransport::always(Err(TransportError::Timeout));
        let gw = gateway(t.clone(), 5);
        let start = Instant::now();

        let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
        match out {
            ChargeResult::FellBackToSecondary {
                instructions,
                cause,
            } => {
                assert_eq!(instructions.address, "TWallet1");
                assert_eq!(cause, PaymentError::Timeout);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        assert_eq!(t.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(900));
        // Exhausted retries count once toward the breaker.
        assert_eq!(gw.breaker().snapshot().failure_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_without_fallback_fails() {
        let t = FakeTransport::always(Err(TransportError::Timeout));
        let gw = gateway(t, 5);
        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert_eq!(out, ChargeResult::Failed(PaymentError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_blip_recovers_within_retries() {
        let t = FakeTransport::new(vec![
            Err(TransportError::Connect("reset".to_string())),
            success_reply(),
        ]);
        let gw = gateway(t.clone(), 1);
        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert!(out.is_success());
        assert_eq!(t.calls(), 2);
        assert_eq!(gw.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn api_error_envelope_does_not_fall_back() {
        let t = FakeTransport::always(ok_json(json!({"success": false, "error": "bad key"})));
        let gw = gateway(t.clone(), 5);

        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert_eq!(
            out,
            ChargeResult::Failed(PaymentError::Api {
                status: 200,
                message: "bad key".to_string()
            })
        );

        let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
        assert!(matches!(out, ChargeResult::Failed(PaymentError::Api { .. })));
        assert_eq!(t.calls(), 2, "API errors are not retried");
    }

    #[tokio::test(start_paused = true)]
    async fn http_error_status_uses_envelope_message() {
        let t = FakeTransport::always(Ok(HttpResponse::new(
            500,
            json!({"success": false, "message": "internal"}).to_string(),
        )));
        let gw = gateway(t, 5);
        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert_eq!(
            out,
            ChargeResult::Failed(PaymentError::Api {
                status: 500,
                message: "internal".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connection_failures_are_not_rerouted() {
        let t = FakeTransport::always(Err(TransportError::Connect("refused".to_string())));
        let gw = gateway(t.clone(), 5);
        let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
        assert!(matches!(out, ChargeResult::Failed(PaymentError::Connection(_))));
        assert_eq!(t.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_reads_retry_after() {
        let t = FakeTransport::always(Ok(
            HttpResponse::new(429, "slow down").with_header("Retry-After", "45")
        ));
        let gw = gateway(t.clone(), 5);
        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert_eq!(
            out,
            ChargeResult::Failed(PaymentError::RateLimited {
                retry_after: Duration::from_secs(45)
            })
        );
        assert_eq!(t.calls(), 1, "429 must not consume retries");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_defaults_to_sixty_seconds() {
        for resp in [
            HttpResponse::new(429, ""),
            HttpResponse::new(429, "").with_header("retry-after", "soon"),
        ] {
            let gw = gateway(FakeTransport::always(Ok(resp)), 5);
            let out = gw.create_charge(ten(), "VIP", None, None).await;
            assert_eq!(
                out,
                ChargeResult::Failed(PaymentError::RateLimited {
                    retry_after: DEFAULT_RETRY_AFTER
                })
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_falls_back_when_configured() {
        let t = FakeTransport::always(Ok(HttpResponse::new(429, "")));
        let gw = gateway(t, 1);
        let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
        assert!(matches!(out, ChargeResult::FellBackToSecondary { .. }));
        // Rate limits are not breaker failures by default.
        assert_eq!(gw.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_success_is_a_failure() {
        for body in [
            "not json".to_string(),
            json!({"ok": true}).to_string(),
            json!({"success": true}).to_string(),
            json!({"success": true, "data": {"qr_code": "Q"}}).to_string(),
            json!({"success": true, "data": {"payment_id": "p1"}}).to_string(),
        ] {
            let t = FakeTransport::always(Ok(HttpResponse::new(200, body.clone())));
            let gw = gateway(t, 5);
            let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
            assert!(
                matches!(out, ChargeResult::Failed(PaymentError::ResponseShape(_))),
                "body {body:?} gave {out:?}"
            );
            assert_eq!(gw.breaker().snapshot().failure_count, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_fails_fast_then_probes_after_recovery() {
        let t = FakeTransport::new(vec![
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            Err(TransportError::Timeout),
            success_reply(),
        ]);
        let gw = gateway(t.clone(), 2);

        for _ in 0..2 {
            let out = gw.create_charge(ten(), "VIP", None, None).await;
            assert_eq!(out, ChargeResult::Failed(PaymentError::Timeout));
        }
        assert_eq!(gw.breaker().state(), CircuitState::Open);
        assert_eq!(t.calls(), 6);

        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert!(matches!(out, ChargeResult::Failed(PaymentError::CircuitOpen(_))));
        let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
        assert!(matches!(
            out,
            ChargeResult::FellBackToSecondary {
                cause: PaymentError::CircuitOpen(_),
                ..
            }
        ));
        assert_eq!(t.calls(), 6, "no network call while open");

        tokio::time::advance(Duration::from_secs(61)).await;
        let out = gw.create_charge(ten(), "VIP", None, None).await;
        assert!(out.is_success(), "probe should succeed, got {out:?}");
        let snap = gw.breaker().snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_fallback_yields_failed() {
        let t = FakeTransport::always(Err(TransportError::Timeout));
        let gw = gateway(t, 5);
        let unconfigured = UsdtSettlement::new(None, "TRC20", "BRL");
        let out = gw.create_charge(ten(), "VIP", None, Some(&unconfigured)).await;
        assert!(matches!(out, ChargeResult::Failed(PaymentError::Fallback(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_transport_errors_are_not_retried_or_counted() {
        let t = FakeTransport::always(Err(TransportError::Other("builder error".to_string())));
        let gw = gateway(t.clone(), 1);
        let out = gw.create_charge(ten(), "VIP", None, Some(&usdt())).await;
        assert!(matches!(out, ChargeResult::Failed(PaymentError::Unexpected(_))));
        assert_eq!(t.calls(), 1);
        assert_eq!(gw.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn reads_payment_status_and_qr() {
        let t = FakeTransport::new(vec![
            ok_json(json!({"status": "approved"})),
            ok_json(json!({"data": {"status": "pending"}})),
            ok_json(json!({"qr_code": "000201..."})),
        ]);
        let gw = gateway(t.clone(), 3);

        assert_eq!(gw.payment_status("p1").await, Ok(PaymentStatus::Paid));
        assert_eq!(
            t.last_request().url,
            "https://pay.example/api/payment/p1/status"
        );
        assert_eq!(t.last_request().method, Method::Get);
        assert_eq!(gw.payment_status("p1").await, Ok(PaymentStatus::Pending));
        assert_eq!(gw.qr_code("p-1_a").await, Ok("000201...".to_string()));
        assert_eq!(t.last_request().url, "https://pay.example/api/payment/p-1_a/qr");
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_unsafe_payment_ids_locally() {
        let t = FakeTransport::always(ok_json(json!({"status": "paid"})));
        let gw = gateway(t.clone(), 3);
        for id in ["", "../admin", "p1?x=1", "a b"] {
            assert!(matches!(
                gw.payment_status(id).await,
                Err(PaymentError::Validation(_))
            ));
        }
        assert_eq!(t.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn status_without_status_field_is_malformed() {
        let t = FakeTransport::always(ok_json(json!({"state": "paid"})));
        let gw = gateway(t, 3);
        assert!(matches!(
            gw.payment_status("p1").await,
            Err(PaymentError::ResponseShape(_))
        ));
    }

    #[test]
    fn numeric_ids_and_gateway_amounts_are_accepted() {
        let resp = HttpResponse::new(
            200,
            json!({"success": true, "data": {"id": 991, "pix_code": "PIX", "amount": 12.5}})
                .to_string(),
        );
        let charge = parse_charge(&resp).unwrap();
        assert_eq!(charge.charge_id, "991");
        assert_eq!(charge.display_code, "PIX");
        assert_eq!(charge.amount, Some(Amount::from_cents(1250)));
    }
}

//! RPC transport client (spec §4.3): JSON-RPC 2.0 over HTTP POST, bounded
//! exponential-backoff retry, and a per-endpoint circuit breaker.
//!
//! The pooled-client and global-registry shape mirrors the teacher's
//! `clients/http_pool.rs` `Lazy<Mutex<HashMap<String, reqwest::Client>>>`;
//! the error-log-then-propagate shape at each call site mirrors
//! `clients/common.rs`'s `send_and_track`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde_json::Value;
use uuid::Uuid;

const BACKOFF_SCHEDULE_MS: [u64; 3] = [1000, 2000, 4000];
const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
const CIRCUIT_RESET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum TransportError {
    Timeout,
    Connection(String),
    CircuitOpen { endpoint: String },
    Decode(String),
    RpcError { code: i64, message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "rpc call timed out"),
            TransportError::Connection(reason) => write!(f, "connection error: {reason}"),
            TransportError::CircuitOpen { endpoint } => {
                write!(f, "circuit open for endpoint {endpoint}")
            }
            TransportError::Decode(reason) => write!(f, "response decode error: {reason}"),
            TransportError::RpcError { code, message } => {
                write!(f, "rpc error {code}: {message}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitPhase {
    Closed,
    Open,
    HalfOpen,
}

struct CircuitBreaker {
    phase: Mutex<CircuitPhase>,
    consecutive_failures: Mutex<u32>,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    fn new() -> Self {
        CircuitBreaker {
            phase: Mutex::new(CircuitPhase::Closed),
            consecutive_failures: Mutex::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// `true` if a call may proceed right now. An `Open` breaker whose reset
    /// timeout has elapsed transitions to `HalfOpen` and allows exactly one
    /// probe through.
    fn allow_request(&self) -> bool {
        let mut phase = self.phase.lock().unwrap();
        match *phase {
            CircuitPhase::Closed => true,
            CircuitPhase::HalfOpen => false,
            CircuitPhase::Open => {
                let opened_at = self.opened_at.lock().unwrap();
                if opened_at.map(|t| t.elapsed() >= CIRCUIT_RESET_TIMEOUT).unwrap_or(false) {
                    *phase = CircuitPhase::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        *self.phase.lock().unwrap() = CircuitPhase::Closed;
        *self.consecutive_failures.lock().unwrap() = 0;
        *self.opened_at.lock().unwrap() = None;
    }

    fn record_failure(&self) {
        let mut phase = self.phase.lock().unwrap();
        if *phase == CircuitPhase::HalfOpen {
            *phase = CircuitPhase::Open;
            *self.opened_at.lock().unwrap() = Some(Instant::now());
            return;
        }
        let mut failures = self.consecutive_failures.lock().unwrap();
        *failures += 1;
        if *failures >= CIRCUIT_FAILURE_THRESHOLD {
            *phase = CircuitPhase::Open;
            *self.opened_at.lock().unwrap() = Some(Instant::now());
        }
    }
}

static CIRCUIT_BREAKERS: Lazy<Mutex<HashMap<String, Arc<CircuitBreaker>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn breaker_for(endpoint: &str) -> Arc<CircuitBreaker> {
    let mut registry = CIRCUIT_BREAKERS.lock().unwrap();
    registry
        .entry(endpoint.to_string())
        .or_insert_with(|| Arc::new(CircuitBreaker::new()))
        .clone()
}

static HTTP_CLIENTS: Lazy<Mutex<HashMap<String, reqwest::Client>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn client_for(base_url: &str, timeout: Duration) -> reqwest::Client {
    let mut pool = HTTP_CLIENTS.lock().unwrap();
    pool.entry(base_url.to_string())
        .or_insert_with(|| {
            reqwest::Client::builder()
                .timeout(timeout)
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(10)
                .build()
                .expect("failed to build reqwest client")
        })
        .clone()
}

/// Send a `league.v2` message as a JSON-RPC 2.0 request and return the
/// decoded `result` value on success.
///
/// `method` is the payload's `message_type` and `params` is the full
/// envelope-plus-payload object. Retries up to `max_retries` times
/// (`LeagueConfig::max_retries`), cycling through [`BACKOFF_SCHEDULE_MS`]
/// for the delay between attempts; a request against a breaker that is
/// `Open` fails fast without touching the network.
pub async fn send_rpc(
    endpoint: &str,
    method: &str,
    params: Value,
    timeout: Duration,
    max_retries: u32,
) -> Result<Value, TransportError> {
    let breaker = breaker_for(endpoint);
    if !breaker.allow_request() {
        return Err(TransportError::CircuitOpen {
            endpoint: endpoint.to_string(),
        });
    }

    let client = client_for(endpoint, timeout);
    let request_id = Uuid::new_v4().to_string();
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": request_id,
        "method": method,
        "params": params,
    });

    let mut last_err = TransportError::Connection("no attempt made".to_string());
    for attempt in 0..=max_retries {
        let backoff_ms = BACKOFF_SCHEDULE_MS[attempt as usize % BACKOFF_SCHEDULE_MS.len()];
        match client.post(endpoint).json(&body).send().await {
            Ok(response) => match response.json::<Value>().await {
                Ok(envelope) => {
                    if let Some(error) = envelope.get("error") {
                        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
                        let message = error
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or("unknown rpc error")
                            .to_string();
                        breaker.record_failure();
                        if log::log_enabled!(log::Level::Warn) {
                            log::warn!("rpc call to {endpoint} returned error {code}: {message}");
                        }
                        return Err(TransportError::RpcError { code, message });
                    }
                    breaker.record_success();
                    return Ok(envelope.get("result").cloned().unwrap_or(Value::Null));
                }
                Err(e) => {
                    last_err = TransportError::Decode(e.to_string());
                }
            },
            Err(e) => {
                if log::log_enabled!(log::Level::Error) {
                    log::error!("rpc call to {endpoint} failed (attempt {attempt}): {e}");
                }
                last_err = if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connection(e.to_string())
                };
            }
        }
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }

    breaker.record_failure();
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new();
        assert!(breaker.allow_request());
        for _ in 0..CIRCUIT_FAILURE_THRESHOLD {
            breaker.record_failure();
        }
        assert!(!breaker.allow_request());
    }

    #[test]
    fn breaker_closes_on_success() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert!(breaker.allow_request());
        assert_eq!(*breaker.consecutive_failures.lock().unwrap(), 0);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let breaker = CircuitBreaker::new();
        for _ in 0..CIRCUIT_FAILURE_THRESHOLD {
            breaker.record_failure();
        }
        *breaker.phase.lock().unwrap() = CircuitPhase::HalfOpen;
        breaker.record_failure();
        assert_eq!(*breaker.phase.lock().unwrap(), CircuitPhase::Open);
    }

    #[tokio::test]
    async fn send_rpc_fails_fast_when_circuit_open() {
        let endpoint = "http://127.0.0.1:1/unreachable-circuit-test";
        let breaker = breaker_for(endpoint);
        for _ in 0..CIRCUIT_FAILURE_THRESHOLD {
            breaker.record_failure();
        }
        let result = send_rpc(
            endpoint,
            "LEAGUE_REGISTER_REQUEST",
            serde_json::json!({}),
            Duration::from_millis(50),
            3,
        )
        .await;
        assert!(matches!(result, Err(TransportError::CircuitOpen { .. })));
    }
}

//! Generic RPC server scaffold (SPEC_FULL §4.11): a pluggable adapter trait
//! generalizing the teacher's `HttpServerAdapter`/`MCPServerBuilder` pair,
//! plus one [`RpcHandler`] implemented per agent role.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use league_protocol::payload::LeagueError;
use league_protocol::{AuthTokenService, ErrorCode, Envelope, Payload, ProtocolError};

use crate::security::IpFilter;

/// Message types whose sender has no token yet — everything else must
/// carry a valid bearer token before it reaches a [`RpcHandler`] (spec
/// §4.2/§8 invariant 6/S5).
const UNAUTHENTICATED_MESSAGE_TYPES: &[&str] =
    &["REFEREE_REGISTER_REQUEST", "LEAGUE_REGISTER_REQUEST"];

/// Token validation context for one bound RPC surface: the service that
/// knows the process's auth secret, and the league id every token on this
/// surface must be scoped to.
pub struct AuthContext {
    pub service: Arc<AuthTokenService>,
    pub league_id: String,
}

/// Outcome of dispatching one decoded message: the JSON-RPC `result` value
/// on success, or a `(code, message)` pair to surface as a JSON-RPC error.
pub type HandlerResult = Result<serde_json::Value, (i64, String)>;

/// Implemented once per agent role (manager, referee, player). Given a
/// validated envelope and its matching payload, decide how to respond.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope, payload: Payload) -> HandlerResult;
}

pub struct RpcServerConfig {
    pub addr: SocketAddr,
    pub ip_filter: IpFilter,
    /// `None` disables token validation on this surface entirely; used by
    /// callers that have no league id yet (e.g. before registration
    /// completes) and by tests.
    pub auth: Option<AuthContext>,
}

pub struct RpcServerInstance {
    addr: SocketAddr,
    shutdown_handle: Box<dyn std::any::Any + Send + Sync>,
}

impl RpcServerInstance {
    pub fn new(addr: SocketAddr, shutdown_handle: Box<dyn std::any::Any + Send + Sync>) -> Self {
        RpcServerInstance { addr, shutdown_handle }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown_handle_mut(&mut self) -> &mut Box<dyn std::any::Any + Send + Sync> {
        &mut self.shutdown_handle
    }
}

#[async_trait]
pub trait RpcServerAdapter: Send + Sync {
    async fn start(
        &self,
        config: RpcServerConfig,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<RpcServerInstance, Box<dyn Error + Send + Sync>>;

    fn name(&self) -> &str {
        "unknown"
    }
}

fn protocol_error_code(err: &ProtocolError) -> i64 {
    match err {
        ProtocolError::UnknownProtocol(_) => -32600,
        ProtocolError::InvalidTimestamp(_) => -32602,
        ProtocolError::InvalidSender(_) => -32602,
        ProtocolError::UnknownMessageType(_) => -32601,
        ProtocolError::SchemaViolation { .. } => -32602,
    }
}

pub struct AxumRpcAdapter;

#[async_trait]
impl RpcServerAdapter for AxumRpcAdapter {
    async fn start(
        &self,
        config: RpcServerConfig,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<RpcServerInstance, Box<dyn Error + Send + Sync>> {
        use axum::{extract::ConnectInfo, routing::post, Json, Router};
        use serde_json::{json, Value};
        use tokio::net::TcpListener;

        let ip_filter = Arc::new(config.ip_filter);
        let auth = Arc::new(config.auth);
        let route_handler = handler.clone();
        let route_filter = ip_filter.clone();
        let route_auth = auth.clone();

        let app = Router::new()
            .route(
                "/rpc",
                post(
                    move |ConnectInfo(addr): ConnectInfo<SocketAddr>, Json(request): Json<Value>| {
                        let handler = route_handler.clone();
                        let filter = route_filter.clone();
                        let auth = route_auth.clone();
                        async move {
                            if !filter.is_allowed(addr.ip()) {
                                return Json(json!({
                                    "jsonrpc": "2.0",
                                    "id": request.get("id").cloned().unwrap_or(Value::Null),
                                    "error": {"code": -32000, "message": "access denied"}
                                }));
                            }

                            let id = request.get("id").cloned().unwrap_or(Value::Null);
                            let params = match request.get("params") {
                                Some(p) => p.clone(),
                                None => {
                                    return Json(json!({
                                        "jsonrpc": "2.0",
                                        "id": id,
                                        "error": {"code": -32602, "message": "missing params"}
                                    }))
                                }
                            };

                            match league_protocol::decode(&params) {
                                Ok((envelope, payload)) => {
                                    if let Some(ctx) = auth.as_ref() {
                                        if !UNAUTHENTICATED_MESSAGE_TYPES.contains(&payload.message_type()) {
                                            let role = match envelope.validate() {
                                                Ok((role, _)) => role,
                                                Err(e) => {
                                                    return Json(json!({
                                                        "jsonrpc": "2.0",
                                                        "id": id,
                                                        "error": {"code": -32602, "message": e.to_string()},
                                                    }));
                                                }
                                            };
                                            if let Err(e) = ctx.service.validate(&envelope.auth_token, &ctx.league_id, role) {
                                                if log::log_enabled!(log::Level::Warn) {
                                                    log::warn!("rejected {} from {}: {e}", payload.message_type(), envelope.sender);
                                                }
                                                let league_error = Payload::LeagueError(LeagueError {
                                                    error_code: ErrorCode::AuthTokenInvalid,
                                                    error_description: e.to_string(),
                                                    context: None,
                                                });
                                                return Json(json!({
                                                    "jsonrpc": "2.0",
                                                    "id": id,
                                                    "result": serde_json::to_value(&league_error).unwrap_or(Value::Null),
                                                }));
                                            }
                                        }
                                    }
                                    match handler.handle(envelope, payload).await {
                                        Ok(result) => Json(json!({
                                            "jsonrpc": "2.0",
                                            "id": id,
                                            "result": result,
                                        })),
                                        Err((code, message)) => {
                                            if log::log_enabled!(log::Level::Warn) {
                                                log::warn!("rpc handler error {code}: {message}");
                                            }
                                            Json(json!({
                                                "jsonrpc": "2.0",
                                                "id": id,
                                                "error": {"code": code, "message": message},
                                            }))
                                        }
                                    }
                                }
                                Err(e) => {
                                    if log::log_enabled!(log::Level::Warn) {
                                        log::warn!("rejected malformed message from {}: {e}", addr.ip());
                                    }
                                    Json(json!({
                                        "jsonrpc": "2.0",
                                        "id": id,
                                        "error": {"code": protocol_error_code(&e), "message": e.to_string()},
                                    }))
                                }
                            }
                        }
                    },
                ),
            )
            .into_make_service_with_connect_info::<SocketAddr>();

        let listener = TcpListener::bind(config.addr).await?;
        let addr = listener.local_addr()?;

        if log::log_enabled!(log::Level::Info) {
            log::info!("rpc server listening on {addr}");
        }

        let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

        Ok(RpcServerInstance::new(addr, Box::new(server_handle)))
    }

    fn name(&self) -> &str {
        "axum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_type_maps_to_method_not_found() {
        let err = ProtocolError::UnknownMessageType("X".to_string());
        assert_eq!(protocol_error_code(&err), -32601);
    }

    #[test]
    fn schema_violation_maps_to_invalid_params() {
        let err = ProtocolError::SchemaViolation {
            message_type: "GAME_OVER".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(protocol_error_code(&err), -32602);
    }
}

//! Referee agent daemon (spec §4.12): registers with the league manager,
//! binds its own RPC surface, and runs whatever matches `ROUND_ANNOUNCEMENT`
//! assigns it. Argument parsing only.

use std::net::SocketAddr;
use std::sync::Arc;

use uuid::Uuid;

use evenodd_league::config::LeagueConfig;
use evenodd_league::handlers::RefereeHandler;
use evenodd_league::rpc_server::{AuthContext, AxumRpcAdapter, RpcServerAdapter, RpcServerConfig};
use evenodd_league::security::IpFilter;
use evenodd_league::transport;
use league_protocol::AuthTokenService;

fn usage() -> ! {
    eprintln!("usage: referee_agent <manager_endpoint> <bind_addr> <public_endpoint>");
    eprintln!(
        "example: referee_agent http://127.0.0.1:9000/rpc 127.0.0.1:9100 http://127.0.0.1:9100/rpc"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let manager_endpoint = args.next().unwrap_or_else(|| usage());
    let bind_addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| usage())
        .parse()
        .map_err(|e| format!("invalid bind address: {e}"))?;
    let public_endpoint = args.next().unwrap_or_else(|| usage());

    let config = Arc::new(LeagueConfig::default());

    let register_params = serde_json::json!({
        "protocol": "league.v2",
        "message_type": "REFEREE_REGISTER_REQUEST",
        "sender": format!("referee:pending-{}", Uuid::new_v4()),
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "conversation_id": Uuid::new_v4().to_string(),
        "auth_token": "",
        "referee_meta": {
            "display_name": "evenodd-referee",
            "version": env!("CARGO_PKG_VERSION"),
            "game_types": ["even_odd"],
            "contact_endpoint": public_endpoint.clone(),
            "max_concurrent_matches": 4,
        }
    });
    let response = transport::send_rpc(
        &manager_endpoint,
        "REFEREE_REGISTER_REQUEST",
        register_params,
        config.rpc_timeout,
        config.max_retries,
    )
    .await?;
    let referee_id = response
        .get("referee_id")
        .and_then(|v| v.as_str())
        .ok_or("manager did not return a referee_id")?
        .to_string();
    let league_id = response
        .get("league_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let auth_token = response
        .get("auth_token")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    println!("registered as {referee_id}");

    let auth_service = Arc::new(AuthTokenService::new(
        &config.auth_secret,
        config.auth_token_ttl.as_secs() as i64,
    ));
    let handler_impl = Arc::new(RefereeHandler::new(
        referee_id.clone(),
        league_id.clone(),
        config,
        manager_endpoint,
        public_endpoint,
    ));
    handler_impl.set_auth_token(auth_token);
    let handler: Arc<dyn evenodd_league::rpc_server::RpcHandler> = handler_impl;

    let auth = AuthContext { service: auth_service, league_id };
    let instance = AxumRpcAdapter
        .start(
            RpcServerConfig { addr: bind_addr, ip_filter: IpFilter::new(), auth: Some(auth) },
            handler,
        )
        .await?;
    println!("referee \"{referee_id}\" listening on {}", instance.addr());

    std::future::pending::<()>().await;
    Ok(())
}

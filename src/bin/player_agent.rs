//! Player agent daemon (spec §4.12): registers with the league manager,
//! binds its own RPC surface, and answers `GAME_INVITATION` /
//! `CHOOSE_PARITY_CALL` using a fixed or alternating strategy. Argument
//! parsing only.

use std::net::SocketAddr;
use std::sync::Arc;

use uuid::Uuid;

use evenodd_league::config::LeagueConfig;
use evenodd_league::handlers::PlayerHandler;
use evenodd_league::player::{AlternatingStrategy, FixedStrategy, PlayerAgent, Strategy};
use evenodd_league::rpc_server::{AuthContext, AxumRpcAdapter, RpcServerAdapter, RpcServerConfig};
use evenodd_league::security::IpFilter;
use evenodd_league::transport;
use league_protocol::payload::Parity;
use league_protocol::AuthTokenService;

fn usage() -> ! {
    eprintln!("usage: player_agent <manager_endpoint> <bind_addr> <public_endpoint> [even|odd|alternating]");
    eprintln!(
        "example: player_agent http://127.0.0.1:9000/rpc 127.0.0.1:9200 http://127.0.0.1:9200/rpc even"
    );
    std::process::exit(2);
}

fn parse_strategy(arg: Option<String>) -> Box<dyn Strategy> {
    match arg.as_deref() {
        None | Some("even") => Box::new(FixedStrategy(Parity::Even)),
        Some("odd") => Box::new(FixedStrategy(Parity::Odd)),
        Some("alternating") => Box::new(AlternatingStrategy::starting_with(Parity::Even)),
        Some(other) => {
            eprintln!("unknown strategy \"{other}\", falling back to even");
            Box::new(FixedStrategy(Parity::Even))
        }
    }
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
    let strategy = parse_strategy(args.next());

    let config = Arc::new(LeagueConfig::default());

    let register_params = serde_json::json!({
        "protocol": "league.v2",
        "message_type": "LEAGUE_REGISTER_REQUEST",
        "sender": format!("player:pending-{}", Uuid::new_v4()),
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "conversation_id": Uuid::new_v4().to_string(),
        "auth_token": "",
        "player_meta": {
            "display_name": "evenodd-player",
            "version": env!("CARGO_PKG_VERSION"),
            "game_types": ["even_odd"],
            "contact_endpoint": public_endpoint.clone(),
        }
    });
    let response = transport::send_rpc(
        &manager_endpoint,
        "LEAGUE_REGISTER_REQUEST",
        register_params,
        config.rpc_timeout,
        config.max_retries,
    )
    .await?;
    let player_id = response
        .get("player_id")
        .and_then(|v| v.as_str())
        .ok_or("manager did not return a player_id")?
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

    println!("registered as {player_id}");

    let auth_service = Arc::new(AuthTokenService::new(
        &config.auth_secret,
        config.auth_token_ttl.as_secs() as i64,
    ));
    let agent = Arc::new(PlayerAgent::new(strategy));
    agent.on_registered(player_id.clone(), league_id.clone(), auth_token);
    let handler: Arc<dyn evenodd_league::rpc_server::RpcHandler> =
        Arc::new(PlayerHandler { agent });

    let auth = AuthContext { service: auth_service, league_id };
    let instance = AxumRpcAdapter
        .start(
            RpcServerConfig { addr: bind_addr, ip_filter: IpFilter::new(), auth: Some(auth) },
            handler,
        )
        .await?;
    println!("player \"{player_id}\" listening on {}", instance.addr());

    std::future::pending::<()>().await;
    Ok(())
}

//! League Manager daemon (spec §4.12): binds the manager's RPC surface and
//! offers a thin stdin command line to start the league and advance rounds.
//! Argument parsing only — all orchestration logic lives in
//! [`evenodd_league::manager::LeagueManager`].

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;

use evenodd_league::config::LeagueConfig;
use evenodd_league::handlers::ManagerHandler;
use evenodd_league::logging::JsonlLogger;
use evenodd_league::manager::LeagueManager;
use evenodd_league::rpc_server::{AuthContext, AxumRpcAdapter, RpcServerAdapter, RpcServerConfig};
use evenodd_league::security::IpFilter;

fn usage() -> ! {
    eprintln!("usage: league_manager <league_id> <bind_addr>");
    eprintln!("example: league_manager demo-league 127.0.0.1:9000");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let league_id = args.next().unwrap_or_else(|| usage());
    let bind_addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| usage())
        .parse()
        .map_err(|e| format!("invalid bind address: {e}"))?;

    let config = Arc::new(LeagueConfig::default());
    let audit_log = JsonlLogger::open(&config.log_dir, &league_id)
        .map(Arc::new)
        .ok();
    let manager = Arc::new(LeagueManager::new(league_id.clone(), config));
    let handler: Arc<dyn evenodd_league::rpc_server::RpcHandler> =
        Arc::new(ManagerHandler { manager: manager.clone(), audit_log });

    let auth = AuthContext { service: manager.auth_service(), league_id: league_id.clone() };
    let instance = AxumRpcAdapter
        .start(
            RpcServerConfig { addr: bind_addr, ip_filter: IpFilter::new(), auth: Some(auth) },
            handler,
        )
        .await?;
    println!("league manager \"{league_id}\" listening on {}", instance.addr());
    println!("commands: start-league | announce-round <index> | quit");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line == "quit" {
            break;
        } else if line == "start-league" {
            match manager.start_league() {
                Ok(rounds) => println!("schedule built: {rounds} rounds"),
                Err(e) => eprintln!("failed to start league: {e}"),
            }
        } else if let Some(index) = line.strip_prefix("announce-round ") {
            match index.trim().parse::<usize>() {
                Ok(round_index) => match manager.announce_round(round_index).await {
                    Ok((round_id, matches)) => {
                        println!("announced {round_id} with {} matches", matches.len())
                    }
                    Err(e) => eprintln!("failed to announce round: {e}"),
                },
                Err(_) => eprintln!("usage: announce-round <index>"),
            }
        } else if !line.is_empty() {
            eprintln!("unknown command: {line}");
        }
    }

    Ok(())
}

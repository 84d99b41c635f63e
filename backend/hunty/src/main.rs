//! Hunty backend — entry point.
//!
//! Wires the wallet bridge, Soroban RPC client, registration service and
//! local hunt store together and serves them over a small Axum REST API.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hunty::api::{self, ApiState};
use hunty::cache::RegistrationCache;
use hunty::clock::{Clock, SystemClock};
use hunty::config::Config;
use hunty::db;
use hunty::hunts::HuntClient;
use hunty::ledger::{LedgerSubmitter, SubmitterSettings};
use hunty::registration::RegistrationService;
use hunty::rpc::{LedgerRpc, SorobanRpc};
use hunty::store::HuntStore;
use hunty::wallet::{BridgeWallet, WalletRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = db::init_pool(&config.database_url).await?;
    let store = HuntStore::new(pool);

    // Shared by the RPC client and the wallet bridge.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let rpc: Arc<dyn LedgerRpc> = Arc::new(SorobanRpc::new(client.clone(), &config.rpc_url));
    match rpc.get_health().await {
        Ok(status) => info!("Soroban RPC {} is {status}", config.rpc_url),
        Err(e) => warn!("Soroban RPC {} unreachable at startup: {e}", config.rpc_url),
    }

    let mut wallets = WalletRegistry::new();
    match &config.wallet_bridge_url {
        Some(url) => {
            info!("Using wallet bridge at {url}");
            wallets = wallets.with(Arc::new(BridgeWallet::new(client, url.clone())));
        }
        None => warn!("WALLET_BRIDGE_URL not set; ledger actions will report no wallet"),
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let submitter = Arc::new(LedgerSubmitter::new(
        wallets,
        rpc.clone(),
        clock.clone(),
        SubmitterSettings {
            network_passphrase: config.network_passphrase.clone(),
            base_fee: config.tx_base_fee,
            timeout_secs: config.tx_timeout_secs,
        },
    ));

    let registration = Arc::new(RegistrationService::new(
        Arc::new(RegistrationCache::new(config.cache_ttl(), clock.clone())),
        config.retry_policy(),
        submitter.clone(),
        Arc::new(store.clone()),
    ));
    let hunts = Arc::new(HuntClient::new(submitter, store.clone(), clock.clone()));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(ApiState {
        store,
        hunts,
        registration,
        rpc,
        clock,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/hunts", get(api::list_hunts).post(api::create_hunt))
        .route("/hunts/:id", get(api::get_hunt))
        .route("/hunts/:id/status", put(api::set_hunt_status))
        .route("/hunts/:id/activate", post(api::activate_hunt))
        .route("/hunts/:id/cancel", post(api::cancel_hunt))
        .route("/hunts/:id/clues", get(api::list_clues).post(api::add_clues))
        .route("/hunts/:id/clues/:clue_id/check", post(api::check_answer))
        .route("/hunts/:id/answers", post(api::submit_answer))
        .route(
            "/hunts/:id/players/:address/registration",
            get(api::registration_status).post(api::register_player),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

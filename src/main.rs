//! CS2 skin arbitrage monitor entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skin_arb::alert::{Dispatcher, LogNotifier, Notifier, WebhookNotifier};
use skin_arb::api::{create_router, AppState};
use skin_arb::catalog::Resolver;
use skin_arb::config::Config;
use skin_arb::detector::Detector;
use skin_arb::marketplace::{build_adapters, build_http_client, ItemFilter};
use skin_arb::scheduler::{poll_once, Scheduler};
use skin_arb::store::PriceStore;
use skin_arb::utils::shutdown_signal;
use skin_arb::{metrics, AppError};

/// CS2 skin cross-marketplace arbitrage monitor.
#[derive(Parser, Debug)]
#[command(name = "skin-arb")]
#[command(about = "Monitors CS2 skin marketplaces for fee-adjusted price spreads")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor: poll loops, detection, HTTP API (default).
    Run {
        /// HTTP server port, overriding configuration.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Resolve an item name to its canonical identity.
    Resolve {
        /// Item name, e.g. "AK-47 | Redline (Field-Tested)".
        name: String,
    },

    /// Poll every marketplace once and print detected opportunities.
    Scan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("skin_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Resolve { name }) => cmd_resolve(&name).await,
        Some(Command::Scan) => cmd_scan().await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(None).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SKIN ARB MONITOR - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Loading watchlist... ");
    let watchlist = match config.watchlist() {
        Ok(w) => {
            println!("OK ({} items)", w.len());
            w
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Watchlist load failed"));
        }
    };

    print!("Checking watchlist names resolve... ");
    let resolver = Resolver::with_aliases(config.aliases()?);
    let mut bad = 0;
    for name in &watchlist {
        if resolver.lookup(name).is_err() {
            if bad == 0 {
                println!("FAILED");
            }
            println!("  Unresolvable: {}", name);
            bad += 1;
        }
    }
    if bad > 0 {
        return Err(anyhow::anyhow!("{bad} watchlist names do not resolve"));
    }
    println!("OK");

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Settlement Currency: {}", config.settlement_currency);
    println!(
        "  Profit Floors: {} minor units, {} bps",
        config.min_profit, config.min_profit_bps
    );
    println!(
        "  Re-alert: delta {} / cooldown {}s",
        config.realert_delta, config.realert_cooldown_secs
    );
    println!(
        "  Webhook: {}",
        if config.webhook_url.is_some() { "configured" } else { "disabled" }
    );
    for id in config.enabled_marketplace_ids()? {
        let profile = config.market_profile(id)?;
        println!(
            "  {}: fee {} bps (min {}), poll {}s, staleness {}s",
            id,
            profile.fee.percentage_bps,
            profile.fee.min_fee,
            profile.poll_interval.as_secs(),
            profile.max_staleness.as_secs(),
        );
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Resolve an item name to its canonical identity.
async fn cmd_resolve(name: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let resolver = Resolver::with_aliases(config.aliases()?);

    match resolver.lookup(name) {
        Ok(item) => {
            println!("Item ID:      {}", item.item_id);
            println!("Display Name: {}", item.display_name);
            println!("Weapon:       {}", item.weapon);
            println!("Skin:         {}", item.skin_name);
            println!("Wear:         {}", item.wear);
            println!("StatTrak:     {}", item.stattrak);
            println!("Souvenir:     {}", item.souvenir);
            Ok(())
        }
        Err(e) => {
            println!("Unresolvable: {}", e);
            Err(anyhow::anyhow!("Name did not resolve"))
        }
    }
}

/// Poll every marketplace once and print detected opportunities.
async fn cmd_scan() -> anyhow::Result<()> {
    let config = Config::load()?;
    let resolver = Arc::new(Resolver::with_aliases(config.aliases()?));
    let store = Arc::new(PriceStore::new(config.history_max_len));
    let detector = Detector::new(&config)?;
    let adapters = build_adapters(&config)?;
    let filter = ItemFilter::names(config.watchlist()?);
    let fetch_timeout = Duration::from_millis(config.fetch_timeout_ms);

    println!("Polling {} marketplaces...", adapters.len());
    let polls = adapters.iter().map(|adapter| async {
        let outcome = poll_once(&**adapter, &filter, &resolver, &store, fetch_timeout).await;
        (adapter.id(), outcome)
    });
    for (id, outcome) in futures::future::join_all(polls).await {
        match outcome {
            Ok(()) => println!("  {}: ok", id),
            Err(e) => println!("  {}: FAILED ({})", id, e),
        }
    }

    let opportunities = detector.run_pass(&store, OffsetDateTime::now_utc());
    if opportunities.is_empty() {
        println!("\nNo opportunities above the configured floors.");
        return Ok(());
    }

    println!("\n{} opportunities:", opportunities.len());
    for opp in &opportunities {
        let item = resolver
            .get(&opp.item_id)
            .map(|i| i.display_name)
            .unwrap_or_else(|| opp.item_id.to_string());
        println!(
            "  {item}: buy {} @ {} -> sell {} @ {} | net +{} ({} bps)",
            opp.buy_marketplace,
            opp.buy_price,
            opp.sell_marketplace,
            opp.sell_price,
            opp.net_profit,
            opp.net_profit_bps,
        );
    }

    Ok(())
}

/// Run the monitor: poll loops, detection, HTTP API.
async fn cmd_run(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        AppError::from(e)
    })?;

    if config.metrics_enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus exporter listening on {}", addr);
    }
    metrics::init_metrics();

    let resolver = Arc::new(Resolver::with_aliases(config.aliases()?));
    let store = Arc::new(PriceStore::new(config.history_max_len));
    let detector = Arc::new(Detector::new(&config)?);

    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(url) = &config.webhook_url {
        notifiers.push(Arc::new(WebhookNotifier::new(
            build_http_client(&config),
            url.clone(),
        )));
        info!("Webhook alerts enabled");
    }
    let dispatcher = Arc::new(Dispatcher::new(&config, notifiers));

    let adapters = build_adapters(&config)?;
    info!(
        marketplaces = adapters.len(),
        watchlist = config.watchlist()?.len(),
        "Pipeline assembled"
    );

    // HTTP API.
    let app_state = AppState::new(&config, store.clone(), detector.clone(), resolver.clone())?;
    let port = port_override.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Flip the shutdown flag when a signal arrives.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    app_state.set_ready(true);
    info!("========================================");
    info!("SKIN ARB MONITOR STARTED");
    info!("========================================");

    let scheduler = Scheduler::new(
        config,
        resolver,
        store,
        detector,
        dispatcher,
        adapters,
    );
    scheduler.run(shutdown_rx).await?;

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_surfaces_config_errors() {
        // A broken environment must fail the command, not silently fall
        // back to defaults and answer from the wrong alias table.
        std::env::set_var("MIN_PROFIT_BPS", "not-a-number");
        let result = tokio_test::block_on(cmd_resolve("AK-47 | Redline (Field-Tested)"));
        std::env::remove_var("MIN_PROFIT_BPS");
        assert!(result.is_err());
    }
}

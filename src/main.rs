mod api;
mod chart;
mod error;
mod ui;
mod watchlist;

use api::coingecko::CoinGeckoClient;
use chart::controller::ChartController;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::error::Error;
use std::io::Write;
use ui::dashboard::Dashboard;
use watchlist::WatchlistStore;

const DEFAULT_COIN: &str = "bitcoin";
const DEFAULT_BASE_PRICE: f64 = 50_000.0;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Logs go to stderr so they stay out of the TUI.
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("coindash", LevelFilter::Debug)
        .format(|buf, record| {
            let ts = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                ts,
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Always)
        .init();

    info!("Starting Coindash...");

    let client = CoinGeckoClient::new()?;
    let controller = ChartController::new(client.clone(), DEFAULT_COIN, DEFAULT_BASE_PRICE);

    let watchlist_path =
        std::env::var("COINDASH_WATCHLIST").unwrap_or_else(|_| "watchlist.json".to_string());
    let watchlist = WatchlistStore::load(watchlist_path);

    let mut dashboard = Dashboard::new(client, controller, watchlist);
    if let Err(e) = dashboard.run().await {
        log::error!("Dashboard error: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

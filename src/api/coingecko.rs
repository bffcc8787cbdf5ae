use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::MarketDataSource;
use crate::chart::range::FetchParams;
use crate::error::CoinDashError;

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const VS_CURRENCY: &str = "usd";

/// One row of the `/coins/markets` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub total_volume: f64,
    pub price_change_percentage_24h: Option<f64>,
}

/// Aggregates from `/global`, shown in the dashboard header.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalMarket {
    pub active_cryptocurrencies: u64,
    pub markets: u64,
    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: f64,
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalMarket,
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new() -> Result<CoinGeckoClient, CoinDashError> {
        Self::with_base_url(COINGECKO_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<CoinGeckoClient, CoinDashError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(CoinGeckoClient { http, base_url: base_url.into() })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, CoinDashError> {
        debug!("GET {} {:?}", url, query);
        let response = self.http.get(url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(CoinDashError::Network(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response.json::<Value>().await?)
    }

    /// Top coins by market cap, one page.
    pub async fn markets(
        &self,
        per_page: usize,
        page: usize,
    ) -> Result<Vec<CoinMarket>, CoinDashError> {
        let url = format!("{}/coins/markets", self.base_url);
        let per_page = per_page.to_string();
        let page = page.to_string();
        let raw = self
            .get_json(
                &url,
                &[
                    ("vs_currency", VS_CURRENCY),
                    ("order", "market_cap_desc"),
                    ("per_page", &per_page),
                    ("page", &page),
                    ("sparkline", "false"),
                ],
            )
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Listing rows for an explicit set of coin ids (the watchlist).
    pub async fn watchlist_markets(
        &self,
        ids: &[String],
    ) -> Result<Vec<CoinMarket>, CoinDashError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/coins/markets", self.base_url);
        let per_page = ids.len().to_string();
        let ids = ids.join(",");
        let raw = self
            .get_json(
                &url,
                &[
                    ("vs_currency", VS_CURRENCY),
                    ("ids", &ids),
                    ("order", "market_cap_desc"),
                    ("per_page", &per_page),
                    ("page", "1"),
                    ("sparkline", "false"),
                ],
            )
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn global(&self) -> Result<GlobalMarket, CoinDashError> {
        let url = format!("{}/global", self.base_url);
        let raw = self.get_json(&url, &[]).await?;
        let parsed: GlobalResponse = serde_json::from_value(raw)?;
        Ok(parsed.data)
    }
}

impl MarketDataSource for CoinGeckoClient {
    async fn market_chart(
        &self,
        coin_id: &str,
        params: &FetchParams,
    ) -> Result<Value, CoinDashError> {
        let url = format!("{}/coins/{}/market_chart", self.base_url, coin_id);
        let mut query: Vec<(&str, &str)> =
            vec![("vs_currency", VS_CURRENCY), ("days", params.days)];
        if let Some(interval) = params.interval {
            query.push(("interval", interval));
        }
        self.get_json(&url, &query).await
    }

    async fn ohlc(&self, coin_id: &str, days: &str) -> Result<Value, CoinDashError> {
        let url = format!("{}/coins/{}/ohlc", self.base_url, coin_id);
        self.get_json(&url, &[("vs_currency", VS_CURRENCY), ("days", days)])
            .await
    }
}

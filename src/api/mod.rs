pub mod coingecko;

use serde_json::Value;

use crate::chart::range::FetchParams;
use crate::error::CoinDashError;

/// Upstream source of chart payloads. Payloads are returned as raw JSON so
/// the normalizer can treat them as untrusted; the controller decides what
/// a failure means. Implemented by the CoinGecko client and by test stubs.
pub trait MarketDataSource {
    async fn market_chart(
        &self,
        coin_id: &str,
        params: &FetchParams,
    ) -> Result<Value, CoinDashError>;

    async fn ohlc(&self, coin_id: &str, days: &str) -> Result<Value, CoinDashError>;
}

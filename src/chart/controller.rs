//! Orchestrates the fetch → normalize → (on failure) generate cycle for
//! one mounted chart and owns its loading state, derived stats, advisory
//! message and auto-refresh timer. Live-data failures never surface as
//! hard errors: the chart always gets a bundle to draw, degraded or not.

use chrono::Utc;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tokio::time::{Duration, Instant};

use crate::api::MarketDataSource;
use crate::error::CoinDashError;

use super::normalize;
use super::range::TimeRange;
use super::{synthetic, ChartType, DerivedStats, SeriesBundle};

pub const DEGRADED_DATA_ADVISORY: &str =
    "Unable to load live data. Showing simulated chart data.";
pub const CANDLE_UNAVAILABLE_ADVISORY: &str =
    "Candlestick data unavailable. Switched to line chart.";

const DEFAULT_BASE_PRICE: f64 = 50_000.0;
const DEFAULT_BASE_MARKET_CAP: f64 = 1.0e11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
}

/// Deadline-based polling timer. Owned by the controller; dropping it is
/// the cancellation.
struct RefreshTimer {
    period: Duration,
    next_fire: Instant,
}

impl RefreshTimer {
    fn new(period: Duration) -> RefreshTimer {
        RefreshTimer { period, next_fire: Instant::now() + period }
    }

    fn due(&mut self, now: Instant) -> bool {
        if now >= self.next_fire {
            self.next_fire = now + self.period;
            true
        } else {
            false
        }
    }
}

pub struct ChartController<S> {
    source: S,
    coin_id: String,
    base_price: f64,
    time_range: TimeRange,
    chart_type: ChartType,
    state: LoadState,
    bundle: SeriesBundle,
    stats: Option<DerivedStats>,
    advisory: Option<String>,
    full_data_loaded: bool,
    auto_refresh: bool,
    refresh_timer: Option<RefreshTimer>,
    zoom_level: u16,
    request_seq: u64,
    rng: StdRng,
}

impl<S> ChartController<S> {
    pub fn new(source: S, coin_id: impl Into<String>, base_price: f64) -> ChartController<S> {
        Self::with_rng(source, coin_id, base_price, StdRng::from_entropy())
    }

    pub fn with_rng(
        source: S,
        coin_id: impl Into<String>,
        base_price: f64,
        rng: StdRng,
    ) -> ChartController<S> {
        ChartController {
            source,
            coin_id: coin_id.into(),
            base_price: if base_price > 0.0 { base_price } else { DEFAULT_BASE_PRICE },
            time_range: TimeRange::D1,
            chart_type: ChartType::Area,
            state: LoadState::Idle,
            bundle: SeriesBundle::default(),
            stats: None,
            advisory: None,
            full_data_loaded: false,
            auto_refresh: false,
            refresh_timer: None,
            zoom_level: 100,
            request_seq: 0,
            rng,
        }
    }

    pub fn coin_id(&self) -> &str {
        &self.coin_id
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn bundle(&self) -> &SeriesBundle {
        &self.bundle
    }

    pub fn stats(&self) -> Option<&DerivedStats> {
        self.stats.as_ref()
    }

    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    pub fn is_full_data_loaded(&self) -> bool {
        self.full_data_loaded
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn zoom_level(&self) -> u16 {
        self.zoom_level
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn refresh_period(&self) -> Option<Duration> {
        self.refresh_timer.as_ref().map(|t| t.period)
    }

    /// Takes a ticket for a new request. Issuing a ticket invalidates
    /// every earlier one, so a slow response cannot overwrite fresher
    /// state ("last write wins" race fix).
    fn begin_request(&mut self) -> u64 {
        self.request_seq += 1;
        self.request_seq
    }

    fn is_current(&self, ticket: u64) -> bool {
        ticket == self.request_seq
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.auto_refresh = enabled;
        self.refresh_timer = if enabled {
            Some(RefreshTimer::new(self.time_range.refresh_interval()))
        } else {
            None
        };
    }

    pub fn refresh_due(&mut self, now: Instant) -> bool {
        self.refresh_timer.as_mut().map_or(false, |t| t.due(now))
    }

    pub fn zoom_in(&mut self) {
        self.zoom_level = (self.zoom_level + 10).min(200);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_level = self.zoom_level.saturating_sub(10).max(50);
    }

    /// Degraded success: replace the whole bundle with synthetic series
    /// and surface an advisory. The chart never shows a hard failure.
    fn apply_fallback(&mut self) {
        self.advisory = Some(DEGRADED_DATA_ADVISORY.to_string());
        let now = now_ms();
        let profile = self.time_range.chart_fallback();

        let prices = synthetic::price_series(profile, self.base_price, now, &mut self.rng);
        let volumes = synthetic::volume_series(&prices, &mut self.rng);
        let market_caps =
            synthetic::market_cap_series(profile, DEFAULT_BASE_MARKET_CAP, now, &mut self.rng);
        let ohlc = if self.chart_type == ChartType::Candle {
            synthetic::ohlc_series(
                self.time_range.ohlc_fallback(),
                self.base_price,
                now,
                &mut self.rng,
            )
        } else {
            Vec::new()
        };

        self.stats = DerivedStats::from_prices(&prices, now);
        self.bundle = SeriesBundle { prices, volumes, market_caps, ohlc };
        self.full_data_loaded = true;
    }
}

impl<S: MarketDataSource> ChartController<S> {
    /// Full fetch cycle for the active (coin, range, type) configuration.
    pub async fn load(&mut self) {
        self.state = LoadState::Loading;
        self.advisory = None;
        self.full_data_loaded = false;
        let ticket = self.begin_request();

        let params = self.time_range.fetch_params();
        let result = self.source.market_chart(&self.coin_id, &params).await;
        if !self.is_current(ticket) {
            warn!("discarding stale market-chart response for {}", self.coin_id);
            return;
        }

        match result {
            Ok(raw) => self.apply_market_chart(ticket, &raw).await,
            Err(e) => {
                error!("market-chart fetch failed for {}: {}", self.coin_id, e);
                self.apply_fallback();
            }
        }
        self.state = LoadState::Ready;
    }

    async fn apply_market_chart(&mut self, ticket: u64, raw: &Value) {
        let prices = match normalize::normalize_price_series(&raw["prices"]) {
            Ok(points) => points,
            Err(e) => {
                warn!("invalid market-chart payload for {}: {}", self.coin_id, e);
                self.apply_fallback();
                return;
            }
        };

        let now = now_ms();
        let mut bundle = SeriesBundle { prices, ..SeriesBundle::default() };

        // Missing or malformed sub-series beside valid prices are not
        // worth a full fallback: volume gets a derived stand-in, market
        // caps stay empty.
        bundle.volumes = match normalize::normalize_volume_series(&raw["total_volumes"]) {
            Ok(volumes) if !volumes.is_empty() => volumes,
            _ => bundle
                .prices
                .iter()
                .map(|p| super::VolumePoint {
                    timestamp: p.timestamp,
                    volume: p.price * (0.5 + rand::Rng::gen_range(&mut self.rng, 0.0..1.0)),
                })
                .collect(),
        };
        bundle.market_caps =
            normalize::normalize_market_cap_series(&raw["market_caps"]).unwrap_or_default();

        self.stats = DerivedStats::from_prices(&bundle.prices, now);
        self.bundle = bundle;

        if self.chart_type == ChartType::Candle && self.bundle.ohlc.is_empty() {
            self.load_ohlc_with_fallback(ticket).await;
        }
        self.full_data_loaded = true;
    }

    /// OHLC sub-fetch on the load path. Unlike the live chart-type switch,
    /// a failure here synthesizes candles instead of abandoning the mode.
    async fn load_ohlc_with_fallback(&mut self, ticket: u64) {
        let days = self.time_range.ohlc_days();
        let result = self.source.ohlc(&self.coin_id, days).await;
        if !self.is_current(ticket) {
            warn!("discarding stale OHLC response for {}", self.coin_id);
            return;
        }
        let normalized = result.and_then(|raw| {
            normalize::normalize_ohlc_series(&raw).map_err(CoinDashError::from)
        });
        match normalized {
            Ok(candles) => self.bundle.ohlc = candles,
            Err(e) => {
                warn!("OHLC fetch failed for {}, generating candles: {}", self.coin_id, e);
                self.advisory = Some(DEGRADED_DATA_ADVISORY.to_string());
                self.bundle.ohlc = synthetic::ohlc_series(
                    self.time_range.ohlc_fallback(),
                    self.base_price,
                    now_ms(),
                    &mut self.rng,
                );
            }
        }
    }

    /// Points the controller at another coin and reloads from scratch.
    pub async fn set_coin(&mut self, coin_id: impl Into<String>, base_price: f64) {
        self.coin_id = coin_id.into();
        self.base_price = if base_price > 0.0 { base_price } else { DEFAULT_BASE_PRICE };
        self.bundle = SeriesBundle::default();
        self.stats = None;
        info!("chart switched to {}", self.coin_id);
        self.load().await;
    }

    pub async fn set_time_range(&mut self, range: TimeRange) {
        if range == self.time_range {
            return;
        }
        self.time_range = range;
        // Re-arm before fetching so the old interval cannot fire again.
        if self.auto_refresh {
            self.refresh_timer = Some(RefreshTimer::new(range.refresh_interval()));
        }
        self.bundle.ohlc.clear();
        self.load().await;
    }

    /// Switches the rendering mode. A live switch to candlestick without
    /// cached OHLC issues a dedicated fetch; if that fails the controller
    /// falls back to the line chart rather than synthesizing candles.
    pub async fn set_chart_type(&mut self, chart_type: ChartType) {
        if chart_type == self.chart_type {
            return;
        }
        self.chart_type = chart_type;
        if chart_type != ChartType::Candle || !self.bundle.ohlc.is_empty() {
            return;
        }

        self.full_data_loaded = false;
        let ticket = self.begin_request();
        let days = self.time_range.ohlc_days();
        let result = self.source.ohlc(&self.coin_id, days).await;
        if !self.is_current(ticket) {
            warn!("discarding stale OHLC response for {}", self.coin_id);
            return;
        }
        let normalized = result.and_then(|raw| {
            normalize::normalize_ohlc_series(&raw).map_err(CoinDashError::from)
        });
        match normalized {
            Ok(candles) => self.bundle.ohlc = candles,
            Err(e) => {
                warn!("candlestick switch failed for {}: {}", self.coin_id, e);
                self.chart_type = ChartType::Line;
                self.advisory = Some(CANDLE_UNAVAILABLE_ADVISORY.to_string());
            }
        }
        self.full_data_loaded = true;
    }

    pub async fn retry(&mut self) {
        self.load().await;
    }

    /// One event-loop iteration: reload if the refresh deadline passed.
    pub async fn tick(&mut self) {
        if self.refresh_due(Instant::now()) {
            self.load().await;
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

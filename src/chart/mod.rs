pub mod controller;
pub mod normalize;
pub mod range;
pub mod synthetic;

/// One price sample, timestamp in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePoint {
    pub timestamp: i64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketCapPoint {
    pub timestamp: i64,
    pub market_cap: f64,
}

/// One candle. Well-formed candles satisfy `high >= max(open, close)`,
/// `low <= min(open, close)` and `high > low`; the renderer treats
/// anything else as degenerate and draws a placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcPoint {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Line,
    Area,
    Bar,
    Candle,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Area => "area",
            ChartType::Bar => "bar",
            ChartType::Candle => "candle",
        }
    }

    pub fn next(self) -> ChartType {
        match self {
            ChartType::Line => ChartType::Area,
            ChartType::Area => ChartType::Bar,
            ChartType::Bar => ChartType::Candle,
            ChartType::Candle => ChartType::Line,
        }
    }
}

/// All series for one active chart configuration. Replaced wholesale on
/// every fetch/generate cycle, never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct SeriesBundle {
    pub prices: Vec<PricePoint>,
    pub volumes: Vec<VolumePoint>,
    pub market_caps: Vec<MarketCapPoint>,
    pub ohlc: Vec<OhlcPoint>,
}

/// Headline numbers derived from the first and last price point of the
/// active bundle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    pub current_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub last_updated: i64,
}

impl DerivedStats {
    pub fn from_prices(prices: &[PricePoint], now_ms: i64) -> Option<DerivedStats> {
        let first = prices.first()?;
        let last = prices.last()?;
        let change = last.price - first.price;
        let percent = if first.price != 0.0 {
            change / first.price * 100.0
        } else {
            0.0
        };
        Some(DerivedStats {
            current_price: last.price,
            price_change: change,
            price_change_percent: percent,
            last_updated: now_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_come_from_first_and_last_point() {
        let prices = vec![
            PricePoint { timestamp: 1000, price: 100.0 },
            PricePoint { timestamp: 2000, price: 110.0 },
        ];
        let stats = DerivedStats::from_prices(&prices, 5000).unwrap();
        assert_eq!(stats.current_price, 110.0);
        assert_eq!(stats.price_change, 10.0);
        assert!((stats.price_change_percent - 10.0).abs() < 1e-9);
        assert_eq!(stats.last_updated, 5000);
    }

    #[test]
    fn stats_for_single_point_are_flat() {
        let prices = vec![PricePoint { timestamp: 1000, price: 42.0 }];
        let stats = DerivedStats::from_prices(&prices, 0).unwrap();
        assert_eq!(stats.current_price, 42.0);
        assert_eq!(stats.price_change, 0.0);
        assert_eq!(stats.price_change_percent, 0.0);
    }

    #[test]
    fn stats_require_at_least_one_point() {
        assert!(DerivedStats::from_prices(&[], 0).is_none());
    }
}

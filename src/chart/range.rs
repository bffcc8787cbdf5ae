use tokio::time::Duration;

/// Symbolic timeframe selector. Drives both the CoinGecko query shape and
/// the synthetic fallback shape. The dashboard only cycles through
/// [`TimeRange::UI_RANGES`]; the granular tokens exist for API parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRange {
    M1,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    D1,
    D7,
    D30,
    D90,
    Y1,
    Max,
}

/// Query parameters for a market-chart request, in CoinGecko's convention:
/// `days` is a day-count string (or `"max"`), `interval` an optional
/// granularity hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchParams {
    pub days: &'static str,
    pub interval: Option<&'static str>,
}

/// Time step and point count for one synthetic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticProfile {
    pub step_ms: i64,
    pub points: usize,
}

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

impl TimeRange {
    /// The ranges the dashboard cycles through with the timeframe key.
    pub const UI_RANGES: [TimeRange; 8] = [
        TimeRange::H1,
        TimeRange::H4,
        TimeRange::D1,
        TimeRange::D7,
        TimeRange::D30,
        TimeRange::D90,
        TimeRange::Y1,
        TimeRange::Max,
    ];

    /// Parses a range token. Unknown tokens resolve to the documented
    /// default, 7 days.
    pub fn parse(token: &str) -> TimeRange {
        match token {
            "1m" => TimeRange::M1,
            "5m" => TimeRange::M5,
            "15m" => TimeRange::M15,
            "30m" => TimeRange::M30,
            "1h" => TimeRange::H1,
            "2h" => TimeRange::H2,
            "4h" => TimeRange::H4,
            "1d" => TimeRange::D1,
            "7d" => TimeRange::D7,
            "30d" => TimeRange::D30,
            "90d" => TimeRange::D90,
            "1y" => TimeRange::Y1,
            "max" => TimeRange::Max,
            _ => TimeRange::D7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::M1 => "1m",
            TimeRange::M5 => "5m",
            TimeRange::M15 => "15m",
            TimeRange::M30 => "30m",
            TimeRange::H1 => "1h",
            TimeRange::H2 => "2h",
            TimeRange::H4 => "4h",
            TimeRange::D1 => "1d",
            TimeRange::D7 => "7d",
            TimeRange::D30 => "30d",
            TimeRange::D90 => "90d",
            TimeRange::Y1 => "1y",
            TimeRange::Max => "max",
        }
    }

    /// Next UI range in cycling order. Granular tokens re-enter the cycle
    /// at 1h.
    pub fn next_ui(self) -> TimeRange {
        let pos = Self::UI_RANGES.iter().position(|r| *r == self);
        match pos {
            Some(i) => Self::UI_RANGES[(i + 1) % Self::UI_RANGES.len()],
            None => TimeRange::H1,
        }
    }

    /// Market-chart query parameters for this range.
    pub fn fetch_params(self) -> FetchParams {
        let (days, interval) = match self {
            TimeRange::M1 => ("1", Some("minute")),
            TimeRange::M5 => ("1", Some("5minute")),
            TimeRange::M15 => ("1", Some("15minute")),
            TimeRange::M30 => ("1", Some("30minute")),
            TimeRange::H1 => ("2", Some("hourly")),
            TimeRange::H2 => ("3", Some("2hour")),
            TimeRange::H4 => ("7", Some("4hour")),
            TimeRange::D1 => ("1", None),
            TimeRange::D7 => ("7", None),
            TimeRange::D30 => ("30", None),
            TimeRange::D90 => ("90", None),
            TimeRange::Y1 => ("365", None),
            TimeRange::Max => ("max", None),
        };
        FetchParams { days, interval }
    }

    /// Day-count string for the dedicated OHLC endpoint. Coarser than the
    /// market-chart mapping: the OHLC endpoint has no interval parameter.
    pub fn ohlc_days(self) -> &'static str {
        match self {
            TimeRange::H1 | TimeRange::H4 | TimeRange::D1 => "1",
            TimeRange::D7 => "7",
            TimeRange::D30 => "30",
            TimeRange::D90 => "90",
            TimeRange::Y1 => "365",
            TimeRange::Max => "max",
            _ => "7",
        }
    }

    /// Auto-refresh polling period for this range.
    pub fn refresh_interval(self) -> Duration {
        match self {
            TimeRange::H1 => Duration::from_secs(30),
            TimeRange::H4 => Duration::from_secs(60),
            TimeRange::D1 => Duration::from_secs(300),
            _ => Duration::from_secs(600),
        }
    }

    /// Profile for the full-series fallback (price, volume, market cap,
    /// and OHLC generated together when the market-chart fetch fails).
    /// Tokens outside the UI set use the 7d entry.
    pub fn chart_fallback(self) -> SyntheticProfile {
        let (step_ms, points) = match self {
            TimeRange::H1 => (MINUTE_MS, 60),
            TimeRange::H4 => (5 * MINUTE_MS, 24),
            TimeRange::D1 => (HOUR_MS, 100),
            TimeRange::D30 => (8 * HOUR_MS, 100),
            TimeRange::D90 => (DAY_MS, 100),
            TimeRange::Y1 => (3 * DAY_MS, 100),
            TimeRange::Max => (7 * DAY_MS, 100),
            _ => (2 * HOUR_MS, 100),
        };
        SyntheticProfile { step_ms, points }
    }

    /// Profile for the OHLC-only fallback. Deliberately denser/sparser
    /// than [`chart_fallback`](Self::chart_fallback) per range: the two
    /// tables diverged upstream and unifying them would change candle
    /// density on screen.
    pub fn ohlc_fallback(self) -> SyntheticProfile {
        let (step_ms, points) = match self {
            TimeRange::H1 => (5 * MINUTE_MS, 12),
            TimeRange::H4 => (20 * MINUTE_MS, 12),
            TimeRange::D1 => (2 * HOUR_MS, 12),
            TimeRange::D7 => (12 * HOUR_MS, 14),
            TimeRange::D30 => (DAY_MS, 30),
            TimeRange::D90 => (3 * DAY_MS, 30),
            TimeRange::Y1 => (7 * DAY_MS, 52),
            TimeRange::Max => (30 * DAY_MS, 60),
            _ => (DAY_MS, 30),
        };
        SyntheticProfile { step_ms, points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TimeRange; 13] = [
        TimeRange::M1,
        TimeRange::M5,
        TimeRange::M15,
        TimeRange::M30,
        TimeRange::H1,
        TimeRange::H2,
        TimeRange::H4,
        TimeRange::D1,
        TimeRange::D7,
        TimeRange::D30,
        TimeRange::D90,
        TimeRange::Y1,
        TimeRange::Max,
    ];

    #[test]
    fn every_token_round_trips_through_parse() {
        for range in ALL {
            assert_eq!(TimeRange::parse(range.as_str()), range);
        }
    }

    #[test]
    fn unknown_tokens_default_to_seven_days() {
        assert_eq!(TimeRange::parse("bogus"), TimeRange::D7);
        assert_eq!(TimeRange::parse(""), TimeRange::D7);
        assert_eq!(TimeRange::parse("2y"), TimeRange::D7);
    }

    #[test]
    fn resolver_is_total_over_all_tokens() {
        for range in ALL {
            let params = range.fetch_params();
            assert!(!params.days.is_empty());
            assert!(range.chart_fallback().points > 0);
            assert!(range.chart_fallback().step_ms > 0);
            assert!(range.ohlc_fallback().points > 0);
            assert!(!range.ohlc_days().is_empty());
        }
    }

    #[test]
    fn max_token_maps_to_max_days() {
        assert_eq!(TimeRange::Max.fetch_params().days, "max");
        assert_eq!(TimeRange::Max.ohlc_days(), "max");
    }

    #[test]
    fn market_chart_mapping_matches_upstream() {
        assert_eq!(
            TimeRange::H1.fetch_params(),
            FetchParams { days: "2", interval: Some("hourly") }
        );
        assert_eq!(
            TimeRange::H4.fetch_params(),
            FetchParams { days: "7", interval: Some("4hour") }
        );
        assert_eq!(TimeRange::D1.fetch_params(), FetchParams { days: "1", interval: None });
        assert_eq!(TimeRange::Y1.fetch_params(), FetchParams { days: "365", interval: None });
    }

    #[test]
    fn chart_fallback_profile_table() {
        assert_eq!(
            TimeRange::H1.chart_fallback(),
            SyntheticProfile { step_ms: 60_000, points: 60 }
        );
        assert_eq!(
            TimeRange::H4.chart_fallback(),
            SyntheticProfile { step_ms: 300_000, points: 24 }
        );
        assert_eq!(
            TimeRange::D1.chart_fallback(),
            SyntheticProfile { step_ms: 3_600_000, points: 100 }
        );
        assert_eq!(
            TimeRange::D7.chart_fallback(),
            SyntheticProfile { step_ms: 7_200_000, points: 100 }
        );
        assert_eq!(
            TimeRange::Max.chart_fallback(),
            SyntheticProfile { step_ms: 604_800_000, points: 100 }
        );
        // Granular tokens use the 7d entry.
        assert_eq!(TimeRange::M5.chart_fallback(), TimeRange::D7.chart_fallback());
    }

    #[test]
    fn ohlc_fallback_profile_table_stays_distinct() {
        assert_eq!(
            TimeRange::H1.ohlc_fallback(),
            SyntheticProfile { step_ms: 300_000, points: 12 }
        );
        assert_eq!(
            TimeRange::D7.ohlc_fallback(),
            SyntheticProfile { step_ms: 43_200_000, points: 14 }
        );
        assert_eq!(
            TimeRange::Y1.ohlc_fallback(),
            SyntheticProfile { step_ms: 604_800_000, points: 52 }
        );
        for range in TimeRange::UI_RANGES {
            assert_ne!(range.chart_fallback(), range.ohlc_fallback());
        }
    }

    #[test]
    fn refresh_interval_is_keyed_by_range() {
        assert_eq!(TimeRange::H1.refresh_interval(), Duration::from_secs(30));
        assert_eq!(TimeRange::H4.refresh_interval(), Duration::from_secs(60));
        assert_eq!(TimeRange::D1.refresh_interval(), Duration::from_secs(300));
        assert_eq!(TimeRange::D30.refresh_interval(), Duration::from_secs(600));
        assert_eq!(TimeRange::Max.refresh_interval(), Duration::from_secs(600));
    }

    #[test]
    fn ui_cycle_wraps_around() {
        assert_eq!(TimeRange::H1.next_ui(), TimeRange::H4);
        assert_eq!(TimeRange::Max.next_ui(), TimeRange::H1);
        assert_eq!(TimeRange::M15.next_ui(), TimeRange::H1);
    }
}

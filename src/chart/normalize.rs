//! Shape validation for raw CoinGecko payloads. The API is treated as
//! untrusted: only arrays of exact numeric tuples pass through, everything
//! else is flagged so the controller can fall back to synthetic data.
//! Values are never repaired here; an inconsistent candle is still a
//! well-shaped candle.

use serde_json::Value;
use thiserror::Error;

use super::{MarketCapPoint, OhlcPoint, PricePoint, VolumePoint};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid series shape: {0}")]
pub struct ShapeError(pub String);

/// Checks that `row` is an array of exactly `arity` numbers and returns
/// them. The first element is the epoch-millisecond timestamp.
fn numeric_tuple(row: &Value, arity: usize, index: usize) -> Result<Vec<f64>, ShapeError> {
    let items = row
        .as_array()
        .ok_or_else(|| ShapeError(format!("element {} is not an array", index)))?;
    if items.len() != arity {
        return Err(ShapeError(format!(
            "element {} has {} members, expected {}",
            index,
            items.len(),
            arity
        )));
    }
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| ShapeError(format!("element {} contains a non-numeric member", index)))
        })
        .collect()
}

fn rows(raw: &Value) -> Result<&Vec<Value>, ShapeError> {
    raw.as_array()
        .ok_or_else(|| ShapeError("top-level value is not an array".to_string()))
}

/// Validates a `[timestamp, price][]` payload. An empty array is a valid
/// empty series, not an error.
pub fn normalize_price_series(raw: &Value) -> Result<Vec<PricePoint>, ShapeError> {
    rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let t = numeric_tuple(row, 2, i)?;
            Ok(PricePoint { timestamp: t[0] as i64, price: t[1] })
        })
        .collect()
}

pub fn normalize_volume_series(raw: &Value) -> Result<Vec<VolumePoint>, ShapeError> {
    rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let t = numeric_tuple(row, 2, i)?;
            Ok(VolumePoint { timestamp: t[0] as i64, volume: t[1] })
        })
        .collect()
}

pub fn normalize_market_cap_series(raw: &Value) -> Result<Vec<MarketCapPoint>, ShapeError> {
    rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let t = numeric_tuple(row, 2, i)?;
            Ok(MarketCapPoint { timestamp: t[0] as i64, market_cap: t[1] })
        })
        .collect()
}

/// Validates a `[timestamp, open, high, low, close][]` payload. OHLC
/// consistency (wick ordering) is deliberately not checked here; the
/// renderer handles degenerate candles.
pub fn normalize_ohlc_series(raw: &Value) -> Result<Vec<OhlcPoint>, ShapeError> {
    rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let t = numeric_tuple(row, 5, i)?;
            Ok(OhlcPoint {
                timestamp: t[0] as i64,
                open: t[1],
                high: t[2],
                low: t[3],
                close: t[4],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_shaped_prices_pass_through_in_order() {
        let raw = json!([[1000, 100.0], [2000, 110.5], [3000, 90.25]]);
        let points = normalize_price_series(&raw).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], PricePoint { timestamp: 1000, price: 100.0 });
        assert_eq!(points[1], PricePoint { timestamp: 2000, price: 110.5 });
        assert_eq!(points[2], PricePoint { timestamp: 3000, price: 90.25 });
    }

    #[test]
    fn empty_array_is_valid_and_empty() {
        assert_eq!(normalize_price_series(&json!([])).unwrap(), vec![]);
        assert_eq!(normalize_ohlc_series(&json!([])).unwrap(), vec![]);
    }

    #[test]
    fn non_array_top_level_is_invalid() {
        assert!(normalize_price_series(&json!({"prices": []})).is_err());
        assert!(normalize_price_series(&json!("nope")).is_err());
        assert!(normalize_price_series(&json!(null)).is_err());
    }

    #[test]
    fn wrong_tuple_arity_is_invalid() {
        assert!(normalize_price_series(&json!([[1000, 1.0, 2.0]])).is_err());
        assert!(normalize_price_series(&json!([[1000]])).is_err());
        assert!(normalize_ohlc_series(&json!([[1000, 1.0, 2.0, 0.5]])).is_err());
    }

    #[test]
    fn non_numeric_member_is_invalid() {
        assert!(normalize_price_series(&json!([[1000, "100"]])).is_err());
        assert!(normalize_volume_series(&json!([[null, 5.0]])).is_err());
    }

    #[test]
    fn one_bad_row_flags_the_whole_payload() {
        let raw = json!([[1000, 1.0], [2000, 2.0], "oops"]);
        assert!(normalize_price_series(&raw).is_err());
    }

    #[test]
    fn ohlc_values_are_not_repaired() {
        // high < low is inconsistent but well shaped; it must pass through
        // untouched for the renderer to deal with.
        let raw = json!([[1000, 10.0, 5.0, 20.0, 11.0]]);
        let points = normalize_ohlc_series(&raw).unwrap();
        assert_eq!(points[0].high, 5.0);
        assert_eq!(points[0].low, 20.0);
    }

    #[test]
    fn market_caps_round_trip() {
        let raw = json!([[1000, 1.0e11], [2000, 1.1e11]]);
        let points = normalize_market_cap_series(&raw).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].market_cap, 1.1e11);
    }
}

//! Directional signal from three-span exponential smoothing.
//!
//! Three EMAs (spans 7, 14, 21) are each extrapolated one step forward with
//! `forecast = 3 * ema[last] - 2 * ema[previous]`. A direction is only called
//! when all three pairwise forecast comparisons agree; requiring unanimity
//! across timescales suppresses noise. The volatility score `rw` measures how
//! far the forecasts have pulled away from the trailing smoothed values,
//! relative to the last price.

use crate::math::ema_last_two;
use fibgrid_core::errors::InvariantError;
use fibgrid_core::side::Side;
use fibgrid_core::types::Indicator;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Two trailing EMA points per window require at least this many closes.
pub const MIN_CLOSES: usize = 22;

/// Computes the indicator from closing prices, oldest first.
///
/// # Errors
/// Returns `InvariantError::NotEnoughCandles` when fewer than [`MIN_CLOSES`]
/// prices are supplied.
pub fn compute_indicator(closes: &[Decimal]) -> Result<Indicator, InvariantError> {
    if closes.len() < MIN_CLOSES {
        return Err(InvariantError::NotEnoughCandles {
            got: closes.len(),
            need: MIN_CLOSES,
        });
    }

    let series: Vec<f64> = closes
        .iter()
        .map(|close| close.to_f64().unwrap_or_default())
        .collect();

    let (ema7_prev, ema7_last) = ema_last_two(&series, 7);
    let (ema14_prev, ema14_last) = ema_last_two(&series, 14);
    let (ema21_prev, ema21_last) = ema_last_two(&series, 21);

    let forecast7 = 3.0 * ema7_last - 2.0 * ema7_prev;
    let forecast14 = 3.0 * ema14_last - 2.0 * ema14_prev;
    let forecast21 = 3.0 * ema21_last - 2.0 * ema21_prev;

    let mut up = 0;
    let mut down = 0;
    for (faster, slower) in [
        (forecast7, forecast14),
        (forecast7, forecast21),
        (forecast14, forecast21),
    ] {
        if faster > slower {
            up += 1;
        }
        if faster < slower {
            down += 1;
        }
    }

    let side = match (up, down) {
        (3, _) => Side::Long,
        (_, 3) => Side::Short,
        _ => Side::Flat,
    };

    let last_price = series[series.len() - 1];
    let dispersion = (forecast14 - ema7_prev)
        .abs()
        .max((forecast21 - ema14_prev).abs())
        .max((forecast21 - ema7_prev).abs());
    let rw = dispersion / last_price * 100.0;

    Ok(Indicator { side, rw })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes_from(values: impl IntoIterator<Item = i64>) -> Vec<Decimal> {
        values.into_iter().map(Decimal::from).collect()
    }

    #[test]
    fn rising_series_signals_long() {
        let closes = closes_from(1..=30);
        let indicator = compute_indicator(&closes).unwrap();
        assert_eq!(indicator.side, Side::Long);
        assert!(indicator.rw > 0.0);
    }

    #[test]
    fn falling_series_signals_short() {
        let closes = closes_from((1..=30).rev());
        let indicator = compute_indicator(&closes).unwrap();
        assert_eq!(indicator.side, Side::Short);
    }

    #[test]
    fn constant_series_is_flat_with_zero_rw() {
        let closes = vec![Decimal::from(350); 25];
        let indicator = compute_indicator(&closes).unwrap();
        assert_eq!(indicator.side, Side::Flat);
        assert!(indicator.rw.abs() < 1e-12);
    }

    #[test]
    fn reversal_without_unanimity_is_flat() {
        // A long rise followed by a sharp drop: the fast forecast flips
        // before the slow ones agree.
        let mut values: Vec<i64> = (1..=28).collect();
        values.extend([20, 12]);
        let closes = closes_from(values);
        let indicator = compute_indicator(&closes).unwrap();
        assert_eq!(indicator.side, Side::Flat);
    }

    #[test]
    fn short_history_is_rejected() {
        let closes = closes_from(1..=21);
        let err = compute_indicator(&closes).unwrap_err();
        assert!(matches!(
            err,
            InvariantError::NotEnoughCandles { got: 21, need: 22 }
        ));
    }

    #[test]
    fn minimum_history_is_accepted() {
        let closes = closes_from(1..=22);
        assert!(compute_indicator(&closes).is_ok());
    }

    #[test]
    fn rw_is_never_negative() {
        for closes in [
            closes_from(1..=30),
            closes_from((1..=30).rev()),
            closes_from([7; 30]),
        ] {
            let indicator = compute_indicator(&closes).unwrap();
            assert!(indicator.rw >= 0.0);
        }
    }
}

use crate::errors::ConfigError;
use crate::side::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Strategy knobs, refreshed wholesale from the control plane before every
/// cycle. CamelCase on the wire; missing keys fall back to the defaults.
///
/// Distances are absolute price offsets in quote currency, not percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameters {
    pub max_leverage: Decimal,
    /// Fraction of balance committed per ladder rung.
    pub open_pos_percent: Decimal,
    /// Capacity cap, in multiples of the per-rung quantity.
    pub max_open_pos_count: u32,
    pub long_addition_distance: Decimal,
    pub short_addition_distance: Decimal,
    pub long_take_profit_distance: Decimal,
    pub short_take_profit_distance: Decimal,
    pub long_stop_loss_distance: Decimal,
    pub short_stop_loss_distance: Decimal,
    /// Volatility ceiling; readings above it veto the cycle.
    pub max_rw: f64,
    /// When false the indicator side is inverted (counter-trend mode).
    pub trend_following: bool,
    pub allow_long: bool,
    pub allow_short: bool,
    pub candle_period: String,
    pub rest_interval_secs: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_leverage: Decimal::new(3, 0),
            open_pos_percent: Decimal::new(1, 2), // 0.01
            max_open_pos_count: 10,
            long_addition_distance: Decimal::new(1, 1), // 0.1
            short_addition_distance: Decimal::new(1, 1), // 0.1
            long_take_profit_distance: Decimal::new(5, 1), // 0.5
            short_take_profit_distance: Decimal::new(5, 1), // 0.5
            long_stop_loss_distance: Decimal::new(10, 0),
            short_stop_loss_distance: Decimal::new(10, 0),
            max_rw: 0.5,
            trend_following: true,
            allow_long: true,
            allow_short: true,
            candle_period: "5m".to_string(),
            rest_interval_secs: 10,
        }
    }
}

impl Parameters {
    /// Rejects knob values the strategy cannot trade on.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidParameter` naming the first offending
    /// knob. Validation failures are fatal to the robot loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive: [(&str, Decimal); 8] = [
            ("maxLeverage", self.max_leverage),
            ("openPosPercent", self.open_pos_percent),
            ("longAdditionDistance", self.long_addition_distance),
            ("shortAdditionDistance", self.short_addition_distance),
            ("longTakeProfitDistance", self.long_take_profit_distance),
            ("shortTakeProfitDistance", self.short_take_profit_distance),
            ("longStopLossDistance", self.long_stop_loss_distance),
            ("shortStopLossDistance", self.short_stop_loss_distance),
        ];
        for (name, value) in positive {
            if value <= Decimal::ZERO {
                return Err(ConfigError::invalid_parameter(name, "must be positive"));
            }
        }
        if self.open_pos_percent > Decimal::ONE {
            return Err(ConfigError::invalid_parameter(
                "openPosPercent",
                "must not exceed 1",
            ));
        }
        if self.max_open_pos_count == 0 {
            return Err(ConfigError::invalid_parameter(
                "maxOpenPosCount",
                "must be at least 1",
            ));
        }
        if !self.max_rw.is_finite() || self.max_rw <= 0.0 {
            return Err(ConfigError::invalid_parameter(
                "maxRw",
                "must be positive and finite",
            ));
        }
        if self.candle_period.is_empty() {
            return Err(ConfigError::invalid_parameter(
                "candlePeriod",
                "must not be empty",
            ));
        }
        if self.rest_interval_secs == 0 {
            return Err(ConfigError::invalid_parameter(
                "restIntervalSecs",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Ladder offset factor for the given direction. Short distance covers
    /// the flat case; flat never reaches the ladder builder.
    #[must_use]
    pub fn addition_distance(&self, side: Side) -> Decimal {
        match side {
            Side::Long => self.long_addition_distance,
            _ => self.short_addition_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_validate() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(Parameters::default()).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "maxLeverage",
            "openPosPercent",
            "maxOpenPosCount",
            "longAdditionDistance",
            "shortTakeProfitDistance",
            "longStopLossDistance",
            "maxRw",
            "trendFollowing",
            "allowLong",
            "allowShort",
            "candlePeriod",
            "restIntervalSecs",
        ] {
            assert!(object.contains_key(key), "missing wire key {key}");
        }
    }

    #[test]
    fn partial_payload_fills_defaults() {
        let params: Parameters =
            serde_json::from_str(r#"{"maxLeverage": "5", "allowShort": false}"#).unwrap();
        assert_eq!(params.max_leverage, dec!(5));
        assert!(!params.allow_short);
        assert_eq!(params.open_pos_percent, dec!(0.01));
        assert_eq!(params.candle_period, "5m");
    }

    #[test]
    fn rejects_non_positive_knobs() {
        let mut params = Parameters::default();
        params.max_leverage = Decimal::ZERO;
        assert!(params.validate().is_err());

        let mut params = Parameters::default();
        params.long_stop_loss_distance = dec!(-1);
        assert!(params.validate().is_err());

        let mut params = Parameters::default();
        params.max_open_pos_count = 0;
        assert!(params.validate().is_err());

        let mut params = Parameters::default();
        params.max_rw = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_percent_above_one() {
        let mut params = Parameters::default();
        params.open_pos_percent = dec!(1.5);
        assert!(params.validate().is_err());
    }

    #[test]
    fn addition_distance_by_side() {
        let mut params = Parameters::default();
        params.long_addition_distance = dec!(0.2);
        params.short_addition_distance = dec!(0.3);
        assert_eq!(params.addition_distance(Side::Long), dec!(0.2));
        assert_eq!(params.addition_distance(Side::Short), dec!(0.3));
        assert_eq!(params.addition_distance(Side::Flat), dec!(0.3));
    }
}

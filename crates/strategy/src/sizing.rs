//! Per-cycle capacity sizing.

use fibgrid_core::errors::ConfigError;
use fibgrid_core::params::Parameters;
use fibgrid_core::types::{MarketType, TradingContext};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived sizing state: the quantity committed per ladder rung and the
/// position-size ceiling. Recomputed from scratch every cycle; a stale store
/// is a bug, never a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Store {
    pub open_pos_qty: Decimal,
    pub max_pos_qty: Decimal,
}

impl Store {
    /// Derives sizing from balance, knobs, and the last traded price.
    ///
    /// Inverse contracts count integer contracts and truncate toward zero so
    /// a rung can never overshoot available margin. Linear contracts hold
    /// fractional base-asset amounts rounded to the venue's quantity
    /// precision.
    ///
    /// # Errors
    /// Returns `ConfigError::UnsupportedMarketType` for spot and margin
    /// markets, which have no sizing rules here.
    pub fn sync(
        balance: Decimal,
        params: &Parameters,
        last_price: Decimal,
        context: &TradingContext,
    ) -> Result<Self, ConfigError> {
        let leveraged = balance * params.max_leverage;
        let count = Decimal::from(params.max_open_pos_count);

        match context.market_type {
            MarketType::InversePerpetual | MarketType::InverseDelivery => {
                let open_pos_qty = (leveraged * params.open_pos_percent * last_price).trunc();
                let max_pos_qty = (open_pos_qty * count)
                    .trunc()
                    .min((leveraged * last_price).trunc());
                Ok(Self {
                    open_pos_qty,
                    max_pos_qty,
                })
            }
            MarketType::LinearPerpetual | MarketType::LinearDelivery => {
                let precision = context.qty_precision;
                let open_unrounded = leveraged * params.open_pos_percent / last_price;
                let max_pos_qty = (open_unrounded * count)
                    .round_dp(precision)
                    .min((leveraged / last_price).round_dp(precision));
                Ok(Self {
                    open_pos_qty: open_unrounded.round_dp(precision),
                    max_pos_qty,
                })
            }
            other @ (MarketType::Spots | MarketType::Margin) => {
                Err(ConfigError::UnsupportedMarketType(other))
            }
        }
    }
}

use crate::params::Parameters;
use crate::types::MarketType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub paper: PaperVenueConfig,
    /// Parameter table served by the local control plane. A remote control
    /// plane supersedes this section.
    #[serde(default)]
    pub parameters: Parameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    pub pair: String,
    pub target_currency: String,
    pub market_type: MarketType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperVenueConfig {
    pub price_precision: u32,
    pub qty_precision: u32,
    pub initial_balance: Decimal,
    pub initial_price: Decimal,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            pair: "ETHUSDT".to_string(),
            target_currency: "USDT".to_string(),
            market_type: MarketType::LinearPerpetual,
        }
    }
}

impl Default for PaperVenueConfig {
    fn default() -> Self {
        Self {
            price_precision: 2,
            qty_precision: 3,
            initial_balance: Decimal::new(10000, 0),
            initial_price: Decimal::new(350, 0),
        }
    }
}
